use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::geometry::{IRect, Matrix};
use crate::shader::GradientShader;

/// A batch of gradient paints to compile into one document.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GradientScene {
    pub version: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    pub gradients: Vec<GradientDraw>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Metadata {
    pub name: String,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// One painted shape: the gradient, where it is drawn, and its device bounds.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GradientDraw {
    pub id: String,
    pub shader: GradientShader,
    #[serde(default, with = "matrix_serde")]
    pub canvas_matrix: Matrix,
    pub bbox: IRect,
}

/// Matrices as JSON arrays: six numbers in PDF order `[a b c d e f]`, or nine
/// numbers row-major including the projective row.
pub mod matrix_serde {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::geometry::Matrix;

    pub fn serialize<S: Serializer>(m: &Matrix, s: S) -> std::result::Result<S::Ok, S::Error> {
        if m.has_perspective() {
            s.collect_seq(m.row_major())
        } else {
            s.collect_seq(m.to_affine())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Matrix, D::Error> {
        let values = Vec::<f32>::deserialize(d)?;
        if let Ok(affine) = <[f32; 6]>::try_from(values.as_slice()) {
            return Ok(Matrix::from_affine(affine));
        }
        if let Ok(full) = <[f32; 9]>::try_from(values.as_slice()) {
            return Ok(Matrix::from_row_major(full));
        }
        Err(D::Error::custom(format!(
            "matrix must have 6 or 9 numbers, got {}",
            values.len()
        )))
    }
}

pub fn parse_scene(text: &str) -> Result<GradientScene> {
    serde_json::from_str(text).context("failed to parse gradient scene json")
}

pub fn load_scene_from_path(path: impl AsRef<std::path::Path>) -> Result<GradientScene> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scene json at {}", path.display()))?;
    let scene = parse_scene(&text).with_context(|| format!("in {}", path.display()))?;
    validate_scene(&scene)?;
    Ok(scene)
}

/// Structural checks that serde cannot express.
///
/// Gradient-level problems (empty or unsorted stops, degenerate transforms)
/// are not errors here; the compiler reports those per gradient.
pub fn validate_scene(scene: &GradientScene) -> Result<()> {
    if scene.version.trim().is_empty() {
        bail!("scene version must not be empty");
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for draw in &scene.gradients {
        if draw.id.is_empty() {
            bail!("gradient id must not be empty");
        }
        if !seen.insert(draw.id.as_str()) {
            bail!("duplicate gradient id: {}", draw.id);
        }
    }
    Ok(())
}

pub fn find_draw<'a>(scene: &'a GradientScene, id: &str) -> Option<&'a GradientDraw> {
    scene.gradients.iter().find(|d| d.id == id)
}
