//! Shading pattern construction for opaque gradients.
//!
//! Two strategies:
//! - **native**: clamped linear, radial and conical gradients under an affine
//!   transform become axial (type 2) or radial (type 3) shadings driven by a
//!   stitched ramp function.
//! - **custom**: everything else becomes a function-based (type 1) shading
//!   whose type 4 calculator function is generated per gradient kind.

use anyhow::Result;

use crate::geometry::{Matrix, Point, inverse_transform_bbox, unit_to_points};
use crate::pdf::{DocumentEmitter, ObjectRef, PdfDict, PdfObject};

use super::geometry_code::{fix_up_radius, write_geometry_program};
use super::key::GradientKey;
use super::matrix_split::split_perspective;
use super::stitch::native_ramp_function;
use super::types::{GradientDescriptor, GradientKind, TileMode};
use super::utils::ProgramText;

/// Emit a PatternType 2 object for `key` (whose stops must all be opaque).
///
/// Returns `Ok(None)` when the transform cannot be represented: a projective
/// row that cannot be split off, or a pattern matrix that collapses the
/// bounding box.
pub fn make_function_shader(
    doc: &mut dyn DocumentEmitter,
    key: &GradientKey,
) -> Result<Option<ObjectRef>> {
    let descriptor = &key.descriptor;
    let mut final_matrix = key.canvas_transform.concat(&key.shader_transform);

    let native = matches!(
        descriptor.kind,
        GradientKind::Linear | GradientKind::Radial | GradientKind::Conical
    ) && descriptor.tile_mode == TileMode::Clamp
        && !final_matrix.has_perspective();

    let mut shading = PdfDict::new();
    let shading_type = if native {
        log::debug!("{:?} gradient: native shading", descriptor.kind);
        let function = doc.emit_object(native_ramp_function(descriptor))?;
        shading.insert("Function", function);
        shading.insert(
            "Extend",
            PdfObject::Array(vec![PdfObject::Bool(true), PdfObject::Bool(true)]),
        );
        shading.insert("Coords", native_coords(descriptor));
        if descriptor.kind == GradientKind::Linear { 2 } else { 3 }
    } else {
        log::debug!(
            "{:?} gradient: calculator function ({:?}, perspective: {})",
            descriptor.kind,
            descriptor.tile_mode,
            final_matrix.has_perspective()
        );
        let Some((matrix, domain, code)) = custom_function(key, final_matrix) else {
            return Ok(None);
        };
        final_matrix = matrix;

        let mut function = PdfDict::new();
        function.insert_int("FunctionType", 4);
        function.insert("Domain", PdfObject::reals(&domain));
        function.insert("Range", PdfObject::reals(&[0.0, 1.0, 0.0, 1.0, 0.0, 1.0]));
        let function = doc.emit_stream(function, code.into_bytes())?;

        shading.insert("Domain", PdfObject::reals(&domain));
        shading.insert("Function", function);
        1
    };

    shading.insert_int("ShadingType", shading_type);
    shading.insert_name("ColorSpace", "DeviceRGB");

    let mut pattern = PdfDict::typed("Pattern");
    pattern.insert_int("PatternType", 2);
    pattern.insert("Matrix", PdfObject::reals(&final_matrix.to_affine()));
    pattern.insert("Shading", shading);
    doc.emit_object(pattern).map(Some)
}

fn native_coords(descriptor: &GradientDescriptor) -> PdfObject {
    let [p0, p1] = descriptor.points;
    match descriptor.kind {
        GradientKind::Conical => {
            let [mut r0, mut r1] = descriptor.radii;
            fix_up_radius(p0, &mut r0, p1, &mut r1);
            PdfObject::reals(&[p0.x, p0.y, r0, p1.x, p1.y, r1])
        }
        GradientKind::Radial => {
            PdfObject::reals(&[p0.x, p0.y, 0.0, p0.x, p0.y, descriptor.radii[0]])
        }
        _ => PdfObject::reals(&[p0.x, p0.y, p1.x, p1.y]),
    }
}

/// Two points whose unit-segment mapping places the gradient's unit space.
fn defining_points(descriptor: &GradientDescriptor) -> [Point; 2] {
    let [p0, p1] = descriptor.points;
    match descriptor.kind {
        GradientKind::Linear => [p0, p1],
        GradientKind::Radial => [p0, Point::new(p0.x + descriptor.radii[0], p0.y)],
        GradientKind::Conical | GradientKind::Sweep => [p0, Point::new(p0.x + 1.0, p0.y)],
    }
}

/// Pattern matrix, `[l r t b]` domain and calculator code of the custom path.
fn custom_function(
    key: &GradientKey,
    mut final_matrix: Matrix,
) -> Option<(Matrix, [f32; 4], ProgramText)> {
    let descriptor = &key.descriptor;
    let mapper = unit_to_points(defining_points(descriptor));
    final_matrix.pre_concat(&mapper);

    let Some(split) = split_perspective(&final_matrix) else {
        log::warn!(
            "gradient transform has a degenerate projective row; skipping"
        );
        return None;
    };

    let Some(bbox) = inverse_transform_bbox(&split.affine, &key.bbox.to_rect()) else {
        log::debug!(
            "gradient bounding box collapses under the pattern matrix; skipping"
        );
        return None;
    };

    let mut unit = descriptor.clone();
    if unit.kind == GradientKind::Conical {
        let Some(inverse_mapper) = mapper.invert() else {
            log::debug!("conical gradient placement is not invertible; skipping");
            return None;
        };
        unit.points = unit.points.map(|p| inverse_mapper.map_point(p));
        unit.radii = unit.radii.map(|r| inverse_mapper.map_radius(r));
    }

    let code = write_geometry_program(&unit, &split.perspective_inverse);
    let domain = [bbox.left, bbox.right, bbox.top, bbox.bottom];
    Some((split.affine, domain, code))
}
