//! Gradient-to-PDF compilation.
//!
//! [`compile_gradient`] turns a [`GradientShader`] painted under a canvas
//! transform into a pattern object, reusing a previously emitted pattern when
//! the same gradient is painted again with the same placement.

pub mod alpha;
pub mod function_shader;
pub mod geometry_code;
pub mod key;
pub mod matrix_split;
pub mod range_dispatch;
pub mod stitch;
pub mod tile_mode;
pub mod types;
pub mod utils;
pub mod validation;

use anyhow::Result;

use crate::geometry::{IRect, Matrix};
use crate::pdf::{DocumentEmitter, ObjectRef};

pub use key::{GradientCache, GradientKey};
pub use types::{Color, ColorStop, GradientDescriptor, GradientKind, GradientShader, TileMode};

/// Pattern object for `shader` drawn under `canvas_transform` within `bbox`.
///
/// `Ok(None)` means no pattern could be produced (malformed stops or an
/// unrepresentable transform); the caller paints nothing. `Err` is an
/// emitter failure.
pub fn compile_gradient(
    doc: &mut dyn DocumentEmitter,
    cache: &mut GradientCache,
    shader: &GradientShader,
    canvas_transform: &Matrix,
    bbox: IRect,
) -> Result<Option<ObjectRef>> {
    let key = GradientKey::new(
        shader.descriptor.clone(),
        *canvas_transform,
        shader.local_matrix,
        bbox,
    );
    cache.acquire(doc, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::pdf::InMemoryDocument;

    #[test]
    fn empty_stops_yield_nothing() {
        let shader = GradientShader::new(GradientDescriptor::linear(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Vec::new(),
            TileMode::Clamp,
        ));
        let mut doc = InMemoryDocument::new();
        let mut cache = GradientCache::new();
        let bbox = IRect::from_ltrb(0, 0, 10, 10);
        let out = compile_gradient(&mut doc, &mut cache, &shader, &Matrix::IDENTITY, bbox);
        assert_eq!(out.unwrap(), None);
        assert!(doc.is_empty());
    }

    #[test]
    fn local_matrix_is_part_of_identity() {
        let shader = GradientShader::new(GradientDescriptor::radial(
            Point::new(5.0, 5.0),
            5.0,
            vec![ColorStop::new(0.0, Color::WHITE), ColorStop::new(1.0, Color::BLACK)],
            TileMode::Clamp,
        ));
        let moved = shader.clone().with_local_matrix(Matrix::translate(3.0, 0.0));
        let mut doc = InMemoryDocument::new();
        let mut cache = GradientCache::new();
        let bbox = IRect::from_ltrb(0, 0, 10, 10);
        let identity = Matrix::IDENTITY;
        let a = compile_gradient(&mut doc, &mut cache, &shader, &identity, bbox).unwrap();
        let b = compile_gradient(&mut doc, &mut cache, &moved, &identity, bbox).unwrap();
        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
    }
}
