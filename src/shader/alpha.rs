//! Translucent gradients.
//!
//! PDF shadings are opaque, so a gradient with alpha is drawn as a tiling
//! pattern that fills its bounds with the opaque color gradient under a soft
//! mask. The mask is a luminosity group painting a grey gradient whose levels
//! are the stop alphas. Both gradients go through the shared cache.

use anyhow::Result;

use crate::geometry::Rect;
use crate::pdf::{DocumentEmitter, ObjectRef, PdfDict, PdfObject};

use super::key::{GradientCache, GradientKey};
use super::utils::rectangle_op;

/// Whether any stop of `key` is not fully opaque.
pub fn has_alpha(key: &GradientKey) -> bool {
    key.descriptor.has_alpha()
}

fn rect_array(r: &Rect) -> PdfObject {
    PdfObject::reals(&[r.left, r.top, r.right, r.bottom])
}

/// Content stream painting pattern `pattern` over `bounds`, optionally under
/// graphics state `gs`. Resource names carry the object numbers.
fn pattern_fill_content(gs: Option<ObjectRef>, pattern: ObjectRef, bounds: &Rect) -> String {
    let mut content = String::new();
    if let Some(gs) = gs {
        content.push_str(&format!("/G{} gs\n", gs.number()));
    }
    let p = pattern.number();
    content.push_str(&format!("/Pattern CS/Pattern cs/P{p} SCN/P{p} scn\n"));
    content.push_str(&rectangle_op(bounds));
    content.push_str("f*\n");
    content
}

fn resource_dict(pattern: ObjectRef, gs: Option<ObjectRef>) -> PdfDict {
    let mut resources = PdfDict::new();
    if let Some(gs) = gs {
        let mut states = PdfDict::new();
        states.insert(format!("G{}", gs.number()), gs);
        resources.insert("ExtGState", states);
    }
    let mut patterns = PdfDict::new();
    patterns.insert(format!("P{}", pattern.number()), pattern);
    resources.insert("Pattern", patterns);
    resources
}

/// ExtGState whose luminosity soft mask is the alpha channel of `key`.
fn smask_graphic_state(
    doc: &mut dyn DocumentEmitter,
    cache: &mut GradientCache,
    key: &GradientKey,
) -> Result<Option<ObjectRef>> {
    let luminosity_key = key.with_descriptor(key.descriptor.luminosity());
    debug_assert!(!has_alpha(&luminosity_key));
    let Some(luminosity) = cache.acquire(doc, luminosity_key)? else {
        return Ok(None);
    };

    let bbox = key.bbox.to_rect();
    let mut group = PdfDict::typed("Group");
    group.insert_name("S", "Transparency");
    group.insert_name("CS", "DeviceRGB");

    let mut form = PdfDict::typed("XObject");
    form.insert_name("Subtype", "Form");
    form.insert("BBox", rect_array(&bbox));
    form.insert("Resources", resource_dict(luminosity, None));
    form.insert("Group", group);
    let content = pattern_fill_content(None, luminosity, &bbox);
    let mask_form = doc.emit_stream(form, content.into_bytes())?;

    let mut mask = PdfDict::typed("Mask");
    mask.insert_name("S", "Luminosity");
    mask.insert("G", mask_form);

    let mut state = PdfDict::typed("ExtGState");
    state.insert("SMask", mask);
    doc.emit_object(state).map(Some)
}

/// Emit the tiling pattern for a gradient with translucent stops.
///
/// `Ok(None)` when the bounding box is empty (a tiling pattern needs
/// positive steps) or when either the color or the mask gradient cannot be
/// compiled.
pub fn make_alpha_function_shader(
    doc: &mut dyn DocumentEmitter,
    cache: &mut GradientCache,
    key: &GradientKey,
) -> Result<Option<ObjectRef>> {
    let bbox = key.bbox.to_rect();
    if bbox.is_empty() {
        log::debug!("translucent gradient has an empty bounding box; skipping");
        return Ok(None);
    }

    let opaque_key = key.with_descriptor(key.descriptor.opaque());
    debug_assert!(!has_alpha(&opaque_key));
    let Some(color_pattern) = cache.acquire(doc, opaque_key)? else {
        return Ok(None);
    };
    let Some(alpha_gs) = smask_graphic_state(doc, cache, key)? else {
        log::warn!(
            "alpha mask gradient failed after its color gradient compiled"
        );
        return Ok(None);
    };

    let mut pattern = PdfDict::typed("Pattern");
    pattern.insert_int("PatternType", 1);
    pattern.insert_int("PaintType", 1);
    pattern.insert_int("TilingType", 1);
    pattern.insert("BBox", rect_array(&bbox));
    pattern.insert_real("XStep", bbox.width());
    pattern.insert_real("YStep", bbox.height());
    pattern.insert("Resources", resource_dict(color_pattern, Some(alpha_gs)));

    let content = pattern_fill_content(Some(alpha_gs), color_pattern, &bbox);
    doc.emit_stream(pattern, content.into_bytes()).map(Some)
}
