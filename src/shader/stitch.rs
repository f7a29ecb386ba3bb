//! Native ramp functions (types 2 and 3) for axial and radial shadings.

use crate::pdf::{PdfDict, PdfObject};

use super::types::{ColorStop, GradientDescriptor};

const STOP_NUDGE: f32 = 0.00001;

fn color_components(rgb: [u8; 3]) -> PdfObject {
    PdfObject::reals(&rgb.map(|c| c as f32 / 255.0))
}

/// Exponential interpolation between two colors over `[0, 1]`.
fn interpolation_function(c0: [u8; 3], c1: [u8; 3]) -> PdfDict {
    let mut dict = PdfDict::new();
    dict.insert("C0", color_components(c0));
    dict.insert("C1", color_components(c1));
    dict.insert("Domain", PdfObject::reals(&[0.0, 1.0]));
    dict.insert_int("FunctionType", 2);
    dict.insert_real("N", 1.0);
    dict
}

/// Make offsets usable as stitching bounds.
///
/// Offsets are forced non-decreasing and a stop sandwiched between two stops
/// at the same offset is dropped. Interior offsets are then pushed forward by
/// `0.00001` past their predecessor and pulled back by the same amount below
/// their successor, so the interior offsets end up strictly increasing and
/// strictly inside the first and last offsets. An interior stop that still
/// cannot be separated is dropped.
pub fn normalize_stops(mut stops: Vec<ColorStop>) -> Vec<ColorStop> {
    let mut i = 1;
    while i + 1 < stops.len() {
        if stops[i - 1].offset > stops[i].offset {
            stops[i].offset = stops[i - 1].offset;
        }
        if stops[i - 1].offset == stops[i].offset && stops[i].offset == stops[i + 1].offset {
            stops.remove(i);
        } else {
            i += 1;
        }
    }

    let n = stops.len();
    if n < 3 {
        return stops;
    }
    for i in 1..n - 1 {
        let floor = stops[i - 1].offset;
        if stops[i].offset <= floor {
            stops[i].offset = floor + STOP_NUDGE;
        }
    }
    for i in (1..n - 1).rev() {
        let ceiling = stops[i + 1].offset;
        if stops[i].offset >= ceiling {
            stops[i].offset = ceiling - STOP_NUDGE;
        }
    }

    let (first, last) = (stops[0], stops[n - 1]);
    let mut kept = Vec::with_capacity(n);
    kept.push(first);
    for &stop in &stops[1..n - 1] {
        let floor = kept[kept.len() - 1].offset;
        if stop.offset > floor && stop.offset < last.offset {
            kept.push(stop);
        }
    }
    kept.push(last);
    kept
}

/// The `/Function` of a native axial or radial shading for `descriptor`.
///
/// Two stops give a single type 2 function; more give a type 3 stitching
/// function over one type 2 function per adjacent pair.
pub fn native_ramp_function(descriptor: &GradientDescriptor) -> PdfDict {
    let mut stops = normalize_stops(descriptor.ramp_stops());
    if let [only] = stops[..] {
        stops.push(only);
    }

    let colors: Vec<[u8; 3]> = stops.iter().map(|s| s.color.rgb_channels()).collect();
    if colors.len() == 2 {
        return interpolation_function(colors[0], colors[1]);
    }

    let mut encode = Vec::new();
    let mut bounds = Vec::new();
    let mut functions = Vec::new();
    for idx in 1..stops.len() {
        if idx > 1 {
            bounds.push(PdfObject::Real(stops[idx - 1].offset));
        }
        encode.push(PdfObject::Real(0.0));
        encode.push(PdfObject::Real(1.0));
        let segment = interpolation_function(colors[idx - 1], colors[idx]);
        functions.push(PdfObject::Dict(segment));
    }

    let mut dict = PdfDict::new();
    dict.insert("Domain", PdfObject::reals(&[0.0, 1.0]));
    dict.insert_int("FunctionType", 3);
    dict.insert("Encode", PdfObject::Array(encode));
    dict.insert("Bounds", PdfObject::Array(bounds));
    dict.insert("Functions", PdfObject::Array(functions));
    dict
}
