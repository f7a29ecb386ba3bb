//! Number formatting and program-text helpers shared by the code generators.

use std::fmt::Write as _;

use crate::geometry::Rect;

/// Format a float for PDF/PostScript: shortest round-trip decimal, never an
/// exponent, `-0` folded to `0`. Non-finite values become `0`.
pub fn fmt_scalar(v: f32) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    if v == 0.0 {
        return "0".to_string();
    }
    format!("{v}")
}

/// An 8-bit color channel as a `[0, 1]` component.
pub fn fmt_color_component(c: u8) -> String {
    match c {
        0 => "0".to_string(),
        255 => "1".to_string(),
        _ => fmt_scalar(c as f32 / 255.0),
    }
}

/// Append-only buffer for calculator-program text.
#[derive(Debug, Default, Clone)]
pub struct ProgramText {
    buf: String,
}

impl ProgramText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.push_str(s);
        self
    }

    pub fn scalar(&mut self, v: f32) -> &mut Self {
        self.buf.push_str(&fmt_scalar(v));
        self
    }

    pub fn color_component(&mut self, c: u8) -> &mut Self {
        self.buf.push_str(&fmt_color_component(c));
        self
    }

    /// `r g b` of an 8-bit color, space separated.
    pub fn rgb(&mut self, rgb: [u8; 3]) -> &mut Self {
        self.color_component(rgb[0])
            .text(" ")
            .color_component(rgb[1])
            .text(" ")
            .color_component(rgb[2])
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Freeze the buffer into stream bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.into_bytes()
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

/// Content-stream fragment `x y w h re` for `r`.
pub fn rectangle_op(r: &Rect) -> String {
    let mut s = String::new();
    let _ = writeln!(
        s,
        "{} {} {} {} re",
        fmt_scalar(r.left),
        fmt_scalar(r.top),
        fmt_scalar(r.width()),
        fmt_scalar(r.height())
    );
    s
}
