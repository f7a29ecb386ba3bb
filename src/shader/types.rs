//! Core type definitions for the gradient compiler.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::geometry::{Matrix, Point};

/// Geometry of the ramp parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GradientKind {
    Linear,
    Radial,
    Conical,
    Sweep,
}

/// How the ramp parameter is folded back into `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TileMode {
    #[default]
    Clamp,
    Repeat,
    Mirror,
}

/// Unpremultiplied 8-bit RGBA.
///
/// Scenes write either `{"r", "g", "b", "a"?}` with 8-bit channels or a
/// premultiplied float array `[r, g, b, a]` in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ColorRepr")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    // Tried first so integer arrays such as [1, 0, 0, 1] read as floats.
    Premultiplied([f32; 4]),
    Bytes {
        r: u8,
        g: u8,
        b: u8,
        #[serde(default = "opaque_alpha")]
        a: u8,
    },
}

fn opaque_alpha() -> u8 {
    Color::OPAQUE
}

impl From<ColorRepr> for Color {
    fn from(repr: ColorRepr) -> Self {
        match repr {
            ColorRepr::Premultiplied(rgba) => Color::from_premultiplied_f32(rgba),
            ColorRepr::Bytes { r, g, b, a } => Color::rgba(r, g, b, a),
        }
    }
}

impl Color {
    pub const OPAQUE: u8 = 0xFF;
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, Self::OPAQUE)
    }

    /// Quantize a premultiplied float color; channels are unpremultiplied first.
    pub fn from_premultiplied_f32([r, g, b, a]: [f32; 4]) -> Self {
        let a = a.clamp(0.0, 1.0);
        let unpremul = |c: f32| if a > 0.0 { c / a } else { 0.0 };
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::rgba(q(unpremul(r)), q(unpremul(g)), q(unpremul(b)), q(a))
    }

    pub fn rgb_channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn is_opaque(self) -> bool {
        self.a == Self::OPAQUE
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn eq_ignoring_alpha(self, other: Color) -> bool {
        self.rgb_channels() == other.rgb_channels()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ColorStop {
    pub color: Color,
    pub offset: f32,
}

impl ColorStop {
    pub const fn new(offset: f32, color: Color) -> Self {
        Self { color, offset }
    }
}

impl PartialEq for ColorStop {
    fn eq(&self, other: &Self) -> bool {
        self.color == other.color && self.offset.to_bits() == other.offset.to_bits()
    }
}

impl Eq for ColorStop {}

impl Hash for ColorStop {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.color.hash(state);
        self.offset.to_bits().hash(state);
    }
}

/// A gradient paint in its own (shader-local) coordinate space.
///
/// `points` and `radii` are interpreted per kind:
/// - linear: `points[0]` → `points[1]`
/// - radial: center `points[0]`, radius `radii[0]`
/// - conical: circles (`points[0]`, `radii[0]`) → (`points[1]`, `radii[1]`)
/// - sweep: center `points[0]`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientDescriptor {
    pub kind: GradientKind,
    pub stops: Vec<ColorStop>,
    #[serde(default)]
    pub points: [Point; 2],
    #[serde(default)]
    pub radii: [f32; 2],
    #[serde(default)]
    pub tile_mode: TileMode,
    /// Interpolation hints carried through to the cache key.
    #[serde(default)]
    pub flags: u32,
}

impl PartialEq for GradientDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.stops == other.stops
            && self.points == other.points
            && self.radii.map(f32::to_bits) == other.radii.map(f32::to_bits)
            && self.tile_mode == other.tile_mode
            && self.flags == other.flags
    }
}

impl Eq for GradientDescriptor {}

impl Hash for GradientDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.stops.len().hash(state);
        self.stops.hash(state);
        self.points.hash(state);
        self.radii.map(f32::to_bits).hash(state);
        self.tile_mode.hash(state);
        self.flags.hash(state);
    }
}

impl GradientDescriptor {
    pub fn linear(p0: Point, p1: Point, stops: Vec<ColorStop>, tile_mode: TileMode) -> Self {
        Self {
            kind: GradientKind::Linear,
            stops,
            points: [p0, p1],
            radii: [0.0, 0.0],
            tile_mode,
            flags: 0,
        }
    }

    pub fn radial(center: Point, radius: f32, stops: Vec<ColorStop>, tile_mode: TileMode) -> Self {
        Self {
            kind: GradientKind::Radial,
            stops,
            points: [center, center],
            radii: [radius, 0.0],
            tile_mode,
            flags: 0,
        }
    }

    pub fn conical(
        start: Point,
        start_radius: f32,
        end: Point,
        end_radius: f32,
        stops: Vec<ColorStop>,
        tile_mode: TileMode,
    ) -> Self {
        Self {
            kind: GradientKind::Conical,
            stops,
            points: [start, end],
            radii: [start_radius, end_radius],
            tile_mode,
            flags: 0,
        }
    }

    pub fn sweep(center: Point, stops: Vec<ColorStop>, tile_mode: TileMode) -> Self {
        Self {
            kind: GradientKind::Sweep,
            stops,
            points: [center, center],
            radii: [0.0, 0.0],
            tile_mode,
            flags: 0,
        }
    }

    pub fn colors(&self) -> impl Iterator<Item = Color> + '_ {
        self.stops.iter().map(|s| s.color)
    }

    /// At least one stop, finite offsets within `[0, 1]`, non-decreasing.
    pub fn is_well_formed(&self) -> bool {
        !self.stops.is_empty()
            && self
                .stops
                .iter()
                .all(|s| s.offset.is_finite() && (0.0..=1.0).contains(&s.offset))
            && self.stops.windows(2).all(|w| w[0].offset <= w[1].offset)
    }

    /// Stops padded so the ramp covers `[0, 1]`: the first color is repeated at
    /// `0` and the last at `1` when the stops leave those ends open.
    pub fn ramp_stops(&self) -> Vec<ColorStop> {
        let mut stops = self.stops.clone();
        if let Some(first) = stops.first().copied() {
            if first.offset > 0.0 {
                stops.insert(0, ColorStop::new(0.0, first.color));
            }
        }
        if let Some(last) = stops.last().copied() {
            if last.offset < 1.0 {
                stops.push(ColorStop::new(1.0, last.color));
            }
        }
        stops
    }

    pub fn has_alpha(&self) -> bool {
        self.colors().any(|c| !c.is_opaque())
    }

    /// Copy with every stop forced fully opaque.
    pub fn opaque(&self) -> Self {
        self.map_colors(|c| c.with_alpha(Color::OPAQUE))
    }

    /// Copy whose stops are opaque greys equal to the source alpha.
    pub fn luminosity(&self) -> Self {
        self.map_colors(|c| Color::rgb(c.a, c.a, c.a))
    }

    fn map_colors(&self, f: impl Fn(Color) -> Color) -> Self {
        let mut out = self.clone();
        for stop in &mut out.stops {
            stop.color = f(stop.color);
        }
        out
    }
}

/// A gradient together with its local matrix: what a painted shape carries.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientShader {
    pub descriptor: GradientDescriptor,
    #[serde(default, with = "crate::dsl::matrix_serde")]
    pub local_matrix: Matrix,
}

impl GradientShader {
    pub fn new(descriptor: GradientDescriptor) -> Self {
        Self {
            descriptor,
            local_matrix: Matrix::IDENTITY,
        }
    }

    pub fn with_local_matrix(mut self, local_matrix: Matrix) -> Self {
        self.local_matrix = local_matrix;
        self
    }
}
