//! Per-kind calculator programs mapping a sample point `x y` to `r g b`.
//!
//! Every program runs in the gradient's unit space: the caller has already
//! folded the kind-specific placement into the pattern matrix, so a linear
//! ramp runs along the x axis and a radial one is centered on the origin with
//! unit radius. Conical gradients keep explicit circles, given in that same
//! unit space.

use crate::geometry::{Matrix, Point};

use super::matrix_split::write_perspective_correction;
use super::range_dispatch::write_gradient_function;
use super::tile_mode::write_tile_mode;
use super::types::{GradientDescriptor, GradientKind};
use super::utils::ProgramText;

const TOUCHING_TOLERANCE: f32 = 0.002;

/// Nudge internally tangent circles apart.
///
/// When the center distance equals the radius difference to within `0.002`,
/// the larger radius grows by `0.002` so the inner circle sits strictly
/// inside the outer one.
pub fn fix_up_radius(p1: Point, r1: &mut f32, p2: Point, r2: &mut f32) {
    let distance = p1.distance(p2);
    let subtract_radii = (*r1 - *r2).abs();
    if (distance - subtract_radii).abs() < TOUCHING_TOLERANCE {
        if *r1 > *r2 {
            *r1 += TOUCHING_TOLERANCE;
        } else {
            *r2 += TOUCHING_TOLERANCE;
        }
    }
}

/// Build the full `{ ... }` function body for `descriptor`.
///
/// `perspective_inverse` is applied to the input point first; pass the
/// identity for an affine pattern matrix.
pub fn write_geometry_program(
    descriptor: &GradientDescriptor,
    perspective_inverse: &Matrix,
) -> ProgramText {
    let mut code = ProgramText::new();
    code.text("{");
    write_perspective_correction(perspective_inverse, &mut code);

    match descriptor.kind {
        GradientKind::Linear => {
            code.text("pop\n"); // y is irrelevant
            write_ramp(descriptor, &mut code);
            code.text("}");
        }
        GradientKind::Radial => {
            code.text("dup mul exch dup mul add sqrt\n");
            write_ramp(descriptor, &mut code);
            code.text("}");
        }
        GradientKind::Sweep => {
            code.text("exch atan 360 div\n");
            write_ramp(descriptor, &mut code);
            code.text("}");
        }
        GradientKind::Conical => {
            write_conical_parameter(descriptor, &mut code);
            code.text("{");
            write_ramp(descriptor, &mut code);
            code.text("} {0 0 0} ifelse }");
        }
    }

    code
}

fn write_ramp(descriptor: &GradientDescriptor, code: &mut ProgramText) {
    write_tile_mode(descriptor.tile_mode, code);
    write_gradient_function(&descriptor.ramp_stops(), code);
}

/// Leaves `t true` for a point on the cone, or just `false` outside it.
///
/// Solves `a·t² + b·t + c = 0` for the interpolated circle through the point
/// and keeps the largest root whose radius is positive, as canvas radial
/// gradients do.
fn write_conical_parameter(descriptor: &GradientDescriptor, code: &mut ProgramText) {
    let [p0, p1] = descriptor.points;
    let dx = p1.x - p0.x;
    let dy = p1.y - p0.y;
    let r0 = descriptor.radii[0];
    let dr = descriptor.radii[1] - r0;
    let a = dx * dx + dy * dy - dr * dr;

    // b = -2 (y·dy + x·dx + r0·dr), keep b and b²
    code.text("2 copy ").scalar(dy).text(" mul exch ").scalar(dx).text(" mul add ");
    code.scalar(r0 * dr).text(" add -2 mul dup dup mul\n");

    // c = x² + y² - r0²                                  c b b² c
    code.text("4 2 roll dup mul exch dup mul add ").scalar(r0 * r0);
    code.text(" sub dup 4 1 roll\n");

    if a == 0.0 {
        // linear case: t = -c/b
        code.text("pop pop div neg dup ").scalar(dr).text(" mul ").scalar(r0).text(" add\n");
        code.text("0 lt {pop false} {true} ifelse\n");
        return;
    }

    // discriminant b² - 4ac
    code.scalar(a * 4.0).text(" mul sub dup\n");
    code.text("0 ge {\n");

    // q = -0.5 (b + sign(b)·√d); roots q/a and c/q
    code.text("sqrt exch dup 0 lt {exch -1 mul} if add -0.5 mul dup\n");
    code.scalar(a).text(" div\n");
    code.text("3 1 roll div\n");
    code.text("2 copy gt {exch} if\n");

    code.text("dup ").scalar(dr).text(" mul ").scalar(r0).text(" add\n");
    code.text(" 0 gt {exch pop true}\n");

    code.text("{pop dup\n").scalar(dr).text(" mul ").scalar(r0).text(" add\n");
    code.text("0 le {pop false} {true} ifelse\n");
    code.text("} ifelse\n");

    code.text("} {pop pop pop false} ifelse\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::matrix_split::split_perspective;
    use crate::shader::types::{Color, ColorStop, TileMode};
    use crate::shader::validation::{evaluate_program, validate_program};
    use proptest::prelude::*;

    fn red_to_blue() -> Vec<ColorStop> {
        vec![
            ColorStop::new(0.0, Color::rgb(255, 0, 0)),
            ColorStop::new(1.0, Color::rgb(0, 0, 255)),
        ]
    }

    fn eval(desc: &GradientDescriptor, x: f32, y: f32) -> Vec<f32> {
        let code = write_geometry_program(desc, &Matrix::IDENTITY);
        evaluate_program(code.as_str(), &[x, y]).unwrap()
    }

    fn assert_close(got: &[f32], expected: [f32; 3]) {
        assert_eq!(got.len(), 3, "{got:?}");
        for (g, e) in got.iter().zip(expected) {
            assert!((g - e).abs() < 2e-3, "got {got:?}, expected {expected:?}");
        }
    }

    #[test]
    fn every_kind_produces_a_valid_program() {
        let origin = Point::new(0.0, 0.0);
        let unit = Point::new(1.0, 0.0);
        for desc in [
            GradientDescriptor::linear(origin, unit, red_to_blue(), TileMode::Clamp),
            GradientDescriptor::radial(origin, 1.0, red_to_blue(), TileMode::Repeat),
            GradientDescriptor::conical(origin, 0.5, unit, 1.0, red_to_blue(), TileMode::Mirror),
            GradientDescriptor::sweep(origin, red_to_blue(), TileMode::Clamp),
        ] {
            let code = write_geometry_program(&desc, &Matrix::IDENTITY);
            validate_program(code.as_str()).unwrap();
        }
    }

    #[test]
    fn linear_ignores_y() {
        let desc = GradientDescriptor::linear(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            red_to_blue(),
            TileMode::Clamp,
        );
        assert_close(&eval(&desc, 0.5, 123.0), [0.5, 0.0, 0.5]);
        assert!(
            write_geometry_program(&desc, &Matrix::IDENTITY).as_str().starts_with("{pop\n")
        );
    }

    #[test]
    fn radial_uses_distance_from_origin() {
        let desc =
            GradientDescriptor::radial(Point::new(0.0, 0.0), 1.0, red_to_blue(), TileMode::Clamp);
        assert_close(&eval(&desc, 0.3, 0.4), [0.5, 0.0, 0.5]);
        assert_close(&eval(&desc, 3.0, 4.0), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn sweep_measures_angle_in_turns() {
        let desc = GradientDescriptor::sweep(Point::new(0.0, 0.0), red_to_blue(), TileMode::Clamp);
        // 90 degrees is a quarter turn
        assert_close(&eval(&desc, 0.0, 1.0), [0.75, 0.0, 0.25]);
    }

    #[test]
    fn sweep_applies_perspective_correction() {
        let projective = Matrix::from_row_major([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.1, 0.05, 1.0]);
        let split = split_perspective(&projective).unwrap();
        let desc = GradientDescriptor::sweep(Point::new(0.0, 0.0), red_to_blue(), TileMode::Clamp);
        let code = write_geometry_program(&desc, &split.perspective_inverse);

        let p = Point::new(2.0, 3.0);
        let corrected = split.perspective_inverse.map_point(p);
        let direct = eval(&desc, corrected.x, corrected.y);
        let via_code = evaluate_program(code.as_str(), &[p.x, p.y]).unwrap();
        assert_close(&via_code, [direct[0], direct[1], direct[2]]);
    }

    #[test]
    fn concentric_cone_interpolates_between_radii() {
        let c = Point::new(0.0, 0.0);
        let desc = GradientDescriptor::conical(c, 1.0, c, 2.0, red_to_blue(), TileMode::Clamp);
        assert_close(&eval(&desc, 1.5, 0.0), [0.5, 0.0, 0.5]);
        // inside the start circle the parameter is negative and clamps
        assert_close(&eval(&desc, 0.5, 0.0), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn cone_with_zero_discriminant_is_not_black() {
        let desc = GradientDescriptor::conical(
            Point::new(0.0, 0.0),
            0.0,
            Point::new(5.0, 0.0),
            3.0,
            red_to_blue(),
            TileMode::Clamp,
        );
        // b = -40, c = 25, a = 16: the double root t = 1.25 has radius 3.75.
        assert_close(&eval(&desc, 4.0, 3.0), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn outside_the_cone_is_black() {
        // a start circle larger than the end circle, offset to the side: points
        // far behind the start are not covered by any circle of positive radius.
        let desc = GradientDescriptor::conical(
            Point::new(0.0, 0.0),
            1.0,
            Point::new(4.0, 0.0),
            0.5,
            red_to_blue(),
            TileMode::Clamp,
        );
        assert_close(&eval(&desc, 0.0, 5.0), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn degenerate_cone_takes_linear_branch() {
        // |dx| == |dr| makes the quadratic coefficient vanish.
        let desc = GradientDescriptor::conical(
            Point::new(0.0, 0.0),
            0.0,
            Point::new(1.0, 0.0),
            1.0,
            red_to_blue(),
            TileMode::Clamp,
        );
        let code = write_geometry_program(&desc, &Matrix::IDENTITY);
        assert!(code.as_str().contains("pop pop div neg dup"));
        assert!(!code.as_str().contains("0 ge {"));
        validate_program(code.as_str()).unwrap();
    }

    #[test]
    fn touching_circles_are_separated() {
        let mut r1 = 1.0;
        let mut r2 = 3.0;
        fix_up_radius(Point::new(0.0, 0.0), &mut r1, Point::new(2.0, 0.0), &mut r2);
        assert_eq!(r1, 1.0);
        assert!((r2 - 3.002).abs() < 1e-6);

        let mut r1 = 3.0;
        let mut r2 = 1.0;
        fix_up_radius(
            Point::new(0.0, 0.0),
            &mut r1,
            Point::new(2.001, 0.0),
            &mut r2,
        );
        assert!((r1 - 3.002).abs() < 1e-6);

        let mut r1 = 1.0;
        let mut r2 = 3.0;
        fix_up_radius(Point::new(0.0, 0.0), &mut r1, Point::new(1.0, 0.0), &mut r2);
        assert_eq!((r1, r2), (1.0, 3.0));
    }

    proptest! {
        #[test]
        fn fix_up_keeps_order_and_opens_the_gap(
            r_small in 0.0f32..50.0,
            gap in 0.0f32..50.0,
            jitter in -0.0019f32..0.0019,
            angle in 0.0f32..std::f32::consts::TAU,
            first_is_larger in any::<bool>(),
        ) {
            let r_large = r_small + gap;
            let distance = (gap + jitter).max(0.0);
            let p1 = Point::new(0.0, 0.0);
            let p2 = Point::new(distance * angle.cos(), distance * angle.sin());
            let (mut r1, mut r2) = if first_is_larger {
                (r_large, r_small)
            } else {
                (r_small, r_large)
            };
            let before = (r1, r2);
            let touching = (p1.distance(p2) - (r1 - r2).abs()).abs() < 0.002;

            fix_up_radius(p1, &mut r1, p2, &mut r2);

            if touching {
                if before.0 > before.1 {
                    prop_assert_eq!(r1, before.0 + 0.002);
                    prop_assert_eq!(r2, before.1);
                } else {
                    prop_assert_eq!(r1, before.0);
                    prop_assert_eq!(r2, before.1 + 0.002);
                }
            } else {
                prop_assert_eq!((r1, r2), before);
            }
        }
    }
}
