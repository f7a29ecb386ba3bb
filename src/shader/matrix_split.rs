//! Removal of the projective row from a gradient transform.
//!
//! PDF pattern matrices are affine. A projective transform `M` is split as
//! `M = A · P` where `A` is affine and
//!
//! ```text
//!     | 1  0  0  |
//! P = | 0  1  0  |
//!     | p0 p1 p2 |
//! ```
//!
//! `A` becomes the pattern matrix and `P⁻¹` is applied to the sample point by
//! the generated function code.

use crate::geometry::{Matrix, nearly_zero};

use super::utils::ProgramText;

/// Result of [`split_perspective`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveSplit {
    pub affine: Matrix,
    /// `P⁻¹`; identity when the input had no projective row.
    pub perspective_inverse: Matrix,
}

/// Split `input` into an affine part and the inverse of its projective part.
///
/// Returns `None` when the projective scale `p2` is (nearly) zero.
pub fn split_perspective(input: &Matrix) -> Option<PerspectiveSplit> {
    if !input.has_perspective() {
        return Some(PerspectiveSplit {
            affine: *input,
            perspective_inverse: Matrix::IDENTITY,
        });
    }

    let p2 = input.get(Matrix::PERSP_2);
    if nearly_zero(p2) {
        return None;
    }

    let sx = input.get(Matrix::SCALE_X);
    let kx = input.get(Matrix::SKEW_X);
    let tx = input.get(Matrix::TRANS_X);
    let ky = input.get(Matrix::SKEW_Y);
    let sy = input.get(Matrix::SCALE_Y);
    let ty = input.get(Matrix::TRANS_Y);
    let p0 = input.get(Matrix::PERSP_0);
    let p1 = input.get(Matrix::PERSP_1);

    let perspective_inverse = Matrix::from_row_major([
        1.0,
        0.0,
        0.0,
        0.0,
        1.0,
        0.0,
        -p0 / p2,
        -p1 / p2,
        1.0 / p2,
    ]);

    let affine = Matrix::from_row_major([
        sx - p0 * tx / p2,
        kx - p1 * tx / p2,
        tx / p2,
        ky - p0 * ty / p2,
        sy - p1 * ty / p2,
        ty / p2,
        0.0,
        0.0,
        1.0,
    ]);

    Some(PerspectiveSplit {
        affine,
        perspective_inverse,
    })
}

/// Emit code mapping `x y` on the stack through `perspective_inverse`.
///
/// Only the bottom row is used: `x y` becomes `x/w y/w` with
/// `w = p0·x + p1·y + p2`. Emits nothing for a matrix without one.
pub fn write_perspective_correction(perspective_inverse: &Matrix, code: &mut ProgramText) {
    if !perspective_inverse.has_perspective() {
        return;
    }

    let p0 = perspective_inverse.get(Matrix::PERSP_0);
    let p1 = perspective_inverse.get(Matrix::PERSP_1);
    let p2 = perspective_inverse.get(Matrix::PERSP_2);

    //                                  x y
    code.text(" dup ").scalar(p1); //   x y y p1
    code.text(" mul ") //               x y y*p1
        .text(" 2 index ") //           x y y*p1 x
        .scalar(p0); //                 x y y*p1 x p0
    code.text(" mul ").scalar(p2); //   x y y*p1 x*p0 p2
    code.text(" add ") //               x y y*p1 x*p0+p2
        .text("add ") //                x y w
        .text("3 1 roll ") //           w x y
        .text("2 index ") //            w x y w
        .text("div ") //                w x y/w
        .text("3 1 roll ") //           y/w w x
        .text("exch ") //               y/w x w
        .text("div ") //                y/w x/w
        .text("exch\n"); //             x/w y/w
}
