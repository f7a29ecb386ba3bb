//! Folding of the ramp parameter for repeat and mirror tiling.

use super::types::TileMode;
use super::utils::ProgramText;

/// Emit code mapping `t` on the stack into the ramp domain.
///
/// Clamp emits nothing: the range dispatch clamps at its own boundary tests.
pub fn write_tile_mode(mode: TileMode, code: &mut ProgramText) {
    match mode {
        TileMode::Clamp => {}
        TileMode::Repeat => {
            code.text("dup truncate sub\n"); // fractional part, sign kept
            code.text("dup 0 le {1 add} if\n"); // (-1, 0] -> (0, 1]
        }
        TileMode::Mirror => {
            // `T 2 mod 0 gt` rather than `T 2 mod 1 eq`: some viewers abort the
            // function when an integer/real `eq` yields false.
            code.text(
                "abs \
                 dup \
                 truncate \
                 dup \
                 cvi \
                 2 mod \
                 0 gt \
                 3 1 roll \
                 sub \
                 exch \
                 {1 exch sub} if\n",
            );
        }
    }
}
