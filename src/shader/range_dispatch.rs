//! Code generation mapping a ramp parameter `t` to an RGB color.
//!
//! The emitted program has the shape
//!
//! ```text
//! if t <= 0          { color[0], mark found }
//! if 0 < t <= end    { binary search over spans, interpolate, mark found }
//! if not found       { color[last] }
//! ```
//!
//! While searching the stack is `[t]`. Once a span matched it is
//! `[r g b 0]`: the trailing `0` makes every later `t > 0` test fail, so it
//! doubles as the "found" marker and is consumed by the final test.

use super::types::{Color, ColorStop};
use super::utils::ProgramText;

/// Indices `i` such that the span `stops[i-1]..stops[i]` needs code.
///
/// Zero-width spans are dropped, and so is every span whose neighbours on
/// both sides have the same RGB color (alpha is ignored).
pub fn collapse_ranges(stops: &[ColorStop]) -> Vec<usize> {
    let n = stops.len();
    (1..n)
        .filter(|&i| {
            let constant_both_sides = stops[i - 1].color.eq_ignoring_alpha(stops[i].color)
                && i != n - 1
                && stops[i].color.eq_ignoring_alpha(stops[i + 1].color);
            let degenerate = stops[i - 1].offset == stops[i].offset;
            !degenerate && !constant_both_sides
        })
        .collect()
}

/// Balanced decision tree over span end indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchNode {
    Leaf {
        end: usize,
    },
    Split {
        end: usize,
        lo: Box<DispatchNode>,
        hi: Box<DispatchNode>,
    },
}

impl DispatchNode {
    /// Index of the last stop covered by this subtree.
    pub fn end(&self) -> usize {
        match self {
            DispatchNode::Leaf { end } | DispatchNode::Split { end, .. } => *end,
        }
    }

    /// Number of range tests on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        match self {
            DispatchNode::Leaf { .. } => 0,
            DispatchNode::Split { lo, hi, .. } => 1 + lo.depth().max(hi.depth()),
        }
    }

    #[cfg(test)]
    fn leaf_ends(&self) -> Vec<usize> {
        match self {
            DispatchNode::Leaf { end } => vec![*end],
            DispatchNode::Split { lo, hi, .. } => {
                let mut v = lo.leaf_ends();
                v.extend(hi.leaf_ends());
                v
            }
        }
    }
}

/// Bisect `range_ends` by count. `None` when there is nothing to dispatch.
pub fn build_dispatch_tree(range_ends: &[usize]) -> Option<DispatchNode> {
    match range_ends {
        [] => None,
        [end] => Some(DispatchNode::Leaf { end: *end }),
        _ => {
            let (lo, hi) = range_ends.split_at(range_ends.len() / 2);
            let lo = build_dispatch_tree(lo)?;
            let hi = build_dispatch_tree(hi)?;
            Some(DispatchNode::Split {
                end: hi.end(),
                lo: Box::new(lo),
                hi: Box::new(hi),
            })
        }
    }
}

const COLOR_SCALE: f32 = 1.0 / 255.0;

/// Emit code turning `t - start` on the stack into `r g b` interpolated from
/// `begin` to `end` over a span of width `range` (non-zero).
pub fn write_interpolation(range: f32, begin: Color, end: Color, code: &mut ProgramText) {
    let begin = begin.rgb_channels();
    let end = end.rgb_channels();

    let multiplier: [f32; 3] =
        std::array::from_fn(|i| COLOR_SCALE * (end[i] as f32 - begin[i] as f32) / range);

    // keep_input[i]: a later component still reads t, so component i works on a copy.
    let mut keep_input = [false; 3];
    for i in (0..2).rev() {
        keep_input[i] = keep_input[i + 1] || multiplier[i + 1] != 0.0;
    }

    if !keep_input[0] && multiplier[0] == 0.0 {
        code.text("pop ");
    }

    for i in 0..3 {
        if keep_input[i] && multiplier[i] != 0.0 {
            code.text("dup ");
        }

        if multiplier[i] == 0.0 {
            code.color_component(begin[i]).text(" ");
        } else {
            if multiplier[i] != 1.0 {
                code.scalar(multiplier[i]).text(" mul ");
            }
            if begin[i] != 0 {
                code.color_component(begin[i]).text(" add ");
            }
        }

        if keep_input[i] {
            code.text("exch ");
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Branch {
    /// Outermost test: `0 < t <= end`.
    Top,
    /// Low side of a split: `t <= end`.
    First,
    /// High side of a split: the `else` procedure.
    Else,
}

fn write_node(stops: &[ColorStop], node: &DispatchNode, branch: Branch, code: &mut ProgramText) {
    let range_end = stops[node.end()].offset;

    match branch {
        Branch::Top => {
            // `0 gt` rather than `0 ne`: some viewers treat `0. 0 ne` as true.
            code.text("dup dup 0 gt exch ").scalar(range_end).text(" le and {\n");
        }
        Branch::First => {
            code.text("dup ").scalar(range_end).text(" le {\n");
        }
        Branch::Else => {
            code.text("{\n");
        }
    }

    match node {
        DispatchNode::Leaf { end } => {
            let begin = end - 1;
            let range_begin = stops[begin].offset;
            code.scalar(range_begin).text(" sub ");
            write_interpolation(
                range_end - range_begin,
                stops[begin].color,
                stops[*end].color,
                code,
            );
            code.text("\n");
        }
        DispatchNode::Split { lo, hi, .. } => {
            write_node(stops, lo, Branch::First, code);
            write_node(stops, hi, Branch::Else, code);
        }
    }

    match branch {
        Branch::Top => {
            code.text("0} if\n");
        }
        Branch::First => {
            code.text("}");
        }
        Branch::Else => {
            code.text("} ifelse\n");
        }
    }
}

/// Emit the full `t -> r g b` dispatch for `stops` (non-empty, sorted).
pub fn write_gradient_function(stops: &[ColorStop], code: &mut ProgramText) {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return;
    };

    code.text("dup 0 le {pop ").rgb(first.color.rgb_channels()).text(" 0} if\n");

    if let Some(tree) = build_dispatch_tree(&collapse_ranges(stops)) {
        write_node(stops, &tree, Branch::Top, code);
    }

    code.text("0 gt {").rgb(last.color.rgb_channels()).text("} if\n");
}
