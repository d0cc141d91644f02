//! Horizontal line alignment and alignment anchor points

use crate::layout::{LineBreak, TextInfo};
use crate::track::{Alignment, HAlign, VAlign};
use crate::utils::math::{d6_to_double, double_to_d6, DBBox, DVector};

/// Shift every line by `(max_width - line_width)` times 0, ½ or 1 for
/// left, center and right alignment. Skipped clusters and newlines do not
/// count towards the line width.
pub fn align_lines(text_info: &mut TextInfo, max_width: f64, halign: HAlign) {
    let factor = match halign {
        HAlign::Left => return,
        HAlign::Center => 0.5,
        HAlign::Right => 1.0,
    };
    let len = text_info.glyphs.len();
    let mut width = 0.0;
    let mut line_start = 0;
    for i in 0..=len {
        if i == len || (i > 0 && text_info.glyphs[i].linebreak != LineBreak::None) {
            let shift = double_to_d6((max_width - width) * factor);
            for glyph in &mut text_info.glyphs[line_start..i] {
                glyph.shift_x(shift);
            }
            line_start = i;
            width = 0.0;
        }
        if let Some(glyph) = text_info.glyphs.get(i) {
            if !glyph.skip && glyph.symbol != '\n' && glyph.symbol != '\0' {
                width += d6_to_double(glyph.cluster_advance.x);
            }
        }
    }
}

/// Anchor point of `bbox` for `alignment`
pub fn get_base_point(bbox: &DBBox, alignment: Alignment) -> DVector {
    let x = match alignment.h {
        HAlign::Left => bbox.x_min,
        HAlign::Center => (bbox.x_max + bbox.x_min) / 2.0,
        HAlign::Right => bbox.x_max,
    };
    let y = match alignment.v {
        VAlign::Top => bbox.y_min,
        VAlign::Center => (bbox.y_max + bbox.y_min) / 2.0,
        VAlign::Sub => bbox.y_max,
    };
    DVector::new(x, y)
}
