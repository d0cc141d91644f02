//! Border generation: stroking, emboldening and opaque boxes

use tiny_skia::{LineCap, LineJoin, Stroke};

use crate::raster::outline::{Orientation, Outline, PointTag};
use crate::utils::math::{BBox, Vector};

/// Whether a contour winds counter-clockwise
fn contour_is_ccw(points: &[Vector]) -> bool {
    let mut sum = 0i64;
    let n = points.len();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += i64::from(a.x) * i64::from(b.y - a.y) - i64::from(a.y) * i64::from(b.x - a.x);
    }
    sum > 0
}

fn contour_cbox(points: &[Vector]) -> BBox {
    let mut bbox = BBox::empty();
    for p in points {
        bbox.extend(p.x, p.y);
    }
    bbox
}

/// Drop hole contours narrower than the border, and reverse hole contours
/// that are not contained in any other contour. Strokers produce artifacts
/// on both.
pub fn fix_stroker_contours(outline: &mut Outline, border_x: i32, border_y: i32) {
    let inside_ccw = outline.orientation() == Orientation::Clockwise;
    let ranges: Vec<_> = outline.contour_ranges().collect();
    let boxes: Vec<BBox> = ranges
        .iter()
        .map(|r| contour_cbox(&outline.points[r.clone()]))
        .collect();

    let mut keep = vec![true; ranges.len()];
    for (i, range) in ranges.iter().enumerate() {
        let mut is_hole = contour_is_ccw(&outline.points[range.clone()]) == inside_ccw;
        if is_hole {
            let contained = boxes
                .iter()
                .enumerate()
                .any(|(j, other)| i != j && other.contains(&boxes[i]));
            if !contained {
                outline.points[range.clone()].reverse();
                outline.tags[range.clone()].reverse();
                is_hole = false;
            }
        }
        if is_hole && (boxes[i].width() < border_x * 2 || boxes[i].height() < border_y * 2) {
            keep[i] = false;
        }
    }

    if keep.iter().all(|&k| k) {
        return;
    }
    let mut fixed = Outline::new();
    for (range, _) in ranges.iter().zip(&keep).filter(|(_, &k)| k) {
        for i in range.clone() {
            fixed.add_point(outline.points[i], outline.tags[i]);
        }
        fixed.close_contour();
    }
    *outline = fixed;
}

/// Border layers for `outline` with 26.6 widths `sx` and `sy`.
///
/// Equal widths use a round-joined geometric stroke, returned together with
/// the cleaned body so the union covers the glyph interior. Unequal widths
/// embolden two copies and take x from one and y from the other, which
/// keeps point correspondence.
pub fn stroke_outline(outline: &Outline, sx: i32, sy: i32) -> Vec<Outline> {
    if sx <= 0 && sy <= 0 {
        return Vec::new();
    }
    let mut body = outline.clone();
    fix_stroker_contours(&mut body, sx, sy);

    if sx == sy {
        let stroke = Stroke {
            width: sx as f32 / 32.0,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        let ring = body
            .to_pixel_path()
            .and_then(|path| path.stroke(&stroke, 1.0))
            .map(|path| Outline::from_pixel_path(&path));
        match ring {
            Some(ring) => vec![body, ring],
            None => Vec::new(),
        }
    } else {
        let mut wide = body.clone();
        wide.embolden(sx * 2, sx * 2);
        wide.translate(-sx, -sx);
        let mut tall = body;
        tall.embolden(sy * 2, sy * 2);
        tall.translate(-sy, -sy);
        for (p, q) in wide.points.iter_mut().zip(&tall.points) {
            p.y = q.y;
        }
        vec![wide]
    }
}

/// Rectangle used as the border in opaque box mode, all values 26.6.
///
/// `adv` is the glyph advance, `asc`/`desc` its ascender and descender,
/// `sx`/`sy` the border widths (at least one pixel).
pub fn opaque_box(adv: i32, asc: i32, desc: i32, sx: i32, sy: i32) -> Outline {
    let sx = sx.max(64);
    let sy = sy.max(64);
    let mut outline = Outline::new();
    for (x, y) in [
        (-sx, asc + sy),
        (adv + sx, asc + sy),
        (adv + sx, -desc - sy),
        (-sx, -desc - sy),
    ] {
        outline.add_point(Vector::new(x, y), PointTag::On);
    }
    outline.close_contour();
    outline
}
