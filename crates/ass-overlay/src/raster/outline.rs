//! Glyph and drawing outlines in 26.6 fixed point
//!
//! Coordinates grow rightwards and upwards (font space). Conversion to
//! `tiny_skia` paths flips the y axis into bitmap space.

use tiny_skia::{Path, PathBuilder, PathSegment};

use crate::utils::math::{BBox, DVector, Vector};

/// Kind of an outline point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointTag {
    /// On-curve point
    On,
    /// Quadratic control point
    Conic,
    /// Cubic control point
    Cubic,
}

/// Orientation of the filled area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Clockwise outer contours (TrueType)
    Clockwise,
    /// Counter-clockwise outer contours (PostScript)
    CounterClockwise,
}

/// Closed contours made of tagged points
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Outline {
    /// Points in 26.6
    pub points: Vec<Vector>,
    /// Tag for each point
    pub tags: Vec<PointTag>,
    /// Inclusive index of the last point of each contour
    pub contours: Vec<usize>,
}

impl Outline {
    /// Create an empty outline
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the outline has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Append a point to the current contour
    pub fn add_point(&mut self, point: Vector, tag: PointTag) {
        self.points.push(point);
        self.tags.push(tag);
    }

    /// Close the current contour, ignoring empty ones
    pub fn close_contour(&mut self) {
        let start = self.contours.last().map_or(0, |&end| end + 1);
        if self.points.len() > start {
            self.contours.push(self.points.len() - 1);
        }
    }

    /// Append all contours of another outline
    pub fn append(&mut self, other: &Outline) {
        let base = self.points.len();
        self.points.extend_from_slice(&other.points);
        self.tags.extend_from_slice(&other.tags);
        self.contours
            .extend(other.contours.iter().map(|&end| end + base));
    }

    /// Point index ranges of every contour
    pub fn contour_ranges(&self) -> impl Iterator<Item = std::ops::RangeInclusive<usize>> + '_ {
        let mut start = 0;
        self.contours.iter().map(move |&end| {
            let range = start..=end;
            start = end + 1;
            range
        })
    }

    /// Control box of all points
    pub fn cbox(&self) -> BBox {
        if self.points.is_empty() {
            return BBox::default();
        }
        let mut bbox = BBox::empty();
        for point in &self.points {
            bbox.extend(point.x, point.y);
        }
        bbox
    }

    /// Translate every point
    pub fn translate(&mut self, dx: i32, dy: i32) {
        for point in &mut self.points {
            point.x += dx;
            point.y += dy;
        }
    }

    /// Apply a 2x2 matrix `[xx xy; yx yy]`
    pub fn transform(&mut self, xx: f64, xy: f64, yx: f64, yy: f64) {
        for point in &mut self.points {
            let x = f64::from(point.x);
            let y = f64::from(point.y);
            point.x = (xx * x + xy * y).round() as i32;
            point.y = (yx * x + yy * y).round() as i32;
        }
    }

    /// Map every point through `f` in floating point 26.6 units
    pub fn map_points(&mut self, mut f: impl FnMut(DVector) -> DVector) {
        for point in &mut self.points {
            let mapped = f(DVector::new(f64::from(point.x), f64::from(point.y)));
            point.x = mapped.x as i32;
            point.y = mapped.y as i32;
        }
    }

    /// Fill orientation, from the signed area of all contours
    pub fn orientation(&self) -> Orientation {
        let mut area = 0i64;
        for range in self.contour_ranges() {
            let end = *range.end();
            let mut prev = self.points[end];
            for i in range {
                let cur = self.points[i];
                area += i64::from(cur.y - prev.y) * i64::from(cur.x + prev.x);
                prev = cur;
            }
        }
        if area > 0 {
            Orientation::CounterClockwise
        } else {
            Orientation::Clockwise
        }
    }

    /// Grow the filled area by `xstrength` horizontally and `ystrength`
    /// vertically, moving points along the bisector of adjacent edges.
    /// The result is shifted by half the strength towards the positive axes.
    pub fn embolden(&mut self, xstrength: i32, ystrength: i32) {
        let xstr = f64::from(xstrength) / 2.0;
        let ystr = f64::from(ystrength) / 2.0;
        if xstr == 0.0 && ystr == 0.0 {
            return;
        }
        let orientation = self.orientation();
        let source = self.points.clone();

        for range in self.contour_ranges().collect::<Vec<_>>() {
            let first = *range.start();
            let last = *range.end();
            let count = last - first + 1;
            if count < 2 {
                continue;
            }
            for i in first..=last {
                let prev = source[if i == first { last } else { i - 1 }];
                let cur = source[i];
                let next = source[if i == last { first } else { i + 1 }];

                let (in_x, in_y, l_in) = unit(cur.x - prev.x, cur.y - prev.y);
                let (out_x, out_y, l_out) = unit(next.x - cur.x, next.y - cur.y);

                let mut d = in_x * out_x + in_y * out_y;
                let (mut shift_x, mut shift_y) = (0.0, 0.0);
                if l_in > 0.0 && l_out > 0.0 && d > -0.9375 {
                    d += 1.0;
                    shift_x = in_y + out_y;
                    shift_y = in_x + out_x;
                    let mut q = out_x * in_y - out_y * in_x;
                    match orientation {
                        Orientation::Clockwise => {
                            shift_x = -shift_x;
                            q = -q;
                        }
                        Orientation::CounterClockwise => shift_y = -shift_y,
                    }
                    let l = l_in.min(l_out);
                    shift_x = if xstr * q <= l * d {
                        shift_x * xstr / d
                    } else {
                        shift_x * l / q
                    };
                    shift_y = if ystr * q <= l * d {
                        shift_y * ystr / d
                    } else {
                        shift_y * l / q
                    };
                }
                self.points[i].x = cur.x + (xstr + shift_x).round() as i32;
                self.points[i].y = cur.y + (ystr + shift_y).round() as i32;
            }
        }
    }

    /// Build a `tiny_skia` path, mapping each point through `f` into
    /// bitmap space (pixels, y down). Returns `None` for empty outlines.
    pub fn to_path(&self, f: impl Fn(Vector) -> (f32, f32)) -> Option<Path> {
        let mut pb = PathBuilder::new();
        for range in self.contour_ranges() {
            decompose_contour(&self.points[range.clone()], &self.tags[range], &f, &mut pb);
        }
        pb.finish()
    }

    /// Path with the outline origin at pixel (0, 0) and y flipped
    pub fn to_pixel_path(&self) -> Option<Path> {
        self.to_path(|p| (p.x as f32 / 64.0, -(p.y as f32) / 64.0))
    }

    /// Rebuild an outline from a pixel-space path produced by
    /// [`Outline::to_pixel_path`] or derived from one
    pub fn from_pixel_path(path: &Path) -> Self {
        let to_d6 = |p: tiny_skia::Point| Vector::new((p.x * 64.0).round() as i32, (-p.y * 64.0).round() as i32);
        let mut outline = Outline::new();
        for segment in path.segments() {
            match segment {
                PathSegment::MoveTo(p) => {
                    outline.close_contour();
                    outline.add_point(to_d6(p), PointTag::On);
                }
                PathSegment::LineTo(p) => outline.add_point(to_d6(p), PointTag::On),
                PathSegment::QuadTo(c, p) => {
                    outline.add_point(to_d6(c), PointTag::Conic);
                    outline.add_point(to_d6(p), PointTag::On);
                }
                PathSegment::CubicTo(c1, c2, p) => {
                    outline.add_point(to_d6(c1), PointTag::Cubic);
                    outline.add_point(to_d6(c2), PointTag::Cubic);
                    outline.add_point(to_d6(p), PointTag::On);
                }
                PathSegment::Close => outline.close_contour(),
            }
        }
        outline.close_contour();
        outline
    }

    /// Approximate heap size in bytes, used for cache accounting
    pub fn byte_size(&self) -> usize {
        self.points.len() * std::mem::size_of::<Vector>()
            + self.tags.len()
            + self.contours.len() * std::mem::size_of::<usize>()
    }
}

fn unit(dx: i32, dy: i32) -> (f64, f64, f64) {
    let (dx, dy) = (f64::from(dx), f64::from(dy));
    let len = dx.hypot(dy);
    if len == 0.0 {
        (0.0, 0.0, 0.0)
    } else {
        (dx / len, dy / len, len)
    }
}

fn midpoint(a: (f32, f32), b: (f32, f32)) -> (f32, f32) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

/// Emit one closed contour, resolving implied on-curve points between
/// consecutive conic controls
fn decompose_contour(
    points: &[Vector],
    tags: &[PointTag],
    f: &impl Fn(Vector) -> (f32, f32),
    pb: &mut PathBuilder,
) {
    let n = points.len();
    if n == 0 {
        return;
    }
    let mapped: Vec<(f32, f32)> = points.iter().map(|&p| f(p)).collect();

    // Start from an on-curve point, or the implied midpoint of two conics
    let (start, first) = match tags.iter().position(|&t| t == PointTag::On) {
        Some(i) => (mapped[i], i + 1),
        None => (midpoint(mapped[0], mapped[n - 1]), 0),
    };
    pb.move_to(start.0, start.1);

    let at = |k: usize| (mapped[k % n], tags[k % n]);
    let end = first + n - usize::from(first > 0);
    let mut i = first;
    while i < end {
        let (p, tag) = at(i);
        match tag {
            PointTag::On => {
                pb.line_to(p.0, p.1);
                i += 1;
            }
            PointTag::Conic => {
                let mut ctrl = p;
                i += 1;
                loop {
                    let (next, next_tag) = if i < end { at(i) } else { (start, PointTag::On) };
                    match next_tag {
                        PointTag::Conic => {
                            let mid = midpoint(ctrl, next);
                            pb.quad_to(ctrl.0, ctrl.1, mid.0, mid.1);
                            ctrl = next;
                            i += 1;
                        }
                        _ => {
                            pb.quad_to(ctrl.0, ctrl.1, next.0, next.1);
                            i += 1;
                            break;
                        }
                    }
                }
            }
            PointTag::Cubic => {
                let c2 = if i + 1 < end { at(i + 1).0 } else { start };
                let to = if i + 2 < end { at(i + 2).0 } else { start };
                pb.cubic_to(p.0, p.1, c2.0, c2.1, to.0, to.1);
                i += 3;
            }
        }
    }
    pb.close();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: i32) -> Outline {
        let mut outline = Outline::new();
        for (x, y) in [(0, 0), (0, size), (size, size), (size, 0)] {
            outline.add_point(Vector::new(x, y), PointTag::On);
        }
        outline.close_contour();
        outline
    }

    #[test]
    fn test_cbox_and_translate() {
        let mut outline = square(640);
        outline.translate(64, -64);
        assert_eq!(outline.cbox(), BBox::new(64, -64, 704, 576));
    }

    #[test]
    fn test_orientation() {
        assert_eq!(square(64).orientation(), Orientation::Clockwise);
        let mut ccw = Outline::new();
        for (x, y) in [(0, 0), (64, 0), (64, 64), (0, 64)] {
            ccw.add_point(Vector::new(x, y), PointTag::On);
        }
        ccw.close_contour();
        assert_eq!(ccw.orientation(), Orientation::CounterClockwise);
    }

    #[test]
    fn test_embolden_grows_square() {
        let mut outline = square(640);
        outline.embolden(128, 128);
        outline.translate(-64, -64);
        let bbox = outline.cbox();
        assert_eq!(bbox.x_min, -64);
        assert_eq!(bbox.x_max, 704);
        assert_eq!(bbox.y_min, -64);
        assert_eq!(bbox.y_max, 704);
    }

    #[test]
    fn test_path_round_trip_keeps_cbox() {
        let outline = square(640);
        let path = outline.to_pixel_path().expect("path");
        let back = Outline::from_pixel_path(&path);
        assert_eq!(back.cbox(), outline.cbox());
        assert_eq!(back.contours.len(), 1);
    }

    #[test]
    fn test_conic_only_contour() {
        let mut outline = Outline::new();
        for (x, y) in [(0, 64), (64, 0), (0, -64), (-64, 0)] {
            outline.add_point(Vector::new(x, y), PointTag::Conic);
        }
        outline.close_contour();
        let path = outline.to_pixel_path().expect("path");
        let bounds = path.bounds();
        assert!(bounds.width() > 0.5 && bounds.width() <= 2.0);
    }

    #[test]
    fn test_append_offsets_contours() {
        let mut a = square(64);
        let b = square(128);
        a.append(&b);
        assert_eq!(a.contours, vec![3, 7]);
        assert_eq!(a.contour_ranges().count(), 2);
    }
}
