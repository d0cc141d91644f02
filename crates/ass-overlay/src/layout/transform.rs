//! Shear, 3D rotation and perspective projection of glyph outlines

use crate::raster::outline::Outline;
use crate::utils::math::{DVector, Vector};

/// Rotation and shear parameters of one glyph
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform3d {
    /// X rotation in radians
    pub frx: f64,
    /// Y rotation in radians
    pub fry: f64,
    /// Z rotation in radians
    pub frz: f64,
    /// Horizontal shear
    pub fax: f64,
    /// Vertical shear
    pub fay: f64,
}

impl Transform3d {
    /// Whether the transform changes anything
    pub fn is_identity(&self) -> bool {
        self.frx == 0.0 && self.fry == 0.0 && self.frz == 0.0 && self.fax == 0.0 && self.fay == 0.0
    }
}

/// Transform `outlines` about the rotation center.
///
/// `shift` moves outline coordinates into the frame of the rotation
/// center (26.6, y up). Points are sheared, rotated around z, x and y in
/// that order and projected with a perspective distance of
/// `20000 * font_scale`. `asc` is the shear origin for `fax`.
pub fn transform_3d(shift: Vector, outlines: &mut [&mut Outline], t: Transform3d, font_scale: f64, asc: i32) {
    if t.is_identity() {
        return;
    }
    let frx = -t.frx;
    let frz = -t.frz;
    let (sx, cx) = frx.sin_cos();
    let (sy, cy) = t.fry.sin_cos();
    let (sz, cz) = frz.sin_cos();
    let dist = (20000.0 * font_scale).trunc();
    let shift_x = f64::from(shift.x);
    let shift_y = f64::from(shift.y);
    let asc = f64::from(asc);

    for outline in outlines.iter_mut() {
        outline.map_points(|p| {
            let x = p.x + shift_x + t.fax * (asc - p.y);
            let y = p.y + shift_y - t.fay * p.x;

            let xx = x * cz + y * sz;
            let yy = -(x * sz - y * cz);

            let y = yy * cx;
            let z = yy * sx;

            let xx2 = xx * cy + z * sy;
            let zz = (xx * sy - z * cy).max(1000.0 - dist);

            DVector::new(
                xx2 * dist / (zz + dist) - shift_x + 0.5,
                y * dist / (zz + dist) - shift_y + 0.5,
            )
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::outline::PointTag;
    use std::f64::consts::FRAC_PI_2;

    fn square() -> Outline {
        let mut outline = Outline::new();
        for (x, y) in [(0, 0), (0, 640), (640, 640), (640, 0)] {
            outline.add_point(Vector::new(x, y), PointTag::On);
        }
        outline.close_contour();
        outline
    }

    #[test]
    fn test_identity_is_noop() {
        let mut outline = square();
        transform_3d(Vector::new(100, 100), &mut [&mut outline], Transform3d::default(), 1.0, 0);
        assert_eq!(outline, square());
    }

    #[test]
    fn test_z_rotation_quarter_turn() {
        let mut outline = square();
        let t = Transform3d {
            frz: FRAC_PI_2,
            ..Transform3d::default()
        };
        transform_3d(Vector::default(), &mut [&mut outline], t, 1.0, 0);
        // counter-clockwise on screen: (640, 0) goes to (0, 640) in y-up space
        let p = outline.points[3];
        assert!(p.x.abs() <= 1, "{p:?}");
        assert!((p.y - 640).abs() <= 1, "{p:?}");
    }

    #[test]
    fn test_horizontal_shear_uses_ascender() {
        let mut outline = square();
        let t = Transform3d {
            fax: 0.5,
            ..Transform3d::default()
        };
        transform_3d(Vector::default(), &mut [&mut outline], t, 1.0, 640);
        // the top edge sits at the ascender and does not move
        assert_eq!(outline.points[1], Vector::new(0, 640));
        assert_eq!(outline.points[0], Vector::new(320, 0));
    }

    #[test]
    fn test_y_rotation_foreshortens() {
        let mut outline = square();
        let t = Transform3d {
            fry: 1.0,
            ..Transform3d::default()
        };
        transform_3d(Vector::default(), &mut [&mut outline], t, 1.0, 0);
        let width = outline.points[3].x - outline.points[0].x;
        assert!(width < 640 && width > 0, "{width}");
    }
}
