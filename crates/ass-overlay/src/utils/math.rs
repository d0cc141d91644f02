//! Fixed-point conversions and small geometry types
//!
//! Outline and layout coordinates are kept in 26.6 fixed point (1/64 pixel)
//! and scale factors handed to caches in 16.16 so that cache keys hash
//! exactly.

/// Convert 26.6 fixed point to floating point
#[inline]
pub fn d6_to_double(x: i32) -> f64 {
    f64::from(x) / 64.0
}

/// Convert floating point to 26.6 fixed point, truncating
#[inline]
pub fn double_to_d6(x: f64) -> i32 {
    (x * 64.0) as i32
}

/// Round 26.6 fixed point to the nearest integer pixel
#[inline]
pub fn d6_to_int(x: i32) -> i32 {
    (x + 32) >> 6
}

/// Convert an integer pixel count to 26.6
#[inline]
pub fn int_to_d6(x: i32) -> i32 {
    x << 6
}

/// Convert floating point to 16.16 fixed point, truncating
#[inline]
pub fn double_to_d16(x: f64) -> i32 {
    (x * 65536.0) as i32
}

/// Convert 16.16 fixed point to floating point
#[inline]
pub fn d16_to_double(x: i32) -> f64 {
    f64::from(x) / 65536.0
}

/// Convert 26.6 to 16.16
#[inline]
pub fn d6_to_d16(x: i32) -> i32 {
    x << 10
}

/// Convert 16.16 to 26.6
#[inline]
pub fn d16_to_d6(x: i32) -> i32 {
    x >> 10
}

/// Linear interpolation with weight `k` in `[0, 1]`
#[inline]
pub fn lerp(a: f64, b: f64, k: f64) -> f64 {
    a * (1.0 - k) + b * k
}

/// Combine two transparency values (0 = opaque, 255 = transparent)
#[inline]
pub fn mult_alpha(a: u32, b: u32) -> u32 {
    0xFF - (0xFF - a) * (0xFF - b) / 0xFF
}

/// Integer vector, usually in 26.6 units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Vector {
    /// X component
    pub x: i32,
    /// Y component
    pub y: i32,
}

impl Vector {
    /// Create a new vector
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Floating point vector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DVector {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
}

impl DVector {
    /// Create a new vector
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Integer bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BBox {
    /// Minimum X
    pub x_min: i32,
    /// Minimum Y
    pub y_min: i32,
    /// Maximum X
    pub x_max: i32,
    /// Maximum Y
    pub y_max: i32,
}

impl Default for BBox {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

impl BBox {
    /// Create a new bounding box
    pub const fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Inverted box that any `extend` call replaces
    pub const fn empty() -> Self {
        Self::new(i32::MAX, i32::MAX, i32::MIN, i32::MIN)
    }

    /// Whether no point was ever added
    pub fn is_empty(&self) -> bool {
        self.x_min > self.x_max || self.y_min > self.y_max
    }

    /// Grow to include a point
    pub fn extend(&mut self, x: i32, y: i32) {
        self.x_min = self.x_min.min(x);
        self.y_min = self.y_min.min(y);
        self.x_max = self.x_max.max(x);
        self.y_max = self.y_max.max(y);
    }

    /// Grow to include another box
    pub fn union(&mut self, other: &BBox) {
        if other.is_empty() {
            return;
        }
        self.extend(other.x_min, other.y_min);
        self.extend(other.x_max, other.y_max);
    }

    /// Width
    pub fn width(&self) -> i32 {
        self.x_max - self.x_min
    }

    /// Height
    pub fn height(&self) -> i32 {
        self.y_max - self.y_min
    }

    /// Whether `other` lies entirely inside this box
    pub fn contains(&self, other: &BBox) -> bool {
        other.x_min >= self.x_min
            && other.x_max <= self.x_max
            && other.y_min >= self.y_min
            && other.y_max <= self.y_max
    }
}

/// Floating point bounding box
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DBBox {
    /// Minimum X
    pub x_min: f64,
    /// Minimum Y
    pub y_min: f64,
    /// Maximum X
    pub x_max: f64,
    /// Maximum Y
    pub y_max: f64,
}

impl DBBox {
    /// Create a new bounding box
    pub const fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Width
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Height
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_point_conversions() {
        assert_eq!(double_to_d6(1.5), 96);
        assert_eq!(d6_to_double(96), 1.5);
        assert_eq!(d6_to_int(95), 1);
        assert_eq!(d6_to_int(96), 2);
        assert_eq!(double_to_d16(0.5), 32768);
        assert_eq!(d16_to_d6(d6_to_d16(77)), 77);
    }

    #[test]
    fn test_mult_alpha() {
        assert_eq!(mult_alpha(0, 0), 0);
        assert_eq!(mult_alpha(0xFF, 0), 0xFF);
        assert_eq!(mult_alpha(0, 0xFF), 0xFF);
        assert_eq!(mult_alpha(0x80, 0x80), 0xFF - 0x7F * 0x7F / 0xFF);
    }

    #[test]
    fn test_bbox_extend() {
        let mut bbox = BBox::empty();
        assert!(bbox.is_empty());
        bbox.extend(3, -2);
        bbox.extend(-1, 5);
        assert_eq!(bbox, BBox::new(-1, -2, 3, 5));
        assert_eq!(bbox.width(), 4);
        assert_eq!(bbox.height(), 7);
        assert!(bbox.contains(&BBox::new(0, 0, 1, 1)));
    }
}
