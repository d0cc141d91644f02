//! Coverage bitmaps and outline rasterization

use std::sync::Arc;

use tiny_skia::{FillRule, Mask, Transform};

use crate::raster::blur::{BoxBlur, Effect, GaussianBlur};
use crate::raster::outline::Outline;
use crate::track::BorderStyle;
use crate::utils::math::{BBox, Vector};
use crate::utils::RenderError;

/// Largest bitmap area rendered from a single outline
const MAX_BITMAP_AREA: i64 = 8_000_000;

/// Single-channel coverage bitmap placed relative to a glyph origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    /// Horizontal offset of column 0 from the origin
    pub left: i32,
    /// Vertical offset of row 0 from the origin (y down)
    pub top: i32,
    /// Width in pixels
    pub w: i32,
    /// Height in pixels
    pub h: i32,
    /// Bytes per row, never less than `w`
    pub stride: i32,
    /// Coverage values, `stride * h` bytes
    pub buffer: Vec<u8>,
}

impl Bitmap {
    /// Create a zeroed bitmap with a 16-byte aligned stride
    pub fn new(left: i32, top: i32, w: i32, h: i32) -> Self {
        let w = w.max(0);
        let h = h.max(0);
        let stride = (w + 15) & !15;
        Self {
            left,
            top,
            w,
            h,
            stride,
            buffer: vec![0; (stride * h) as usize],
        }
    }

    /// Build a bitmap around an existing buffer
    pub fn from_buffer(w: i32, h: i32, stride: i32, buffer: Vec<u8>) -> Self {
        Self {
            left: 0,
            top: 0,
            w,
            h,
            stride,
            buffer,
        }
    }

    /// Heap bytes owned by this bitmap
    pub fn byte_size(&self) -> usize {
        self.buffer.len()
    }

    /// Visible part of row `y`
    pub fn row(&self, y: i32) -> &[u8] {
        let start = (y * self.stride) as usize;
        &self.buffer[start..start + self.w as usize]
    }

    /// Whether every coverage value is zero
    pub fn is_blank(&self) -> bool {
        (0..self.h).all(|y| self.row(y).iter().all(|&v| v == 0))
    }
}

/// Rasterize the union of `layers` with `bord` pixels of padding on every
/// side
pub fn outline_to_bitmap(layers: &[&Outline], bord: i32) -> Result<Bitmap, RenderError> {
    let mut cbox = BBox::empty();
    for layer in layers.iter().filter(|l| !l.is_empty()) {
        cbox.union(&layer.cbox());
    }
    if cbox.is_empty() {
        cbox = BBox::default();
    }

    let x_min = cbox.x_min & !63;
    let y_min = cbox.y_min & !63;
    let x_max = (cbox.x_max + 63) & !63;
    let y_max = (cbox.y_max + 63) & !63;
    let w = (x_max - x_min) >> 6;
    let h = (y_max - y_min) >> 6;
    if i64::from(w) * i64::from(h) > MAX_BITMAP_AREA {
        return Err(RenderError::RasterError(format!(
            "glyph bitmap too large: {w}x{h}"
        )));
    }

    let mut bitmap = Bitmap::new((x_min >> 6) - bord, -(y_max >> 6) - bord, w + 2 * bord, h + 2 * bord);
    if w == 0 || h == 0 {
        return Ok(bitmap);
    }

    let mut mask = Mask::new(w as u32, h as u32)
        .ok_or_else(|| RenderError::RasterError(format!("cannot allocate {w}x{h} mask")))?;
    for layer in layers {
        let path = layer.to_path(|p| {
            (
                (p.x - x_min) as f32 / 64.0,
                (y_max - p.y) as f32 / 64.0,
            )
        });
        if let Some(path) = path {
            mask.fill_path(&path, FillRule::Winding, true, Transform::identity());
        }
    }

    let stride = bitmap.stride as usize;
    let bord = bord as usize;
    for (y, row) in mask.data().chunks_exact(w as usize).enumerate() {
        let start = (y + bord) * stride + bord;
        bitmap.buffer[start..start + row.len()].copy_from_slice(row);
    }
    Ok(bitmap)
}

/// Remove the part of the border that lies under the fill so that
/// translucent fills do not show the border through them
pub fn fix_outline(fill: &Bitmap, border: &mut Bitmap) {
    let l = border.left.max(fill.left);
    let t = border.top.max(fill.top);
    let r = (border.left + border.w).min(fill.left + fill.w);
    let b = (border.top + border.h).min(fill.top + fill.h);

    for y in t..b {
        let g_row = ((y - fill.top) * fill.stride + (l - fill.left)) as usize;
        let o_row = ((y - border.top) * border.stride + (l - border.left)) as usize;
        for x in 0..(r - l).max(0) as usize {
            let g = fill.buffer[g_row + x];
            let o = &mut border.buffer[o_row + x];
            *o = if *o > g { *o - g / 2 } else { 0 };
        }
    }
}

/// Move coverage by a sub-pixel amount (26.6, |shift| < 64) by handing a
/// proportional share of each pixel to its neighbour
pub fn shift_bitmap(bitmap: &mut Bitmap, shift_x: i32, shift_y: i32) {
    let (w, h, s) = (bitmap.w as usize, bitmap.h as usize, bitmap.stride as usize);
    let buf = &mut bitmap.buffer;

    let mut transfer = |from: usize, to: usize, shift: i32| {
        let b = ((i32::from(buf[from]) * shift) >> 6) as u8;
        buf[from] -= b;
        buf[to] = buf[to].saturating_add(b);
    };

    if shift_x > 0 {
        for y in 0..h {
            for x in (1..w).rev() {
                transfer(y * s + x - 1, y * s + x, shift_x);
            }
        }
    } else if shift_x < 0 {
        for y in 0..h {
            for x in 0..w.saturating_sub(1) {
                transfer(y * s + x + 1, y * s + x, -shift_x);
            }
        }
    }

    if shift_y > 0 {
        for x in 0..w {
            for y in (1..h).rev() {
                transfer((y - 1) * s + x, y * s + x, shift_y);
            }
        }
    } else if shift_y < 0 {
        for x in 0..w {
            for y in 0..h.saturating_sub(1) {
                transfer((y + 1) * s + x, y * s + x, -shift_y);
            }
        }
    }
}

/// Fill, border and shadow bitmaps of one glyph
#[derive(Debug, Clone, Default)]
pub struct GlyphBitmaps {
    /// Fill coverage
    pub fill: Option<Arc<Bitmap>>,
    /// Border coverage
    pub border: Option<Arc<Bitmap>>,
    /// Shadow coverage
    pub shadow: Option<Arc<Bitmap>>,
}

impl GlyphBitmaps {
    /// Total heap bytes, for cache accounting
    pub fn byte_size(&self) -> usize {
        [&self.fill, &self.border, &self.shadow]
            .iter()
            .filter_map(|b| b.as_deref())
            .map(Bitmap::byte_size)
            .sum()
    }
}

/// Rasterize a glyph, its border layers and its shadow, applying box blur
/// (`be` passes) and Gaussian blur to the border, or to the fill when
/// there is no border
pub fn glyph_to_bitmap(
    fill: &Outline,
    border: &[Outline],
    be: i32,
    blur_radius: f64,
    shadow_offset: Vector,
    border_style: BorderStyle,
) -> Result<GlyphBitmaps, RenderError> {
    let blur_radius = blur_radius * 2.0;
    let bbord = if be > 0 { f64::from(2 * be).sqrt() } else { 0.0 };
    let gbord = if blur_radius > 0.0 { blur_radius + 1.0 } else { 0.0 };
    let mut bord = bbord.max(gbord) as i32;
    if bord == 0 && (shadow_offset.x != 0 || shadow_offset.y != 0) {
        bord = 1;
    }

    let mut bm_fill = outline_to_bitmap(&[fill], bord)?;
    let mut bm_border = if border.is_empty() {
        None
    } else {
        Some(outline_to_bitmap(&border.iter().collect::<Vec<_>>(), bord)?)
    };

    {
        let target = bm_border.as_mut().unwrap_or(&mut bm_fill);
        if be > 0 {
            BoxBlur::new(be as u32).apply(target)?;
        }
        if blur_radius > 0.0 {
            GaussianBlur::new(blur_radius).apply(target)?;
        }
    }

    let mut shadow = match bm_border.as_mut() {
        Some(bm_border) => {
            let shadow = bm_border.clone();
            if border_style != BorderStyle::OpaqueBox {
                fix_outline(&bm_fill, bm_border);
            }
            shadow
        }
        None => bm_fill.clone(),
    };
    shift_bitmap(&mut shadow, shadow_offset.x, shadow_offset.y);

    Ok(GlyphBitmaps {
        fill: Some(Arc::new(bm_fill)),
        border: bm_border.map(Arc::new),
        shadow: Some(Arc::new(shadow)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::outline::PointTag;

    fn rect(x0: i32, y0: i32, x1: i32, y1: i32) -> Outline {
        let mut outline = Outline::new();
        for (x, y) in [(x0, y0), (x0, y1), (x1, y1), (x1, y0)] {
            outline.add_point(Vector::new(x, y), PointTag::On);
        }
        outline.close_contour();
        outline
    }

    #[test]
    fn test_stride_alignment() {
        let bitmap = Bitmap::new(0, 0, 17, 3);
        assert_eq!(bitmap.stride, 32);
        assert_eq!(bitmap.buffer.len(), 96);
    }

    #[test]
    fn test_rasterize_rect_placement() {
        let outline = rect(0, 0, 10 * 64, 5 * 64);
        let bitmap = outline_to_bitmap(&[&outline], 2).expect("bitmap");
        assert_eq!((bitmap.w, bitmap.h), (14, 9));
        assert_eq!(bitmap.left, -2);
        assert_eq!(bitmap.top, -5 - 2);
        assert_eq!(bitmap.row(4)[5], 255);
        assert_eq!(bitmap.row(0)[5], 0);
        assert_eq!(bitmap.row(4)[0], 0);
    }

    #[test]
    fn test_empty_outline_gives_padding_only() {
        let bitmap = outline_to_bitmap(&[&Outline::new()], 1).expect("bitmap");
        assert_eq!((bitmap.w, bitmap.h), (2, 2));
        assert!(bitmap.is_blank());
    }

    #[test]
    fn test_fix_outline_clears_under_fill() {
        let mut fill = Bitmap::new(0, 0, 2, 1);
        fill.buffer[0] = 255;
        let mut border = Bitmap::new(0, 0, 2, 1);
        border.buffer[0] = 255;
        border.buffer[1] = 200;
        fix_outline(&fill, &mut border);
        assert_eq!(border.buffer[0], 0);
        assert_eq!(border.buffer[1], 200);
    }

    #[test]
    fn test_blurred_border_is_still_cut_under_fill() {
        let fill = rect(0, 0, 640, 640);
        let border = vec![rect(-64, -64, 704, 704)];
        let center = |bm: &Bitmap| bm.row(bm.h / 2)[(bm.w / 2) as usize];

        let bitmaps =
            glyph_to_bitmap(&fill, &border, 0, 1.0, Vector::default(), BorderStyle::Outline)
                .expect("glyph");
        assert_eq!(center(&bitmaps.border.expect("border")), 0);
        assert!(center(&bitmaps.shadow.expect("shadow")) > 0);

        let bitmaps =
            glyph_to_bitmap(&fill, &border, 0, 1.0, Vector::default(), BorderStyle::OpaqueBox)
                .expect("glyph");
        assert!(center(&bitmaps.border.expect("border")) > 0);
    }

    #[test]
    fn test_shift_bitmap_moves_half() {
        let mut bitmap = Bitmap::new(0, 0, 2, 1);
        bitmap.buffer[0] = 200;
        shift_bitmap(&mut bitmap, 32, 0);
        assert_eq!(bitmap.buffer[0], 100);
        assert_eq!(bitmap.buffer[1], 100);
    }

    #[test]
    fn test_glyph_to_bitmap_shadow_from_border() {
        let fill = rect(0, 0, 640, 640);
        let border = vec![rect(-64, -64, 704, 704)];
        let bitmaps =
            glyph_to_bitmap(&fill, &border, 0, 0.0, Vector::default(), BorderStyle::Outline)
                .expect("glyph");
        let bm_border = bitmaps.border.expect("border");
        let shadow = bitmaps.shadow.expect("shadow");
        assert_eq!(shadow.w, bm_border.w);
        // shadow keeps full coverage where the border was cut away
        assert_eq!(shadow.row(5)[5], 255);
        assert!(bm_border.row(5)[5] < 255);
    }
}
