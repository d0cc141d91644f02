//! Image list assembly for one event
//!
//! Glyph bitmaps are cut to the clip rectangle (or around it for inverse
//! clips), split at the karaoke boundary and emitted as [`Image`]s in
//! shadow, border, fill order. Overlapping neighbours of the same color are
//! de-duplicated and vector clip masks are blended in afterwards.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::cache::{ClipMaskKey, ClippedKey, CompositeKey, CompositeSide, RenderCache};
use crate::pipeline::state::{ClipMode, Karaoke};
use crate::raster::{Bitmap, GlyphBitmaps};
use crate::utils::math::Vector;

/// Split position that keeps the whole bitmap on the left
const NO_SPLIT: i32 = 1_000_000;

/// Colored coverage bitmap placed on the frame.
///
/// The pixels are `w` by `h` bytes starting at `offset` in the shared
/// bitmap, `stride` bytes per row.
#[derive(Debug, Clone)]
pub struct Image {
    /// Shared source bitmap
    pub bitmap: Arc<Bitmap>,
    /// Byte offset of the first visible pixel
    pub offset: usize,
    /// Width in pixels
    pub w: i32,
    /// Height in pixels
    pub h: i32,
    /// Bytes per row
    pub stride: i32,
    /// Color as 0xRRGGBBAA, alpha 0 is opaque
    pub color: u32,
    /// Left edge on the frame
    pub dst_x: i32,
    /// Top edge on the frame
    pub dst_y: i32,
}

impl Image {
    /// Visible pixels of row `y`
    pub fn row(&self, y: i32) -> &[u8] {
        let start = self.offset + (y * self.stride) as usize;
        &self.bitmap.buffer[start..start + self.w as usize]
    }

    /// Whether both images show the same pixels of the same buffer
    pub fn same_pixels(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.bitmap, &other.bitmap)
            && self.offset == other.offset
            && self.w == other.w
            && self.h == other.h
            && self.stride == other.stride
    }

    fn side(&self) -> CompositeSide {
        CompositeSide {
            id: Arc::as_ptr(&self.bitmap) as usize,
            offset: self.offset,
            x: self.dst_x,
            y: self.dst_y,
            w: self.w,
            h: self.h,
            stride: self.stride,
        }
    }

    /// Copy of the visible pixels in a bitmap of its own
    fn to_bitmap(&self) -> Bitmap {
        let mut bitmap = Bitmap::new(0, 0, self.w, self.h);
        for y in 0..self.h {
            let start = (y * bitmap.stride) as usize;
            bitmap.buffer[start..start + self.w as usize].copy_from_slice(self.row(y));
        }
        bitmap
    }

    fn set_bitmap(&mut self, bitmap: Arc<Bitmap>) {
        self.offset = 0;
        self.stride = bitmap.stride;
        self.bitmap = bitmap;
    }
}

/// Integer rectangle, `x1` and `y1` exclusive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ClipRect {
    /// Left
    pub x0: i32,
    /// Top
    pub y0: i32,
    /// Right
    pub x1: i32,
    /// Bottom
    pub y1: i32,
}

impl ClipRect {
    /// Create a rectangle
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Whether the rectangle has no area
    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    /// Number of pixels covered
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.x1 - self.x0) * i64::from(self.y1 - self.y0)
        }
    }

    /// Intersection, possibly empty
    pub fn intersect(&self, other: &ClipRect) -> ClipRect {
        ClipRect::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        )
    }

    fn translate(&self, dx: i32, dy: i32) -> ClipRect {
        ClipRect::new(self.x0 + dx, self.y0 + dy, self.x1 + dx, self.y1 + dy)
    }
}

/// Frame bounds and rectangle clip of the event being composited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaintArea {
    /// Frame width
    pub width: i32,
    /// Frame height
    pub height: i32,
    /// Clip rectangle in frame pixels
    pub clip: ClipRect,
    /// Keep the inside or the outside of the clip
    pub mode: ClipMode,
}

impl PaintArea {
    fn screen(&self) -> ClipRect {
        ClipRect::new(0, 0, self.width, self.height)
    }
}

/// Everything the compositor needs to paint one glyph
#[derive(Debug, Clone)]
pub struct GlyphPaint {
    /// Fill, border and shadow bitmaps
    pub bitmaps: Arc<GlyphBitmaps>,
    /// Pen position in frame pixels
    pub pen: Vector,
    /// Pen position of the shadow in frame pixels
    pub shadow_pen: Vector,
    /// Whether the glyph casts a shadow
    pub has_shadow: bool,
    /// Fill, karaoke, border and shadow colors
    pub c: [u32; 4],
    /// Karaoke effect
    pub effect: Karaoke,
    /// Karaoke split relative to the pen, in pixels
    pub split: i32,
    /// Right edge of the glyph's control box relative to the pen
    pub right: i32,
}

/// Split a bitmap placed at `(dst_x, dst_y)` at column `brk` into a left
/// image of `color` and a right image of `color2`, restricted to `area`
/// (bitmap coordinates)
fn emit_split(
    images: &mut Vec<Image>,
    bm: &Arc<Bitmap>,
    area: ClipRect,
    dst: Vector,
    brk: i32,
    color: u32,
    color2: u32,
) {
    let mut emit = |x0: i32, x1: i32, color: u32| {
        images.push(Image {
            bitmap: Arc::clone(bm),
            offset: (bm.stride * area.y0 + x0) as usize,
            w: x1 - x0,
            h: area.y1 - area.y0,
            stride: bm.stride,
            color,
            dst_x: dst.x + x0,
            dst_y: dst.y + area.y0,
        });
    };
    if brk > area.x0 {
        emit(area.x0, brk.min(area.x1), color);
    }
    if brk < area.x1 {
        emit(brk.max(area.x0), area.x1, color2);
    }
}

/// Emit the visible part of `bm` with its origin at `pen`, cut to the
/// clip rectangle and the frame. Columns left of `brk` (relative to the
/// pen) get `color`, the rest `color2`.
pub fn render_glyph(
    images: &mut Vec<Image>,
    bm: &Arc<Bitmap>,
    pen: Vector,
    area: &PaintArea,
    color: u32,
    color2: u32,
    brk: i32,
) {
    let dst = Vector::new(pen.x + bm.left, pen.y + bm.top);
    let brk = brk.saturating_sub(bm.left);
    let clip = area.clip.intersect(&area.screen());

    let visible = ClipRect::new(0, 0, bm.w, bm.h).intersect(&clip.translate(-dst.x, -dst.y));
    if visible.is_empty() {
        return;
    }
    emit_split(images, bm, visible, dst, brk, color, color2);
}

/// Parts of a `w` by `h` bitmap outside `clip` (bitmap coordinates): a
/// left strip, the parts above and below the clip, and a right strip.
/// Empty candidates are dropped.
pub fn inverse_clip_rects(w: i32, h: i32, clip: ClipRect) -> SmallVec<[ClipRect; 4]> {
    let mid_x0 = clip.x0.max(0);
    let mid_x1 = clip.x1.min(w);
    [
        ClipRect::new(0, 0, clip.x0.min(w), h),
        ClipRect::new(mid_x0, 0, mid_x1, clip.y0.min(h)),
        ClipRect::new(mid_x0, clip.y1.max(0), mid_x1, h),
        ClipRect::new(clip.x1.max(0), 0, w, h),
    ]
    .into_iter()
    .filter(|r| !r.is_empty())
    .collect()
}

/// Like [`render_glyph`] but keeps what lies outside the clip rectangle
pub fn render_glyph_inverse(
    images: &mut Vec<Image>,
    bm: &Arc<Bitmap>,
    pen: Vector,
    area: &PaintArea,
    color: u32,
    color2: u32,
    brk: i32,
) {
    let dst = Vector::new(pen.x + bm.left, pen.y + bm.top);
    let brk = brk.saturating_sub(bm.left);
    let clip = area.clip.translate(-dst.x, -dst.y);
    let screen = area.screen().translate(-dst.x, -dst.y);

    for rect in inverse_clip_rects(bm.w, bm.h, clip) {
        let rect = rect.intersect(&screen);
        if rect.is_empty() {
            continue;
        }
        emit_split(images, bm, rect, dst, brk, color, color2);
    }
}

fn paint(
    images: &mut Vec<Image>,
    bm: &Arc<Bitmap>,
    pen: Vector,
    area: &PaintArea,
    color: u32,
    color2: u32,
    brk: i32,
) {
    match area.mode {
        ClipMode::Normal => render_glyph(images, bm, pen, area, color, color2, brk),
        ClipMode::Inverse => render_glyph_inverse(images, bm, pen, area, color, color2, brk),
    }
}

/// Blend the overlap of two consecutive images of the same color: the
/// first loses its overlapping pixels, the second receives the saturated
/// sum. Results are cached by the identity and placement of both sides.
pub fn render_overlap(a: &mut Image, b: &mut Image, cache: &mut RenderCache) {
    if a.color != b.color {
        return;
    }
    if a.same_pixels(b) && a.dst_x == b.dst_x && a.dst_y == b.dst_y {
        return;
    }
    let ra = ClipRect::new(a.dst_x, a.dst_y, a.dst_x + a.w, a.dst_y + a.h);
    let rb = ClipRect::new(b.dst_x, b.dst_y, b.dst_x + b.w, b.dst_y + b.h);
    let overlap = ra.intersect(&rb);
    if overlap.is_empty() {
        return;
    }

    let key = CompositeKey {
        a: a.side(),
        b: b.side(),
    };
    let (na, nb) = match cache.get_composite(&key) {
        Some(pair) => pair,
        None => {
            let mut ba = a.to_bitmap();
            let mut bb = b.to_bitmap();
            for y in overlap.y0..overlap.y1 {
                for x in overlap.x0..overlap.x1 {
                    let pa = ((y - a.dst_y) * ba.stride + (x - a.dst_x)) as usize;
                    let pb = ((y - b.dst_y) * bb.stride + (x - b.dst_x)) as usize;
                    let sum = u16::from(ba.buffer[pa]) + u16::from(bb.buffer[pb]);
                    ba.buffer[pa] = 0;
                    bb.buffer[pb] = sum.min(255) as u8;
                }
            }
            cache.store_composite(key, ba, bb)
        }
    };
    a.set_bitmap(na);
    b.set_bitmap(nb);
}

/// Emit one image pass, de-duplicating the overlap between the last image
/// of the previous glyph and the first image of the current one
fn pass<'a>(
    images: &mut Vec<Image>,
    cache: &mut RenderCache,
    items: impl Iterator<Item = (&'a Arc<Bitmap>, Vector, u32, u32, i32)>,
    area: &PaintArea,
    dedup: bool,
) {
    let mut last_tail: Option<usize> = None;
    for (bm, pen, color, color2, brk) in items {
        let here = images.len();
        paint(images, bm, pen, area, color, color2, brk);
        if images.len() == here {
            continue;
        }
        if let Some(prev) = last_tail {
            if dedup && color & 0xFF > 0 {
                let (head, tail) = images.split_at_mut(here);
                render_overlap(&mut head[prev], &mut tail[0], cache);
            }
        }
        last_tail = Some(images.len() - 1);
    }
}

/// Build the image list of an event: every shadow, then every border,
/// then every fill
pub fn render_text(paints: &[GlyphPaint], area: &PaintArea, cache: &mut RenderCache) -> Vec<Image> {
    let mut images = Vec::new();

    let shadows = paints.iter().filter_map(|p| {
        let bm = p.bitmaps.shadow.as_ref()?;
        if !p.has_shadow || bm.is_blank() {
            return None;
        }
        Some((bm, p.shadow_pen, p.c[3], p.c[3], NO_SPLIT))
    });
    pass(&mut images, cache, shadows, area, true);

    let borders = paints.iter().filter_map(|p| {
        let bm = p.bitmaps.border.as_ref()?;
        if p.effect == Karaoke::Outline && p.split <= p.right {
            return None;
        }
        Some((bm, p.pen, p.c[2], p.c[2], NO_SPLIT))
    });
    pass(&mut images, cache, borders, area, true);

    let fills = paints.iter().filter_map(|p| {
        let bm = p.bitmaps.fill.as_ref()?;
        let item = match p.effect {
            Karaoke::Instant | Karaoke::Outline => {
                let color = if p.split > p.right { p.c[0] } else { p.c[1] };
                (bm, p.pen, color, color, NO_SPLIT)
            }
            Karaoke::Fill => (bm, p.pen, p.c[0], p.c[1], p.split),
            Karaoke::None => (bm, p.pen, p.c[0], p.c[0], NO_SPLIT),
        };
        Some(item)
    });
    pass(&mut images, cache, fills, area, false);

    images
}

/// Apply a vector clip mask to every image. `mask.left` and `mask.top`
/// are frame coordinates. A regular clip multiplies coverage by the mask
/// and drops images that miss it; an inverse clip subtracts the mask.
/// Touched images get buffers cached by source image and mask, so an
/// unchanged frame reuses them.
pub fn blend_vector_clip(
    images: &mut Vec<Image>,
    mask: &Bitmap,
    mask_key: &ClipMaskKey,
    inverse: bool,
    cache: &mut RenderCache,
) {
    let mask_rect = ClipRect::new(mask.left, mask.top, mask.left + mask.w, mask.top + mask.h);
    images.retain_mut(|image| {
        let rect = ClipRect::new(image.dst_x, image.dst_y, image.dst_x + image.w, image.dst_y + image.h);
        let overlap = rect.intersect(&mask_rect);
        if overlap.is_empty() {
            return inverse;
        }

        let key = ClippedKey {
            source: image.side(),
            mask: mask_key.clone(),
            inverse,
        };
        let bitmap = match cache.get_clipped(&key) {
            Some(bitmap) => bitmap,
            None => cache.store_clipped(key, clip_image(image, mask, &overlap, inverse)),
        };
        image.set_bitmap(bitmap);
        true
    });
}

fn clip_image(image: &Image, mask: &Bitmap, overlap: &ClipRect, inverse: bool) -> Bitmap {
    let mut out = if inverse {
        image.to_bitmap()
    } else {
        Bitmap::new(0, 0, image.w, image.h)
    };
    for y in overlap.y0..overlap.y1 {
        let src = image.row(y - image.dst_y);
        let mask_row = mask.row(y - mask.top);
        for x in overlap.x0..overlap.x1 {
            let a = u32::from(src[(x - image.dst_x) as usize]);
            let b = u32::from(mask_row[(x - mask.left) as usize]);
            let pos = ((y - image.dst_y) * out.stride + (x - image.dst_x)) as usize;
            out.buffer[pos] = if inverse {
                a.saturating_sub(b) as u8
            } else {
                ((a * b + 255) >> 8) as u8
            };
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::drawing::DrawingKey;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn solid(w: i32, h: i32, value: u8) -> Arc<Bitmap> {
        let mut bm = Bitmap::new(0, 0, w, h);
        for y in 0..h {
            let start = (y * bm.stride) as usize;
            bm.buffer[start..start + w as usize].fill(value);
        }
        Arc::new(bm)
    }

    fn mask_key() -> ClipMaskKey {
        ClipMaskKey {
            drawing: DrawingKey::new("m 0 0 l 4 0 4 4 0 4"),
            scale: 1,
            scale_x: 65536,
            scale_y: 65536,
            origin: Vector::default(),
        }
    }

    fn area(clip: ClipRect, mode: ClipMode) -> PaintArea {
        PaintArea {
            width: 100,
            height: 100,
            clip,
            mode,
        }
    }

    fn full() -> ClipRect {
        ClipRect::new(0, 0, 100, 100)
    }

    fn rects(images: &[Image]) -> Vec<(i32, i32, i32, i32)> {
        images.iter().map(|i| (i.dst_x, i.dst_y, i.w, i.h)).collect()
    }

    #[test]
    fn test_clip_crops_to_rectangle() {
        let bm = solid(10, 10, 255);
        let mut images = Vec::new();
        let clip = ClipRect::new(15, 0, 100, 17);
        render_glyph(&mut images, &bm, Vector::new(10, 10), &area(clip, ClipMode::Normal), 1, 1, NO_SPLIT);
        assert_eq!(rects(&images), vec![(15, 10, 5, 7)]);
        assert_eq!(images[0].offset, 5);
    }

    #[test]
    fn test_glyph_off_screen_emits_nothing() {
        let bm = solid(10, 10, 255);
        let mut images = Vec::new();
        render_glyph(&mut images, &bm, Vector::new(120, 10), &area(full(), ClipMode::Normal), 1, 1, NO_SPLIT);
        assert!(images.is_empty());
    }

    #[test]
    fn test_karaoke_split_colors() {
        let bm = solid(10, 4, 255);
        let mut images = Vec::new();
        render_glyph(&mut images, &bm, Vector::new(0, 0), &area(full(), ClipMode::Normal), 1, 2, 4);
        assert_eq!(rects(&images), vec![(0, 0, 4, 4), (4, 0, 6, 4)]);
        assert_eq!(images[0].color, 1);
        assert_eq!(images[1].color, 2);
    }

    #[test]
    fn test_inverse_clip_rectangles() {
        let got = inverse_clip_rects(10, 10, ClipRect::new(3, 4, 6, 8));
        let want: Vec<ClipRect> = vec![
            ClipRect::new(0, 0, 3, 10),
            ClipRect::new(3, 0, 6, 4),
            ClipRect::new(3, 8, 6, 10),
            ClipRect::new(6, 0, 10, 10),
        ];
        assert_eq!(got.to_vec(), want);
    }

    #[test]
    fn test_inverse_clip_covering_and_disjoint() {
        assert!(inverse_clip_rects(10, 10, ClipRect::new(-5, -5, 20, 20)).is_empty());
        let outside = inverse_clip_rects(10, 10, ClipRect::new(30, 30, 40, 40));
        assert_eq!(outside.to_vec(), vec![ClipRect::new(0, 0, 10, 10)]);
    }

    #[test]
    fn test_inverse_render_splits_rects() {
        let bm = solid(10, 10, 255);
        let mut images = Vec::new();
        let clip = ClipRect::new(0, 0, 100, 15);
        render_glyph_inverse(&mut images, &bm, Vector::new(10, 10), &area(clip, ClipMode::Inverse), 1, 2, 5);
        // only the band below the clip survives, split at x = 15
        assert_eq!(rects(&images), vec![(10, 15, 5, 5), (15, 15, 5, 5)]);
    }

    #[test]
    fn test_overlap_caps_coverage() {
        let mut cache = RenderCache::new();
        let bm = solid(10, 10, 200);
        let image = |x: i32| Image {
            bitmap: Arc::clone(&bm),
            offset: 0,
            w: 10,
            h: 10,
            stride: bm.stride,
            color: 0xFFFFFF80,
            dst_x: x,
            dst_y: 0,
        };
        let mut a = image(0);
        let mut b = image(6);
        render_overlap(&mut a, &mut b, &mut cache);
        assert_eq!(a.row(0)[7], 0);
        assert_eq!(a.row(0)[5], 200);
        assert_eq!(b.row(0)[1], 255);
        assert_eq!(b.row(0)[5], 200);

        // same geometry again comes from the composite cache
        let mut c = image(0);
        let mut d = image(6);
        render_overlap(&mut c, &mut d, &mut cache);
        assert!(Arc::ptr_eq(&a.bitmap, &c.bitmap));
        assert_eq!(cache.stats().composite_hits, 1);
    }

    #[test]
    fn test_render_text_order_and_karaoke_border() {
        let mut cache = RenderCache::new();
        let bitmaps = Arc::new(GlyphBitmaps {
            fill: Some(solid(4, 4, 255)),
            border: Some(solid(6, 6, 255)),
            shadow: Some(solid(6, 6, 255)),
        });
        let glyph = GlyphPaint {
            bitmaps,
            pen: Vector::new(10, 10),
            shadow_pen: Vector::new(12, 12),
            has_shadow: true,
            c: [0x11, 0x22, 0x33, 0x44],
            effect: Karaoke::None,
            split: 0,
            right: 4,
        };
        let images = render_text(std::slice::from_ref(&glyph), &area(full(), ClipMode::Normal), &mut cache);
        let colors: Vec<u32> = images.iter().map(|i| i.color).collect();
        assert_eq!(colors, vec![0x44, 0x33, 0x11]);

        let ko = GlyphPaint {
            effect: Karaoke::Outline,
            has_shadow: false,
            ..glyph
        };
        let images = render_text(&[ko], &area(full(), ClipMode::Normal), &mut cache);
        // border hidden and fill still secondary until the split passes it
        let colors: Vec<u32> = images.iter().map(|i| i.color).collect();
        assert_eq!(colors, vec![0x22]);
    }

    #[test]
    fn test_vector_clip_multiplies_and_drops() {
        let bm = solid(4, 4, 255);
        let image = |x: i32| Image {
            bitmap: Arc::clone(&bm),
            offset: 0,
            w: 4,
            h: 4,
            stride: bm.stride,
            color: 0,
            dst_x: x,
            dst_y: 0,
        };
        let mut mask = Bitmap::new(2, 0, 4, 4);
        for y in 0..4 {
            let start = (y * mask.stride) as usize;
            mask.buffer[start..start + 4].fill(128);
        }

        let mut cache = RenderCache::new();
        let mut images = vec![image(0), image(50)];
        blend_vector_clip(&mut images, &mask, &mask_key(), false, &mut cache);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].row(0), &[0, 0, 128, 128]);

        let mut images = vec![image(0), image(50)];
        blend_vector_clip(&mut images, &mask, &mask_key(), true, &mut cache);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].row(0), &[255, 255, 127, 127]);
        assert!(Arc::ptr_eq(&images[1].bitmap, &bm));
    }

    #[test]
    fn test_vector_clip_reuses_blended_buffers() {
        let bm = solid(4, 4, 200);
        let image = || Image {
            bitmap: Arc::clone(&bm),
            offset: 0,
            w: 4,
            h: 4,
            stride: bm.stride,
            color: 0,
            dst_x: 0,
            dst_y: 0,
        };
        let mut mask = Bitmap::new(0, 0, 4, 4);
        mask.buffer.fill(255);
        let mut cache = RenderCache::new();

        let mut first = vec![image()];
        blend_vector_clip(&mut first, &mask, &mask_key(), false, &mut cache);
        let mut second = vec![image()];
        blend_vector_clip(&mut second, &mask, &mask_key(), false, &mut cache);
        assert!(first[0].same_pixels(&second[0]));
        assert!(!Arc::ptr_eq(&first[0].bitmap, &bm));
        assert_eq!(first[0].row(0), &[200, 200, 200, 200]);

        // the inverse clip of the same mask is a different buffer
        let mut inverse = vec![image()];
        blend_vector_clip(&mut inverse, &mask, &mask_key(), true, &mut cache);
        assert!(!inverse[0].same_pixels(&first[0]));
        assert_eq!(inverse[0].row(0), &[0, 0, 0, 0]);

        cache.flush();
        let mut third = vec![image()];
        blend_vector_clip(&mut third, &mask, &mask_key(), false, &mut cache);
        assert!(!third[0].same_pixels(&first[0]));
    }

    proptest! {
        #[test]
        fn prop_inverse_clip_partitions_outside(
            w in 1i32..40,
            h in 1i32..40,
            x0 in -50i32..50,
            y0 in -50i32..50,
            cw in 0i32..60,
            ch in 0i32..60,
        ) {
            let clip = ClipRect::new(x0, y0, x0 + cw, y0 + ch);
            let parts = inverse_clip_rects(w, h, clip);
            let bounds = ClipRect::new(0, 0, w, h);
            let mut total = bounds.intersect(&clip).area();
            for (i, r) in parts.iter().enumerate() {
                prop_assert!(!r.is_empty());
                prop_assert_eq!(r.intersect(&bounds), *r);
                prop_assert!(r.intersect(&clip).is_empty());
                for other in parts.iter().skip(i + 1) {
                    prop_assert!(r.intersect(other).is_empty());
                }
                total += r.area();
            }
            prop_assert_eq!(total, i64::from(w) * i64::from(h));
        }
    }
}
