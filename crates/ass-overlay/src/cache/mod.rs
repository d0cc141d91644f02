//! Caches for fonts, outlines, bitmaps and blended composites
//!
//! Every cache is keyed by exactly the inputs that determine its value.
//! There is no per-entry eviction: a cache over its ceiling is cleared
//! wholesale together with the caches that key off its values.

use std::sync::Arc;

use ahash::AHashMap;

use crate::font::{FaceId, Font, FontDesc, FontHandle, GlyphProvider};
use crate::pipeline::drawing::DrawingKey;
use crate::pipeline::state::Decoration;
use crate::raster::outline::Outline;
use crate::raster::stroke::{opaque_box, stroke_outline};
use crate::raster::{Bitmap, GlyphBitmaps};
use crate::renderer::settings::{CacheLimits, Hinting};
use crate::track::BorderStyle;
use crate::utils::math::{BBox, Vector};

/// Outline cache key of a font glyph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlyphOutlineKey {
    pub face: FaceId,
    pub glyph: u32,
    /// Pixel size, 26.6
    pub size: i32,
    pub weight: u16,
    pub italic: bool,
    /// 16.16
    pub scale_x: i32,
    /// 16.16
    pub scale_y: i32,
    /// Border widths, 26.6
    pub border_x: i32,
    pub border_y: i32,
    pub decoration: Decoration,
    pub border_style: BorderStyle,
    pub hinting: Hinting,
    pub vertical: bool,
}

/// Outline cache key of a drawing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DrawingOutlineKey {
    pub drawing: DrawingKey,
    /// `\p` level
    pub scale: i32,
    /// 16.16
    pub scale_x: i32,
    pub scale_y: i32,
    /// Baseline offset, 26.6
    pub pbo: i32,
    pub border_x: i32,
    pub border_y: i32,
    pub border_style: BorderStyle,
}

/// Key of the outline cache
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutlineKey {
    Glyph(GlyphOutlineKey),
    Drawing(DrawingOutlineKey),
}

/// Outline of a glyph or drawing with its border and metrics (26.6)
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineEntry {
    /// Fill outline
    pub outline: Outline,
    /// Border outlines, empty without a border
    pub border: Vec<Outline>,
    /// Control box of the fill
    pub bbox: BBox,
    /// Advance
    pub advance: Vector,
    /// Ascender
    pub asc: i32,
    /// Descender
    pub desc: i32,
}

impl OutlineEntry {
    /// Entry for `outline` with its border: an opaque box around the
    /// advance for [`BorderStyle::OpaqueBox`], otherwise a stroke when
    /// either border width (26.6) is positive
    pub fn new(
        outline: Outline,
        advance: Vector,
        asc: i32,
        desc: i32,
        border_style: BorderStyle,
        border_x: i32,
        border_y: i32,
    ) -> Self {
        let border = match border_style {
            BorderStyle::OpaqueBox => vec![opaque_box(advance.x, asc, desc, border_x, border_y)],
            BorderStyle::Outline => stroke_outline(&outline, border_x, border_y),
        };
        Self {
            bbox: outline.cbox(),
            outline,
            border,
            advance,
            asc,
            desc,
        }
    }

    fn byte_size(&self) -> usize {
        self.outline.byte_size() + self.border.iter().map(Outline::byte_size).sum::<usize>()
    }
}

/// Bitmap cache key of a transformed glyph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlyphBitmapKey {
    pub outline: OutlineKey,
    /// Rotations and shears, 16.16
    pub frx: i32,
    pub fry: i32,
    pub frz: i32,
    pub fax: i32,
    pub fay: i32,
    pub be: i32,
    /// Gaussian radius, 16.16
    pub blur: i32,
    /// Subpixel shadow offset, 26.6
    pub shadow_offset: Vector,
    /// Subpixel pen position, 26.6
    pub advance: Vector,
    /// Offset from the rotation center, 26.6
    pub shift: Vector,
}

/// Bitmap cache key of a vector clip mask
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClipMaskKey {
    pub drawing: DrawingKey,
    pub scale: i32,
    /// 16.16
    pub scale_x: i32,
    pub scale_y: i32,
    /// Mask origin in frame pixels
    pub origin: Vector,
}

/// Key of the bitmap cache
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BitmapKey {
    Glyph(GlyphBitmapKey),
    Clip(ClipMaskKey),
}

/// Identity and placement of one side of an overlapping pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompositeSide {
    /// Address of the shared source bitmap
    pub id: usize,
    pub offset: usize,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub stride: i32,
}

/// Key of the composite cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    pub a: CompositeSide,
    pub b: CompositeSide,
}

/// Key of a vector clip blended into one image
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClippedKey {
    pub source: CompositeSide,
    pub mask: ClipMaskKey,
    pub inverse: bool,
}

/// Cache statistics for monitoring
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub outline_hits: u64,
    pub outline_misses: u64,
    pub bitmap_hits: u64,
    pub bitmap_misses: u64,
    pub composite_hits: u64,
    pub composite_misses: u64,
    /// Wholesale flushes triggered by the ceilings or by setters
    pub flushes: u64,
    pub font_entries: usize,
    pub outline_entries: usize,
    pub bitmap_entries: usize,
    pub bitmap_bytes: usize,
    pub composite_entries: usize,
}

impl CacheStats {
    /// Hits over lookups across the outline, bitmap and composite caches
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.outline_hits + self.bitmap_hits + self.composite_hits;
        let total = hits + self.outline_misses + self.bitmap_misses + self.composite_misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Resolved fonts, addressed by [`FontHandle`]
#[derive(Debug, Default)]
pub struct FontCache {
    fonts: Vec<Font>,
    index: AHashMap<FontDesc, FontHandle>,
}

impl FontCache {
    /// Handle for `desc`, resolving its primary face on first use
    pub fn get_or_insert(&mut self, desc: FontDesc, provider: &mut dyn GlyphProvider) -> FontHandle {
        if let Some(&handle) = self.index.get(&desc) {
            return handle;
        }
        let handle = FontHandle(self.fonts.len());
        let font = Font::new(desc.clone(), provider);
        if font.primary().is_none() {
            log::debug!("no face matches font family {:?}", desc.family);
        }
        self.fonts.push(font);
        self.index.insert(desc, handle);
        handle
    }

    /// Font behind a handle
    pub fn get(&self, handle: FontHandle) -> Option<&Font> {
        self.fonts.get(handle.0)
    }

    /// Mutable font behind a handle, for fallback face resolution
    pub fn get_mut(&mut self, handle: FontHandle) -> Option<&mut Font> {
        self.fonts.get_mut(handle.0)
    }

    /// Number of fonts
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Whether no font was resolved yet
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Forget every font
    pub fn clear(&mut self) {
        self.fonts.clear();
        self.index.clear();
    }
}

/// What [`RenderCache::check_limits`] flushed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flushed {
    pub outlines: bool,
    pub bitmaps: bool,
}

impl Flushed {
    /// Whether any bitmap became invalid
    pub fn any(&self) -> bool {
        self.outlines || self.bitmaps
    }
}

/// The renderer's caches
#[derive(Debug, Default)]
pub struct RenderCache {
    /// Font cache, never flushed by the ceilings
    pub fonts: FontCache,
    outlines: AHashMap<OutlineKey, Arc<OutlineEntry>>,
    outline_bytes: usize,
    bitmaps: AHashMap<BitmapKey, Arc<GlyphBitmaps>>,
    bitmap_bytes: usize,
    composites: AHashMap<CompositeKey, (Arc<Bitmap>, Arc<Bitmap>)>,
    clipped: AHashMap<ClippedKey, Arc<Bitmap>>,
    stats: CacheStats,
}

impl RenderCache {
    /// Create empty caches
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an outline from cache
    pub fn get_outline(&mut self, key: &OutlineKey) -> Option<Arc<OutlineEntry>> {
        if let Some(entry) = self.outlines.get(key) {
            self.stats.outline_hits += 1;
            Some(Arc::clone(entry))
        } else {
            self.stats.outline_misses += 1;
            None
        }
    }

    /// Store an outline in cache
    pub fn store_outline(&mut self, key: OutlineKey, entry: OutlineEntry) -> Arc<OutlineEntry> {
        self.outline_bytes += entry.byte_size();
        let entry = Arc::new(entry);
        self.outlines.insert(key, Arc::clone(&entry));
        entry
    }

    /// Get glyph or mask bitmaps from cache
    pub fn get_bitmaps(&mut self, key: &BitmapKey) -> Option<Arc<GlyphBitmaps>> {
        if let Some(bitmaps) = self.bitmaps.get(key) {
            self.stats.bitmap_hits += 1;
            Some(Arc::clone(bitmaps))
        } else {
            self.stats.bitmap_misses += 1;
            None
        }
    }

    /// Store bitmaps in cache
    pub fn store_bitmaps(&mut self, key: BitmapKey, bitmaps: GlyphBitmaps) -> Arc<GlyphBitmaps> {
        self.bitmap_bytes += bitmaps.byte_size();
        let bitmaps = Arc::new(bitmaps);
        self.bitmaps.insert(key, Arc::clone(&bitmaps));
        bitmaps
    }

    /// Get a blended pair from cache
    pub fn get_composite(&mut self, key: &CompositeKey) -> Option<(Arc<Bitmap>, Arc<Bitmap>)> {
        if let Some((a, b)) = self.composites.get(key) {
            self.stats.composite_hits += 1;
            Some((Arc::clone(a), Arc::clone(b)))
        } else {
            self.stats.composite_misses += 1;
            None
        }
    }

    /// Store a blended pair in cache
    pub fn store_composite(&mut self, key: CompositeKey, a: Bitmap, b: Bitmap) -> (Arc<Bitmap>, Arc<Bitmap>) {
        let pair = (Arc::new(a), Arc::new(b));
        self.composites
            .insert(key, (Arc::clone(&pair.0), Arc::clone(&pair.1)));
        pair
    }

    /// Get a clipped image from cache
    pub fn get_clipped(&mut self, key: &ClippedKey) -> Option<Arc<Bitmap>> {
        let found = self.clipped.get(key).cloned();
        if found.is_some() {
            self.stats.composite_hits += 1;
        } else {
            self.stats.composite_misses += 1;
        }
        found
    }

    /// Store a clipped image in cache
    pub fn store_clipped(&mut self, key: ClippedKey, bitmap: Bitmap) -> Arc<Bitmap> {
        let bitmap = Arc::new(bitmap);
        self.clipped.insert(key, Arc::clone(&bitmap));
        bitmap
    }

    /// Flush caches over their ceilings. Flushing outlines also flushes
    /// bitmaps and composites; flushing bitmaps also flushes composites.
    pub fn check_limits(&mut self, limits: &CacheLimits) -> Flushed {
        let mut flushed = Flushed::default();
        if self.bitmap_bytes >= limits.bitmap_max_bytes {
            log::debug!("bitmap cache over {} bytes, flushing", limits.bitmap_max_bytes);
            self.flush_bitmaps();
            flushed.bitmaps = true;
        }
        if self.outlines.len() >= limits.glyph_max {
            log::debug!("outline cache over {} entries, flushing", limits.glyph_max);
            self.outlines.clear();
            self.outline_bytes = 0;
            self.flush_bitmaps();
            flushed.outlines = true;
            flushed.bitmaps = true;
        }
        flushed
    }

    fn flush_bitmaps(&mut self) {
        self.bitmaps.clear();
        self.bitmap_bytes = 0;
        self.composites.clear();
        self.clipped.clear();
        self.stats.flushes += 1;
    }

    /// Clear the outline, bitmap and composite caches
    pub fn flush(&mut self) {
        self.outlines.clear();
        self.outline_bytes = 0;
        self.flush_bitmaps();
    }

    /// Clear everything including resolved fonts
    pub fn clear(&mut self) {
        self.flush();
        self.fonts.clear();
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            font_entries: self.fonts.len(),
            outline_entries: self.outlines.len(),
            bitmap_entries: self.bitmaps.len(),
            bitmap_bytes: self.bitmap_bytes,
            composite_entries: self.composites.len() + self.clipped.len(),
            ..self.stats
        }
    }
}
