//! Renderer instance owning configuration, fonts, shaper and caches

use log::{debug, warn};

use crate::cache::{CacheStats, RenderCache};
use crate::compositor::Image;
use crate::font::GlyphProvider;
use crate::layout::TextInfo;
use crate::shaping::{Shaper, ShapingEngine, ShapingLevel};
use crate::track::Track;
use crate::utils::RenderError;

mod assembler;
mod event;
mod frame;
pub mod settings;

pub use assembler::{detect_change, ChangeKind};
pub use frame::{Frame, PixelFormat};
pub use settings::{CacheLimits, FrameGeometry, Hinting, Settings};

use event::{render_event, EventContext};

/// Renders the active events of a track into positioned images.
///
/// All caches live in the renderer, so two renderers never share state.
/// Setters that change frame geometry or fonts start a new render
/// generation, which drops sticky event placements and flushes the caches.
pub struct Renderer {
    settings: Settings,
    provider: Box<dyn GlyphProvider>,
    shaper: Shaper,
    cache: RenderCache,
    text_info: TextInfo,
    generation: u64,
    prev_images: Option<Vec<Image>>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("settings", &self.settings)
            .field("shaper", &self.shaper)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Create a renderer that takes fonts from `provider`
    pub fn new(provider: Box<dyn GlyphProvider>) -> Result<Self, RenderError> {
        if tiny_skia::Mask::new(1, 1).is_none() {
            return Err(RenderError::InitializationError(
                "rasterizer could not allocate a mask".into(),
            ));
        }
        Ok(Self {
            settings: Settings::default(),
            provider,
            shaper: Shaper::default(),
            cache: RenderCache::new(),
            text_info: TextInfo::new(),
            generation: 1,
            prev_images: None,
        })
    }

    /// Create a renderer using the installed system fonts
    #[cfg(feature = "system-fonts")]
    pub fn with_default_fonts() -> Result<Self, RenderError> {
        Self::new(Box::new(crate::font::FontDbProvider::new()))
    }

    /// Current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Render generation; sticky placements from older generations are
    /// ignored
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn reconfigure(&mut self) {
        self.generation += 1;
        self.cache.clear();
        self.prev_images = None;
        debug!("render generation {}", self.generation);
    }

    /// Set the output frame size. Without a configured aspect ratio, the
    /// display and storage aspect become `width / height`.
    pub fn set_frame_size(&mut self, width: i32, height: i32) {
        if self.settings.frame_width == width && self.settings.frame_height == height {
            return;
        }
        self.settings.frame_width = width;
        self.settings.frame_height = height;
        if self.settings.aspect == 0.0 || self.settings.storage_aspect == 0.0 {
            let ratio = if height > 0 { f64::from(width) / f64::from(height) } else { 1.0 };
            self.settings.aspect = ratio;
            self.settings.storage_aspect = ratio;
        }
        self.reconfigure();
    }

    /// Set the margins between the video and the frame edges
    pub fn set_margins(&mut self, top: i32, bottom: i32, left: i32, right: i32) {
        let s = &mut self.settings;
        if (s.top_margin, s.bottom_margin, s.left_margin, s.right_margin) == (top, bottom, left, right) {
            return;
        }
        s.top_margin = top;
        s.bottom_margin = bottom;
        s.left_margin = left;
        s.right_margin = right;
        self.reconfigure();
    }

    /// Let top and bottom aligned text use the margins
    pub fn set_use_margins(&mut self, use_margins: bool) {
        self.settings.use_margins = use_margins;
    }

    /// Set the display aspect ratio `dar` and storage aspect ratio `sar`
    pub fn set_aspect_ratio(&mut self, dar: f64, sar: f64) {
        if self.settings.aspect == dar && self.settings.storage_aspect == sar {
            return;
        }
        self.settings.aspect = dar;
        self.settings.storage_aspect = sar;
        self.reconfigure();
    }

    /// Scale every font size by `coeff`
    pub fn set_font_scale(&mut self, coeff: f64) {
        if self.settings.font_size_coeff == coeff {
            return;
        }
        self.settings.font_size_coeff = coeff;
        self.reconfigure();
    }

    /// Select the hinting mode requested from the glyph provider
    pub fn set_hinting(&mut self, hinting: Hinting) {
        if self.settings.hinting == hinting {
            return;
        }
        self.settings.hinting = hinting;
        self.reconfigure();
    }

    /// Set the fallback font and family, optionally replacing the glyph
    /// provider
    pub fn set_fonts(
        &mut self,
        default_font: Option<&str>,
        default_family: Option<&str>,
        provider: Option<Box<dyn GlyphProvider>>,
    ) {
        if let Some(provider) = provider {
            self.provider = provider;
        }
        self.settings.default_font = default_font.map(str::to_owned);
        self.settings.default_family = default_family.map(str::to_owned);
        self.provider.set_defaults(default_font, default_family);
        self.reconfigure();
    }

    /// Set the cache ceilings; zero keeps the default for that cache
    pub fn set_cache_limits(&mut self, glyph_max: usize, bitmap_max_mb: usize) {
        self.settings.cache_limits = CacheLimits::new(glyph_max, bitmap_max_mb);
    }

    /// Extra space between lines, in frame pixels
    pub fn set_line_spacing(&mut self, line_spacing: f64) {
        self.settings.line_spacing = line_spacing;
    }

    /// Install a shaping engine for complex shaping, or `None` for simple
    /// shaping
    pub fn set_shaper(&mut self, engine: Option<Box<dyn ShapingEngine>>) {
        self.shaper.set_engine(engine);
        self.cache.clear();
        self.prev_images = None;
    }

    /// Shaping quality in effect
    pub fn shaping_level(&self) -> ShapingLevel {
        self.shaper.level()
    }

    /// Cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached outline and bitmap
    pub fn flush_caches(&mut self) {
        self.cache.flush();
        self.prev_images = None;
    }

    /// Render the events of `track` active at `now` (milliseconds)
    pub fn render_frame(&mut self, track: &Track, now: i64) -> Vec<Image> {
        self.render_frame_with_change(track, now).0
    }

    /// Render a frame and report how it differs from the previous one
    pub fn render_frame_with_change(&mut self, track: &Track, now: i64) -> (Vec<Image>, ChangeKind) {
        if !self.settings.is_configured() {
            debug!("frame size not set, nothing rendered");
            return (Vec::new(), ChangeKind::Unchanged);
        }
        if track.play_res_x <= 0 || track.play_res_y <= 0 {
            let (x, y) = track.play_res();
            warn!("PlayResX/PlayResY missing, using {x}x{y}");
        }
        if track.styles.is_empty() {
            debug!("{}", RenderError::EmptyTrack);
            return self.finish(Vec::new());
        }

        if self.cache.check_limits(&self.settings.cache_limits).any() {
            debug!("cache ceiling reached, caches flushed");
            self.prev_images = None;
        }

        let geometry = FrameGeometry::new(&self.settings, track);
        let mut events = Vec::new();
        for (index, event) in track.events.iter().enumerate() {
            if !event.is_active(now) {
                continue;
            }
            let ctx = EventContext {
                settings: &self.settings,
                geometry: &geometry,
                track,
                now,
                provider: self.provider.as_mut(),
                shaper: &mut self.shaper,
                cache: &mut self.cache,
                text_info: &mut self.text_info,
            };
            match render_event(ctx, index) {
                Ok(images) => events.push(images),
                Err(err) => debug!("event {index} skipped: {err}"),
            }
        }

        let images = assembler::assemble(events, track, geometry.height, self.generation);
        self.finish(images)
    }

    fn finish(&mut self, images: Vec<Image>) -> (Vec<Image>, ChangeKind) {
        let change = detect_change(self.prev_images.as_deref(), &images);
        self.prev_images = Some(images.clone());
        (images, change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{FaceData, FaceId, FontDesc, GlyphOutline, GlyphRequest};
    use crate::track::{Event, Style};
    use crate::utils::math::Vector;
    use pretty_assertions::assert_eq;

    struct NoFonts;

    impl GlyphProvider for NoFonts {
        fn resolve(&mut self, _: &FontDesc, _: Option<char>) -> Option<FaceId> {
            None
        }
        fn glyph_index(&self, _: FaceId, _: char) -> Option<u32> {
            None
        }
        fn get_glyph(&self, _: FaceId, _: u32, _: &GlyphRequest) -> Option<GlyphOutline> {
            None
        }
        fn get_kerning(&self, _: FaceId, _: u32, _: u32, _: f64) -> Vector {
            Vector::default()
        }
        fn get_ascent_descent(&self, _: FaceId, _: f64) -> (i32, i32) {
            (0, 0)
        }
        fn face_data(&self, _: FaceId) -> Option<FaceData> {
            None
        }
    }

    fn renderer() -> Renderer {
        Renderer::new(Box::new(NoFonts)).expect("renderer")
    }

    #[test]
    fn test_unconfigured_renders_nothing() {
        let mut renderer = renderer();
        let mut track = Track::new(384, 288);
        track.styles.push(Style::default());
        track.events.push(Event::new(0, 1000, "text"));
        assert_eq!(renderer.render_frame_with_change(&track, 0).1, ChangeKind::Unchanged);
    }

    #[test]
    fn test_frame_size_sets_aspect_and_generation() {
        let mut renderer = renderer();
        let generation = renderer.generation();
        renderer.set_frame_size(640, 480);
        assert_eq!(renderer.generation(), generation + 1);
        assert_eq!(renderer.settings().aspect, 640.0 / 480.0);
        assert_eq!(renderer.settings().font_scale_x(), 1.0);

        renderer.set_frame_size(640, 480);
        assert_eq!(renderer.generation(), generation + 1);
    }

    #[test]
    fn test_spacing_setters_keep_generation() {
        let mut renderer = renderer();
        renderer.set_frame_size(640, 480);
        let generation = renderer.generation();
        renderer.set_line_spacing(4.0);
        renderer.set_use_margins(true);
        renderer.set_cache_limits(10, 1);
        assert_eq!(renderer.generation(), generation);
        renderer.set_margins(10, 10, 0, 0);
        renderer.set_font_scale(1.5);
        renderer.set_hinting(Hinting::Light);
        assert_eq!(renderer.generation(), generation + 3);
        assert_eq!(renderer.settings().cache_limits.bitmap_max_bytes, 1024 * 1024);
    }

    #[test]
    fn test_missing_glyphs_render_nothing() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut renderer = renderer();
        renderer.set_frame_size(384, 288);
        let mut track = Track::new(384, 288);
        track.styles.push(Style::default());
        track.events.push(Event::new(0, 1000, "text"));
        let (images, change) = renderer.render_frame_with_change(&track, 500);
        assert!(images.is_empty());
        assert_eq!(change, ChangeKind::Unchanged);
        assert_eq!(renderer.shaping_level(), ShapingLevel::Simple);
    }
}
