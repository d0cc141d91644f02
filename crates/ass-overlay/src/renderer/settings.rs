//! Embedder configuration and per-frame coordinate mapping

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::track::Track;

/// Default glyph (outline) cache ceiling, in entries
pub const DEFAULT_GLYPH_MAX: usize = 1000;
/// Default bitmap cache ceiling, in bytes
pub const DEFAULT_BITMAP_MAX_BYTES: usize = 50 * 1024 * 1024;

/// Hinting requested from the glyph provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Hinting {
    /// Unhinted outlines
    #[default]
    None,
    /// Light autohinting
    Light,
    /// Normal autohinting
    Normal,
    /// Font native hinting
    Native,
}

/// Cache ceilings; a cache exceeding its ceiling is flushed wholesale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CacheLimits {
    /// Maximum number of outline cache entries
    pub glyph_max: usize,
    /// Maximum total size of cached bitmaps
    pub bitmap_max_bytes: usize,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            glyph_max: DEFAULT_GLYPH_MAX,
            bitmap_max_bytes: DEFAULT_BITMAP_MAX_BYTES,
        }
    }
}

impl CacheLimits {
    /// Limits from a glyph count and a bitmap size in MiB; zero keeps the
    /// default for that cache
    pub fn new(glyph_max: usize, bitmap_max_mb: usize) -> Self {
        Self {
            glyph_max: if glyph_max == 0 { DEFAULT_GLYPH_MAX } else { glyph_max },
            bitmap_max_bytes: if bitmap_max_mb == 0 {
                DEFAULT_BITMAP_MAX_BYTES
            } else {
                bitmap_max_mb * 1024 * 1024
            },
        }
    }
}

/// Renderer settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Settings {
    /// Frame width in pixels
    pub frame_width: i32,
    /// Frame height in pixels
    pub frame_height: i32,
    /// Top margin (negative values crop)
    pub top_margin: i32,
    /// Bottom margin
    pub bottom_margin: i32,
    /// Left margin
    pub left_margin: i32,
    /// Right margin
    pub right_margin: i32,
    /// Place top and bottom aligned text inside the margins
    pub use_margins: bool,
    /// Display aspect ratio, 0 until configured
    pub aspect: f64,
    /// Storage (pixel) aspect ratio, 0 until configured
    pub storage_aspect: f64,
    /// Font size multiplier
    pub font_size_coeff: f64,
    /// Hinting mode
    pub hinting: Hinting,
    /// Extra space between lines in pixels
    pub line_spacing: f64,
    /// Font used when no family matches
    pub default_font: Option<String>,
    /// Family used when no family matches
    pub default_family: Option<String>,
    /// Cache ceilings
    pub cache_limits: CacheLimits,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frame_width: 0,
            frame_height: 0,
            top_margin: 0,
            bottom_margin: 0,
            left_margin: 0,
            right_margin: 0,
            use_margins: false,
            aspect: 0.0,
            storage_aspect: 0.0,
            font_size_coeff: 1.0,
            hinting: Hinting::None,
            line_spacing: 0.0,
            default_font: None,
            default_family: None,
            cache_limits: CacheLimits::default(),
        }
    }
}

impl Settings {
    /// Whether a frame size has been set
    pub fn is_configured(&self) -> bool {
        self.frame_width > 0 && self.frame_height > 0
    }

    /// Settings from a JSON document; missing fields are an error
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, crate::utils::RenderError> {
        serde_json::from_str(json).map_err(|e| crate::utils::RenderError::InvalidInput(e.to_string()))
    }

    /// Horizontal stretch from aspect correction
    pub fn font_scale_x(&self) -> f64 {
        if self.aspect > 0.0 && self.storage_aspect > 0.0 {
            self.aspect / self.storage_aspect
        } else {
            1.0
        }
    }
}

/// Frame geometry derived from the settings and the track at frame start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    /// Frame width
    pub width: i32,
    /// Frame height
    pub height: i32,
    /// Video width without margins
    pub orig_width: i32,
    /// Video height without margins
    pub orig_height: i32,
    /// Video width without non-negative margins
    pub orig_width_nocrop: i32,
    /// Video height without non-negative margins
    pub orig_height_nocrop: i32,
    /// Effective script width
    pub play_res_x: i32,
    /// Effective script height
    pub play_res_y: i32,
    /// Script-to-pixel font scale
    pub font_scale: f64,
    /// Horizontal stretch from aspect correction
    pub font_scale_x: f64,
    /// Border and shadow scale
    pub border_scale: f64,
    left_margin: i32,
    top_margin: i32,
    bottom_margin: i32,
    use_margins: bool,
}

impl FrameGeometry {
    /// Compute the geometry of a frame of `track`
    pub fn new(settings: &Settings, track: &Track) -> Self {
        let (play_res_x, play_res_y) = track.play_res();
        let orig_height = settings.frame_height - settings.top_margin - settings.bottom_margin;
        let border_scale = if track.scaled_border_and_shadow {
            f64::from(orig_height) / f64::from(play_res_y)
        } else {
            1.0
        };
        Self {
            width: settings.frame_width,
            height: settings.frame_height,
            orig_width: settings.frame_width - settings.left_margin - settings.right_margin,
            orig_height,
            orig_width_nocrop: settings.frame_width
                - settings.left_margin.max(0)
                - settings.right_margin.max(0),
            orig_height_nocrop: settings.frame_height
                - settings.top_margin.max(0)
                - settings.bottom_margin.max(0),
            play_res_x,
            play_res_y,
            font_scale: settings.font_size_coeff * f64::from(orig_height) / f64::from(play_res_y),
            font_scale_x: settings.font_scale_x(),
            border_scale,
            left_margin: settings.left_margin,
            top_margin: settings.top_margin,
            bottom_margin: settings.bottom_margin,
            use_margins: settings.use_margins,
        }
    }

    fn sx(&self, width: i32) -> f64 {
        f64::from(width) / f64::from(self.play_res_x)
    }

    fn sy(&self, height: i32) -> f64 {
        f64::from(height) / f64::from(self.play_res_y)
    }

    /// Script x to screen x for text placed by margins
    pub fn x2scr(&self, x: f64) -> f64 {
        x * self.sx(self.orig_width_nocrop) + f64::from(self.left_margin.max(0))
    }

    /// Script x to screen x for explicitly positioned text
    pub fn x2scr_pos(&self, x: f64) -> f64 {
        x * self.sx(self.orig_width) + f64::from(self.left_margin)
    }

    /// Script x to screen x for clip rectangles of text placed by margins
    pub fn x2scr_scaled(&self, x: f64) -> f64 {
        self.x2scr(x)
    }

    /// Script x to screen x for clip rectangles of positioned text
    pub fn x2scr_pos_scaled(&self, x: f64) -> f64 {
        self.x2scr_pos(x)
    }

    /// Script y to screen y
    pub fn y2scr(&self, y: f64) -> f64 {
        y * self.sy(self.orig_height_nocrop) + f64::from(self.top_margin.max(0))
    }

    /// Script y to screen y for explicitly positioned text
    pub fn y2scr_pos(&self, y: f64) -> f64 {
        y * self.sy(self.orig_height) + f64::from(self.top_margin)
    }

    /// Script y to screen y for top aligned text
    pub fn y2scr_top(&self, y: f64) -> f64 {
        let y = y * self.sy(self.orig_height_nocrop);
        if self.use_margins {
            y
        } else {
            y + f64::from(self.top_margin.max(0))
        }
    }

    /// Script y to screen y for bottom aligned text
    pub fn y2scr_sub(&self, y: f64) -> f64 {
        let y = y * self.sy(self.orig_height_nocrop) + f64::from(self.top_margin.max(0));
        if self.use_margins {
            y + f64::from(self.bottom_margin.max(0))
        } else {
            y
        }
    }
}
