//! Error types for rendering

use thiserror::Error;

/// Rendering error types
#[derive(Debug, Error)]
pub enum RenderError {
    /// Invalid dimensions provided
    #[error("Invalid dimensions: dimensions must be positive and non-zero")]
    InvalidDimensions,

    /// Frame size was never configured
    #[error("Renderer not configured: frame size is not set")]
    NotConfigured,

    /// Track has no events to render
    #[error("Track contains no events")]
    EmptyTrack,

    /// Event refers to a style that does not exist
    #[error("Style index {index} out of range ({count} styles)")]
    StyleOutOfRange {
        /// Requested style index
        index: usize,
        /// Number of styles in the track
        count: usize,
    },

    /// Event has no text
    #[error("Event text is empty")]
    EmptyEvent,

    /// Event produced no glyphs
    #[error("Event produced no glyphs")]
    NoGlyphs,

    /// Font error
    #[error("Font error: {0}")]
    FontError(String),

    /// Shaping error
    #[error("Text shaping failed: {0}")]
    ShapingError(String),

    /// Drawing error
    #[error("Drawing failed: {0}")]
    DrawingError(String),

    /// Rasterization error
    #[error("Rasterization failed: {0}")]
    RasterError(String),

    /// Initialization error
    #[error("Initialization error: {0}")]
    InitializationError(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RenderError {
    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ShapingError(_) | Self::DrawingError(_) | Self::RasterError(_) | Self::FontError(_)
        )
    }

    /// Check if error only affects a single event
    pub fn is_event_level(&self) -> bool {
        matches!(
            self,
            Self::StyleOutOfRange { .. } | Self::EmptyEvent | Self::NoGlyphs
        )
    }
}
