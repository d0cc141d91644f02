//! Outline rasterization, stroking and blur

pub mod bitmap;
pub mod blur;
pub mod outline;
pub mod stroke;

pub use bitmap::{glyph_to_bitmap, outline_to_bitmap, Bitmap, GlyphBitmaps};
pub use outline::{Outline, PointTag};
