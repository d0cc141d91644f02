//! Event text interpretation: override tags, drawings and render state

pub mod drawing;
pub mod scan;
pub mod state;
pub mod tag_parser;
pub mod transition;

pub use drawing::{Drawing, DrawingKey};
pub use state::{ClipMode, EventType, Karaoke, RenderState, ScrollDirection, TagContext};
