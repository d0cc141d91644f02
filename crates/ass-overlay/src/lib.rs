//! ASS subtitle overlay renderer
//!
//! `ass-overlay` turns the events of a parsed subtitle [`Track`] that are
//! active at a given time into a list of single-channel coverage images,
//! each with a color and a frame position, ready to be alpha-blended over a
//! video frame. Override tags, karaoke, drawings, clips, bidirectional text,
//! wrapping, collision avoidance and blur are handled the way common
//! subtitle renderers do.
//!
//! ```no_run
//! use ass_overlay::{Event, Renderer, Style, Track};
//!
//! # fn main() -> Result<(), ass_overlay::RenderError> {
//! let mut track = Track::new(1920, 1080);
//! track.styles.push(Style::default());
//! track.events.push(Event::new(0, 5000, r"{\an8}Hello"));
//!
//! let mut renderer = Renderer::with_default_fonts()?;
//! renderer.set_frame_size(1920, 1080);
//! let images = renderer.render_frame(&track, 1000);
//! # let _ = images;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod collision;
pub mod compositor;
pub mod font;
pub mod layout;
pub mod pipeline;
pub mod raster;
pub mod renderer;
pub mod shaping;
pub mod track;
pub mod utils;

pub use compositor::Image;
pub use font::{FaceId, FontDbProvider, FontDesc, GlyphProvider};
pub use renderer::{ChangeKind, Frame, Hinting, PixelFormat, Renderer, Settings};
pub use shaping::{RustybuzzShaper, ShapingEngine, ShapingLevel};
pub use track::{Alignment, BorderStyle, Event, Style, Track, WrapStyle};
pub use utils::RenderError;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
