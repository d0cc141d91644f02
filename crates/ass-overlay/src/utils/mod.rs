//! Utility types and helper functions

mod errors;
pub mod math;

pub use errors::RenderError;
pub use math::{BBox, DBBox, DVector, Vector};
