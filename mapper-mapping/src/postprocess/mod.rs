//! Post-processing passes run on the extracted map when mapping ends.
//!
//! Filtering always runs before texturing.

pub mod filter;
pub mod texture;

pub use filter::{filter_chunk, filter_map};
pub use texture::{Keyframe, KeyframeStore};
