//! Zero-copy parsers for the on-disk layout.
//!
//! Nothing here interprets chunks relative to each other, see [`crate::loader`].

pub mod blend_mode;
pub mod chunk;
pub mod chunks;
pub mod color_depth;
pub mod errors;
pub mod header;
pub mod image;
pub mod palette;
pub mod raw_file;
pub mod raw_frame;
pub mod scalars;
