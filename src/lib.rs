//! Decoder for Aseprite (`.ase` / `.aseprite`) documents.
//!
//! [`Document`] decodes a file into layers, frames, tags, slices and
//! tilesets. Frames can be flattened into RGBA images with
//! [`Document::flatten_frame`], or packed into a grid atlas with
//! animation cycles by [`output::pack`]. [`cache`] stores textures and atlases
//! in a small binary format.

pub mod binary;
pub mod cache;
pub mod loader;
pub mod make_image;
pub mod output;
pub mod wrappers;

pub use loader::{is_supported_path, DecodeError, Document, LookupError};
pub use make_image::{FlattenOptions, LoadImageError};
pub use output::{pack, AnimationCycle, AtlasRegion, PackError, PackOptions, PackedAtlas};
