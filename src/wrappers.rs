use std::ops::RangeInclusive;

use image::{ImageBuffer, Rgba, RgbaImage};

use crate::binary::{
    blend_mode::BlendMode,
    chunks::{
        layer::LayerFlags,
        slice::{SliceFlags, SliceKey},
        tags::AnimationDirection,
        user_data::UserDataChunk,
    },
};

/// Text and color a user attached to a layer, cel, tag or slice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserData {
    pub text: Option<String>,
    pub color: Option<Rgba<u8>>,
}

impl From<UserDataChunk<'_>> for UserData {
    fn from(chunk: UserDataChunk<'_>) -> Self {
        Self {
            text: chunk.text.map(str::to_owned),
            color: chunk.color.map(Into::into),
        }
    }
}

/// A cel in a frame, there is usually 1 per layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cel {
    pub layer_index: usize,
    pub x: i32,
    pub y: i32,
    pub opacity: u8,
    /// Index into the document's cel contents, linked cels share it
    pub content_index: usize,
    /// Frame this cel was linked to in the file
    pub linked_frame: Option<usize>,
    pub user_data: UserData,
}

impl Cel {
    pub fn layer_index(&self) -> usize {
        self.layer_index
    }
    pub fn is_linked(&self) -> bool {
        self.linked_frame.is_some()
    }
}

/// Pixels or tiles of a cel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CelContent {
    Image(RgbaImage),
    Tilemap(Tilemap),
}

impl CelContent {
    pub fn is_tilemap(&self) -> bool {
        matches!(self, CelContent::Tilemap(_))
    }
}

/// Grid of tiles, row by row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tilemap {
    /// Width in number of tiles
    pub width: u32,
    /// Height in number of tiles
    pub height: u32,
    pub tiles: Vec<Tile>,
}

impl Tilemap {
    pub fn tile(&self, column: u32, row: u32) -> Option<&Tile> {
        if column >= self.width || row >= self.height {
            return None;
        }
        self.tiles.get(row as usize * self.width as usize + column as usize)
    }

    /// Tiles with their grid position
    pub fn iter_tiles(&self) -> impl Iterator<Item = (u32, u32, &Tile)> {
        let width = self.width.max(1);
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, tile)| (i as u32 % width, i as u32 / width, tile))
    }
}

/// One tilemap entry.
///
/// Flip and rotation hold the masked bits as stored, without shifting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tile {
    pub id: u32,
    pub x_flip: u32,
    pub y_flip: u32,
    pub rotation: u32,
}

impl Tile {
    pub fn is_x_flipped(&self) -> bool {
        self.x_flip != 0
    }
    pub fn is_y_flipped(&self) -> bool {
        self.y_flip != 0
    }
    pub fn is_rotated(&self) -> bool {
        self.rotation != 0
    }
}

/// A frame in the file
/// This is a collection of cels, in paint order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// In milliseconds
    pub duration: u32,
    pub cels: Vec<Cel>,
}

impl Frame {
    pub fn iter_cels(&self) -> impl Iterator<Item = &Cel> {
        self.cels.iter()
    }
    pub fn cel_at_layer_index(&self, layer_index: usize) -> Option<&Cel> {
        self.cels.iter().find(|c| c.layer_index == layer_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Image,
    Tilemap { tileset_id: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub name: String,
    pub flags: LayerFlags,
    /// Raw blend mode id
    pub blend_mode: u16,
    pub opacity: u8,
    pub kind: LayerKind,
    pub user_data: UserData,
}

impl Layer {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn visible(&self) -> bool {
        self.flags.contains(LayerFlags::VISIBLE)
    }
    pub fn is_background(&self) -> bool {
        self.flags.contains(LayerFlags::BACKGROUND)
    }
    pub fn is_reference(&self) -> bool {
        self.flags.contains(LayerFlags::REFERENCE)
    }
    /// `None` for ids newer than this crate
    pub fn blend_mode(&self) -> Option<BlendMode> {
        BlendMode::from_repr(self.blend_mode)
    }
    pub fn tileset_id(&self) -> Option<u32> {
        match self.kind {
            LayerKind::Tilemap { tileset_id } => Some(tileset_id),
            LayerKind::Image => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    /// First frame, inclusive
    pub from: usize,
    /// Last frame, inclusive
    pub to: usize,
    pub direction: AnimationDirection,
    pub repeat: u16,
    pub color: Rgba<u8>,
    pub user_data: UserData,
}

impl Tag {
    pub fn frame_range(&self) -> RangeInclusive<usize> {
        self.from..=self.to
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    pub name: String,
    pub flags: SliceFlags,
    pub keys: Vec<SliceKey>,
    pub user_data: UserData,
}

impl Slice {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn is_nine_patch(&self) -> bool {
        self.flags.contains(SliceFlags::NINE_PATCH)
    }
    pub fn has_pivot(&self) -> bool {
        self.flags.contains(SliceFlags::PIVOT)
    }
    /// Key in effect on `frame`: the last one starting at or before it
    pub fn key_at(&self, frame: usize) -> Option<&SliceKey> {
        self.keys
            .iter()
            .filter(|k| k.start_frame as usize <= frame)
            .max_by_key(|k| k.start_frame)
    }
}

/// Borrowed view of a single tile
pub type TileImage<'a> = ImageBuffer<Rgba<u8>, &'a [u8]>;

/// Tiles stored end to end in one strip, `tile_width` wide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tileset {
    pub id: u32,
    pub name: String,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tile_count: u32,
    /// `tile_width` x `tile_height * tile_count`
    pub pixels: RgbaImage,
}

impl Tileset {
    fn tile_byte_len(&self) -> usize {
        self.tile_width as usize * self.tile_height as usize * 4
    }

    /// Raw RGBA bytes of tile `id`
    pub fn tile_pixels(&self, id: u32) -> Option<&[u8]> {
        if id >= self.tile_count {
            return None;
        }
        let len = self.tile_byte_len();
        let start = id as usize * len;
        self.pixels.as_raw().get(start..start + len)
    }

    pub fn tile(&self, id: u32) -> Option<TileImage<'_>> {
        let pixels = self.tile_pixels(id)?;
        ImageBuffer::from_raw(self.tile_width, self.tile_height, pixels)
    }
}

pub trait PixelExt {
    fn a(&self) -> u8;
    fn zeroed() -> Self;
}

impl PixelExt for Rgba<u8> {
    fn a(&self) -> u8 {
        self.0[3]
    }

    fn zeroed() -> Self {
        Self([0; 4])
    }
}
