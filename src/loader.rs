use std::{io::Read, path::Path};

use image::Rgba;
use itertools::Itertools;
use nom::Offset;
use thiserror::Error;

use crate::{
    binary::{
        chunk::{Chunk, ChunkType},
        chunks::{
            cel::{CelChunk, CelContent as RawCelContent},
            layer::{LayerChunk, LayerType},
            palette::PaletteChunk,
            slice::SliceChunk,
            tags::TagsChunk,
            tileset::TilesetChunk,
            user_data::UserDataChunk,
        },
        color_depth::ColorDepth,
        errors::{ParseError, ParseErrorKind},
        header::{Header, HeaderFlags},
        palette::Palette,
        raw_file::{parse_raw_file, RawFile},
    },
    make_image::{decode_tilemap, inflate, LoadImageError, PixelDecoder},
    wrappers::*,
};

/// File extensions handled by [`Document::read_file`]
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["ase", "aseprite"];

pub fn is_supported_path(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("parsing failed at byte {offset}: {kind}")]
    Parse { offset: usize, kind: ParseErrorKind },
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("user data in frame {frame} has no owner (previous chunk: {antecedent:?})")]
    UserDataWithoutOwner {
        frame: usize,
        antecedent: Option<ChunkType>,
    },
    #[error("cel {slot} of frame {frame} links to frame {linked_frame} which has no such cel")]
    LinkedCelNotFound {
        frame: usize,
        slot: usize,
        linked_frame: usize,
    },
    #[error("cel in frame {frame} refers to layer {layer_index}, only {layer_count} layers exist")]
    LayerIndexOutOfRange {
        frame: usize,
        layer_index: usize,
        layer_count: usize,
    },
    #[error("invalid image in frame {frame}: {source}")]
    Image {
        frame: usize,
        source: LoadImageError,
    },
}

impl DecodeError {
    fn from_nom(data: &[u8], e: nom::Err<ParseError<'_>>) -> Self {
        match e {
            nom::Err::Error(e) | nom::Err::Failure(e) => DecodeError::Parse {
                offset: data.offset(e.input),
                kind: e.kind,
            },
            nom::Err::Incomplete(_) => DecodeError::Parse {
                offset: data.len(),
                kind: ParseErrorKind::UnexpectedEof,
            },
        }
    }
}

/// Lookup of something the document does not have
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("frame index {index} out of range, the document has {count} frames")]
    FrameIndexOutOfRange { index: usize, count: usize },
    #[error("missing tag: {name} (available: {available})")]
    MissingTag { name: String, available: String },
    #[error("missing layer: {name} (available: {available})")]
    MissingLayer { name: String, available: String },
    #[error("layer index {index} out of range, the document has {count} layers")]
    LayerIndexOutOfRange { index: usize, count: usize },
    #[error("missing slice: {name} (available: {available})")]
    MissingSlice { name: String, available: String },
    #[error("missing tileset with id {id} (available: {available})")]
    MissingTilesetId { id: u32, available: String },
    #[error("missing tileset: {name} (available: {available})")]
    MissingTilesetName { name: String, available: String },
    #[error("cel content {index} out of range, the document has {count}")]
    CelContentOutOfRange { index: usize, count: usize },
}

/// Chunk a following user data chunk belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum UserDataOwner {
    /// Start of a frame
    #[default]
    Nothing,
    Cel,
    Layer,
    Slice,
    /// Index of the tag the next user data goes to
    Tags { next: usize },
    /// A chunk that cannot carry user data
    Other(ChunkType),
}

impl UserDataOwner {
    fn antecedent(self) -> Option<ChunkType> {
        match self {
            UserDataOwner::Nothing => None,
            UserDataOwner::Cel => Some(ChunkType::Cel),
            UserDataOwner::Layer => Some(ChunkType::Layer),
            UserDataOwner::Slice => Some(ChunkType::Slice),
            UserDataOwner::Tags { .. } => Some(ChunkType::Tags),
            UserDataOwner::Other(chunk_type) => Some(chunk_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Usually the file stem
    pub name: String,
    pub header: Header,
    /// Used for indexed-to-RGB conversion
    pub palette: Palette,
    /// All layers in the file in order, which is also paint order
    pub layers: Vec<Layer>,
    /// All frames in the file in order
    pub frames: Vec<Frame>,
    /// All tags in the file
    pub tags: Vec<Tag>,
    pub slices: Vec<Slice>,
    pub tilesets: Vec<Tileset>,
    /// Pixels and tiles of all cels, linked cels point at the same entry
    pub cel_contents: Vec<CelContent>,
}

impl Document {
    fn new(name: String, file: RawFile<'_>) -> Result<Self, DecodeError> {
        let mut palette = Palette::default();
        palette.grow(file.header.number_of_colors as usize);

        let mut ase = Self {
            name,
            header: file.header,
            palette,
            layers: Vec::new(),
            frames: Vec::with_capacity(file.frames.len()),
            tags: Vec::new(),
            slices: Vec::new(),
            tilesets: Vec::new(),
            cel_contents: Vec::new(),
        };

        for (frame_index, raw_frame) in file.frames.into_iter().enumerate() {
            ase.frames.push(Frame {
                duration: raw_frame.duration as u32,
                cels: Vec::new(),
            });
            let mut owner = UserDataOwner::default();
            for chunk in raw_frame.chunks {
                owner = match chunk {
                    Chunk::UserData(user_data) => {
                        ase.attach_user_data(frame_index, owner, user_data)?
                    }
                    Chunk::Layer(chunk) => {
                        ase.push_layer(chunk);
                        UserDataOwner::Layer
                    }
                    Chunk::Cel(chunk) => {
                        ase.push_cel(frame_index, chunk)?;
                        UserDataOwner::Cel
                    }
                    Chunk::Tags(chunk) => {
                        let next = ase.tags.len();
                        ase.push_tags(chunk);
                        UserDataOwner::Tags { next }
                    }
                    Chunk::Palette(chunk) => {
                        ase.apply_palette(&chunk);
                        UserDataOwner::Other(ChunkType::Palette)
                    }
                    Chunk::Slice(chunk) => {
                        ase.push_slice(chunk);
                        UserDataOwner::Slice
                    }
                    Chunk::Tileset(chunk) => {
                        ase.push_tileset(frame_index, chunk)?;
                        UserDataOwner::Other(ChunkType::Tileset)
                    }
                    Chunk::Ignored(chunk_type) => UserDataOwner::Other(chunk_type),
                };
            }
        }

        log::debug!(
            "decoded {:?}: {}x{} {:?}, {} frames, {} layers, {} tags, {} slices, {} tilesets",
            ase.name,
            ase.width(),
            ase.height(),
            ase.color_depth(),
            ase.frames.len(),
            ase.layers.len(),
            ase.tags.len(),
            ase.slices.len(),
            ase.tilesets.len(),
        );
        Ok(ase)
    }

    fn pixel_decoder(&self) -> PixelDecoder<'_> {
        PixelDecoder {
            color_depth: self.header.color_depth,
            palette: &self.palette,
            transparent_index: self.header.transparent_index,
        }
    }

    fn attach_user_data(
        &mut self,
        frame: usize,
        owner: UserDataOwner,
        chunk: UserDataChunk<'_>,
    ) -> Result<UserDataOwner, DecodeError> {
        let missing = || DecodeError::UserDataWithoutOwner {
            frame,
            antecedent: owner.antecedent(),
        };
        let target = match owner {
            UserDataOwner::Cel => self
                .frames
                .last_mut()
                .and_then(|f| f.cels.last_mut())
                .map(|c| &mut c.user_data),
            UserDataOwner::Layer => self.layers.last_mut().map(|l| &mut l.user_data),
            UserDataOwner::Slice => self.slices.last_mut().map(|s| &mut s.user_data),
            UserDataOwner::Tags { next } => self.tags.get_mut(next).map(|t| &mut t.user_data),
            UserDataOwner::Nothing | UserDataOwner::Other(_) => None,
        };
        *target.ok_or_else(missing)? = chunk.into();

        Ok(match owner {
            UserDataOwner::Tags { next } => UserDataOwner::Tags { next: next + 1 },
            owner => owner,
        })
    }

    fn push_layer(&mut self, chunk: LayerChunk<'_>) {
        let kind = match chunk.layer_type {
            LayerType::Image => LayerKind::Image,
            LayerType::Tilemap { tileset_id } => LayerKind::Tilemap { tileset_id },
            LayerType::Unknown(other) => {
                log::warn!("layer {:?} has unknown type {other}, reading it as an image layer", chunk.name);
                LayerKind::Image
            }
        };
        let opacity = if self.header.flags.contains(HeaderFlags::LAYER_OPACITY_VALID) {
            chunk.opacity
        } else {
            u8::MAX
        };
        self.layers.push(Layer {
            name: chunk.name.to_owned(),
            flags: chunk.flags,
            blend_mode: chunk.blend_mode,
            opacity,
            kind,
            user_data: UserData::default(),
        });
    }

    fn push_cel(&mut self, frame: usize, chunk: CelChunk<'_>) -> Result<(), DecodeError> {
        let layer_index = chunk.layer_index as usize;
        if layer_index >= self.layers.len() {
            return Err(DecodeError::LayerIndexOutOfRange {
                frame,
                layer_index,
                layer_count: self.layers.len(),
            });
        }
        let image_error = |source| DecodeError::Image { frame, source };
        let slot = self.frames[frame].cels.len();

        let (content_index, linked_frame) = match chunk.content {
            RawCelContent::Image(image) => {
                let pixel_decoder = self.pixel_decoder();
                let expected = image.pixel_count() * pixel_decoder.color_depth.bytes_per_pixel();
                let img = if image.compressed {
                    let data = inflate(image.data, expected).map_err(image_error)?;
                    pixel_decoder.to_rgba(&data, image.width.into(), image.height.into())
                } else {
                    pixel_decoder.to_rgba(image.data, image.width.into(), image.height.into())
                }
                .map_err(image_error)?;
                self.cel_contents.push(CelContent::Image(img));
                (self.cel_contents.len() - 1, None)
            }
            RawCelContent::LinkedCel { frame_position } => {
                let linked_frame = frame_position as usize;
                let content_index = self
                    .frames
                    .get(linked_frame)
                    .and_then(|f| f.cels.get(slot))
                    .map(|c| c.content_index)
                    .ok_or(DecodeError::LinkedCelNotFound {
                        frame,
                        slot,
                        linked_frame,
                    })?;
                (content_index, Some(linked_frame))
            }
            RawCelContent::CompressedTilemap(tilemap) => {
                let tilemap = decode_tilemap(&tilemap).map_err(image_error)?;
                self.cel_contents.push(CelContent::Tilemap(tilemap));
                (self.cel_contents.len() - 1, None)
            }
        };

        self.frames[frame].cels.push(Cel {
            layer_index,
            x: chunk.x.into(),
            y: chunk.y.into(),
            opacity: chunk.opacity,
            content_index,
            linked_frame,
            user_data: UserData::default(),
        });
        Ok(())
    }

    fn push_tags(&mut self, chunk: TagsChunk<'_>) {
        self.tags.extend(chunk.tags.into_iter().map(|tag| {
            let [red, green, blue] = tag.color;
            Tag {
                name: tag.name.to_owned(),
                from: tag.frames.0 as usize,
                to: tag.frames.1 as usize,
                direction: tag.animation_direction,
                repeat: tag.animation_repeat,
                color: Rgba([red, green, blue, u8::MAX]),
                user_data: UserData::default(),
            }
        }));
    }

    fn apply_palette(&mut self, chunk: &PaletteChunk) {
        self.palette.grow(chunk.palette_size as usize);
        self.palette
            .set_entries(chunk.first_index as usize, &chunk.entries);
    }

    fn push_slice(&mut self, chunk: SliceChunk<'_>) {
        self.slices.push(Slice {
            name: chunk.name.to_owned(),
            flags: chunk.flags,
            keys: chunk.keys,
            user_data: UserData::default(),
        });
    }

    fn push_tileset(&mut self, frame: usize, chunk: TilesetChunk<'_>) -> Result<(), DecodeError> {
        let image_error = |source| DecodeError::Image { frame, source };
        let tile_width = u32::from(chunk.width);
        let strip_height = u32::from(chunk.height)
            .checked_mul(chunk.number_of_tiles)
            .ok_or(image_error(LoadImageError::ImageTooLarge))?;
        let pixel_decoder = self.pixel_decoder();
        let expected = tile_width as usize
            * strip_height as usize
            * pixel_decoder.color_depth.bytes_per_pixel();
        let data = inflate(chunk.compressed_tiles, expected).map_err(image_error)?;
        let pixels = pixel_decoder
            .to_rgba(&data, tile_width, strip_height)
            .map_err(image_error)?;
        self.tilesets.push(Tileset {
            id: chunk.id,
            name: chunk.name.to_owned(),
            tile_width,
            tile_height: chunk.height.into(),
            tile_count: chunk.number_of_tiles,
            pixels,
        });
        Ok(())
    }

    /// Load a aseprite file from a byte slice
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        Self::from_named_bytes(String::new(), data)
    }

    pub fn from_named_bytes(name: impl Into<String>, data: &[u8]) -> Result<Self, DecodeError> {
        let (_, raw_file) = parse_raw_file(data).map_err(|e| DecodeError::from_nom(data, e))?;
        Self::new(name.into(), raw_file)
    }

    /// Read the whole stream, then decode it
    pub fn from_reader(name: impl Into<String>, mut reader: impl Read) -> Result<Self, DecodeError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_named_bytes(name, &data)
    }

    /// Load a file, the document is named after the file stem
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_named_bytes(name, &data)
    }

    pub fn width(&self) -> u32 {
        self.header.width.into()
    }

    pub fn height(&self) -> u32 {
        self.header.height.into()
    }

    pub fn pixel_count(&self) -> usize {
        self.header.width as usize * self.header.height as usize
    }

    pub fn color_depth(&self) -> ColorDepth {
        self.header.color_depth
    }

    /// Only indexed documents have a transparent index
    pub fn transparent_index(&self) -> Option<u8> {
        (self.header.color_depth == ColorDepth::Indexed).then_some(self.header.transparent_index)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Result<&Frame, LookupError> {
        self.frames.get(index).ok_or(LookupError::FrameIndexOutOfRange {
            index,
            count: self.frames.len(),
        })
    }

    pub fn layer_at(&self, index: usize) -> Result<&Layer, LookupError> {
        self.layers.get(index).ok_or(LookupError::LayerIndexOutOfRange {
            index,
            count: self.layers.len(),
        })
    }

    pub fn layer(&self, name: &str) -> Result<&Layer, LookupError> {
        self.layers
            .iter()
            .find(|l| l.name == name)
            .ok_or_else(|| LookupError::MissingLayer {
                name: name.to_owned(),
                available: self.layers.iter().map(Layer::name).join(", "),
            })
    }

    pub fn tag(&self, name: &str) -> Result<&Tag, LookupError> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| LookupError::MissingTag {
                name: name.to_owned(),
                available: self.tags.iter().map(Tag::name).join(", "),
            })
    }

    pub fn slice(&self, name: &str) -> Result<&Slice, LookupError> {
        self.slices
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| LookupError::MissingSlice {
                name: name.to_owned(),
                available: self.slices.iter().map(Slice::name).join(", "),
            })
    }

    pub fn tileset_by_id(&self, id: u32) -> Result<&Tileset, LookupError> {
        self.tilesets
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| LookupError::MissingTilesetId {
                id,
                available: self.tilesets.iter().map(|t| t.id).join(", "),
            })
    }

    pub fn tileset_by_name(&self, name: &str) -> Result<&Tileset, LookupError> {
        self.tilesets
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| LookupError::MissingTilesetName {
                name: name.to_owned(),
                available: self.tilesets.iter().map(|t| t.name.as_str()).join(", "),
            })
    }

    /// Pixels or tiles of a cel, resolved through links
    pub fn cel_content(&self, cel: &Cel) -> Result<&CelContent, LookupError> {
        self.cel_contents
            .get(cel.content_index)
            .ok_or(LookupError::CelContentOutOfRange {
                index: cel.content_index,
                count: self.cel_contents.len(),
            })
    }
}
