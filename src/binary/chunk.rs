use nom::bytes::complete::take;
use strum_macros::FromRepr;

use super::{
    chunks::{
        cel::{parse_cel_chunk, CelChunk},
        layer::{parse_layer_chunk, LayerChunk},
        palette::{parse_palette_chunk, PaletteChunk},
        slice::{parse_slice_chunk, SliceChunk},
        tags::{parse_tags_chunk, TagsChunk},
        tileset::{parse_tileset_chunk, TilesetChunk},
        user_data::{parse_user_data_chunk, UserDataChunk},
    },
    errors::{failure, ParseErrorKind, ParseResult},
    scalars::{dword, word, Word},
};

/// Size and type fields preceding every chunk body
const CHUNK_HEADER_SIZE: u32 = 6;

#[derive(FromRepr, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ChunkType {
    Palette0004 = 0x0004,
    Palette0011 = 0x0011,
    Layer = 0x2004,
    Cel = 0x2005,
    CelExtra = 0x2006,
    ColorProfile = 0x2007,
    ExternalFiles = 0x2008,
    Mask = 0x2016,
    Path = 0x2017,
    Tags = 0x2018,
    Palette = 0x2019,
    UserData = 0x2020,
    Slice = 0x2022,
    Tileset = 0x2023,
}

#[derive(Debug)]
pub enum Chunk<'a> {
    Layer(LayerChunk<'a>),
    Cel(CelChunk<'a>),
    Tags(TagsChunk<'a>),
    Palette(PaletteChunk),
    Slice(SliceChunk<'a>),
    Tileset(TilesetChunk<'a>),
    UserData(UserDataChunk<'a>),
    /// Known chunk whose content is not needed, body left unread
    Ignored(ChunkType),
}

impl Chunk<'_> {
    pub fn chunk_type(&self) -> ChunkType {
        match self {
            Chunk::Layer(_) => ChunkType::Layer,
            Chunk::Cel(_) => ChunkType::Cel,
            Chunk::Tags(_) => ChunkType::Tags,
            Chunk::Palette(_) => ChunkType::Palette,
            Chunk::Slice(_) => ChunkType::Slice,
            Chunk::Tileset(_) => ChunkType::Tileset,
            Chunk::UserData(_) => ChunkType::UserData,
            Chunk::Ignored(chunk_type) => *chunk_type,
        }
    }

    pub fn is_user_data(&self) -> bool {
        matches!(self, Chunk::UserData(_))
    }
}

pub fn parse_chunks(input: &[u8], chunk_count: usize) -> ParseResult<'_, Vec<Chunk<'_>>> {
    let mut chunks = Vec::with_capacity(chunk_count.min(1024));
    let mut input = input;
    for _ in 0..chunk_count {
        let (rest, chunk) = parse_chunk(input)?;
        chunks.push(chunk);
        input = rest;
    }
    Ok((input, chunks))
}

pub fn parse_chunk(input: &[u8]) -> ParseResult<'_, Chunk<'_>> {
    let size_at = input;
    let (input, size) = dword(input)?;
    if size < CHUNK_HEADER_SIZE {
        return failure(size_at, ParseErrorKind::InvalidChunkSize(size));
    }
    let type_at = input;
    let (input, raw_type) = word(input)?;
    let Some(chunk_type) = ChunkType::from_repr(raw_type) else {
        return failure(type_at, ParseErrorKind::UnknownChunkType(raw_type));
    };
    let (rest, body) = take(size - CHUNK_HEADER_SIZE)(input)?;
    log::trace!("chunk {chunk_type:?} ({size} bytes)");

    let (_, chunk) = match chunk_type {
        ChunkType::Layer => parse_layer_chunk(body).map(|(i, c)| (i, Chunk::Layer(c)))?,
        ChunkType::Cel => parse_cel_chunk(body).map(|(i, c)| (i, Chunk::Cel(c)))?,
        ChunkType::Tags => parse_tags_chunk(body).map(|(i, c)| (i, Chunk::Tags(c)))?,
        ChunkType::Palette => parse_palette_chunk(body).map(|(i, c)| (i, Chunk::Palette(c)))?,
        ChunkType::Slice => parse_slice_chunk(body).map(|(i, c)| (i, Chunk::Slice(c)))?,
        ChunkType::Tileset => parse_tileset_chunk(body).map(|(i, c)| (i, Chunk::Tileset(c)))?,
        ChunkType::UserData => {
            parse_user_data_chunk(body).map(|(i, c)| (i, Chunk::UserData(c)))?
        }
        ChunkType::Palette0004
        | ChunkType::Palette0011
        | ChunkType::CelExtra
        | ChunkType::ColorProfile
        | ChunkType::ExternalFiles
        | ChunkType::Mask
        | ChunkType::Path => {
            log::debug!("skipping {chunk_type:?} chunk ({} bytes)", body.len());
            (body, Chunk::Ignored(chunk_type))
        }
    };
    Ok((rest, chunk))
}
