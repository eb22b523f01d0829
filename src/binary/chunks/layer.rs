use bitflags::bitflags;
use nom::{bytes::complete::take, combinator::cond};

use crate::binary::{
    errors::ParseResult,
    scalars::{byte, dword, parse_string, word, Byte, Dword, Word},
};

#[derive(Debug, Clone, Copy)]
pub struct LayerChunk<'a> {
    pub flags: LayerFlags,
    pub layer_type: LayerType,
    pub blend_mode: Word,
    /// Only meaningful if the header says layer opacity is valid
    pub opacity: Byte,
    pub name: &'a str,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LayerFlags: Word {
        const VISIBLE = 1;
        const EDITABLE = 2;
        const LOCK_MOVEMENT = 4;
        const BACKGROUND = 8;
        const PREFER_LINKED_CELS = 16;
        const COLLAPSED = 32;
        const REFERENCE = 64;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    /// Normal image layer, groups are read as image layers too
    Image,
    Tilemap { tileset_id: Dword },
    Unknown(Word),
}

pub fn parse_layer_chunk(input: &[u8]) -> ParseResult<'_, LayerChunk<'_>> {
    let (input, flags) = word(input)?;
    let flags = LayerFlags::from_bits_truncate(flags);
    let (input, layer_type) = word(input)?;
    // child level, default width and height
    let (input, _) = take(6usize)(input)?;
    let (input, blend_mode) = word(input)?;
    let (input, opacity) = byte(input)?;
    let (input, _) = take(3usize)(input)?;
    let (input, name) = parse_string(input)?;
    let (input, tileset_id) = cond(layer_type == 2, dword)(input)?;
    let layer_type = match (layer_type, tileset_id) {
        (0 | 1, _) => LayerType::Image,
        (2, Some(tileset_id)) => LayerType::Tilemap { tileset_id },
        (other, _) => LayerType::Unknown(other),
    };
    Ok((
        input,
        LayerChunk {
            flags,
            layer_type,
            blend_mode,
            opacity,
            name,
        },
    ))
}
