use bitflags::bitflags;
use nom::{bytes::complete::take, combinator::cond, multi::count};

use crate::binary::{
    errors::{failure, ParseErrorKind, ParseResult},
    scalars::{dword, parse_color, parse_string, word, Color, Dword, Word},
};

#[derive(Debug)]
pub struct PaletteChunk {
    /// New palette size (total number of entries)
    pub palette_size: Dword,
    pub first_index: Dword,
    pub entries: Vec<Color>,
}

bitflags! {
    pub struct PaletteEntryFlags: Word {
        const HAS_NAME = 0x1;
    }
}

/// Largest palette a file can declare, the header stores its size in a word
pub const MAX_PALETTE_SIZE: Dword = 1 << 16;

pub fn parse_palette_chunk(input: &[u8]) -> ParseResult<'_, PaletteChunk> {
    let size_at = input;
    let (input, palette_size) = dword(input)?;
    if palette_size > MAX_PALETTE_SIZE {
        return failure(
            size_at,
            ParseErrorKind::InvalidPaletteRange(0, palette_size),
        );
    }
    let range_at = input;
    let (input, first_index) = dword(input)?;
    let (input, last_index) = dword(input)?;
    if last_index < first_index || last_index >= palette_size {
        return failure(
            range_at,
            ParseErrorKind::InvalidPaletteRange(first_index, last_index),
        );
    }
    let (input, _) = take(8usize)(input)?;
    let entry_count = (last_index - first_index) as usize + 1;
    let (input, entries) = count(parse_palette_entry, entry_count)(input)?;
    Ok((
        input,
        PaletteChunk {
            palette_size,
            first_index,
            entries,
        },
    ))
}

pub fn parse_palette_entry(input: &[u8]) -> ParseResult<'_, Color> {
    let (input, flags) = word(input)?;
    let flags = PaletteEntryFlags::from_bits_truncate(flags);
    let (input, color) = parse_color(input)?;
    // entry names are not kept
    let (input, _) = cond(flags.contains(PaletteEntryFlags::HAS_NAME), parse_string)(input)?;
    Ok((input, color))
}
