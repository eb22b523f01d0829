use bitflags::bitflags;
use nom::bytes::complete::take;

use super::{
    color_depth::ColorDepth,
    errors::{failure, ParseErrorKind, ParseResult},
    scalars::{byte, dword, word, Byte, Dword, Word},
};

/// The header occupies the first 128 bytes of the file
pub const HEADER_SIZE: usize = 128;

const FILE_MAGIC_NUMBER: Word = 0xA5E0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub frames: Word,
    pub width: Word,
    pub height: Word,
    pub color_depth: ColorDepth,
    pub flags: HeaderFlags,
    /// Palette entry which represent transparent color in all
    /// non-background layers (only for indexed sprites).
    pub transparent_index: Byte,
    /// Number of colors (0 means 256 for old sprites)
    pub number_of_colors: Word,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeaderFlags: Dword {
        /// Layer opacity has valid value
        const LAYER_OPACITY_VALID = 1;
    }
}

pub fn parse_header(input: &[u8]) -> ParseResult<'_, Header> {
    let (rest, input) = take(HEADER_SIZE)(input)?;
    // file size, not trusted
    let (input, _) = take(4usize)(input)?;
    let magic_at = input;
    let (input, magic) = word(input)?;
    if magic != FILE_MAGIC_NUMBER {
        return failure(magic_at, ParseErrorKind::InvalidFileMagic(magic));
    }
    let (input, frames) = word(input)?;
    let (input, width) = word(input)?;
    let (input, height) = word(input)?;
    let depth_at = input;
    let (input, depth) = word(input)?;
    let Some(color_depth) = ColorDepth::from_bits(depth) else {
        return failure(depth_at, ParseErrorKind::UnsupportedColorDepth(depth));
    };
    let (input, flags) = dword(input)?;
    let flags = HeaderFlags::from_bits_truncate(flags);
    // speed (deprecated) and two reserved dwords
    let (input, _) = take(2usize + 4 + 4)(input)?;
    let (input, transparent_index) = byte(input)?;
    let (input, _) = take(3usize)(input)?;
    let (_, number_of_colors) = word(input)?;

    Ok((
        rest,
        Header {
            frames,
            width,
            height,
            color_depth,
            flags,
            transparent_index,
            number_of_colors,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(magic: Word, depth: Word) -> Vec<u8> {
        let mut h = vec![0u8; HEADER_SIZE];
        h[4..6].copy_from_slice(&magic.to_le_bytes());
        h[6..8].copy_from_slice(&3u16.to_le_bytes());
        h[8..10].copy_from_slice(&16u16.to_le_bytes());
        h[10..12].copy_from_slice(&8u16.to_le_bytes());
        h[12..14].copy_from_slice(&depth.to_le_bytes());
        h[14..18].copy_from_slice(&1u32.to_le_bytes());
        h[28] = 4;
        h[32..34].copy_from_slice(&32u16.to_le_bytes());
        h
    }

    #[test]
    fn parses_header_fields() {
        let bytes = header_bytes(FILE_MAGIC_NUMBER, 8);
        let (rest, header) = parse_header(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(header.frames, 3);
        assert_eq!((header.width, header.height), (16, 8));
        assert_eq!(header.color_depth, ColorDepth::Indexed);
        assert!(header.flags.contains(HeaderFlags::LAYER_OPACITY_VALID));
        assert_eq!(header.transparent_index, 4);
        assert_eq!(header.number_of_colors, 32);
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = header_bytes(0xE0A5, 32);
        let Err(nom::Err::Failure(e)) = parse_header(&bytes) else {
            panic!("expected failure");
        };
        assert_eq!(e.kind, ParseErrorKind::InvalidFileMagic(0xE0A5));
    }

    #[test]
    fn rejects_unknown_color_depth() {
        let bytes = header_bytes(FILE_MAGIC_NUMBER, 24);
        let Err(nom::Err::Failure(e)) = parse_header(&bytes) else {
            panic!("expected failure");
        };
        assert_eq!(e.kind, ParseErrorKind::UnsupportedColorDepth(24));
    }

    #[test]
    fn truncated_header_is_an_error() {
        let bytes = header_bytes(FILE_MAGIC_NUMBER, 32);
        assert!(parse_header(&bytes[..100]).is_err());
    }
}
