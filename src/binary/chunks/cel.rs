use nom::{bytes::complete::take, combinator::rest};

use crate::binary::{
    errors::{failure, ParseErrorKind, ParseResult},
    image::Image,
    scalars::{byte, dword, short, word, Byte, Dword, Short, Word},
};

#[derive(Debug, Clone, Copy)]
pub struct CelChunk<'a> {
    /// Index into the layers of the file, in the order they were read
    pub layer_index: Word,
    pub x: Short,
    pub y: Short,
    pub opacity: Byte,
    pub content: CelContent<'a>,
}

#[derive(Debug, Clone, Copy)]
pub enum CelContent<'a> {
    /// Raw or compressed pixels
    Image(Image<'a>),
    /// Reuses the cel at the same position of an earlier frame
    LinkedCel { frame_position: Word },
    CompressedTilemap(CompressedTilemap<'a>),
}

#[derive(Debug, Clone, Copy)]
pub struct CompressedTilemap<'a> {
    /// Width in number of tiles
    pub width: Word,
    /// Height in number of tiles
    pub height: Word,
    /// Currently always 32
    pub bits_per_tile: Word,
    pub bitmask_tile_id: Dword,
    pub bitmask_x_flip: Dword,
    pub bitmask_y_flip: Dword,
    pub bitmask_rotation: Dword,
    /// Zlib stream of `width * height` tile records
    pub data: &'a [u8],
}

pub fn parse_cel_chunk(input: &[u8]) -> ParseResult<'_, CelChunk<'_>> {
    let (input, layer_index) = word(input)?;
    let (input, x) = short(input)?;
    let (input, y) = short(input)?;
    let (input, opacity) = byte(input)?;
    let type_at = input;
    let (input, cel_type) = word(input)?;
    // z-index and reserved bytes
    let (input, _) = take(7usize)(input)?;
    let (input, content) = match cel_type {
        0 => parse_image(input, false)?,
        1 => {
            let (input, frame_position) = word(input)?;
            (input, CelContent::LinkedCel { frame_position })
        }
        2 => parse_image(input, true)?,
        3 => parse_compressed_tilemap(input)?,
        other => return failure(type_at, ParseErrorKind::UnknownCelType(other)),
    };
    Ok((
        input,
        CelChunk {
            layer_index,
            x,
            y,
            opacity,
            content,
        },
    ))
}

fn parse_image(input: &[u8], compressed: bool) -> ParseResult<'_, CelContent<'_>> {
    let (input, width) = word(input)?;
    let (input, height) = word(input)?;
    let (input, data) = rest(input)?;
    Ok((
        input,
        CelContent::Image(Image {
            width,
            height,
            data,
            compressed,
        }),
    ))
}

fn parse_compressed_tilemap(input: &[u8]) -> ParseResult<'_, CelContent<'_>> {
    let (input, width) = word(input)?;
    let (input, height) = word(input)?;
    let bits_at = input;
    let (input, bits_per_tile) = word(input)?;
    if !matches!(bits_per_tile, 8 | 16 | 32) {
        return failure(bits_at, ParseErrorKind::InvalidBitsPerTile(bits_per_tile));
    }
    let (input, bitmask_tile_id) = dword(input)?;
    let (input, bitmask_x_flip) = dword(input)?;
    let (input, bitmask_y_flip) = dword(input)?;
    let (input, bitmask_rotation) = dword(input)?;
    let (input, _) = take(10usize)(input)?;
    let (input, data) = rest(input)?;
    Ok((
        input,
        CelContent::CompressedTilemap(CompressedTilemap {
            width,
            height,
            bits_per_tile,
            bitmask_tile_id,
            bitmask_x_flip,
            bitmask_y_flip,
            bitmask_rotation,
            data,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cel_header(cel_type: Word) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&1u16.to_le_bytes());
        b.extend_from_slice(&(-2i16).to_le_bytes());
        b.extend_from_slice(&5i16.to_le_bytes());
        b.push(255);
        b.extend_from_slice(&cel_type.to_le_bytes());
        b.extend_from_slice(&[0; 7]);
        b
    }

    #[test]
    fn raw_image_takes_remaining_bytes() {
        let mut body = cel_header(0);
        body.extend_from_slice(&1u16.to_le_bytes());
        body.extend_from_slice(&2u16.to_le_bytes());
        body.extend_from_slice(&[9; 8]);
        let (_, cel) = parse_cel_chunk(&body).unwrap();
        assert_eq!((cel.layer_index, cel.x, cel.y), (1, -2, 5));
        let CelContent::Image(image) = cel.content else {
            panic!("expected image");
        };
        assert_eq!((image.width, image.height), (1, 2));
        assert!(!image.compressed);
        assert_eq!(image.data, &[9; 8]);
    }

    #[test]
    fn linked_cel_reads_frame_position() {
        let mut body = cel_header(1);
        body.extend_from_slice(&4u16.to_le_bytes());
        let (_, cel) = parse_cel_chunk(&body).unwrap();
        assert!(matches!(
            cel.content,
            CelContent::LinkedCel { frame_position: 4 }
        ));
    }

    #[test]
    fn tilemap_reads_bitmasks() {
        let mut body = cel_header(3);
        body.extend_from_slice(&3u16.to_le_bytes());
        body.extend_from_slice(&2u16.to_le_bytes());
        body.extend_from_slice(&32u16.to_le_bytes());
        for mask in [0x1fff_ffffu32, 0x2000_0000, 0x4000_0000, 0x8000_0000] {
            body.extend_from_slice(&mask.to_le_bytes());
        }
        body.extend_from_slice(&[0; 10]);
        body.extend_from_slice(&[1, 2, 3]);
        let (_, cel) = parse_cel_chunk(&body).unwrap();
        let CelContent::CompressedTilemap(tilemap) = cel.content else {
            panic!("expected tilemap");
        };
        assert_eq!((tilemap.width, tilemap.height), (3, 2));
        assert_eq!(tilemap.bitmask_tile_id, 0x1fff_ffff);
        assert_eq!(tilemap.bitmask_rotation, 0x8000_0000);
        assert_eq!(tilemap.data, &[1, 2, 3]);
    }

    #[test]
    fn unknown_cel_type_is_fatal() {
        let body = cel_header(9);
        let Err(nom::Err::Failure(e)) = parse_cel_chunk(&body) else {
            panic!("expected failure");
        };
        assert_eq!(e.kind, ParseErrorKind::UnknownCelType(9));
    }
}
