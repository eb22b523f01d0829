use bitflags::bitflags;
use nom::{bytes::complete::take, combinator::cond, multi::count};

use crate::binary::{
    errors::ParseResult,
    scalars::{dword, long, parse_rect, parse_string, Dword, Long, Rect},
};

#[derive(Debug, Clone)]
pub struct SliceChunk<'a> {
    pub flags: SliceFlags,
    pub name: &'a str,
    pub keys: Vec<SliceKey>,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SliceFlags: Dword {
        /// It's a 9-patches slice
        const NINE_PATCH = 1;
        /// Has pivot information
        const PIVOT = 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceKey {
    /// Frame number from which this key is valid, until the next key
    pub start_frame: Dword,
    pub bounds: Rect,
    /// 9-patch center, relative to `bounds`
    pub center: Option<Rect>,
    /// Pivot, relative to the origin of `bounds`
    pub pivot: Option<(Long, Long)>,
}

pub fn parse_slice_chunk(input: &[u8]) -> ParseResult<'_, SliceChunk<'_>> {
    let (input, number_of_keys) = dword(input)?;
    let (input, flags) = dword(input)?;
    let flags = SliceFlags::from_bits_truncate(flags);
    let (input, _) = take(4usize)(input)?;
    let (input, name) = parse_string(input)?;
    let (input, keys) = count(
        |input| parse_slice_key(input, flags),
        number_of_keys as usize,
    )(input)?;
    Ok((input, SliceChunk { flags, name, keys }))
}

fn parse_slice_key(input: &[u8], flags: SliceFlags) -> ParseResult<'_, SliceKey> {
    let (input, start_frame) = dword(input)?;
    let (input, bounds) = parse_rect(input)?;
    let (input, center) = cond(flags.contains(SliceFlags::NINE_PATCH), parse_rect)(input)?;
    let (input, pivot) = cond(flags.contains(SliceFlags::PIVOT), parse_pivot)(input)?;
    Ok((
        input,
        SliceKey {
            start_frame,
            bounds,
            center,
            pivot,
        },
    ))
}

fn parse_pivot(input: &[u8]) -> ParseResult<'_, (Long, Long)> {
    let (input, x) = long(input)?;
    let (input, y) = long(input)?;
    Ok((input, (x, y)))
}
