use bitflags::bitflags;
use nom::combinator::cond;

use crate::binary::{
    errors::ParseResult,
    scalars::{dword, parse_color, parse_string, Color, Dword},
};

/// Text and color attached to the chunk read before it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserDataChunk<'a> {
    pub text: Option<&'a str>,
    pub color: Option<Color>,
}

bitflags! {
    pub struct UserDataFlags: Dword {
        const HAS_TEXT = 1;
        const HAS_COLOR = 2;
        const HAS_PROPERTIES = 4;
    }
}

pub fn parse_user_data_chunk(input: &[u8]) -> ParseResult<'_, UserDataChunk<'_>> {
    let (input, flags) = dword(input)?;
    let flags = UserDataFlags::from_bits_truncate(flags);
    let (input, text) = cond(flags.contains(UserDataFlags::HAS_TEXT), parse_string)(input)?;
    let (input, color) = cond(flags.contains(UserDataFlags::HAS_COLOR), parse_color)(input)?;
    Ok((input, UserDataChunk { text, color }))
}
