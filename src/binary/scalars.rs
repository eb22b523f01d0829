use nom::{
    bytes::complete::take,
    combinator::map_res,
    number::complete::{le_i16, le_i32, le_u16, le_u32, le_u8},
};

use super::errors::ParseResult;

pub type Byte = u8;
pub type Word = u16;
pub type Short = i16;
pub type Dword = u32;
pub type Long = i32;

pub fn byte(input: &[u8]) -> ParseResult<'_, Byte> {
    le_u8(input)
}

pub fn word(input: &[u8]) -> ParseResult<'_, Word> {
    le_u16(input)
}

pub fn short(input: &[u8]) -> ParseResult<'_, Short> {
    le_i16(input)
}

pub fn dword(input: &[u8]) -> ParseResult<'_, Dword> {
    le_u32(input)
}

pub fn long(input: &[u8]) -> ParseResult<'_, Long> {
    le_i32(input)
}

/// WORD length followed by that many bytes of UTF-8, no terminator
pub fn parse_string(input: &[u8]) -> ParseResult<'_, &str> {
    let (input, len) = word(input)?;
    map_res(take(len), std::str::from_utf8)(input)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub red: Byte,
    pub green: Byte,
    pub blue: Byte,
    pub alpha: Byte,
}

impl From<Color> for image::Rgba<u8> {
    fn from(c: Color) -> Self {
        image::Rgba([c.red, c.green, c.blue, c.alpha])
    }
}

pub fn parse_color(input: &[u8]) -> ParseResult<'_, Color> {
    let (input, red) = byte(input)?;
    let (input, green) = byte(input)?;
    let (input, blue) = byte(input)?;
    let (input, alpha) = byte(input)?;
    Ok((
        input,
        Color {
            red,
            green,
            blue,
            alpha,
        },
    ))
}

/// Rectangle in canvas coordinates, origin can be negative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: Long,
    pub y: Long,
    pub width: Dword,
    pub height: Dword,
}

pub fn parse_rect(input: &[u8]) -> ParseResult<'_, Rect> {
    let (input, x) = long(input)?;
    let (input, y) = long(input)?;
    let (input, width) = dword(input)?;
    let (input, height) = dword(input)?;
    Ok((
        input,
        Rect {
            x,
            y,
            width,
            height,
        },
    ))
}
