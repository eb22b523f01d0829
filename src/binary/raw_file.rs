use nom::multi::count;

use super::{
    errors::ParseResult,
    header::{parse_header, Header},
    raw_frame::{parse_rawframe, RawFrame},
};

/// The file as it is laid out on disk, chunks not interpreted yet
#[derive(Debug)]
pub struct RawFile<'a> {
    pub header: Header,
    pub frames: Vec<RawFrame<'a>>,
}

pub fn parse_raw_file(input: &[u8]) -> ParseResult<'_, RawFile<'_>> {
    let (input, header) = parse_header(input)?;
    let (input, frames) = count(parse_rawframe, header.frames.into())(input)?;
    Ok((input, RawFile { header, frames }))
}
