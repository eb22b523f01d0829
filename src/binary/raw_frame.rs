use nom::bytes::complete::take;

use super::{
    chunk::{parse_chunks, Chunk},
    errors::{failure, ParseErrorKind, ParseResult},
    scalars::{dword, word, Dword, Word},
};

#[derive(Debug)]
pub struct RawFrame<'a> {
    /// Frame duration in milliseconds
    pub duration: Word,
    pub chunks: Vec<Chunk<'a>>,
}

const FRAME_MAGIC_NUMBER: Word = 0xF1FA;

/// Old chunk count field value telling to read the new one instead
const CHUNK_COUNT_ESCAPE: Word = 0xFFFF;

/// Number of chunks in a frame, the dword field only takes over when the
/// word field overflowed
pub fn chunk_count(old: Word, new: Dword) -> usize {
    if old == CHUNK_COUNT_ESCAPE && Dword::from(old) < new {
        new as usize
    } else {
        old as usize
    }
}

pub fn parse_rawframe(input: &[u8]) -> ParseResult<'_, RawFrame<'_>> {
    // frame size in bytes, chunks are read one after the other instead
    let (input, _) = take(4usize)(input)?;
    let magic_at = input;
    let (input, magic) = word(input)?;
    if magic != FRAME_MAGIC_NUMBER {
        return failure(magic_at, ParseErrorKind::InvalidFrameMagic(magic));
    }
    let (input, old_chunk_count) = word(input)?;
    let (input, duration) = word(input)?;
    let (input, _) = take(2usize)(input)?;
    let (input, new_chunk_count) = dword(input)?;
    let (input, chunks) = parse_chunks(input, chunk_count(old_chunk_count, new_chunk_count))?;
    Ok((input, RawFrame { duration, chunks }))
}
