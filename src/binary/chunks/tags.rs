use nom::{bytes::complete::take, multi::count};
use strum_macros::FromRepr;

use crate::binary::{
    errors::{failure, ParseErrorKind, ParseResult},
    scalars::{byte, parse_string, word, Byte, Word},
};

#[derive(Debug)]
/// After the tags chunk, you can write one user data chunk for each tag. E.g. if there are 10 tags, you can then write 10 user data chunks one for each tag.
pub struct TagsChunk<'a> {
    pub tags: Vec<TagChunk<'a>>,
}

/// A tag in the file
/// This is a range of frames over the frames in the file, ordered by frame index
#[derive(Debug, Clone, Copy)]
pub struct TagChunk<'a> {
    /// Both Inclusive
    pub frames: (Word, Word),
    pub animation_direction: AnimationDirection,
    /// Repeat N times. Play this animation section N times:
    ///   0 = Doesn't specify (plays infinite in UI, once on export,
    ///       for ping-pong it plays once in each direction)
    ///   1 = Plays once (for ping-pong, it plays just in one direction)
    ///   2 = Plays twice (for ping-pong, it plays once in one direction,
    ///       and once in reverse)
    ///   n = Plays N times
    pub animation_repeat: Word,
    /// Tag color, alpha is always opaque
    pub color: [Byte; 3],
    pub name: &'a str,
}

#[derive(FromRepr, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AnimationDirection {
    Forward = 0,
    Reverse = 1,
    PingPong = 2,
}

pub fn parse_tags_chunk(input: &[u8]) -> ParseResult<'_, TagsChunk<'_>> {
    let (input, number_of_tags) = word(input)?;
    let (input, _) = take(8usize)(input)?;
    let (input, tags) = count(parse_tag, number_of_tags.into())(input)?;
    Ok((input, TagsChunk { tags }))
}

pub fn parse_tag(input: &[u8]) -> ParseResult<'_, TagChunk<'_>> {
    let range_at = input;
    let (input, from_frame) = word(input)?;
    let (input, to_frame) = word(input)?;
    if from_frame > to_frame {
        return failure(
            range_at,
            ParseErrorKind::InvalidFrameRange(from_frame, to_frame),
        );
    }
    let direction_at = input;
    let (input, direction) = byte(input)?;
    let Some(animation_direction) = AnimationDirection::from_repr(direction) else {
        return failure(
            direction_at,
            ParseErrorKind::UnknownAnimationDirection(direction),
        );
    };
    let (input, animation_repeat) = word(input)?;
    let (input, _) = take(6usize)(input)?;
    let (input, red) = byte(input)?;
    let (input, green) = byte(input)?;
    let (input, blue) = byte(input)?;
    let (input, _) = byte(input)?;
    let (input, name) = parse_string(input)?;
    Ok((
        input,
        TagChunk {
            frames: (from_frame, to_frame),
            animation_direction,
            animation_repeat,
            color: [red, green, blue],
            name,
        },
    ))
}
