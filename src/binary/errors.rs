use nom::{
    error::{ErrorKind, FromExternalError},
    IResult,
};
use thiserror::Error;

use super::scalars::{Byte, Dword, Word};

/// Why a structure in the file was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("invalid file magic number {0:#06x}, expected 0xa5e0")]
    InvalidFileMagic(Word),
    #[error("invalid frame magic number {0:#06x}, expected 0xf1fa")]
    InvalidFrameMagic(Word),
    #[error("unsupported color depth {0}")]
    UnsupportedColorDepth(Word),
    #[error("chunk size {0} is smaller than the chunk header")]
    InvalidChunkSize(Dword),
    #[error("unknown chunk type {0:#06x}")]
    UnknownChunkType(Word),
    #[error("unknown cel type {0}")]
    UnknownCelType(Word),
    #[error("unknown animation direction {0}")]
    UnknownAnimationDirection(Byte),
    #[error("invalid tag frame range {0}..={1}")]
    InvalidFrameRange(Word, Word),
    #[error("invalid palette range {0}..={1}")]
    InvalidPaletteRange(Dword, Dword),
    #[error("invalid bits per tile {0}")]
    InvalidBitsPerTile(Word),
    #[error("tileset {0} links to an external file, which is not supported")]
    ExternalTileset(Dword),
    #[error("tileset {0} does not embed its tiles")]
    MissingTilesetImage(Dword),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("malformed data ({0:?})")]
    Nom(ErrorKind),
}

/// Parse failure at a position of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError<'a> {
    pub input: &'a [u8],
    pub kind: ParseErrorKind,
}

impl<'a> ParseError<'a> {
    pub fn new(input: &'a [u8], kind: ParseErrorKind) -> Self {
        Self { input, kind }
    }
}

impl<'a> nom::error::ParseError<&'a [u8]> for ParseError<'a> {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        let kind = match kind {
            ErrorKind::Eof => ParseErrorKind::UnexpectedEof,
            kind => ParseErrorKind::Nom(kind),
        };
        Self { input, kind }
    }

    fn append(_input: &'a [u8], _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a, E> FromExternalError<&'a [u8], E> for ParseError<'a> {
    fn from_external_error(input: &'a [u8], kind: ErrorKind, _e: E) -> Self {
        Self {
            input,
            kind: ParseErrorKind::Nom(kind),
        }
    }
}

pub type ParseResult<'a, O> = IResult<&'a [u8], O, ParseError<'a>>;

/// Abort parsing with a structural error at `input`
pub fn failure<'a, O>(input: &'a [u8], kind: ParseErrorKind) -> ParseResult<'a, O> {
    Err(nom::Err::Failure(ParseError::new(input, kind)))
}
