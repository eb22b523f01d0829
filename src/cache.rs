//! On-disk cache of decoded textures and packed atlases.
//!
//! Every record is written field by field, little-endian: strings are a u16
//! byte length followed by UTF-8, counts and numbers are u32. Reading expects
//! fields in exactly the order they were written.

use std::io::Write;

use image::RgbaImage;
use nom::{bytes::complete::take, multi::count, Offset};
use thiserror::Error;

use crate::{
    binary::{
        errors::{ParseError, ParseErrorKind, ParseResult},
        scalars::{byte, dword, parse_string},
    },
    output::{AnimFrame, AnimationCycle, AtlasRegion, PackedAtlas},
};

pub const TEXTURE_MAGIC: &[u8; 3] = b"AST";
pub const ATLAS_MAGIC: &[u8; 3] = b"ASA";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to write cache: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache is malformed at byte {offset}: {kind}")]
    Parse { offset: usize, kind: ParseErrorKind },
    #[error("expected magic {expected:?}, found {found:?}")]
    BadMagic { expected: [u8; 3], found: Vec<u8> },
    #[error("name of {0} bytes does not fit a cache record")]
    StringTooLong(usize),
    #[error("{name:?} is {width}x{height} but holds {actual} pixel bytes")]
    PixelLength {
        name: String,
        width: u32,
        height: u32,
        actual: usize,
    },
    #[error("value {0} does not fit a cache record")]
    ValueTooLarge(usize),
}

impl CacheError {
    fn from_nom(data: &[u8], e: nom::Err<ParseError<'_>>) -> Self {
        match e {
            nom::Err::Error(e) | nom::Err::Failure(e) => CacheError::Parse {
                offset: data.offset(e.input),
                kind: e.kind,
            },
            nom::Err::Incomplete(_) => CacheError::Parse {
                offset: data.len(),
                kind: ParseErrorKind::UnexpectedEof,
            },
        }
    }
}

/// A single decoded image and the name it is cached under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTexture {
    pub name: String,
    pub image: RgbaImage,
}

fn write_u32(w: &mut impl Write, value: usize) -> Result<(), CacheError> {
    let value = u32::try_from(value).map_err(|_| CacheError::ValueTooLarge(value))?;
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_string(w: &mut impl Write, s: &str) -> Result<(), CacheError> {
    let len = u16::try_from(s.len()).map_err(|_| CacheError::StringTooLong(s.len()))?;
    w.write_all(&len.to_le_bytes())?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn write_image(w: &mut impl Write, name: &str, image: &RgbaImage) -> Result<(), CacheError> {
    write_string(w, name)?;
    write_u32(w, image.width() as usize)?;
    write_u32(w, image.height() as usize)?;
    write_u32(w, image.as_raw().len())?;
    w.write_all(image.as_raw())?;
    Ok(())
}

pub fn write_texture(w: &mut impl Write, name: &str, image: &RgbaImage) -> Result<(), CacheError> {
    w.write_all(TEXTURE_MAGIC)?;
    write_image(w, name, image)
}

pub fn write_atlas(w: &mut impl Write, atlas: &PackedAtlas) -> Result<(), CacheError> {
    w.write_all(ATLAS_MAGIC)?;
    write_image(w, &atlas.name, &atlas.image)?;

    write_u32(w, atlas.regions.len())?;
    for region in &atlas.regions {
        write_string(w, &region.name)?;
        for value in [
            region.frame_index,
            region.x as usize,
            region.y as usize,
            region.width as usize,
            region.height as usize,
            region.duration as usize,
        ] {
            write_u32(w, value)?;
        }
    }

    write_u32(w, atlas.cycles.len())?;
    for cycle in &atlas.cycles {
        write_string(w, &cycle.name)?;
        w.write_all(&[
            cycle.is_looping.into(),
            cycle.is_reversed.into(),
            cycle.is_ping_pong.into(),
        ])?;
        write_u32(w, cycle.frames.len())?;
        for frame in &cycle.frames {
            write_u32(w, frame.frame_index)?;
            write_u32(w, frame.duration as usize)?;
        }
    }
    Ok(())
}

fn check_magic<'a>(data: &'a [u8], expected: &[u8; 3]) -> Result<&'a [u8], CacheError> {
    match data.split_first_chunk::<3>() {
        Some((found, rest)) if found == expected => Ok(rest),
        _ => Err(CacheError::BadMagic {
            expected: *expected,
            found: data.iter().take(3).copied().collect(),
        }),
    }
}

struct RawImage<'a> {
    name: &'a str,
    width: u32,
    height: u32,
    pixels: &'a [u8],
}

impl RawImage<'_> {
    fn into_texture(self) -> Result<CachedTexture, CacheError> {
        let RawImage {
            name,
            width,
            height,
            pixels,
        } = self;
        let expected = width as usize * height as usize * 4;
        let image = (expected == pixels.len())
            .then(|| RgbaImage::from_raw(width, height, pixels.to_vec()))
            .flatten()
            .ok_or_else(|| CacheError::PixelLength {
                name: name.to_owned(),
                width,
                height,
                actual: pixels.len(),
            })?;
        Ok(CachedTexture {
            name: name.to_owned(),
            image,
        })
    }
}

fn parse_image(input: &[u8]) -> ParseResult<'_, RawImage<'_>> {
    let (input, name) = parse_string(input)?;
    let (input, width) = dword(input)?;
    let (input, height) = dword(input)?;
    let (input, len) = dword(input)?;
    let (input, pixels) = take(len)(input)?;
    Ok((
        input,
        RawImage {
            name,
            width,
            height,
            pixels,
        },
    ))
}

fn parse_region(input: &[u8]) -> ParseResult<'_, AtlasRegion> {
    let (input, name) = parse_string(input)?;
    let (input, frame_index) = dword(input)?;
    let (input, x) = dword(input)?;
    let (input, y) = dword(input)?;
    let (input, width) = dword(input)?;
    let (input, height) = dword(input)?;
    let (input, duration) = dword(input)?;
    Ok((
        input,
        AtlasRegion {
            name: name.to_owned(),
            frame_index: frame_index as usize,
            x,
            y,
            width,
            height,
            duration,
        },
    ))
}

fn parse_anim_frame(input: &[u8]) -> ParseResult<'_, AnimFrame> {
    let (input, frame_index) = dword(input)?;
    let (input, duration) = dword(input)?;
    Ok((
        input,
        AnimFrame {
            frame_index: frame_index as usize,
            duration,
        },
    ))
}

fn parse_cycle(input: &[u8]) -> ParseResult<'_, AnimationCycle> {
    let (input, name) = parse_string(input)?;
    let (input, is_looping) = byte(input)?;
    let (input, is_reversed) = byte(input)?;
    let (input, is_ping_pong) = byte(input)?;
    let (input, frame_count) = dword(input)?;
    let (input, frames) = count(parse_anim_frame, frame_count as usize)(input)?;
    Ok((
        input,
        AnimationCycle {
            name: name.to_owned(),
            frames,
            is_looping: is_looping != 0,
            is_reversed: is_reversed != 0,
            is_ping_pong: is_ping_pong != 0,
        },
    ))
}

fn parse_counted<'a, O>(
    input: &'a [u8],
    item: fn(&'a [u8]) -> ParseResult<'a, O>,
) -> ParseResult<'a, Vec<O>> {
    let (input, n) = dword(input)?;
    let mut items = Vec::with_capacity((n as usize).min(1024));
    let mut input = input;
    for _ in 0..n {
        let (rest, value) = item(input)?;
        items.push(value);
        input = rest;
    }
    Ok((input, items))
}

type AtlasBody<'a> = (RawImage<'a>, Vec<AtlasRegion>, Vec<AnimationCycle>);

fn parse_atlas_body(input: &[u8]) -> ParseResult<'_, AtlasBody<'_>> {
    let (input, raw) = parse_image(input)?;
    let (input, regions) = parse_counted(input, parse_region)?;
    let (input, cycles) = parse_counted(input, parse_cycle)?;
    Ok((input, (raw, regions, cycles)))
}

pub fn read_texture(data: &[u8]) -> Result<CachedTexture, CacheError> {
    let body = check_magic(data, TEXTURE_MAGIC)?;
    let (_, raw) = parse_image(body).map_err(|e| CacheError::from_nom(data, e))?;
    raw.into_texture()
}

pub fn read_atlas(data: &[u8]) -> Result<PackedAtlas, CacheError> {
    let body = check_magic(data, ATLAS_MAGIC)?;
    let (_, (raw, regions, cycles)) =
        parse_atlas_body(body).map_err(|e| CacheError::from_nom(data, e))?;
    let texture = raw.into_texture()?;
    Ok(PackedAtlas {
        name: texture.name,
        image: texture.image,
        regions,
        cycles,
    })
}
