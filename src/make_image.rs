use std::{borrow::Cow, io::Read, ops::Deref};

use image::{ImageBuffer, Rgba, RgbaImage};
use thiserror::Error;

use crate::{
    binary::{
        chunks::cel::CompressedTilemap, color_depth::ColorDepth, palette::Palette,
    },
    loader::{Document, LookupError},
    wrappers::{Cel, CelContent, PixelExt, Tile, Tilemap},
};

/// Zlib header bytes in front of the DEFLATE stream
const ZLIB_HEADER_SIZE: usize = 2;

#[derive(Error, Debug)]
pub enum LoadImageError {
    #[error("decompression failed: {0}")]
    DecompressError(std::io::Error),
    #[error("compressed data is missing its zlib header")]
    MissingZlibHeader,
    #[error("invalid image data: expected {expected} bytes, got {actual}")]
    InvalidImageData { expected: usize, actual: usize },
    #[error("image dimensions overflow")]
    ImageTooLarge,
    #[error("palette index {index} out of range, the palette has {len} colors")]
    PaletteIndexOutOfRange { index: u8, len: usize },
    #[error("tilemap cel on layer {0} which has no tileset")]
    TilemapWithoutTileset(usize),
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Turns stored pixels into RGBA for one color depth
#[derive(Debug, Clone, Copy)]
pub struct PixelDecoder<'a> {
    pub color_depth: ColorDepth,
    pub palette: &'a Palette,
    pub transparent_index: u8,
}

impl PixelDecoder<'_> {
    /// Extra bytes after `width * height` pixels are ignored
    pub fn to_rgba(&self, data: &[u8], width: u32, height: u32) -> Result<RgbaImage, LoadImageError> {
        let pixel_count = width as usize * height as usize;
        let expected = pixel_count * self.color_depth.bytes_per_pixel();
        let data = data.get(..expected).ok_or(LoadImageError::InvalidImageData {
            expected,
            actual: data.len(),
        })?;

        let mut pixels = Vec::with_capacity(pixel_count * 4);
        match self.color_depth {
            ColorDepth::Rgba => pixels.extend_from_slice(data),
            ColorDepth::Grayscale => {
                for px in data.chunks_exact(2) {
                    pixels.extend_from_slice(&[px[0], px[0], px[0], px[1]]);
                }
            }
            ColorDepth::Indexed => {
                for &index in data {
                    let color = if index == self.transparent_index {
                        Rgba::zeroed()
                    } else {
                        self.palette.get(index.into()).ok_or(
                            LoadImageError::PaletteIndexOutOfRange {
                                index,
                                len: self.palette.len(),
                            },
                        )?
                    };
                    pixels.extend_from_slice(&color.0);
                }
            }
        }

        RgbaImage::from_raw(width, height, pixels).ok_or(LoadImageError::ImageTooLarge)
    }
}

/// Decompress a zlib-framed DEFLATE stream holding at least `expected_len` bytes
pub fn inflate(data: &[u8], expected_len: usize) -> Result<Vec<u8>, LoadImageError> {
    let deflate = data
        .get(ZLIB_HEADER_SIZE..)
        .ok_or(LoadImageError::MissingZlibHeader)?;
    let mut out = Vec::with_capacity(expected_len.min(1 << 24));
    flate2::read::DeflateDecoder::new(deflate)
        .take(expected_len as u64)
        .read_to_end(&mut out)
        .map_err(LoadImageError::DecompressError)?;
    if out.len() < expected_len {
        return Err(LoadImageError::InvalidImageData {
            expected: expected_len,
            actual: out.len(),
        });
    }
    Ok(out)
}

pub fn decode_tilemap(tilemap: &CompressedTilemap<'_>) -> Result<Tilemap, LoadImageError> {
    let tile_count = tilemap.width as usize * tilemap.height as usize;
    let bytes_per_tile = tilemap.bits_per_tile as usize / 8;
    let data = inflate(tilemap.data, tile_count * bytes_per_tile)?;
    let tiles = data
        .chunks_exact(bytes_per_tile)
        .take(tile_count)
        .map(|record| {
            let value = record
                .iter()
                .rev()
                .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
            Tile {
                id: value & tilemap.bitmask_tile_id,
                x_flip: value & tilemap.bitmask_x_flip,
                y_flip: value & tilemap.bitmask_y_flip,
                rotation: value & tilemap.bitmask_rotation,
            }
        })
        .collect();
    Ok(Tilemap {
        width: tilemap.width.into(),
        height: tilemap.height.into(),
        tiles,
    })
}

/// Which cels take part when flattening a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlattenOptions {
    pub only_visible_layers: bool,
    pub include_background_layer: bool,
    pub include_tilemap_layers: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            only_visible_layers: true,
            include_background_layer: true,
            include_tilemap_layers: true,
        }
    }
}

/// Copy every non-transparent pixel of `source` onto `target` at (x, y), clipped
fn paint<C>(target: &mut RgbaImage, source: &ImageBuffer<Rgba<u8>, C>, x: i64, y: i64)
where
    C: Deref<Target = [u8]>,
{
    let (width, height) = (i64::from(target.width()), i64::from(target.height()));
    for (sx, sy, pixel) in source.enumerate_pixels() {
        if pixel.a() == 0 {
            continue;
        }
        let (tx, ty) = (x + i64::from(sx), y + i64::from(sy));
        if tx < 0 || ty < 0 || tx >= width || ty >= height {
            continue;
        }
        target.put_pixel(tx as u32, ty as u32, *pixel);
    }
}

impl Document {
    /// Pixels of a cel at its own size, tilemaps are expanded with their tileset
    pub fn cel_image(&self, cel: &Cel) -> Result<Cow<'_, RgbaImage>, LoadImageError> {
        let tilemap = match self.cel_content(cel)? {
            CelContent::Image(img) => return Ok(Cow::Borrowed(img)),
            CelContent::Tilemap(tilemap) => tilemap,
        };
        let tileset_id = self
            .layer_at(cel.layer_index)?
            .tileset_id()
            .ok_or(LoadImageError::TilemapWithoutTileset(cel.layer_index))?;
        let tileset = self.tileset_by_id(tileset_id)?;

        let width = tilemap
            .width
            .checked_mul(tileset.tile_width)
            .ok_or(LoadImageError::ImageTooLarge)?;
        let height = tilemap
            .height
            .checked_mul(tileset.tile_height)
            .ok_or(LoadImageError::ImageTooLarge)?;
        let mut pixels = RgbaImage::new(width, height);
        for (column, row, tile) in tilemap.iter_tiles() {
            let Some(tile_image) = tileset.tile(tile.id) else {
                log::warn!(
                    "tile id {} outside tileset {} ({} tiles)",
                    tile.id,
                    tileset.id,
                    tileset.tile_count
                );
                continue;
            };
            paint(
                &mut pixels,
                &tile_image,
                i64::from(column * tileset.tile_width),
                i64::from(row * tileset.tile_height),
            );
        }
        Ok(Cow::Owned(pixels))
    }

    /// Combine the cels of a frame into one canvas sized image.
    ///
    /// Cels are painted bottom to top, a non-transparent pixel replaces what
    /// is under it.
    pub fn flatten_frame(
        &self,
        frame_index: usize,
        options: &FlattenOptions,
    ) -> Result<RgbaImage, LoadImageError> {
        let frame = self.frame(frame_index)?;
        let mut pixels = RgbaImage::new(self.width(), self.height());

        for cel in frame.iter_cels() {
            let layer = self.layer_at(cel.layer_index())?;
            if options.only_visible_layers && !layer.visible() {
                continue;
            }
            if layer.is_background() && !options.include_background_layer {
                continue;
            }
            if self.cel_content(cel)?.is_tilemap() && !options.include_tilemap_layers {
                continue;
            }
            let img = self.cel_image(cel)?;
            paint(&mut pixels, &*img, cel.x.into(), cel.y.into());
        }

        Ok(pixels)
    }

    /// Flatten every frame in order
    pub fn flatten_frames(&self, options: &FlattenOptions) -> Result<Vec<RgbaImage>, LoadImageError> {
        (0..self.frames.len())
            .map(|i| self.flatten_frame(i, options))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut e = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        e.write_all(data).unwrap();
        e.finish().unwrap()
    }

    #[test]
    fn indexed_uses_palette_and_transparent_index() {
        let palette = Palette {
            colors: vec![Rgba([0, 0, 0, 0]), Rgba([255, 0, 0, 255]), Rgba([0, 0, 255, 255])],
        };
        let decoder = PixelDecoder {
            color_depth: ColorDepth::Indexed,
            palette: &palette,
            transparent_index: 2,
        };
        let img = decoder.to_rgba(&[1, 2], 2, 1).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(img.get_pixel(1, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn indexed_out_of_palette_is_an_error() {
        let palette = Palette::default();
        let decoder = PixelDecoder {
            color_depth: ColorDepth::Indexed,
            palette: &palette,
            transparent_index: 0,
        };
        assert!(matches!(
            decoder.to_rgba(&[5], 1, 1),
            Err(LoadImageError::PaletteIndexOutOfRange { index: 5, len: 0 })
        ));
    }

    #[test]
    fn grayscale_expands_to_rgba() {
        let palette = Palette::default();
        let decoder = PixelDecoder {
            color_depth: ColorDepth::Grayscale,
            palette: &palette,
            transparent_index: 0,
        };
        let img = decoder.to_rgba(&[80, 200, 10, 0], 1, 2).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgba([80, 80, 80, 200]));
        assert_eq!(img.get_pixel(0, 1), &Rgba([10, 10, 10, 0]));
    }

    #[test]
    fn rgba_is_copied_and_short_data_rejected() {
        let palette = Palette::default();
        let decoder = PixelDecoder {
            color_depth: ColorDepth::Rgba,
            palette: &palette,
            transparent_index: 0,
        };
        let img = decoder.to_rgba(&[1, 2, 3, 4], 1, 1).unwrap();
        assert_eq!(img.as_raw(), &vec![1, 2, 3, 4]);
        assert!(matches!(
            decoder.to_rgba(&[1, 2, 3], 1, 1),
            Err(LoadImageError::InvalidImageData {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn inflate_skips_zlib_header() {
        let data: Vec<u8> = (0..64).collect();
        assert_eq!(inflate(&zlib(&data), 64).unwrap(), data);
        assert!(matches!(
            inflate(&zlib(&data), 65),
            Err(LoadImageError::InvalidImageData { .. })
        ));
        assert!(matches!(inflate(&[0x78], 1), Err(LoadImageError::MissingZlibHeader)));
    }

    #[test]
    fn tile_records_are_masked_without_shifting() {
        let mut records = Vec::new();
        for value in [3u32, 0x2000_0001, 0x8000_0002] {
            records.extend_from_slice(&value.to_le_bytes());
        }
        records.extend_from_slice(&0u32.to_le_bytes());
        let compressed = zlib(&records);
        let tilemap = decode_tilemap(&CompressedTilemap {
            width: 2,
            height: 2,
            bits_per_tile: 32,
            bitmask_tile_id: 0x1fff_ffff,
            bitmask_x_flip: 0x2000_0000,
            bitmask_y_flip: 0x4000_0000,
            bitmask_rotation: 0x8000_0000,
            data: &compressed,
        })
        .unwrap();
        assert_eq!(tilemap.tiles.len(), 4);
        assert_eq!(tilemap.tiles[0].id, 3);
        assert_eq!(tilemap.tiles[1].id, 1);
        assert_eq!(tilemap.tiles[1].x_flip, 0x2000_0000);
        assert!(tilemap.tiles[1].is_x_flipped());
        assert!(!tilemap.tiles[1].is_y_flipped());
        assert_eq!(tilemap.tiles[2].rotation, 0x8000_0000);
    }

    #[test]
    fn sixteen_bit_tile_records() {
        let compressed = zlib(&[0x05, 0x80, 0x07, 0x00]);
        let tilemap = decode_tilemap(&CompressedTilemap {
            width: 2,
            height: 1,
            bits_per_tile: 16,
            bitmask_tile_id: 0x7fff,
            bitmask_x_flip: 0x8000,
            bitmask_y_flip: 0,
            bitmask_rotation: 0,
            data: &compressed,
        })
        .unwrap();
        assert_eq!(tilemap.tiles[0].id, 5);
        assert_eq!(tilemap.tiles[0].x_flip, 0x8000);
        assert_eq!(tilemap.tiles[1].id, 7);
    }

    #[test]
    fn eight_bit_tile_records() {
        let compressed = zlib(&[0x03, 0x81]);
        let tilemap = decode_tilemap(&CompressedTilemap {
            width: 2,
            height: 1,
            bits_per_tile: 8,
            bitmask_tile_id: 0x7f,
            bitmask_x_flip: 0x80,
            bitmask_y_flip: 0,
            bitmask_rotation: 0,
            data: &compressed,
        })
        .unwrap();
        assert_eq!(tilemap.tiles.len(), 2);
        assert_eq!((tilemap.tiles[0].id, tilemap.tiles[0].x_flip), (3, 0));
        assert_eq!((tilemap.tiles[1].id, tilemap.tiles[1].x_flip), (1, 0x80));
    }

    #[test]
    fn paint_clips_and_keeps_transparent_pixels() {
        let mut target = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]));
        let mut source = RgbaImage::new(2, 2);
        source.put_pixel(0, 0, Rgba([1, 1, 1, 255]));
        source.put_pixel(1, 1, Rgba([2, 2, 2, 255]));
        paint(&mut target, &source, -1, 0);
        assert_eq!(target.get_pixel(0, 1), &Rgba([2, 2, 2, 255]));
        assert_eq!(target.get_pixel(0, 0), &Rgba([9, 9, 9, 255]));
        assert_eq!(target.get_pixel(1, 1), &Rgba([9, 9, 9, 255]));
    }
}
