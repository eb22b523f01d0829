#![allow(dead_code)]

use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};

pub const LAYER_VISIBLE: u16 = 1;
pub const LAYER_BACKGROUND: u16 = 8;
pub const LAYER_REFERENCE: u16 = 64;

pub const DIR_FORWARD: u8 = 0;
pub const DIR_REVERSE: u8 = 1;
pub const DIR_PING_PONG: u8 = 2;

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u16).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

/// Chunk with its size and type fields
pub fn chunk(chunk_type: u16, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 6);
    out.extend_from_slice(&(body.len() as u32 + 6).to_le_bytes());
    out.extend_from_slice(&chunk_type.to_le_bytes());
    out.extend_from_slice(body);
    out
}

pub fn layer(name: &str, flags: u16, opacity: u8) -> Vec<u8> {
    layer_of_type(name, flags, 0, opacity)
}

pub fn layer_of_type(name: &str, flags: u16, layer_type: u16, opacity: u8) -> Vec<u8> {
    blended_layer(name, flags, layer_type, 0, opacity)
}

pub fn blended_layer(name: &str, flags: u16, layer_type: u16, blend_mode: u16, opacity: u8) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&flags.to_le_bytes());
    body.extend_from_slice(&layer_type.to_le_bytes());
    body.extend_from_slice(&[0; 6]);
    body.extend_from_slice(&blend_mode.to_le_bytes());
    body.push(opacity);
    body.extend_from_slice(&[0; 3]);
    string(&mut body, name);
    chunk(0x2004, &body)
}

pub fn tilemap_layer(name: &str, tileset_id: u32) -> Vec<u8> {
    let mut out = layer_of_type(name, LAYER_VISIBLE, 2, 255);
    out.extend_from_slice(&tileset_id.to_le_bytes());
    let size = out.len() as u32;
    out[0..4].copy_from_slice(&size.to_le_bytes());
    out
}

fn cel_header(body: &mut Vec<u8>, layer_index: u16, x: i16, y: i16, cel_type: u16) {
    body.extend_from_slice(&layer_index.to_le_bytes());
    body.extend_from_slice(&x.to_le_bytes());
    body.extend_from_slice(&y.to_le_bytes());
    body.push(255);
    body.extend_from_slice(&cel_type.to_le_bytes());
    body.extend_from_slice(&[0; 7]);
}

pub fn raw_cel(layer_index: u16, x: i16, y: i16, width: u16, height: u16, pixels: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    cel_header(&mut body, layer_index, x, y, 0);
    body.extend_from_slice(&width.to_le_bytes());
    body.extend_from_slice(&height.to_le_bytes());
    body.extend_from_slice(pixels);
    chunk(0x2005, &body)
}

pub fn compressed_cel(
    layer_index: u16,
    x: i16,
    y: i16,
    width: u16,
    height: u16,
    pixels: &[u8],
) -> Vec<u8> {
    let mut body = Vec::new();
    cel_header(&mut body, layer_index, x, y, 2);
    body.extend_from_slice(&width.to_le_bytes());
    body.extend_from_slice(&height.to_le_bytes());
    body.extend_from_slice(&zlib(pixels));
    chunk(0x2005, &body)
}

pub fn linked_cel(layer_index: u16, frame_position: u16) -> Vec<u8> {
    let mut body = Vec::new();
    cel_header(&mut body, layer_index, 0, 0, 1);
    body.extend_from_slice(&frame_position.to_le_bytes());
    chunk(0x2005, &body)
}

/// 32-bit tile records with the usual id/flip/rotation masks
pub fn tilemap_cel(layer_index: u16, x: i16, y: i16, width: u16, height: u16, tiles: &[u32]) -> Vec<u8> {
    let mut body = Vec::new();
    cel_header(&mut body, layer_index, x, y, 3);
    body.extend_from_slice(&width.to_le_bytes());
    body.extend_from_slice(&height.to_le_bytes());
    body.extend_from_slice(&32u16.to_le_bytes());
    for mask in [0x1fff_ffffu32, 0x2000_0000, 0x4000_0000, 0x8000_0000] {
        body.extend_from_slice(&mask.to_le_bytes());
    }
    body.extend_from_slice(&[0; 10]);
    let records: Vec<u8> = tiles.iter().flat_map(|t| t.to_le_bytes()).collect();
    body.extend_from_slice(&zlib(&records));
    chunk(0x2005, &body)
}

pub struct TagDef<'a> {
    pub from: u16,
    pub to: u16,
    pub direction: u8,
    pub name: &'a str,
}

pub fn tags(tags: &[TagDef<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(tags.len() as u16).to_le_bytes());
    body.extend_from_slice(&[0; 8]);
    for tag in tags {
        body.extend_from_slice(&tag.from.to_le_bytes());
        body.extend_from_slice(&tag.to.to_le_bytes());
        body.push(tag.direction);
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&[0; 6]);
        body.extend_from_slice(&[10, 20, 30, 0]);
        string(&mut body, tag.name);
    }
    chunk(0x2018, &body)
}

pub fn palette(first_index: u32, colors: &[[u8; 4]]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(first_index + colors.len() as u32).to_le_bytes());
    body.extend_from_slice(&first_index.to_le_bytes());
    body.extend_from_slice(&(first_index + colors.len() as u32 - 1).to_le_bytes());
    body.extend_from_slice(&[0; 8]);
    for color in colors {
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(color);
    }
    chunk(0x2019, &body)
}

/// Slice without nine-patch or pivot data, keys are (start frame, x, y, w, h)
pub fn slice(name: &str, keys: &[(u32, i32, i32, u32, u32)]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(keys.len() as u32).to_le_bytes());
    body.extend_from_slice(&0u32.to_le_bytes());
    body.extend_from_slice(&[0; 4]);
    string(&mut body, name);
    for (start, x, y, w, h) in keys {
        body.extend_from_slice(&start.to_le_bytes());
        body.extend_from_slice(&x.to_le_bytes());
        body.extend_from_slice(&y.to_le_bytes());
        body.extend_from_slice(&w.to_le_bytes());
        body.extend_from_slice(&h.to_le_bytes());
    }
    chunk(0x2022, &body)
}

/// Embedded tileset, `pixels` is the whole strip in the document's color depth
pub fn tileset(id: u32, tile_width: u16, tile_height: u16, count: u32, name: &str, pixels: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&id.to_le_bytes());
    body.extend_from_slice(&2u32.to_le_bytes());
    body.extend_from_slice(&count.to_le_bytes());
    body.extend_from_slice(&tile_width.to_le_bytes());
    body.extend_from_slice(&tile_height.to_le_bytes());
    body.extend_from_slice(&1i16.to_le_bytes());
    body.extend_from_slice(&[0; 14]);
    string(&mut body, name);
    let compressed = zlib(pixels);
    body.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    body.extend_from_slice(&compressed);
    chunk(0x2023, &body)
}

pub fn user_data(text: Option<&str>, color: Option<[u8; 4]>) -> Vec<u8> {
    let mut flags = 0u32;
    if text.is_some() {
        flags |= 1;
    }
    if color.is_some() {
        flags |= 2;
    }
    let mut body = flags.to_le_bytes().to_vec();
    if let Some(text) = text {
        string(&mut body, text);
    }
    if let Some(color) = color {
        body.extend_from_slice(&color);
    }
    chunk(0x2020, &body)
}

pub struct FrameDef {
    pub duration: u16,
    pub chunks: Vec<Vec<u8>>,
}

impl FrameDef {
    pub fn new(duration: u16, chunks: Vec<Vec<u8>>) -> Self {
        Self { duration, chunks }
    }

    fn write(&self, out: &mut Vec<u8>) {
        let body: Vec<u8> = self.chunks.concat();
        out.extend_from_slice(&(body.len() as u32 + 16).to_le_bytes());
        out.extend_from_slice(&0xF1FAu16.to_le_bytes());
        out.extend_from_slice(&(self.chunks.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.duration.to_le_bytes());
        out.extend_from_slice(&[0; 2]);
        out.extend_from_slice(&(self.chunks.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
    }
}

pub struct FileDef {
    pub width: u16,
    pub height: u16,
    pub color_depth: u16,
    pub flags: u32,
    pub transparent_index: u8,
    pub number_of_colors: u16,
    pub frames: Vec<FrameDef>,
}

impl FileDef {
    pub fn new(width: u16, height: u16, color_depth: u16) -> Self {
        Self {
            width,
            height,
            color_depth,
            flags: 1,
            transparent_index: 0,
            number_of_colors: 0,
            frames: Vec::new(),
        }
    }

    pub fn frame(mut self, duration: u16, chunks: Vec<Vec<u8>>) -> Self {
        self.frames.push(FrameDef::new(duration, chunks));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut header = vec![0u8; 128];
        header[4..6].copy_from_slice(&0xA5E0u16.to_le_bytes());
        header[6..8].copy_from_slice(&(self.frames.len() as u16).to_le_bytes());
        header[8..10].copy_from_slice(&self.width.to_le_bytes());
        header[10..12].copy_from_slice(&self.height.to_le_bytes());
        header[12..14].copy_from_slice(&self.color_depth.to_le_bytes());
        header[14..18].copy_from_slice(&self.flags.to_le_bytes());
        header[28] = self.transparent_index;
        header[32..34].copy_from_slice(&self.number_of_colors.to_le_bytes());

        let mut out = header;
        for frame in &self.frames {
            frame.write(&mut out);
        }
        let size = out.len() as u32;
        out[0..4].copy_from_slice(&size.to_le_bytes());
        out
    }
}

/// RGBA pixels of a `width x height` block filled with one color
pub fn solid(width: usize, height: usize, color: [u8; 4]) -> Vec<u8> {
    color.repeat(width * height)
}
