use image::{imageops, RgbaImage};
use thiserror::Error;

use crate::{
    binary::chunks::tags::AnimationDirection,
    loader::Document,
    make_image::{FlattenOptions, LoadImageError},
    wrappers::Tag,
};

#[derive(Error, Debug)]
pub enum PackError {
    #[error("two tags are named {0:?}, animation names must be unique")]
    DuplicateTagName(String),
    #[error("tag {name:?} covers frames {from}..={to}, the document has {frame_count} frames")]
    TagOutOfRange {
        name: String,
        from: usize,
        to: usize,
        frame_count: usize,
    },
    #[error("atlas dimensions do not fit in 32 bits")]
    AtlasTooLarge,
    #[error(transparent)]
    Image(#[from] LoadImageError),
}

/// How frames are flattened and laid out in the atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackOptions {
    pub only_visible_layers: bool,
    pub include_background_layer: bool,
    pub include_tilemap_layers: bool,
    /// Identical frames share one cell
    pub merge_duplicates: bool,
    /// Empty pixels around the whole atlas
    pub border_padding: u32,
    /// Empty pixels between cells
    pub spacing: u32,
    /// Empty pixels on each side of a frame inside its cell
    pub inner_padding: u32,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            only_visible_layers: true,
            include_background_layer: true,
            include_tilemap_layers: true,
            merge_duplicates: true,
            border_padding: 0,
            spacing: 0,
            inner_padding: 0,
        }
    }
}

impl PackOptions {
    pub fn flatten_options(&self) -> FlattenOptions {
        FlattenOptions {
            only_visible_layers: self.only_visible_layers,
            include_background_layer: self.include_background_layer,
            include_tilemap_layers: self.include_tilemap_layers,
        }
    }
}

/// Where a frame ended up in the atlas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasRegion {
    pub name: String,
    pub frame_index: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// In milliseconds
    pub duration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimFrame {
    pub frame_index: usize,
    /// In milliseconds
    pub duration: u32,
}

/// Animation built from a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationCycle {
    pub name: String,
    pub frames: Vec<AnimFrame>,
    pub is_looping: bool,
    pub is_reversed: bool,
    pub is_ping_pong: bool,
}

impl AnimationCycle {
    fn from_tag(tag: &Tag, document: &Document) -> Result<Self, PackError> {
        let frames = document
            .frames
            .get(tag.frame_range())
            .ok_or_else(|| PackError::TagOutOfRange {
                name: tag.name.clone(),
                from: tag.from,
                to: tag.to,
                frame_count: document.frames.len(),
            })?;
        Ok(Self {
            name: tag.name.clone(),
            frames: tag
                .frame_range()
                .zip(frames)
                .map(|(frame_index, f)| AnimFrame {
                    frame_index,
                    duration: f.duration,
                })
                .collect(),
            is_looping: true,
            is_reversed: tag.direction == AnimationDirection::Reverse,
            is_ping_pong: tag.direction == AnimationDirection::PingPong,
        })
    }

    pub fn frame_indices(&self) -> Vec<usize> {
        self.frames.iter().map(|f| f.frame_index).collect()
    }

    pub fn durations(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.duration).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedAtlas {
    pub name: String,
    pub image: RgbaImage,
    /// One per frame of the document, in frame order
    pub regions: Vec<AtlasRegion>,
    pub cycles: Vec<AnimationCycle>,
}

impl PackedAtlas {
    pub fn cycle(&self, name: &str) -> Option<&AnimationCycle> {
        self.cycles.iter().find(|c| c.name == name)
    }

    /// Number of occupied cells, duplicates merged into one cell count once
    pub fn cell_count(&self) -> usize {
        self.regions
            .iter()
            .map(|r| (r.x, r.y))
            .collect::<ahash::HashSet<_>>()
            .len()
    }
}

/// Square-ish grid of equally sized cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub columns: u32,
    pub rows: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub border_padding: u32,
    pub spacing: u32,
    pub inner_padding: u32,
}

fn ceil_sqrt(n: u32) -> u32 {
    let n = u64::from(n);
    let mut root = (n as f64).sqrt() as u64;
    while root * root < n {
        root += 1;
    }
    while root > 0 && (root - 1) * (root - 1) >= n {
        root -= 1;
    }
    root as u32
}

impl GridLayout {
    pub fn new(cell_count: u32, frame_width: u32, frame_height: u32, options: &PackOptions) -> Self {
        let columns = ceil_sqrt(cell_count);
        let rows = if columns == 0 {
            0
        } else {
            cell_count.div_ceil(columns)
        };
        Self {
            columns,
            rows,
            frame_width,
            frame_height,
            border_padding: options.border_padding,
            spacing: options.spacing,
            inner_padding: options.inner_padding,
        }
    }

    fn extent(&self, cells: u32, frame_size: u32) -> Option<u32> {
        cells
            .checked_mul(frame_size)?
            .checked_add(self.border_padding.checked_mul(2)?)?
            .checked_add(self.spacing.checked_mul(cells.saturating_sub(1))?)?
            .checked_add(self.inner_padding.checked_mul(2)?.checked_mul(cells)?)
    }

    fn offset(&self, cell: u32, frame_size: u32) -> Option<u32> {
        cell.checked_mul(frame_size)?
            .checked_add(self.border_padding)?
            .checked_add(self.spacing.checked_mul(cell)?)?
            .checked_add(self.inner_padding.checked_mul(cell.checked_mul(2)?.checked_add(1)?)?)
    }

    pub fn width(&self) -> Result<u32, PackError> {
        self.extent(self.columns, self.frame_width)
            .ok_or(PackError::AtlasTooLarge)
    }

    pub fn height(&self) -> Result<u32, PackError> {
        self.extent(self.rows, self.frame_height)
            .ok_or(PackError::AtlasTooLarge)
    }

    /// Top left pixel of the frame placed in cell `index`
    pub fn cell_origin(&self, index: u32) -> Result<(u32, u32), PackError> {
        let columns = self.columns.max(1);
        let (column, row) = (index % columns, index / columns);
        self.offset(column, self.frame_width)
            .zip(self.offset(row, self.frame_height))
            .ok_or(PackError::AtlasTooLarge)
    }
}

/// For each frame, the earliest frame with identical pixels, `None` when it is the first
pub fn duplicate_frames(frames: &[RgbaImage]) -> Vec<Option<usize>> {
    let mut first_seen = ahash::HashMap::<&[u8], usize>::default();
    frames
        .iter()
        .enumerate()
        .map(|(i, img)| {
            let first = *first_seen.entry(img.as_raw().as_slice()).or_insert(i);
            (first != i).then_some(first)
        })
        .collect()
}

/// Flatten every frame of `document` and lay them out in one atlas image
pub fn pack(document: &Document, options: &PackOptions) -> Result<PackedAtlas, PackError> {
    let mut names = ahash::HashSet::default();
    for tag in &document.tags {
        if !names.insert(tag.name.as_str()) {
            return Err(PackError::DuplicateTagName(tag.name.clone()));
        }
    }
    let cycles = document
        .tags
        .iter()
        .map(|t| AnimationCycle::from_tag(t, document))
        .collect::<Result<Vec<_>, _>>()?;

    let frames = document.flatten_frames(&options.flatten_options())?;
    let duplicates = if options.merge_duplicates {
        duplicate_frames(&frames)
    } else {
        vec![None; frames.len()]
    };
    let distinct = duplicates.iter().filter(|d| d.is_none()).count();
    log::debug!(
        "packing {:?}: {} frames, {} distinct",
        document.name,
        frames.len(),
        distinct
    );

    let layout = GridLayout::new(distinct as u32, document.width(), document.height(), options);
    let mut image = RgbaImage::new(layout.width()?, layout.height()?);
    let mut regions: Vec<AtlasRegion> = Vec::with_capacity(frames.len());
    let mut cell = 0;
    for (frame_index, (frame, duplicate)) in frames.iter().zip(&duplicates).enumerate() {
        let (x, y) = match duplicate {
            Some(original) => (regions[*original].x, regions[*original].y),
            None => {
                let origin = layout.cell_origin(cell)?;
                cell += 1;
                imageops::replace(&mut image, frame, origin.0.into(), origin.1.into());
                origin
            }
        };
        regions.push(AtlasRegion {
            name: format!("{} {}", document.name, frame_index),
            frame_index,
            x,
            y,
            width: document.width(),
            height: document.height(),
            duration: document.frames[frame_index].duration,
        });
    }

    Ok(PackedAtlas {
        name: document.name.clone(),
        image,
        regions,
        cycles,
    })
}
