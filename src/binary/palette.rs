use image::Rgba;

use super::scalars::Color;

/// Ordered palette of the file, used for indexed-to-RGBA conversion
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Palette {
    pub colors: Vec<Rgba<u8>>,
}

impl Palette {
    /// Grow to `size` entries, new entries are zeroed and existing ones kept
    pub fn grow(&mut self, size: usize) {
        if self.colors.len() < size {
            self.colors.resize(size, Rgba([0; 4]));
        }
    }

    /// Write `entries` starting at `first_index`, growing as needed
    pub fn set_entries(&mut self, first_index: usize, entries: &[Color]) {
        self.grow(first_index + entries.len());
        for (c, entry) in self.colors[first_index..].iter_mut().zip(entries) {
            *c = (*entry).into();
        }
    }

    pub fn get(&self, index: usize) -> Option<Rgba<u8>> {
        self.colors.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
