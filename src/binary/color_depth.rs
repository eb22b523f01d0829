use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use super::scalars::Word;

/// Bits per pixel of every image in the file
#[derive(EnumIter, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorDepth {
    /// One palette index per pixel
    Indexed,
    /// Gray value followed by alpha
    Grayscale,
    /// Red, green, blue, alpha
    Rgba,
}

impl ColorDepth {
    pub fn from_bits(bits: Word) -> Option<Self> {
        Self::iter().find(|depth| depth.bits_per_pixel() == bits)
    }

    pub fn bits_per_pixel(self) -> Word {
        match self {
            Self::Indexed => 8,
            Self::Grayscale => 16,
            Self::Rgba => 32,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        self.bits_per_pixel() as usize / 8
    }
}
