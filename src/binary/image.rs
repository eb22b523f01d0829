use super::scalars::Word;

/// Pixels of a raw (kind 0) or compressed (kind 2) cel, still in the document's color depth
#[derive(Debug, Clone, Copy)]
pub struct Image<'a> {
    pub width: Word,
    pub height: Word,
    /// Rows top to bottom, each row left to right. For compressed cels this
    /// is a zlib stream that inflates to the same layout.
    pub data: &'a [u8],
    pub compressed: bool,
}

impl Image<'_> {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}
