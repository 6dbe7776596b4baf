use std::path::Path;

use crate::{DocumentMetadata, TocEntry};

/// Tightly packed RGBA8 raster of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl PageBitmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> anyhow::Result<Self> {
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4);
        if pixels.len() != expected {
            anyhow::bail!(
                "pixel buffer has {} bytes, expected {expected} for {width}x{height}",
                pixels.len()
            );
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }
}

/// An opened document as seen by the viewer.
///
/// Page indices are 0-based here; the viewer translates to the 1-based page
/// numbers users see.
pub trait Document {
    fn page_count(&self) -> u32;

    fn is_pdf(&self) -> bool;

    /// Whether the file was protected when it was opened.
    fn needs_password(&self) -> bool;

    /// Whether the content is still locked (no password accepted yet).
    fn is_encrypted(&self) -> bool;

    /// Tries `password`; returns `true` once the document is unlocked.
    fn authenticate(&mut self, password: &str) -> bool;

    /// Cheap probe that the page can be loaded at all.
    fn load_page(&self, index: u32) -> anyhow::Result<()>;

    /// Rasterises a page at `scale` pixels per point.
    fn render_page(&self, index: u32, scale: f32) -> anyhow::Result<PageBitmap>;

    fn render_pages(&self, scale: f32) -> anyhow::Result<Vec<PageBitmap>> {
        (0..self.page_count())
            .map(|index| self.render_page(index, scale))
            .collect()
    }

    fn toc(&self) -> anyhow::Result<Vec<TocEntry>>;

    fn metadata(&self) -> DocumentMetadata;

    fn page_text(&self, index: u32) -> anyhow::Result<String>;
}

/// Turns a path into an opened (possibly still locked) document.
pub trait DocumentOpener {
    fn open(&self, path: &Path) -> anyhow::Result<Box<dyn Document>>;
}
