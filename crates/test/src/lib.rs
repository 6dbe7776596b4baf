//! Test helpers and fixtures.

use std::path::{Path, PathBuf};

use leafview_application::{EventQueue, PageView, Viewer};
use leafview_core::{Config, Document, DocumentMetadata, DocumentOpener, PageBitmap, TocEntry};

/// In-memory document with striped pages so rotations are observable.
#[derive(Debug, Clone)]
pub struct FakeDocument {
    pub pages: Vec<(u32, u32)>,
    pub toc: Vec<TocEntry>,
    pub password: Option<String>,
    pub unlocked: bool,
    pub pdf: bool,
    pub readable: bool,
    pub metadata: DocumentMetadata,
}

impl FakeDocument {
    pub fn new(pages: &[(u32, u32)]) -> Self {
        Self {
            pages: pages.to_vec(),
            toc: Vec::new(),
            password: None,
            unlocked: false,
            pdf: true,
            readable: true,
            metadata: DocumentMetadata {
                format: "PDF 1.7".to_string(),
                ..DocumentMetadata::default()
            },
        }
    }

    pub fn with_toc(mut self, toc: Vec<TocEntry>) -> Self {
        self.toc = toc;
        self
    }

    pub fn locked(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// A non-PDF document whose first page cannot be loaded.
    pub fn unreadable_image(mut self) -> Self {
        self.pdf = false;
        self.readable = false;
        self
    }
}

impl Document for FakeDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn is_pdf(&self) -> bool {
        self.pdf
    }

    fn needs_password(&self) -> bool {
        self.password.is_some()
    }

    fn is_encrypted(&self) -> bool {
        self.password.is_some() && !self.unlocked
    }

    fn authenticate(&mut self, password: &str) -> bool {
        self.unlocked = self.password.as_deref() == Some(password);
        self.unlocked
    }

    fn load_page(&self, index: u32) -> anyhow::Result<()> {
        if !self.readable {
            anyhow::bail!("decoder rejected page {index}");
        }
        if index as usize >= self.pages.len() {
            anyhow::bail!("page {index} out of range");
        }
        Ok(())
    }

    fn render_page(&self, index: u32, scale: f32) -> anyhow::Result<PageBitmap> {
        self.load_page(index)?;
        let (w, h) = self.pages[index as usize];
        let w = ((w as f32) * scale).round().max(1.0) as u32;
        let h = ((h as f32) * scale).round().max(1.0) as u32;
        let image = striped_page(index, w, h);
        PageBitmap::new(w, h, image.into_raw())
    }

    fn toc(&self) -> anyhow::Result<Vec<TocEntry>> {
        Ok(self.toc.clone())
    }

    fn metadata(&self) -> DocumentMetadata {
        self.metadata.clone()
    }

    fn page_text(&self, index: u32) -> anyhow::Result<String> {
        self.load_page(index)?;
        Ok(format!("page {}", index + 1))
    }
}

/// Opens every path as a copy of `template`.
#[derive(Debug, Clone)]
pub struct FakeOpener {
    pub template: FakeDocument,
}

impl DocumentOpener for FakeOpener {
    fn open(&self, _path: &Path) -> anyhow::Result<Box<dyn Document>> {
        Ok(Box::new(self.template.clone()))
    }
}

/// Page image whose top rows differ from the rest, so any rotation changes it.
pub fn striped_page(index: u32, width: u32, height: u32) -> image::RgbaImage {
    let shade = (index * 40 % 200) as u8;
    image::RgbaImage::from_fn(width, height, |x, y| {
        if y < height / 4 {
            image::Rgba([200, shade, 0, 255])
        } else if x < width / 3 {
            image::Rgba([0, 0, 200, 255])
        } else {
            image::Rgba([255, 255, 255, 255])
        }
    })
}

pub fn fake_pages(sizes: &[(u32, u32)]) -> Vec<PageView> {
    sizes
        .iter()
        .zip(0u32..)
        .map(|(&(w, h), index)| PageView::new(index + 1, striped_page(index, w, h)))
        .collect()
}

/// A viewer over `sizes` with default config and a queue to inspect events.
pub fn make_viewer(sizes: &[(u32, u32)], viewport: (u32, u32)) -> (Viewer, EventQueue) {
    let events = EventQueue::new();
    let mut viewer = Viewer::new(
        fake_pages(sizes),
        &Config::default(),
        Box::new(events.clone()),
    );
    viewer.set_viewport_size(viewport.0, viewport.1);
    (viewer, events)
}

pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_pages_are_numbered_from_one() {
        let pages = fake_pages(&[(10, 20), (30, 40)]);
        assert_eq!(pages[0].number(), 1);
        assert_eq!(pages[1].size(), (30, 40));
    }

    #[test]
    fn unreadable_image_fails_first_page_probe() {
        let doc = FakeDocument::new(&[(10, 10)]).unreadable_image();
        assert!(!doc.is_pdf());
        assert!(doc.load_page(0).is_err());
    }
}
