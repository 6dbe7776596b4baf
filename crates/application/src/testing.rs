//! In-memory documents for unit tests.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use leafview_core::{Document, DocumentMetadata, DocumentOpener, PageBitmap, TocEntry};

#[derive(Clone, Default)]
pub struct StubDocument {
    pub pages: Vec<(u32, u32)>,
    pub password: Option<String>,
    pub unlocked: bool,
    pub toc: Vec<TocEntry>,
    pub metadata: DocumentMetadata,
    pub dropped: Rc<Cell<bool>>,
}

impl StubDocument {
    pub fn with_pages(pages: &[(u32, u32)]) -> Self {
        let mut document = Self::default();
        document.pages = pages.to_vec();
        document
    }

    pub fn locked(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }
}

impl Drop for StubDocument {
    fn drop(&mut self) {
        self.dropped.set(true);
    }
}

impl Document for StubDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn is_pdf(&self) -> bool {
        true
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
        if index as usize >= self.pages.len() {
            anyhow::bail!("page {index} out of range");
        }
        Ok(())
    }

    fn render_page(&self, index: u32, scale: f32) -> anyhow::Result<PageBitmap> {
        self.load_page(index)?;
        let (w, h) = self.pages[index as usize];
        let w = ((w as f32) * scale).round() as u32;
        let h = ((h as f32) * scale).round() as u32;
        PageBitmap::new(w, h, vec![255; (w * h * 4) as usize])
    }

    fn toc(&self) -> anyhow::Result<Vec<TocEntry>> {
        Ok(self.toc.clone())
    }

    fn metadata(&self) -> DocumentMetadata {
        self.metadata.clone()
    }

    fn page_text(&self, index: u32) -> anyhow::Result<String> {
        self.load_page(index)?;
        Ok(format!("text of page {}", index + 1))
    }
}

/// Opens every path as a copy of `template`; files starting with `junk` fail.
pub struct StubOpener {
    pub template: StubDocument,
}

impl DocumentOpener for StubOpener {
    fn open(&self, path: &Path) -> anyhow::Result<Box<dyn Document>> {
        if std::fs::read(path)?.starts_with(b"junk") {
            anyhow::bail!("no header");
        }
        Ok(Box::new(self.template.clone()))
    }
}

pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> anyhow::Result<std::path::PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}
