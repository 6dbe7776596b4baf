use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context as _;
use leafview_core::{Document, DocumentMetadata, PageBitmap, TocEntry};
use pdfium_render::prelude::{
    PdfBitmapFormat, PdfDocument, PdfDocumentMetadataTagType, PdfPage, PdfRenderConfig,
    PdfiumError, PdfiumInternalError,
};

use crate::Engine;
use crate::outline;

/// A PDF file rendered through pdfium.
///
/// The file is reopened for every operation, so the handle itself is cheap and
/// only remembers the accepted password.
pub struct PdfiumDocument {
    engine: Engine,
    path: PathBuf,
    password: Option<String>,
    needs_password: bool,
    locked: bool,
    page_count: u32,
}

enum Probe {
    Unlocked(u32),
    Locked,
}

impl PdfiumDocument {
    pub fn open(engine: Engine, path: &Path) -> anyhow::Result<Self> {
        let probe = {
            let pdfium = engine.pdfium()?;
            match pdfium.load_pdf_from_file(path, None) {
                Ok(document) => Probe::Unlocked(u32::from(document.pages().len())),
                Err(PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError)) => {
                    Probe::Locked
                }
                Err(err) => {
                    return Err(anyhow::anyhow!(err))
                        .with_context(|| format!("open pdf {}", path.display()));
                }
            }
        };

        let (locked, page_count) = match probe {
            Probe::Unlocked(count) => (false, count),
            Probe::Locked => (true, 0),
        };
        tracing::debug!(path = %path.display(), locked, page_count, "pdf opened");

        Ok(Self {
            engine,
            path: path.to_path_buf(),
            password: None,
            needs_password: locked,
            locked,
            page_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_document<T>(
        &self,
        f: impl FnOnce(&PdfDocument<'_>) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        if self.locked {
            anyhow::bail!("document is locked");
        }
        let pdfium = self.engine.pdfium()?;
        let document = pdfium
            .load_pdf_from_file(&self.path, self.password.as_deref())
            .map_err(|err| anyhow::anyhow!(err))
            .with_context(|| format!("reopen pdf {}", self.path.display()))?;
        f(&document)
    }

    fn pdf_version(&self) -> Option<String> {
        let mut header = [0u8; 16];
        let mut file = std::fs::File::open(&self.path).ok()?;
        let read = file.read(&mut header).ok()?;
        let header = std::str::from_utf8(&header[..read]).ok()?;
        let version = header.strip_prefix("%PDF-")?;
        let version: String = version
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        (!version.is_empty()).then_some(version)
    }
}

fn page_at<'a>(document: &PdfDocument<'a>, index: u32) -> anyhow::Result<PdfPage<'a>> {
    let index = u16::try_from(index).map_err(|_| anyhow::anyhow!("page index out of range"))?;
    document
        .pages()
        .get(index)
        .map_err(|err| anyhow::anyhow!(err))
}

fn render(page: &PdfPage<'_>, scale: f32) -> anyhow::Result<PageBitmap> {
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(scale.max(0.01))
        .render_form_data(false)
        .render_annotations(true)
        .use_grayscale_rendering(false)
        .set_reverse_byte_order(false)
        .set_format(PdfBitmapFormat::BGRA);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|err| anyhow::anyhow!(err))?;

    let width = bitmap.width().max(0) as u32;
    let height = bitmap.height().max(0) as u32;
    let pixels = bgra_to_rgba(&bitmap.as_raw_bytes(), width, height);
    PageBitmap::new(width, height, pixels)
}

/// Repacks a (possibly padded) BGRA buffer into tight RGBA rows.
pub(crate) fn bgra_to_rgba(src: &[u8], width: u32, height: u32) -> Vec<u8> {
    let width = width as usize;
    let height = height as usize;
    let src_stride = if height == 0 { 0 } else { src.len() / height };

    let mut pixels = Vec::with_capacity(width.saturating_mul(height).saturating_mul(4));
    for y in 0..height {
        let base = y.saturating_mul(src_stride);
        for x in 0..width {
            let idx = base.saturating_add(x.saturating_mul(4));
            let b = src.get(idx).copied().unwrap_or(255);
            let g = src.get(idx + 1).copied().unwrap_or(255);
            let r = src.get(idx + 2).copied().unwrap_or(255);
            let a = src.get(idx + 3).copied().unwrap_or(255);
            pixels.extend_from_slice(&[r, g, b, a]);
        }
    }
    pixels
}

impl Document for PdfiumDocument {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn is_pdf(&self) -> bool {
        true
    }

    fn needs_password(&self) -> bool {
        self.needs_password
    }

    fn is_encrypted(&self) -> bool {
        self.locked
    }

    fn authenticate(&mut self, password: &str) -> bool {
        let page_count = {
            let Ok(pdfium) = self.engine.pdfium() else {
                return false;
            };
            match pdfium.load_pdf_from_file(&self.path, Some(password)) {
                Ok(document) => u32::from(document.pages().len()),
                Err(err) => {
                    tracing::debug!(error = %err, "pdf authentication failed");
                    return false;
                }
            }
        };

        self.password = Some(password.to_string());
        self.locked = false;
        self.page_count = page_count;
        true
    }

    fn load_page(&self, index: u32) -> anyhow::Result<()> {
        self.with_document(|document| page_at(document, index).map(|_| ()))
    }

    fn render_page(&self, index: u32, scale: f32) -> anyhow::Result<PageBitmap> {
        self.with_document(|document| render(&page_at(document, index)?, scale))
    }

    fn render_pages(&self, scale: f32) -> anyhow::Result<Vec<PageBitmap>> {
        let started = Instant::now();
        let bitmaps = self.with_document(|document| {
            (0..self.page_count)
                .map(|index| render(&page_at(document, index)?, scale))
                .collect::<anyhow::Result<Vec<_>>>()
        })?;
        tracing::info!(
            path = %self.path.display(),
            pages = bitmaps.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "rendered all pages"
        );
        Ok(bitmaps)
    }

    fn toc(&self) -> anyhow::Result<Vec<TocEntry>> {
        if self.locked {
            anyhow::bail!("document is locked");
        }
        outline::read_toc(&self.path, self.password.as_deref())
    }

    fn metadata(&self) -> DocumentMetadata {
        let format = match self.pdf_version() {
            Some(version) => format!("PDF {version}"),
            None => "PDF".to_string(),
        };
        let encryption = self.needs_password.then(|| "Password protected".to_string());

        let tags = self.with_document(|document| {
            let metadata = document.metadata();
            let tag = |kind: PdfDocumentMetadataTagType| {
                metadata
                    .get(kind)
                    .map(|tag| tag.value().to_string())
                    .unwrap_or_default()
            };
            Ok(DocumentMetadata {
                format: format.clone(),
                title: tag(PdfDocumentMetadataTagType::Title),
                author: tag(PdfDocumentMetadataTagType::Author),
                creator: tag(PdfDocumentMetadataTagType::Creator),
                producer: tag(PdfDocumentMetadataTagType::Producer),
                subject: tag(PdfDocumentMetadataTagType::Subject),
                keywords: tag(PdfDocumentMetadataTagType::Keywords),
                encryption: encryption.clone(),
                creation_date: tag(PdfDocumentMetadataTagType::CreationDate),
                mod_date: tag(PdfDocumentMetadataTagType::ModificationDate),
            })
        });

        match tags {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(error = %err, "pdf metadata unavailable");
                DocumentMetadata {
                    format,
                    encryption,
                    ..DocumentMetadata::default()
                }
            }
        }
    }

    fn page_text(&self, index: u32) -> anyhow::Result<String> {
        self.with_document(|document| {
            let page = page_at(document, index)?;
            let text = page.text().map_err(|err| anyhow::anyhow!(err))?;
            Ok(text.all())
        })
    }
}
