//! Document backends: pdfium for PDF files, the `image` crate for rasters.

use std::cell::{Ref, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use leafview_core::{Document, DocumentOpener, file_extension};
use pdfium_render::prelude::Pdfium;

mod outline;
mod pdfium_document;
mod raster;

pub use pdfium_document::PdfiumDocument;
pub use raster::ImageDocument;

const PDFIUM_LIB_ENV: &str = "LEAFVIEW_PDFIUM_LIB_PATH";
const PDFIUM_DIR_ENV: &str = "LEAFVIEW_PDFIUM_DIR";
const PDFIUM_DISABLE_ENV: &str = "LEAFVIEW_DISABLE_PDFIUM";

/// Entry point for opening documents. Cloning shares the pdfium binding.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    pdfium: Rc<RefCell<PdfiumState>>,
}

#[derive(Debug, Default)]
enum PdfiumState {
    #[default]
    Uninitialized,
    Available(Pdfium),
    Unavailable(String),
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_pdfium(&self) -> anyhow::Result<()> {
        let _ = self.pdfium()?;
        Ok(())
    }

    /// The process' pdfium binding, bound on first use. A failed bind is
    /// remembered so later PDFs fail fast with the same message.
    pub(crate) fn pdfium(&self) -> anyhow::Result<Ref<'_, Pdfium>> {
        if pdfium_disabled() {
            anyhow::bail!("pdfium disabled via {PDFIUM_DISABLE_ENV}");
        }
        if matches!(*self.pdfium.borrow(), PdfiumState::Uninitialized) {
            let next = match bind_pdfium() {
                Ok(pdfium) => {
                    tracing::debug!("pdfium bound");
                    PdfiumState::Available(pdfium)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "pdfium unavailable");
                    PdfiumState::Unavailable(err.to_string())
                }
            };
            *self.pdfium.borrow_mut() = next;
        }
        Ref::filter_map(self.pdfium.borrow(), |state| match state {
            PdfiumState::Available(pdfium) => Some(pdfium),
            _ => None,
        })
        .map_err(|state| match &*state {
            PdfiumState::Unavailable(err) => anyhow::anyhow!(err.clone()),
            _ => anyhow::anyhow!("pdfium not initialised"),
        })
    }
}

impl DocumentOpener for Engine {
    fn open(&self, path: &Path) -> anyhow::Result<Box<dyn Document>> {
        let ext = file_extension(path);
        tracing::debug!(path = %path.display(), ?ext, "opening document");
        match ext.as_deref() {
            Some("pdf") => Ok(Box::new(PdfiumDocument::open(self.clone(), path)?)),
            Some("png" | "jpg" | "jpeg" | "bmp" | "tiff") => Ok(Box::new(ImageDocument::open(path)?)),
            Some(other) => anyhow::bail!("no renderer available for .{other} files"),
            None => anyhow::bail!("file has no extension"),
        }
    }
}

fn pdfium_disabled() -> bool {
    std::env::var(PDFIUM_DISABLE_ENV)
        .map(|v| !v.trim().is_empty() && v.trim() != "0")
        .unwrap_or(false)
}

/// Library files tried before the system search path, in order.
fn library_candidates(env_dir: Option<PathBuf>, exe_dir: Option<PathBuf>) -> Vec<PathBuf> {
    env_dir
        .into_iter()
        .chain(exe_dir)
        .chain([PathBuf::from(".pdfium")])
        .map(|dir| Pdfium::pdfium_platform_library_name_at_path(&dir))
        .collect()
}

fn bind_pdfium() -> anyhow::Result<Pdfium> {
    if let Some(path) = std::env::var_os(PDFIUM_LIB_ENV).map(PathBuf::from) {
        let bindings = Pdfium::bind_to_library(&path).map_err(|err| {
            anyhow::anyhow!("load pdfium from {PDFIUM_LIB_ENV}={}: {err}", path.display())
        })?;
        return Ok(Pdfium::new(bindings));
    }

    let env_dir = std::env::var_os(PDFIUM_DIR_ENV).map(PathBuf::from);
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    for path in library_candidates(env_dir, exe_dir) {
        match Pdfium::bind_to_library(&path) {
            Ok(bindings) => {
                tracing::debug!(path = %path.display(), "pdfium library found");
                return Ok(Pdfium::new(bindings));
            }
            Err(err) => tracing::trace!(path = %path.display(), error = %err, "no pdfium here"),
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|err| {
        anyhow::anyhow!(
            "{err}\n\nPdfium library not found. Set {PDFIUM_LIB_ENV}, or place {} next to the leafview binary.",
            Pdfium::pdfium_platform_library_name().to_string_lossy()
        )
    })?;
    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_without_backend_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        std::fs::write(&path, b"PK\x03\x04").unwrap();

        let err = Engine::new().open(&path).err().unwrap();
        assert!(err.to_string().contains(".epub"));
    }

    #[test]
    fn candidates_prefer_the_configured_dir() {
        let found = library_candidates(Some(PathBuf::from("/opt/pdfium")), None);
        assert_eq!(found.len(), 2);
        assert!(found[0].starts_with("/opt/pdfium"));
        assert!(found[1].starts_with(".pdfium"));
    }

    #[test]
    fn raster_files_open_without_pdfium() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scan.png");
        image::RgbaImage::from_pixel(4, 3, image::Rgba([10, 20, 30, 255])).save(&path)?;

        let document = Engine::new().open(&path)?;
        assert_eq!(document.page_count(), 1);
        assert!(!document.is_pdf());
        Ok(())
    }
}
