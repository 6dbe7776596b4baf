use std::path::{Path, PathBuf};

use anyhow::Context as _;
use image::RgbaImage;
use image::imageops::FilterType;
use leafview_core::{Document, DocumentMetadata, PageBitmap, TocEntry, file_extension};

/// A raster image shown as a one-page document.
pub struct ImageDocument {
    path: PathBuf,
    image: RgbaImage,
}

impl ImageDocument {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("decode image {}", path.display()))?
            .to_rgba8();
        tracing::debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "image opened"
        );
        Ok(Self {
            path: path.to_path_buf(),
            image,
        })
    }
}

impl Document for ImageDocument {
    fn page_count(&self) -> u32 {
        1
    }

    fn is_pdf(&self) -> bool {
        false
    }

    fn needs_password(&self) -> bool {
        false
    }

    fn is_encrypted(&self) -> bool {
        false
    }

    fn authenticate(&mut self, _password: &str) -> bool {
        true
    }

    fn load_page(&self, index: u32) -> anyhow::Result<()> {
        if index != 0 {
            anyhow::bail!("image documents have a single page, got index {index}");
        }
        Ok(())
    }

    fn render_page(&self, index: u32, scale: f32) -> anyhow::Result<PageBitmap> {
        self.load_page(index)?;
        let image = if (scale - 1.0).abs() < f32::EPSILON {
            self.image.clone()
        } else {
            let width = ((self.image.width() as f32) * scale).round().max(1.0) as u32;
            let height = ((self.image.height() as f32) * scale).round().max(1.0) as u32;
            image::imageops::resize(&self.image, width, height, FilterType::Triangle)
        };
        let (width, height) = image.dimensions();
        PageBitmap::new(width, height, image.into_raw())
    }

    fn toc(&self) -> anyhow::Result<Vec<TocEntry>> {
        Ok(Vec::new())
    }

    fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            format: file_extension(&self.path)
                .map(|ext| ext.to_ascii_uppercase())
                .unwrap_or_else(|| "Image".to_string()),
            ..DocumentMetadata::default()
        }
    }

    fn page_text(&self, _index: u32) -> anyhow::Result<String> {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, width: u32, height: u32) -> anyhow::Result<PathBuf> {
        let path = dir.join("page.png");
        RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255])).save(&path)?;
        Ok(path)
    }

    #[test]
    fn renders_at_requested_scale() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let document = ImageDocument::open(&write_png(dir.path(), 10, 4)?)?;

        let full = document.render_page(0, 1.0)?;
        assert_eq!((full.width, full.height), (10, 4));
        assert_eq!(&full.pixels[..4], &[200, 100, 50, 255]);

        let doubled = document.render_page(0, 2.0)?;
        assert_eq!((doubled.width, doubled.height), (20, 8));
        Ok(())
    }

    #[test]
    fn only_first_page_exists() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let document = ImageDocument::open(&write_png(dir.path(), 2, 2)?)?;
        assert!(document.load_page(0).is_ok());
        assert!(document.load_page(1).is_err());
        assert_eq!(document.metadata().format, "PNG");
        Ok(())
    }

    #[test]
    fn corrupt_images_fail_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(ImageDocument::open(&path).is_err());
    }
}
