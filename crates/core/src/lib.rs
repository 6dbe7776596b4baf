//! Core domain types for Leafview.

use std::path::Path;

use serde::{Deserialize, Serialize};

mod document;
mod text;

pub use document::{Document, DocumentOpener, PageBitmap};
pub use text::{format_file_size, parse_date, truncate_text};

pub const SUPPORTED_DOCUMENT_EXTENSIONS: &[&str] =
    &["pdf", "epub", "txt", "mobi", "xps", "fb2", "cbz"];
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "svg"];

/// Lowercased extension of `path`, without the dot.
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn is_supported_path(path: &Path) -> bool {
    file_extension(path).is_some_and(|ext| {
        SUPPORTED_DOCUMENT_EXTENSIONS.contains(&ext.as_str())
            || SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str())
    })
}

/// Base file name used to key document tabs.
pub fn file_name_key(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dpi_scale: DpiScale,
    pub zoom: ZoomLimits,
    pub layout: PageLayout,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dpi_scale: DpiScale::Auto,
            zoom: ZoomLimits::default(),
            layout: PageLayout::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn normalize(&mut self) {
        self.zoom.min = self.zoom.min.max(1);
        self.zoom.max = self.zoom.max.max(self.zoom.min);
        self.zoom.default = self.zoom.default.clamp(self.zoom.min, self.zoom.max);
        self.zoom.step = self.zoom.step.max(1);

        let level = self.log_level.trim().to_ascii_lowercase();
        self.log_level = if level.is_empty() {
            "info".to_string()
        } else {
            level
        };
    }

    /// Pixels per PDF point used when rasterising reference images.
    pub fn render_scale(&self) -> f32 {
        self.dpi_scale.factor()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomLimits {
    pub min: u32,
    pub max: u32,
    pub step: u32,
    pub default: u32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: 50,
            max: 200,
            step: 10,
            default: 100,
        }
    }
}

impl ZoomLimits {
    pub fn clamp(&self, percent: u32) -> u32 {
        percent.clamp(self.min, self.max)
    }
}

/// Pixel geometry of the vertically stacked page column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageLayout {
    pub top_margin: u32,
    pub page_spacing: u32,
    pub fit_margin: u32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            top_margin: 10,
            page_spacing: 12,
            fit_margin: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DpiScale {
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "1")]
    X100,
    #[serde(rename = "1.25")]
    X125,
    #[serde(rename = "1.5")]
    X150,
    #[serde(rename = "1.75")]
    X175,
    #[serde(rename = "2")]
    X200,
}

impl DpiScale {
    pub fn as_str(&self) -> &'static str {
        match self {
            DpiScale::Auto => "auto",
            DpiScale::X100 => "1",
            DpiScale::X125 => "1.25",
            DpiScale::X150 => "1.5",
            DpiScale::X175 => "1.75",
            DpiScale::X200 => "2",
        }
    }

    pub fn factor(&self) -> f32 {
        match self {
            DpiScale::Auto | DpiScale::X100 => 1.0,
            DpiScale::X125 => 1.25,
            DpiScale::X150 => 1.5,
            DpiScale::X175 => 1.75,
            DpiScale::X200 => 2.0,
        }
    }

    pub fn cycle(&self) -> DpiScale {
        match self {
            DpiScale::Auto => DpiScale::X100,
            DpiScale::X100 => DpiScale::X125,
            DpiScale::X125 => DpiScale::X150,
            DpiScale::X150 => DpiScale::X175,
            DpiScale::X175 => DpiScale::X200,
            DpiScale::X200 => DpiScale::Auto,
        }
    }
}

impl std::fmt::Display for DpiScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DpiScale {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DpiScale::Auto),
            "1" | "1.0" => Ok(DpiScale::X100),
            "1.25" => Ok(DpiScale::X125),
            "1.5" => Ok(DpiScale::X150),
            "1.75" => Ok(DpiScale::X175),
            "2" | "2.0" => Ok(DpiScale::X200),
            _ => Err("unknown dpi scale"),
        }
    }
}

/// Clockwise page rotation; only ever advances by a quarter turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn next(&self) -> Rotation {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn swaps_axes(&self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// A transient, user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(severity: Severity, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Success, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, title, message)
    }
}

/// One outline row as emitted by the document backend, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// 1-based nesting depth.
    pub level: u32,
    pub title: String,
    /// 1-based target page, `None` when the destination could not be resolved.
    pub page: Option<u32>,
}

impl TocEntry {
    pub fn new(level: u32, title: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            level,
            title: title.into(),
            page,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub format: String,
    pub title: String,
    pub author: String,
    pub creator: String,
    pub producer: String,
    pub subject: String,
    pub keywords: String,
    pub encryption: Option<String>,
    pub creation_date: String,
    pub mod_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_standard_zoom_bounds() {
        let config = Config::default();
        assert_eq!(config.zoom.min, 50);
        assert_eq!(config.zoom.max, 200);
        assert_eq!(config.zoom.step, 10);
        assert_eq!(config.zoom.default, 100);
    }

    #[test]
    fn normalize_repairs_inverted_zoom_bounds() {
        let mut config = Config {
            zoom: ZoomLimits {
                min: 0,
                max: 0,
                step: 0,
                default: 500,
            },
            log_level: "  ".to_string(),
            ..Config::default()
        };
        config.normalize();
        assert_eq!(config.zoom.min, 1);
        assert_eq!(config.zoom.max, 1);
        assert_eq!(config.zoom.default, 1);
        assert_eq!(config.zoom.step, 1);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn config_fills_missing_fields_from_defaults() {
        let config: Config = serde_json::from_str(r#"{"dpi_scale":"1.5"}"#).unwrap();
        assert_eq!(config.dpi_scale, DpiScale::X150);
        assert_eq!(config.layout, PageLayout::default());
        assert_eq!(config.render_scale(), 1.5);
    }

    #[test]
    fn dpi_scale_parses_and_cycles() {
        assert_eq!("Auto".parse::<DpiScale>().unwrap(), DpiScale::Auto);
        assert_eq!(" 1.75 ".parse::<DpiScale>().unwrap(), DpiScale::X175);
        assert!("3".parse::<DpiScale>().is_err());

        let mut scale = DpiScale::Auto;
        for _ in 0..6 {
            scale = scale.cycle();
        }
        assert_eq!(scale, DpiScale::Auto);
    }

    #[test]
    fn rotation_wraps_after_four_quarter_turns() {
        let mut rotation = Rotation::default();
        let mut seen = Vec::new();
        for _ in 0..4 {
            rotation = rotation.next();
            seen.push(rotation.degrees());
        }
        assert_eq!(seen, vec![90, 180, 270, 0]);
    }

    #[test]
    fn supported_paths_ignore_extension_case() {
        assert!(is_supported_path(Path::new("/tmp/a.PDF")));
        assert!(is_supported_path(Path::new("scan.jpeg")));
        assert!(!is_supported_path(Path::new("notes.docx")));
        assert!(!is_supported_path(Path::new("README")));
    }

    #[test]
    fn file_name_key_drops_directories() {
        assert_eq!(file_name_key(Path::new("/a/b/report.pdf")), "report.pdf");
        assert_eq!(file_name_key(Path::new("/c/report.pdf")), "report.pdf");
    }
}
