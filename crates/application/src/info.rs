use std::path::Path;

use leafview_core::{Document, format_file_size, parse_date, truncate_text};

const MAX_VALUE_CHARS: usize = 50;

/// Label/value rows shown in the document information panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    rows: Vec<(String, String)>,
}

impl DocumentInfo {
    pub fn collect(path: &Path, document: &dyn Document) -> Self {
        let metadata = document.metadata();
        let size = std::fs::metadata(path)
            .map(|m| format_file_size(m.len()))
            .unwrap_or_else(|_| "-".to_string());
        // Reported for protected files even after they have been unlocked.
        let encryption = match metadata.encryption.clone() {
            Some(scheme) => scheme,
            None if document.needs_password() => "Encrypted".to_string(),
            None => "No".to_string(),
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let folder = path
            .parent()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();

        let rows = [
            ("File Name", file_name),
            ("File Path", folder),
            ("File Format", metadata.format),
            ("File Size", size),
            ("Page Count", document.page_count().to_string()),
            ("Title", metadata.title),
            ("Author", metadata.author),
            ("Creator", metadata.creator),
            ("Producer", metadata.producer),
            ("Subject", metadata.subject),
            ("Keywords", metadata.keywords),
            ("Encryption", encryption),
            ("Creation Date", parse_date(&metadata.creation_date)),
            ("Modification Date", parse_date(&metadata.mod_date)),
        ]
        .into_iter()
        .map(|(label, value)| {
            let value = if value.trim().is_empty() {
                "-".to_string()
            } else {
                truncate_text(&value, MAX_VALUE_CHARS)
            };
            (label.to_string(), value)
        })
        .collect();

        Self { rows }
    }

    pub fn rows(&self) -> &[(String, String)] {
        &self.rows
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}
