use leafview_core::{Notification, Severity};

/// Why a file never made it into a tab.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpenError {
    #[error("This is not a file.")]
    NotAFile,
    #[error("Unsupported file type.")]
    UnsupportedFormat,
    #[error("File is not suitable or is corrupted.")]
    CorruptOrUnsupportedContent { detail: String },
    #[error("File is password protected.")]
    PasswordRequired,
    #[error("Incorrect password.")]
    PasswordIncorrect,
    #[error("File is password protected.")]
    UserAbortedAuthentication,
}

impl OpenError {
    pub fn severity(&self) -> Severity {
        match self {
            OpenError::CorruptOrUnsupportedContent { .. } => Severity::Error,
            _ => Severity::Warning,
        }
    }

    pub fn to_notification(&self) -> Notification {
        Notification::new(self.severity(), "File could not be opened", self.to_string())
    }
}

/// Rejected navigation input; the page field is reverted when these occur.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewerError {
    #[error("Page {page} is outside 1..={page_count}.")]
    PageIndexOutOfRange { page: i64, page_count: u32 },
    #[error("\"{input}\" is not a page number.")]
    NonNumericPageInput { input: String },
}

impl ViewerError {
    pub fn to_notification(&self) -> Notification {
        Notification::warning("Invalid page", self.to_string())
    }
}
