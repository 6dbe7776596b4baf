//! File validation and the password gate that runs before a tab is created.
//!
//! Checks happen in a fixed order: the path must be a regular file, its
//! extension must be supported, the backend must open it (and, for non-PDF
//! formats, load the first page), and a locked document must be unlocked
//! before anything is rendered. Failures turn
//! into [`OpenError`] values; the caller shows their notification.

use std::path::{Path, PathBuf};

use leafview_core::{Document, DocumentOpener, Notification, is_supported_path};

use crate::error::OpenError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenState {
    Unopened,
    OpenAttempted,
    Rejected(OpenError),
    NeedsPassword { incorrect: bool },
    Authenticated,
    Aborted,
    Ready,
}

/// Supplies passwords for a locked document; `None` means the user gave up.
pub trait PasswordPrompt {
    fn request(&mut self, path: &Path, incorrect: bool) -> Option<String>;
}

impl<F> PasswordPrompt for F
where
    F: FnMut(&Path, bool) -> Option<String>,
{
    fn request(&mut self, path: &Path, incorrect: bool) -> Option<String> {
        self(path, incorrect)
    }
}

/// A document that passed every check, together with the password that opened it.
pub struct OpenedDocument {
    pub path: PathBuf,
    pub document: Box<dyn Document>,
    pub password: Option<String>,
}

pub struct OpenAttempt {
    path: PathBuf,
    state: OpenState,
    history: Vec<OpenState>,
    document: Option<Box<dyn Document>>,
    password: Option<String>,
}

impl OpenAttempt {
    /// Runs the file checks and leaves the attempt in `Ready`, `Rejected`
    /// or `NeedsPassword`.
    pub fn start(opener: &dyn DocumentOpener, path: &Path) -> Self {
        let mut attempt = Self {
            path: path.to_path_buf(),
            state: OpenState::Unopened,
            history: vec![OpenState::Unopened],
            document: None,
            password: None,
        };
        attempt.transition(OpenState::OpenAttempted);

        if !path.is_file() {
            attempt.transition(OpenState::Rejected(OpenError::NotAFile));
            return attempt;
        }
        if !is_supported_path(path) {
            attempt.transition(OpenState::Rejected(OpenError::UnsupportedFormat));
            return attempt;
        }
        let document = match opener.open(path) {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %format!("{err:#}"), "document rejected");
                attempt.transition(OpenState::Rejected(OpenError::CorruptOrUnsupportedContent {
                    detail: format!("{err:#}"),
                }));
                return attempt;
            }
        };
        if !document.is_pdf()
            && let Err(err) = document.load_page(0)
        {
            tracing::warn!(path = %path.display(), error = %format!("{err:#}"), "first page unreadable");
            attempt.transition(OpenState::Rejected(OpenError::CorruptOrUnsupportedContent {
                detail: format!("{err:#}"),
            }));
            return attempt;
        }
        let locked = document.needs_password();
        attempt.document = Some(document);
        if locked {
            attempt.transition(OpenState::NeedsPassword { incorrect: false });
        } else {
            attempt.transition(OpenState::Ready);
        }
        attempt
    }

    fn transition(&mut self, next: OpenState) {
        tracing::debug!(path = %self.path.display(), from = ?self.state, to = ?next, "open state");
        self.state = next.clone();
        self.history.push(next);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &OpenState {
        &self.state
    }

    /// Every state this attempt has passed through, oldest first.
    pub fn history(&self) -> &[OpenState] {
        &self.history
    }

    pub fn needs_password(&self) -> bool {
        matches!(self.state, OpenState::NeedsPassword { .. })
    }

    pub fn holds_document(&self) -> bool {
        self.document.is_some()
    }

    /// The reason the last submitted password was refused, if it was.
    pub fn error(&self) -> Option<OpenError> {
        match self.state {
            OpenState::NeedsPassword { incorrect: true } => Some(OpenError::PasswordIncorrect),
            OpenState::Rejected(ref err) => Some(err.clone()),
            OpenState::Aborted => Some(OpenError::UserAbortedAuthentication),
            _ => None,
        }
    }

    /// Tries `candidate` against the locked document. Returns `true` once unlocked.
    pub fn submit_password(&mut self, candidate: &str) -> bool {
        if !self.needs_password() {
            return matches!(self.state, OpenState::Authenticated | OpenState::Ready);
        }
        let Some(document) = self.document.as_mut() else {
            return false;
        };
        if document.authenticate(candidate) {
            self.password = Some(candidate.to_string());
            self.transition(OpenState::Authenticated);
            true
        } else {
            tracing::info!(path = %self.path.display(), "password rejected");
            self.transition(OpenState::NeedsPassword { incorrect: true });
            false
        }
    }

    /// Abandons a pending password prompt and releases the document handle.
    pub fn cancel(&mut self) {
        if self.needs_password() {
            self.document = None;
            self.transition(OpenState::Aborted);
        }
    }

    /// Asks `prompt` until the document unlocks or the prompt is dismissed.
    pub fn run_prompt(&mut self, prompt: &mut dyn PasswordPrompt) {
        while let OpenState::NeedsPassword { incorrect } = self.state {
            match prompt.request(&self.path, incorrect) {
                Some(candidate) => {
                    self.submit_password(&candidate);
                }
                None => self.cancel(),
            }
        }
    }

    pub fn notification(&self) -> Option<Notification> {
        match self.state {
            OpenState::Ready | OpenState::Authenticated => Some(Notification::success(
                "File opened",
                "File has been opened successfully.",
            )),
            OpenState::Rejected(_) | OpenState::Aborted => {
                self.error().map(|err| err.to_notification())
            }
            _ => None,
        }
    }

    pub fn finish(self) -> Result<OpenedDocument, OpenError> {
        match self.state {
            OpenState::Ready | OpenState::Authenticated => match self.document {
                Some(document) => Ok(OpenedDocument {
                    path: self.path,
                    document,
                    password: self.password,
                }),
                None => Err(OpenError::UserAbortedAuthentication),
            },
            OpenState::Rejected(err) => Err(err),
            OpenState::Aborted => Err(OpenError::UserAbortedAuthentication),
            OpenState::NeedsPassword { .. } | OpenState::Unopened | OpenState::OpenAttempted => {
                Err(OpenError::PasswordRequired)
            }
        }
    }
}

/// Opens `path`, prompting for a password when needed.
pub fn open_document(
    opener: &dyn DocumentOpener,
    path: &Path,
    prompt: &mut dyn PasswordPrompt,
) -> Result<OpenedDocument, OpenError> {
    let mut attempt = OpenAttempt::start(opener, path);
    attempt.run_prompt(prompt);
    attempt.finish()
}
