//! Application orchestration layer for Leafview.

use std::collections::VecDeque;
use std::path::Path;

use leafview_core::{Config, DocumentOpener, Notification};

mod error;
mod events;
mod gate;
mod geometry;
mod info;
mod tabs;
mod toc;
mod viewer;

#[cfg(test)]
mod testing;

pub use error::{OpenError, ViewerError};
pub use events::{EventQueue, EventSink, Observers, ViewerEvent};
pub use gate::{OpenAttempt, OpenState, OpenedDocument, PasswordPrompt, open_document};
pub use geometry::{Rect, most_visible_page, stack_pages};
pub use info::DocumentInfo;
pub use tabs::{DocumentTab, Tabs};
pub use toc::{TocNode, TocTree};
pub use viewer::{PageView, Viewer, transform_image};

const MAX_NOTIFICATIONS: usize = 5;

/// What happened to a request to open a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenProgress {
    Opened(usize),
    Focused(usize),
    AwaitingPassword,
    Failed,
}

pub struct AppContext {
    pub config: Config,
    pub tabs: Tabs,
    pub notifications: VecDeque<Notification>,
    pending: Option<OpenAttempt>,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            tabs: Tabs::new(),
            notifications: VecDeque::new(),
            pending: None,
        }
    }

    pub fn notify(&mut self, notification: Notification) {
        tracing::debug!(
            severity = notification.severity.as_str(),
            title = %notification.title,
            message = %notification.message,
            "notification"
        );
        self.notifications.push_back(notification);
        while self.notifications.len() > MAX_NOTIFICATIONS {
            self.notifications.pop_front();
        }
    }

    /// Starts opening `path`. A file whose name is already open only focuses that tab.
    pub fn open_path(&mut self, opener: &dyn DocumentOpener, path: &Path) -> OpenProgress {
        if let Some(idx) = self.tabs.find(path) {
            self.tabs.focus(idx);
            tracing::info!(path = %path.display(), tab = idx, "already open, focusing");
            return OpenProgress::Focused(idx);
        }
        let attempt = OpenAttempt::start(opener, path);
        if attempt.needs_password() {
            self.pending = Some(attempt);
            return OpenProgress::AwaitingPassword;
        }
        self.complete(attempt)
    }

    /// The attempt waiting for a password, if any.
    pub fn pending_password(&self) -> Option<&OpenAttempt> {
        self.pending.as_ref()
    }

    pub fn submit_password(&mut self, candidate: &str) -> OpenProgress {
        let Some(mut attempt) = self.pending.take() else {
            return OpenProgress::Failed;
        };
        if attempt.submit_password(candidate) {
            return self.complete(attempt);
        }
        self.pending = Some(attempt);
        OpenProgress::AwaitingPassword
    }

    pub fn cancel_password(&mut self) -> OpenProgress {
        match self.pending.take() {
            Some(mut attempt) => {
                attempt.cancel();
                self.complete(attempt)
            }
            None => OpenProgress::Failed,
        }
    }

    fn complete(&mut self, attempt: OpenAttempt) -> OpenProgress {
        let notification = attempt.notification();
        let opened = match attempt.finish() {
            Ok(opened) => opened,
            Err(err) => {
                self.notify(err.to_notification());
                return OpenProgress::Failed;
            }
        };
        match DocumentTab::load(opened, &self.config) {
            Ok(tab) => {
                let idx = self.tabs.open(tab);
                if let Some(notification) = notification {
                    self.notify(notification);
                }
                OpenProgress::Opened(idx)
            }
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "document could not be rendered");
                self.notify(
                    OpenError::CorruptOrUnsupportedContent {
                        detail: format!("{err:#}"),
                    }
                    .to_notification(),
                );
                OpenProgress::Failed
            }
        }
    }

    /// Moves viewer notifications into the notification list and returns the rest.
    pub fn drain_viewer_events(&mut self) -> Vec<ViewerEvent> {
        let Some(tab) = self.tabs.active() else {
            return Vec::new();
        };
        let mut other = Vec::new();
        for event in tab.events.drain() {
            match event {
                ViewerEvent::Notify(notification) => self.notify(notification),
                event => other.push(event),
            }
        }
        other
    }
}
