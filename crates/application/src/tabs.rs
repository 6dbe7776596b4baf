use std::path::{Path, PathBuf};

use anyhow::Context as _;
use leafview_core::{Config, Document, file_name_key};

use crate::events::EventQueue;
use crate::gate::OpenedDocument;
use crate::info::DocumentInfo;
use crate::toc::TocTree;
use crate::viewer::{PageView, Viewer};

/// One open document with its viewer state.
pub struct DocumentTab {
    pub key: String,
    pub path: PathBuf,
    pub document: Box<dyn Document>,
    pub password: Option<String>,
    pub viewer: Viewer,
    pub toc: TocTree,
    pub info: DocumentInfo,
    pub events: EventQueue,
}

impl DocumentTab {
    /// Renders every page at the configured scale and builds the side panels.
    pub fn load(opened: OpenedDocument, config: &Config) -> anyhow::Result<Self> {
        let OpenedDocument {
            path,
            document,
            password,
        } = opened;
        let bitmaps = document
            .render_pages(config.render_scale())
            .with_context(|| format!("render {}", path.display()))?;
        let pages = bitmaps
            .into_iter()
            .zip(1u32..)
            .map(|(bitmap, number)| PageView::from_bitmap(number, bitmap))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let entries = match document.toc() {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %format!("{err:#}"), "outline unavailable");
                Vec::new()
            }
        };
        let toc = TocTree::build(&entries);
        let info = DocumentInfo::collect(&path, document.as_ref());
        let events = EventQueue::new();
        let viewer = Viewer::new(pages, config, Box::new(events.clone()));

        tracing::info!(
            path = %path.display(),
            pages = viewer.page_count(),
            outline = toc.len(),
            "document loaded"
        );
        Ok(Self {
            key: file_name_key(&path),
            path,
            document,
            password,
            viewer,
            toc,
            info,
            events,
        })
    }

    /// Extracted text of the current page.
    pub fn current_page_text(&self) -> anyhow::Result<String> {
        let page = self.viewer.current_page();
        if page == 0 {
            return Ok(String::new());
        }
        self.document.page_text(page - 1)
    }
}

/// Open tabs in insertion order, keyed by file name.
#[derive(Default)]
pub struct Tabs {
    tabs: Vec<DocumentTab>,
    active: usize,
}

impl Tabs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentTab> {
        self.tabs.iter()
    }

    /// Tab index for `path`; any file with the same name matches.
    pub fn find(&self, path: &Path) -> Option<usize> {
        let key = file_name_key(path);
        self.tabs.iter().position(|tab| tab.key == key)
    }

    /// Appends `tab` and focuses it, or focuses the existing tab with the same key.
    pub fn open(&mut self, tab: DocumentTab) -> usize {
        if let Some(idx) = self.tabs.iter().position(|t| t.key == tab.key) {
            self.active = idx;
            return idx;
        }
        self.tabs.push(tab);
        self.active = self.tabs.len() - 1;
        self.active
    }

    pub fn close(&mut self, index: usize) -> Option<DocumentTab> {
        if index >= self.tabs.len() {
            return None;
        }
        let tab = self.tabs.remove(index);
        if self.active > index || self.active >= self.tabs.len() {
            self.active = self.active.saturating_sub(1);
        }
        tracing::info!(path = %tab.path.display(), "tab closed");
        Some(tab)
    }

    pub fn close_active(&mut self) -> Option<DocumentTab> {
        self.close(self.active)
    }

    pub fn active_index(&self) -> Option<usize> {
        (!self.tabs.is_empty()).then_some(self.active)
    }

    pub fn active(&self) -> Option<&DocumentTab> {
        self.tabs.get(self.active)
    }

    pub fn active_mut(&mut self) -> Option<&mut DocumentTab> {
        self.tabs.get_mut(self.active)
    }

    pub fn focus(&mut self, index: usize) -> bool {
        if index < self.tabs.len() {
            self.active = index;
            true
        } else {
            false
        }
    }

    pub fn focus_next(&mut self) {
        if !self.tabs.is_empty() {
            self.active = (self.active + 1) % self.tabs.len();
        }
    }

    pub fn focus_previous(&mut self) {
        if !self.tabs.is_empty() {
            self.active = (self.active + self.tabs.len() - 1) % self.tabs.len();
        }
    }
}
