//! PDF outline (bookmarks) flattened into `(level, title, page)` rows.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context as _;
use leafview_core::TocEntry;
use pdf::file::FileOptions;
use pdf::object::{
    Action, Dest, MaybeNamedDest, OutlineItem, PageTree, PagesNode, PlainRef, RcRef, Resolve,
};
use pdf::primitive::{PdfString, Primitive};

pub(crate) fn read_toc(path: &Path, password: Option<&str>) -> anyhow::Result<Vec<TocEntry>> {
    let options = FileOptions::cached();
    let options = match password {
        Some(password) => options.password(password.as_bytes()),
        None => options,
    };
    let file = options
        .open(path)
        .with_context(|| format!("parse outline of {}", path.display()))?;
    let resolver = file.resolver();
    let catalog = file.get_root();

    let mut dest_pages_by_name: HashMap<String, PlainRef> = HashMap::new();
    if let Some(ref names) = catalog.names
        && let Some(ref dests) = names.dests
    {
        dests.walk(&resolver, &mut |key: &PdfString, val: &Option<Dest>| {
            if let Some(Dest {
                page: Some(page), ..
            }) = val
            {
                dest_pages_by_name.insert(key.to_string_lossy(), page.get_inner());
            }
        })?;
    }

    let mut pages_by_ref: HashMap<PlainRef, u32> = HashMap::new();
    number_pages(&resolver, &mut pages_by_ref, &catalog.pages, &mut 1);

    let targets = Targets {
        pages_by_ref,
        dest_pages_by_name,
    };

    let mut out = Vec::new();
    if let Some(ref outlines) = catalog.outlines
        && let Some(entry_ref) = outlines.first
    {
        let entry = resolver.get(entry_ref)?;
        walk_outline(&resolver, entry, 1, &targets, &mut out);
    }
    tracing::debug!(path = %path.display(), entries = out.len(), "outline read");
    Ok(out)
}

/// Assigns 1-based page numbers to every leaf of the page tree, in order.
fn number_pages(
    r: &impl Resolve,
    pages: &mut HashMap<PlainRef, u32>,
    tree: &PageTree,
    next_page: &mut u32,
) {
    for &node_ref in &tree.kids {
        let Ok(node) = r.get(node_ref) else {
            continue;
        };
        match *node {
            PagesNode::Tree(ref tree) => number_pages(r, pages, tree, next_page),
            PagesNode::Leaf(_) => {
                pages.insert(node_ref.get_inner(), *next_page);
                *next_page = next_page.saturating_add(1);
            }
        }
    }
}

struct Targets {
    pages_by_ref: HashMap<PlainRef, u32>,
    dest_pages_by_name: HashMap<String, PlainRef>,
}

impl Targets {
    fn by_ref(&self, r: PlainRef) -> Option<u32> {
        self.pages_by_ref.get(&r).copied()
    }

    fn by_name(&self, name: &str) -> Option<u32> {
        let page_ref = self.dest_pages_by_name.get(name).copied()?;
        self.by_ref(page_ref)
    }

    fn for_item(&self, item: &OutlineItem) -> Option<u32> {
        let direct = match item.dest {
            Some(Primitive::String(ref s)) => self.by_name(&s.to_string_lossy()),
            Some(Primitive::Array(ref a)) => match a.first() {
                Some(Primitive::Reference(r)) => self.by_ref(*r),
                _ => None,
            },
            _ => None,
        };
        if direct.is_some() {
            return direct;
        }

        match item.action.clone() {
            Some(Action::Goto(MaybeNamedDest::Named(s))) => self.by_name(&s.to_string_lossy()),
            Some(Action::Goto(MaybeNamedDest::Direct(Dest { page: Some(p), .. }))) => {
                self.by_ref(p.get_inner())
            }
            _ => None,
        }
    }
}

fn walk_outline(
    r: &impl Resolve,
    mut node: RcRef<OutlineItem>,
    level: u32,
    targets: &Targets,
    out: &mut Vec<TocEntry>,
) {
    loop {
        let title = node
            .title
            .as_ref()
            .map(|t| t.to_string_lossy())
            .unwrap_or_else(|| "(untitled)".to_string());

        out.push(TocEntry::new(level, title, targets.for_item(&node)));

        if let Some(entry_ref) = node.first
            && let Ok(entry) = r.get(entry_ref)
        {
            walk_outline(r, entry, level + 1, targets, out);
        }

        if let Some(entry_ref) = node.next
            && let Ok(entry) = r.get(entry_ref)
        {
            node = entry;
            continue;
        }

        break;
    }
}
