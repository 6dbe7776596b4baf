//! Table of contents as a forest built from flat `(level, title, page)` rows.

use leafview_core::TocEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocNode {
    pub entry: TocEntry,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub depth: usize,
}

/// Nodes are stored in input order, which is also pre-order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocTree {
    nodes: Vec<TocNode>,
    roots: Vec<usize>,
}

impl TocTree {
    /// Builds the forest. Each entry becomes a child of the nearest preceding
    /// entry one level shallower; level-1 entries are roots. Levels below 1
    /// are treated as 1.
    pub fn build(entries: &[TocEntry]) -> Self {
        let mut nodes: Vec<TocNode> = Vec::with_capacity(entries.len());
        let mut roots = Vec::new();
        let mut stack: Vec<usize> = Vec::new();

        for entry in entries {
            let level = entry.level.max(1) as usize;
            let index = nodes.len();
            stack.truncate(level - 1);
            let parent = stack.last().copied();
            stack.push(index);

            let depth = match parent {
                Some(parent) => {
                    nodes[parent].children.push(index);
                    nodes[parent].depth + 1
                }
                None => {
                    roots.push(index);
                    0
                }
            };
            nodes.push(TocNode {
                entry: entry.clone(),
                parent,
                children: Vec::new(),
                depth,
            });
        }

        Self { nodes, roots }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[TocNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&TocNode> {
        self.nodes.get(index)
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn children(&self, index: usize) -> &[usize] {
        self.nodes
            .get(index)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.nodes.get(index).and_then(|node| node.parent)
    }

    /// Titles from the root down to `index`.
    pub fn path(&self, index: usize) -> Vec<&str> {
        let mut titles = Vec::new();
        let mut cursor = Some(index);
        while let Some(idx) = cursor {
            let Some(node) = self.nodes.get(idx) else {
                break;
            };
            titles.push(node.entry.title.as_str());
            cursor = node.parent;
        }
        titles.reverse();
        titles
    }

    /// Last entry (in reading order) that starts at or before `page`.
    pub fn nearest_entry_for_page(&self, page: u32) -> Option<usize> {
        let mut best = None;
        for (idx, node) in self.nodes.iter().enumerate() {
            match node.entry.page {
                Some(entry_page) if entry_page <= page => best = Some(idx),
                Some(_) => break,
                None => {}
            }
        }
        best
    }
}
