//! Pixel geometry of the stacked page column.

use leafview_core::PageLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    pub fn intersection_area(&self, other: &Rect) -> u64 {
        let w = self
            .right()
            .min(other.right())
            .saturating_sub(u64::from(self.x.max(other.x)));
        let h = self
            .bottom()
            .min(other.bottom())
            .saturating_sub(u64::from(self.y.max(other.y)));
        w * h
    }
}

/// Index of the page with the largest visible area; ties keep the earlier page.
pub fn most_visible_page(pages: &[Rect], viewport: &Rect) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (idx, page) in pages.iter().enumerate() {
        let area = page.intersection_area(viewport);
        if area == 0 {
            continue;
        }
        match best {
            Some((_, best_area)) if area <= best_area => {}
            _ => best = Some((idx, area)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Lays pages out top to bottom, each centered in `content_width`.
pub fn stack_pages(sizes: &[(u32, u32)], layout: &PageLayout, content_width: u32) -> Vec<Rect> {
    let mut y = layout.top_margin;
    sizes
        .iter()
        .map(|&(width, height)| {
            let rect = Rect::new(content_width.saturating_sub(width) / 2, y, width, height);
            y = y.saturating_add(height).saturating_add(layout.page_spacing);
            rect
        })
        .collect()
}

/// Total height of the column including the margin below the last page.
pub fn content_height(sizes: &[(u32, u32)], layout: &PageLayout) -> u32 {
    if sizes.is_empty() {
        return layout.top_margin.saturating_mul(2);
    }
    let pages: u32 = sizes.iter().map(|&(_, h)| h).fold(0, u32::saturating_add);
    let gaps = layout
        .page_spacing
        .saturating_mul(u32::try_from(sizes.len() - 1).unwrap_or(u32::MAX));
    layout
        .top_margin
        .saturating_mul(2)
        .saturating_add(pages)
        .saturating_add(gaps)
}
