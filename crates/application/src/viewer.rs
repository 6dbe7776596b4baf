//! Continuous-scroll page viewer: current-page tracking, page navigation,
//! zoom, fit-to-width and rotation.
//!
//! All coordinates are in display pixels. Every page keeps the bitmap it
//! was rendered with and derives its displayed image from that reference,
//! so repeated zoom and rotate operations never accumulate resampling loss.

use std::time::Instant;

use image::RgbaImage;
use image::imageops::{self, FilterType};
use leafview_core::{Config, Notification, PageBitmap, PageLayout, Rotation, ZoomLimits};

use crate::error::ViewerError;
use crate::events::{EventSink, ViewerEvent};
use crate::geometry::{self, Rect};

pub struct PageView {
    number: u32,
    reference: RgbaImage,
    displayed: RgbaImage,
}

impl PageView {
    pub fn new(number: u32, reference: RgbaImage) -> Self {
        Self {
            number,
            displayed: reference.clone(),
            reference,
        }
    }

    pub fn from_bitmap(number: u32, bitmap: PageBitmap) -> anyhow::Result<Self> {
        let PageBitmap {
            width,
            height,
            pixels,
        } = bitmap;
        let reference = RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow::anyhow!("page {number}: bitmap does not fit {width}x{height}"))?;
        Ok(Self::new(number, reference))
    }

    /// 1-based page number.
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn reference(&self) -> &RgbaImage {
        &self.reference
    }

    pub fn displayed(&self) -> &RgbaImage {
        &self.displayed
    }

    pub fn size(&self) -> (u32, u32) {
        self.displayed.dimensions()
    }

    fn reference_width(&self, rotation: Rotation) -> u32 {
        if rotation.swaps_axes() {
            self.reference.height()
        } else {
            self.reference.width()
        }
    }

    fn redraw(&mut self, rotation: Rotation, zoom: u32) {
        self.displayed = transform_image(&self.reference, rotation, zoom);
    }
}

/// Rotates `reference` clockwise, then scales it to `zoom` percent.
pub fn transform_image(reference: &RgbaImage, rotation: Rotation, zoom: u32) -> RgbaImage {
    let rotated = match rotation {
        Rotation::Deg0 => reference.clone(),
        Rotation::Deg90 => imageops::rotate90(reference),
        Rotation::Deg180 => imageops::rotate180(reference),
        Rotation::Deg270 => imageops::rotate270(reference),
    };
    if zoom == 100 {
        return rotated;
    }
    let (width, height) = rotated.dimensions();
    let width = scale_dimension(width, zoom);
    let height = scale_dimension(height, zoom);
    imageops::resize(&rotated, width, height, FilterType::Triangle)
}

fn scale_dimension(value: u32, zoom: u32) -> u32 {
    let scaled = (u64::from(value) * u64::from(zoom) + 50) / 100;
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

pub struct Viewer {
    pages: Vec<PageView>,
    limits: ZoomLimits,
    layout: PageLayout,
    zoom: u32,
    rotation: Rotation,
    fit_width: bool,
    current_page: u32,
    page_field: String,
    scroll_x: u32,
    scroll_y: u32,
    viewport_width: u32,
    viewport_height: u32,
    events: Box<dyn EventSink>,
}

impl Viewer {
    pub fn new(pages: Vec<PageView>, config: &Config, events: Box<dyn EventSink>) -> Self {
        let current_page = if pages.is_empty() { 0 } else { 1 };
        let mut viewer = Self {
            pages,
            limits: config.zoom,
            layout: config.layout,
            zoom: 100,
            rotation: Rotation::Deg0,
            fit_width: false,
            current_page,
            page_field: current_page.to_string(),
            scroll_x: 0,
            scroll_y: 0,
            viewport_width: 0,
            viewport_height: 0,
            events,
        };
        let initial = viewer.limits.clamp(viewer.limits.default);
        if initial != viewer.zoom {
            viewer.zoom = initial;
            viewer.redraw_pages();
        }
        viewer
    }

    pub fn pages(&self) -> &[PageView] {
        &self.pages
    }

    pub fn page_count(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }

    /// 1-based; 0 only for a document without pages.
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_field(&self) -> &str {
        &self.page_field
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn is_fit_width(&self) -> bool {
        self.fit_width
    }

    pub fn scroll(&self) -> (u32, u32) {
        (self.scroll_x, self.scroll_y)
    }

    pub fn viewport(&self) -> Rect {
        Rect::new(
            self.scroll_x,
            self.scroll_y,
            self.viewport_width,
            self.viewport_height,
        )
    }

    fn page_sizes(&self) -> Vec<(u32, u32)> {
        self.pages.iter().map(PageView::size).collect()
    }

    pub fn content_size(&self) -> (u32, u32) {
        let sizes = self.page_sizes();
        let widest = sizes.iter().map(|&(w, _)| w).max().unwrap_or(0);
        (
            widest.max(self.viewport_width),
            geometry::content_height(&sizes, &self.layout),
        )
    }

    pub fn max_scroll(&self) -> (u32, u32) {
        let (width, height) = self.content_size();
        (
            width.saturating_sub(self.viewport_width),
            height.saturating_sub(self.viewport_height),
        )
    }

    /// Page rectangles in content coordinates.
    pub fn page_rects(&self) -> Vec<Rect> {
        let (content_width, _) = self.content_size();
        geometry::stack_pages(&self.page_sizes(), &self.layout, content_width)
    }

    /// Top edge of page `page` (1-based) before clamping to the scroll range.
    pub fn page_offset(&self, page: u32) -> Option<u32> {
        if page == 0 || page > self.page_count() {
            return None;
        }
        let preceding = self.pages[..(page - 1) as usize]
            .iter()
            .map(|p| p.size().1.saturating_add(self.layout.page_spacing))
            .fold(0u32, u32::saturating_add);
        Some(self.layout.top_margin.saturating_add(preceding))
    }

    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        if (width, height) == (self.viewport_width, self.viewport_height) {
            return;
        }
        self.viewport_width = width;
        self.viewport_height = height;
        if self.fit_width {
            let zoom = self.fit_zoom();
            if zoom != self.zoom {
                self.apply_zoom(zoom);
                return;
            }
        }
        self.clamp_scroll();
        self.track_current_page();
    }

    /// Scroll-position change: clamps, then re-evaluates the current page.
    pub fn set_scroll(&mut self, x: u32, y: u32) {
        self.scroll_x = x;
        self.scroll_y = y;
        self.clamp_scroll();
        self.track_current_page();
    }

    pub fn scroll_by(&mut self, dx: i64, dy: i64) {
        let x = offset_clamped(self.scroll_x, dx);
        let y = offset_clamped(self.scroll_y, dy);
        self.set_scroll(x, y);
    }

    fn clamp_scroll(&mut self) {
        let (max_x, max_y) = self.max_scroll();
        self.scroll_x = self.scroll_x.min(max_x);
        self.scroll_y = self.scroll_y.min(max_y);
    }

    /// Most visible page in the current viewport, 1-based.
    pub fn most_visible_page(&self) -> Option<u32> {
        geometry::most_visible_page(&self.page_rects(), &self.viewport())
            .and_then(|idx| u32::try_from(idx + 1).ok())
    }

    fn track_current_page(&mut self) {
        if let Some(page) = self.most_visible_page() {
            self.set_current_page(page);
        }
        self.page_field = self.current_page.to_string();
    }

    fn set_current_page(&mut self, page: u32) {
        if page != self.current_page {
            self.current_page = page;
            self.events.emit(ViewerEvent::CurrentPageChanged(page));
        }
        self.page_field = page.to_string();
    }

    /// Scrolls so the top edge of `page` meets the top of the viewport.
    pub fn go_to_page(&mut self, page: i64) -> Result<(), ViewerError> {
        let count = self.page_count();
        let target = u32::try_from(page)
            .ok()
            .filter(|p| (1..=count).contains(p));
        let Some(target) = target else {
            return Err(self.reject(ViewerError::PageIndexOutOfRange {
                page,
                page_count: count,
            }));
        };
        self.locate(target);
        Ok(())
    }

    /// Parses typed page-number input and navigates to it.
    pub fn submit_page_field(&mut self, input: &str) -> Result<u32, ViewerError> {
        let trimmed = input.trim();
        let Ok(page) = trimmed.parse::<i64>() else {
            return Err(self.reject(ViewerError::NonNumericPageInput {
                input: trimmed.to_string(),
            }));
        };
        self.go_to_page(page)?;
        Ok(self.current_page)
    }

    /// Does nothing on the last page.
    pub fn next_page(&mut self) -> Result<(), ViewerError> {
        if self.current_page >= self.page_count() {
            return Ok(());
        }
        self.go_to_page(i64::from(self.current_page) + 1)
    }

    /// Does nothing on the first page.
    pub fn previous_page(&mut self) -> Result<(), ViewerError> {
        if self.current_page <= 1 {
            return Ok(());
        }
        self.go_to_page(i64::from(self.current_page) - 1)
    }

    pub fn first_page(&mut self) -> Result<(), ViewerError> {
        self.go_to_page(1)
    }

    pub fn last_page(&mut self) -> Result<(), ViewerError> {
        self.go_to_page(i64::from(self.page_count()))
    }

    fn reject(&mut self, err: ViewerError) -> ViewerError {
        tracing::debug!(error = %err, current = self.current_page, "page navigation rejected");
        self.page_field = self.current_page.to_string();
        self.events.emit(ViewerEvent::Notify(err.to_notification()));
        err
    }

    fn locate(&mut self, page: u32) {
        let Some(offset) = self.page_offset(page) else {
            return;
        };
        let (_, max_y) = self.max_scroll();
        self.scroll_y = offset.min(max_y);
        self.set_current_page(page);
    }

    pub fn zoom_in(&mut self) -> bool {
        if self.zoom >= self.limits.max {
            return self.zoom_limit_reached(self.limits.max, "in beyond");
        }
        self.step_zoom(self.zoom.saturating_add(self.limits.step))
    }

    pub fn zoom_out(&mut self) -> bool {
        if self.zoom <= self.limits.min {
            return self.zoom_limit_reached(self.limits.min, "out below");
        }
        self.step_zoom(self.zoom.saturating_sub(self.limits.step))
    }

    fn zoom_limit_reached(&mut self, limit: u32, direction: &str) -> bool {
        tracing::debug!(zoom = self.zoom, limit, "zoom limit reached");
        self.events.emit(ViewerEvent::ZoomLimitReached { limit });
        self.events.emit(ViewerEvent::Notify(Notification::warning(
            "Zoom limit reached",
            format!("Cannot zoom {direction} {limit}%."),
        )));
        false
    }

    fn step_zoom(&mut self, target: u32) -> bool {
        if self.fit_width {
            self.fit_width = false;
            self.events.emit(ViewerEvent::FitModeChanged(false));
        }
        self.apply_zoom(self.limits.clamp(target));
        true
    }

    /// Toggles fit-to-width; turning it off restores the default zoom.
    pub fn toggle_fit_width(&mut self) {
        self.fit_width = !self.fit_width;
        self.events.emit(ViewerEvent::FitModeChanged(self.fit_width));
        let zoom = if self.fit_width {
            self.fit_zoom()
        } else {
            self.limits.clamp(self.limits.default)
        };
        self.apply_zoom(zoom);
    }

    /// Zoom percent at which the first page spans the viewport minus the fit margin.
    pub fn fit_zoom(&self) -> u32 {
        let Some(first) = self.pages.first() else {
            return self.zoom;
        };
        let reference_width = first.reference_width(self.rotation);
        let available = self.viewport_width.saturating_sub(self.layout.fit_margin);
        if reference_width == 0 || available == 0 {
            return self.limits.min;
        }
        let percent = u64::from(available) * 100 / u64::from(reference_width);
        self.limits
            .clamp(u32::try_from(percent).unwrap_or(u32::MAX))
    }

    pub fn rotate(&mut self) {
        self.rotation = self.rotation.next();
        self.events.emit(ViewerEvent::RotationChanged(self.rotation));
        if self.fit_width {
            let zoom = self.fit_zoom();
            if zoom != self.zoom {
                self.apply_zoom(zoom);
                return;
            }
        }
        self.redraw_pages();
        self.relocate();
    }

    fn apply_zoom(&mut self, zoom: u32) {
        if zoom == self.zoom {
            return;
        }
        self.zoom = zoom;
        self.redraw_pages();
        self.events.emit(ViewerEvent::ZoomChanged(zoom));
        self.relocate();
    }

    fn relocate(&mut self) {
        if self.current_page > 0 {
            self.locate(self.current_page);
        }
        self.clamp_scroll();
    }

    fn redraw_pages(&mut self) {
        let started = Instant::now();
        for page in &mut self.pages {
            page.redraw(self.rotation, self.zoom);
        }
        tracing::debug!(
            pages = self.pages.len(),
            zoom = self.zoom,
            rotation = self.rotation.degrees(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pages redrawn"
        );
    }
}

fn offset_clamped(value: u32, delta: i64) -> u32 {
    let moved = i64::from(value).saturating_add(delta);
    u32::try_from(moved.max(0)).unwrap_or(u32::MAX)
}
