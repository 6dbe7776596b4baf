//! Composes the visible slice of the page column into one image.

use image::{Rgba, RgbaImage};
use leafview_application::Viewer;

const BACKDROP: Rgba<u8> = Rgba([96, 96, 96, 255]);

/// Converts a cell area into pixels using the terminal font size.
pub(crate) fn cells_to_pixels(cols: u16, rows: u16, font_size: (u16, u16)) -> (u32, u32) {
    let (font_w, font_h) = font_size;
    (
        u32::from(cols).saturating_mul(u32::from(font_w.max(1))),
        u32::from(rows).saturating_mul(u32::from(font_h.max(1))),
    )
}

/// Draws every page that intersects the viewer's viewport onto a backdrop.
pub(crate) fn compose_viewport(viewer: &Viewer) -> RgbaImage {
    let viewport = viewer.viewport();
    let mut canvas = RgbaImage::from_pixel(
        viewport.width.max(1),
        viewport.height.max(1),
        BACKDROP,
    );
    for (page, rect) in viewer.pages().iter().zip(viewer.page_rects()) {
        if rect.intersection_area(&viewport) == 0 {
            continue;
        }
        let x = i64::from(rect.x) - i64::from(viewport.x);
        let y = i64::from(rect.y) - i64::from(viewport.y);
        image::imageops::overlay(&mut canvas, page.displayed(), x, y);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use leafview_application::{EventQueue, PageView};
    use leafview_core::Config;

    use super::*;

    fn viewer() -> Viewer {
        let pages = [Rgba([255, 0, 0, 255]), Rgba([0, 0, 255, 255])]
            .into_iter()
            .enumerate()
            .map(|(i, color)| PageView::new(i as u32 + 1, RgbaImage::from_pixel(40, 40, color)))
            .collect();
        let mut viewer = Viewer::new(pages, &Config::default(), Box::new(EventQueue::new()));
        viewer.set_viewport_size(60, 50);
        viewer
    }

    #[test]
    fn pixels_follow_font_size() {
        assert_eq!(cells_to_pixels(10, 4, (8, 16)), (80, 64));
        assert_eq!(cells_to_pixels(10, 4, (0, 0)), (10, 4));
    }

    #[test]
    fn pages_are_drawn_at_their_offsets() {
        let mut viewer = viewer();
        let canvas = compose_viewport(&viewer);
        assert_eq!(canvas.dimensions(), (60, 50));
        // Top margin, then the first page centered horizontally.
        assert_eq!(*canvas.get_pixel(30, 5), BACKDROP);
        assert_eq!(*canvas.get_pixel(30, 20), Rgba([255, 0, 0, 255]));
        assert_eq!(*canvas.get_pixel(5, 20), BACKDROP);

        viewer.set_scroll(0, 52);
        let canvas = compose_viewport(&viewer);
        // Page two starts at y = 10 + 40 + 12 = 62, i.e. 10px into the viewport.
        assert_eq!(*canvas.get_pixel(30, 15), Rgba([0, 0, 255, 255]));
    }
}
