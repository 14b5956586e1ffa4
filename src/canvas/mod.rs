//! # Canvas Capability
//!
//! The drawing and text-measurement interface the layout engine draws through.
//! The engine never knows what kind of document it is producing: it asks a
//! [`TextMeasure`] how text wraps, then issues rectangles, text runs and
//! images to a [`Canvas`].
//!
//! Coordinates are in points with the origin at the top-left corner of the
//! page and y growing downward. Canvases that need another convention (PDF
//! is bottom-left, y-up) flip on their side.
//!
//! Two implementations ship with the crate:
//! - [`RecordingCanvas`]: records draw operations per page, for tests and
//!   pagination previews
//! - [`crate::pdf::PdfCanvas`]: writes a PDF file

mod recording;

pub use recording::{DrawOp, RecordedPage, RecordingCanvas};

use crate::error::{CanvasError, FolioError};
use crate::model::ImageEntry;
use crate::style::{Paint, TextStyle};

/// Replaced by the 1-based number of the page the text is drawn on.
pub const PAGE_NUMBER_PLACEHOLDER: &str = "{{pageNumber}}";

/// Replaced by the final page count of the document.
pub const TOTAL_PAGES_PLACEHOLDER: &str = "{{totalPages}}";

/// An axis-aligned rectangle, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Shrink on all sides. Never produces a negative size.
    pub fn inset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            width: (self.width - 2.0 * dx).max(0.0),
            height: (self.height - 2.0 * dy).max(0.0),
        }
    }
}

/// Text measurement: how a string wraps and how wide it is.
pub trait TextMeasure {
    /// Wrap `text` into lines no wider than `max_width`.
    fn measure_text(&self, text: &str, max_width: f64, style: &TextStyle) -> Vec<String>;

    /// Width of a single line of text.
    fn text_width(&self, text: &str, style: &TextStyle) -> f64;
}

/// A page-oriented drawing surface.
///
/// `new_page` is always called before anything is drawn; every draw call
/// targets the most recently allocated page.
pub trait Canvas: TextMeasure {
    /// What [`Canvas::finish`] produces (PDF bytes, recorded pages...).
    type Output;

    fn new_page(&mut self, width: f64, height: f64);

    fn draw_rect(&mut self, rect: Rect, paint: Paint);

    /// Draw `lines` stacked at `style.line_height`, the first line box's top
    /// edge at `y`.
    fn draw_text(&mut self, lines: &[String], x: f64, y: f64, style: &TextStyle);

    /// Draw an image scaled into `rect`. Failure is recoverable: nothing has
    /// been drawn and the caller decides what to show instead.
    fn draw_image(&mut self, image: &ImageEntry, rect: Rect) -> Result<(), CanvasError>;

    /// Close the document, substituting page-number placeholders.
    fn finish(self) -> Result<Self::Output, FolioError>;
}

/// Replace `{{pageNumber}}` and `{{totalPages}}` in `text`.
pub fn substitute_page_placeholders(text: &str, page_number: usize, total_pages: usize) -> String {
    if !text.contains("{{") {
        return text.to_string();
    }
    text.replace(PAGE_NUMBER_PLACEHOLDER, &page_number.to_string())
        .replace(TOTAL_PAGES_PLACEHOLDER, &total_pages.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_placeholders() {
        assert_eq!(
            substitute_page_placeholders("Page {{pageNumber}} of {{totalPages}}", 2, 7),
            "Page 2 of 7"
        );
        assert_eq!(substitute_page_placeholders("plain", 1, 1), "plain");
    }

    #[test]
    fn test_rect_inset_clamps() {
        let r = Rect::new(10.0, 10.0, 4.0, 20.0).inset(3.0, 2.0);
        assert_eq!(r, Rect::new(13.0, 12.0, 0.0, 16.0));
        assert_eq!(r.bottom(), 28.0);
    }
}
