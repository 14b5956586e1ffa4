//! A canvas that records what it is asked to draw.
//!
//! Used by the test suite to assert on layout decisions, and by the CLI's
//! `--pages-only` mode to paginate without producing a file. Text is
//! measured either with the standard Helvetica metrics (the same as the PDF
//! canvas, so page counts agree) or with a fixed advance per character.

use super::{substitute_page_placeholders, Canvas, Rect, TextMeasure};
use crate::error::{CanvasError, FolioError};
use crate::image_loader;
use crate::model::ImageEntry;
use crate::style::{Paint, TextStyle};
use crate::text;

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect {
        rect: Rect,
        paint: Paint,
    },
    Text {
        lines: Vec<String>,
        x: f64,
        y: f64,
        style: TextStyle,
    },
    Image {
        rect: Rect,
    },
}

/// Everything drawn on one page.
#[derive(Debug, Clone, Default)]
pub struct RecordedPage {
    pub width: f64,
    pub height: f64,
    pub ops: Vec<DrawOp>,
}

impl RecordedPage {
    /// All text lines on the page, in draw order.
    pub fn text_lines(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().flat_map(|op| match op {
            DrawOp::Text { lines, .. } => lines.iter().map(String::as_str).collect::<Vec<_>>(),
            _ => Vec::new(),
        })
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.text_lines().any(|line| line.contains(needle))
    }

    pub fn image_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Image { .. }))
            .count()
    }
}

pub struct RecordingCanvas {
    pages: Vec<RecordedPage>,
    char_width: Option<f64>,
}

impl Default for RecordingCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingCanvas {
    /// Measure text with the standard font metrics.
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            char_width: None,
        }
    }

    /// Measure every character as `width` points regardless of style.
    pub fn with_char_width(width: f64) -> Self {
        Self {
            pages: Vec::new(),
            char_width: Some(width),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn push(&mut self, op: DrawOp) {
        match self.pages.last_mut() {
            Some(page) => page.ops.push(op),
            None => log::warn!("draw call before the first page was dropped"),
        }
    }
}

impl TextMeasure for RecordingCanvas {
    fn measure_text(&self, text: &str, max_width: f64, style: &TextStyle) -> Vec<String> {
        match self.char_width {
            Some(w) => text::break_into_lines(text, max_width, |_| w),
            None => text::wrap_standard(text, max_width, style),
        }
    }

    fn text_width(&self, text: &str, style: &TextStyle) -> f64 {
        match self.char_width {
            Some(w) => text.chars().count() as f64 * w,
            None => text::standard_width(text, style),
        }
    }
}

impl Canvas for RecordingCanvas {
    type Output = Vec<RecordedPage>;

    fn new_page(&mut self, width: f64, height: f64) {
        self.pages.push(RecordedPage {
            width,
            height,
            ops: Vec::new(),
        });
    }

    fn draw_rect(&mut self, rect: Rect, paint: Paint) {
        self.push(DrawOp::Rect { rect, paint });
    }

    fn draw_text(&mut self, lines: &[String], x: f64, y: f64, style: &TextStyle) {
        self.push(DrawOp::Text {
            lines: lines.to_vec(),
            x,
            y,
            style: *style,
        });
    }

    fn draw_image(&mut self, image: &ImageEntry, rect: Rect) -> Result<(), CanvasError> {
        image_loader::check_format(&image.data)?;
        self.push(DrawOp::Image { rect });
        Ok(())
    }

    fn finish(mut self) -> Result<Self::Output, FolioError> {
        let total = self.pages.len();
        for (idx, page) in self.pages.iter_mut().enumerate() {
            for op in &mut page.ops {
                if let DrawOp::Text { lines, .. } = op {
                    for line in lines.iter_mut() {
                        *line = substitute_page_placeholders(line, idx + 1, total);
                    }
                }
            }
        }
        Ok(self.pages)
    }
}
