//! # Page State
//!
//! The single mutable geometry tracker for one document: where the cursor is
//! on the current page, how much room is left above the bottom reserve, and
//! which page we are on.
//!
//! The cursor only ever moves down within a page. Callers check
//! [`PageState::remaining_space`] before advancing; an advance that would
//! cross the bottom reserve is a bug in the caller, not a page break.

use crate::canvas::Canvas;
use crate::error::FolioError;
use crate::model::PageConfig;

/// Tolerance for comparing accumulated point values.
pub(crate) const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct PageState {
    pub page_width: f64,
    pub page_height: f64,
    pub left_margin: f64,
    pub right_margin: f64,
    pub top_margin: f64,
    /// Space kept free at the bottom of every page (footer area).
    pub bottom_reserve: f64,
    /// Distance of the cursor from the top edge of the page.
    pub cursor_y: f64,
    /// 1-based.
    pub page_number: usize,
}

impl PageState {
    pub fn new(config: &PageConfig) -> Result<Self, FolioError> {
        let (page_width, page_height) = config.size.dimensions();
        let margin = config.margin;

        if !(page_width.is_finite() && page_height.is_finite())
            || page_width <= 0.0
            || page_height <= 0.0
        {
            return Err(FolioError::Configuration(format!(
                "page size must be positive, got {page_width}x{page_height}"
            )));
        }
        if [margin.top, margin.right, margin.bottom, margin.left]
            .iter()
            .any(|m| !m.is_finite() || *m < 0.0)
        {
            return Err(FolioError::Configuration(
                "margins must be finite and non-negative".to_string(),
            ));
        }
        if page_width - margin.horizontal() <= 0.0 {
            return Err(FolioError::Configuration(format!(
                "left and right margins ({:.1}pt) leave no content width on a {:.1}pt wide page",
                margin.horizontal(),
                page_width
            )));
        }
        if margin.bottom >= page_height {
            return Err(FolioError::Configuration(format!(
                "bottom reserve {:.1}pt is not smaller than the page height {:.1}pt",
                margin.bottom, page_height
            )));
        }
        if margin.vertical() >= page_height {
            return Err(FolioError::Configuration(format!(
                "top margin and bottom reserve ({:.1}pt) leave no usable height on a {:.1}pt tall page",
                margin.vertical(),
                page_height
            )));
        }

        Ok(Self {
            page_width,
            page_height,
            left_margin: margin.left,
            right_margin: margin.right,
            top_margin: margin.top,
            bottom_reserve: margin.bottom,
            cursor_y: margin.top,
            page_number: 1,
        })
    }

    pub fn content_width(&self) -> f64 {
        self.page_width - self.left_margin - self.right_margin
    }

    /// The lowest y the cursor may reach.
    pub fn content_bottom(&self) -> f64 {
        self.page_height - self.bottom_reserve
    }

    pub fn remaining_space(&self) -> f64 {
        (self.content_bottom() - self.cursor_y).max(0.0)
    }

    /// Usable height of a fresh page.
    pub fn page_capacity(&self) -> f64 {
        self.content_bottom() - self.top_margin
    }

    pub fn is_at_page_top(&self) -> bool {
        (self.cursor_y - self.top_margin).abs() < EPSILON
    }

    /// Move the cursor down by `height`.
    ///
    /// A non-positive height, or one that would cross the bottom reserve, is
    /// rejected: the cursor is clamped to the content bottom and an error is
    /// returned.
    pub fn advance(&mut self, height: f64) -> Result<(), FolioError> {
        if !height.is_finite() || height <= 0.0 {
            let msg = format!("advance by {height} on page {}", self.page_number);
            log::error!("{msg}");
            return Err(FolioError::Cursor(msg));
        }
        if height > self.remaining_space() + EPSILON {
            let msg = format!(
                "advance by {:.2}pt with only {:.2}pt left on page {}",
                height,
                self.remaining_space(),
                self.page_number
            );
            log::error!("{msg}");
            self.cursor_y = self.content_bottom();
            return Err(FolioError::Cursor(msg));
        }
        self.cursor_y = (self.cursor_y + height).min(self.content_bottom());
        Ok(())
    }

    /// Consume decorative spacing, at most what is left on the page.
    pub fn skip(&mut self, gap: f64) {
        if gap > 0.0 {
            self.cursor_y = (self.cursor_y + gap).min(self.content_bottom());
        }
    }

    /// Move to the top of a fresh page and have the canvas allocate it.
    pub fn start_new_page<C: Canvas>(&mut self, canvas: &mut C) {
        self.cursor_y = self.top_margin;
        self.page_number += 1;
        canvas.new_page(self.page_width, self.page_height);
        log::debug!("started page {}", self.page_number);
    }
}
