//! # Layout Engine
//!
//! Places a report's sections onto pages. This is the heart of Folio.
//!
//! Every block is measured into rows first ([`rows`]), then the page break
//! planner ([`page_break`]) decides where the block goes: whole on the
//! current page, whole on the next one, or split between two rows. Only then
//! is anything drawn, so a block is never half-drawn when a break turns out
//! to be necessary.
//!
//! ## Page State
//!
//! A single [`PageState`] tracks the cursor for the whole document. It is
//! owned by the [`ReportRenderer`] and only moves forward: down the page,
//! then to the top of the next one.

pub mod page_break;
pub mod page_state;
pub mod rows;

use serde::{Deserialize, Serialize};

use crate::canvas::{substitute_page_placeholders, Canvas, Rect};
use crate::error::FolioError;
use crate::image_loader;
use crate::model::{Block, Field, Grid, ImageEntry, ImagePair, PageConfig, Table, TextBlock};
use crate::style::{FontWeight, Paint, TextStyle, Theme};

pub use page_break::{decide_fit, plan_fragments, FitDecision, Fragment};
pub use page_state::PageState;
pub use rows::{measure_block, BlockLayout, BlockMetrics, GridRow, RowLayout};

use page_state::EPSILON;
use rows::{GridLayout, ImageLayout, TableLayout, TextLayout};

const ELLIPSIS: &str = "...";
const IMAGE_PLACEHOLDER: &str = "Reference Image";
const CONTINUED_SUFFIX: &str = " (continued)";

/// Row heights, paddings and font sizes, in points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutMetrics {
    pub title_size: f64,
    pub subtitle_size: f64,
    /// Space between the title block and the first section.
    pub title_gap: f64,

    pub section_header_height: f64,
    pub section_header_size: f64,
    pub accent_width: f64,
    /// Space between a section header and its first block.
    pub header_gap: f64,
    /// Space after every block.
    pub block_gap: f64,

    pub grid_row_height: f64,
    /// Total vertical padding of a grid fragment.
    pub grid_padding: f64,
    /// Share of a field cell taken by the label.
    pub label_ratio: f64,
    pub cell_inset: f64,
    pub label_size: f64,
    pub value_size: f64,

    pub table_row_height: f64,
    pub table_font_size: f64,

    pub text_line_height: f64,
    pub text_label_height: f64,
    /// Total vertical padding of a text fragment, excluding the label strip.
    pub text_padding: f64,
    pub text_min_height: f64,
    pub text_inset: f64,

    pub image_max_height: f64,
    pub caption_height: f64,
    pub caption_size: f64,
    pub image_padding: f64,
    pub image_inset: f64,

    pub footer_size: f64,
    pub border_width: f64,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            title_size: 18.0,
            subtitle_size: 10.0,
            title_gap: 12.0,
            section_header_height: 20.0,
            section_header_size: 11.0,
            accent_width: 3.0,
            header_gap: 4.0,
            block_gap: 6.0,
            grid_row_height: 14.0,
            grid_padding: 6.0,
            label_ratio: 0.4,
            cell_inset: 4.0,
            label_size: 8.0,
            value_size: 9.0,
            table_row_height: 16.0,
            table_font_size: 8.0,
            text_line_height: 12.0,
            text_label_height: 12.0,
            text_padding: 8.0,
            text_min_height: 32.0,
            text_inset: 6.0,
            image_max_height: 120.0,
            caption_height: 14.0,
            caption_size: 8.0,
            image_padding: 6.0,
            image_inset: 6.0,
            footer_size: 8.0,
            border_width: 0.5,
        }
    }
}

impl LayoutMetrics {
    /// Reject settings that would give rows or fragments no height.
    pub fn validate(&self) -> Result<(), FolioError> {
        let positive = [
            ("titleSize", self.title_size),
            ("subtitleSize", self.subtitle_size),
            ("sectionHeaderHeight", self.section_header_height),
            ("sectionHeaderSize", self.section_header_size),
            ("gridRowHeight", self.grid_row_height),
            ("labelSize", self.label_size),
            ("valueSize", self.value_size),
            ("tableRowHeight", self.table_row_height),
            ("tableFontSize", self.table_font_size),
            ("textLineHeight", self.text_line_height),
            ("textMinHeight", self.text_min_height),
            ("imageMaxHeight", self.image_max_height),
            ("captionSize", self.caption_size),
            ("footerSize", self.footer_size),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(FolioError::Configuration(format!(
                    "metric {name} must be a positive number, got {value}"
                )));
            }
        }

        let non_negative = [
            ("titleGap", self.title_gap),
            ("accentWidth", self.accent_width),
            ("headerGap", self.header_gap),
            ("blockGap", self.block_gap),
            ("gridPadding", self.grid_padding),
            ("cellInset", self.cell_inset),
            ("textLabelHeight", self.text_label_height),
            ("textPadding", self.text_padding),
            ("textInset", self.text_inset),
            ("captionHeight", self.caption_height),
            ("imagePadding", self.image_padding),
            ("imageInset", self.image_inset),
            ("borderWidth", self.border_width),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(FolioError::Configuration(format!(
                    "metric {name} must be zero or more, got {value}"
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.label_ratio) {
            return Err(FolioError::Configuration(format!(
                "metric labelRatio must be between 0 and 1, got {}",
                self.label_ratio
            )));
        }
        Ok(())
    }
}

/// A recoverable problem met while drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderWarning {
    pub page: usize,
    pub message: String,
}

/// The result of a successful render.
#[derive(Debug)]
pub struct RenderedDocument<T> {
    pub output: T,
    pub page_count: usize,
    pub warnings: Vec<RenderWarning>,
}

/// Draws sections onto a canvas, breaking pages as it goes.
///
/// One renderer per document. The first page is allocated on construction.
pub struct ReportRenderer<C: Canvas> {
    state: PageState,
    canvas: C,
    metrics: LayoutMetrics,
    theme: Theme,
    footer: Option<String>,
    warnings: Vec<RenderWarning>,
}

impl<C: Canvas> ReportRenderer<C> {
    pub fn new(
        config: &PageConfig,
        metrics: LayoutMetrics,
        theme: Theme,
        mut canvas: C,
    ) -> Result<Self, FolioError> {
        let state = PageState::new(config)?;
        metrics.validate()?;
        canvas.new_page(state.page_width, state.page_height);

        let mut renderer = Self {
            state,
            canvas,
            metrics,
            theme,
            footer: config.footer.clone().filter(|f| !f.trim().is_empty()),
            warnings: Vec::new(),
        };
        renderer.draw_footer();
        Ok(renderer)
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn warnings(&self) -> &[RenderWarning] {
        &self.warnings
    }

    /// Draw the report title, an optional subtitle and a rule under them.
    pub fn render_title(&mut self, title: &str, subtitle: Option<&str>) -> Result<(), FolioError> {
        let width = self.state.content_width();
        let title_style = TextStyle::new(self.metrics.title_size, FontWeight::Bold, self.theme.title_text);
        let subtitle_style =
            TextStyle::new(self.metrics.subtitle_size, FontWeight::Regular, self.theme.subtitle_text);

        let title_lines = self.canvas.measure_text(title, width, &title_style);
        let subtitle_lines = subtitle
            .filter(|s| !s.trim().is_empty())
            .map(|s| self.canvas.measure_text(s, width, &subtitle_style))
            .unwrap_or_default();

        let rule_gap = 4.0;
        let height = title_lines.len() as f64 * title_style.line_height
            + subtitle_lines.len() as f64 * subtitle_style.line_height
            + rule_gap
            + self.metrics.border_width;

        self.ensure_room(height, "report title")?;

        let x = self.state.left_margin;
        let mut y = self.state.cursor_y;
        self.canvas.draw_text(&title_lines, x, y, &title_style);
        y += title_lines.len() as f64 * title_style.line_height;
        if !subtitle_lines.is_empty() {
            self.canvas.draw_text(&subtitle_lines, x, y, &subtitle_style);
            y += subtitle_lines.len() as f64 * subtitle_style.line_height;
        }
        self.canvas.draw_rect(
            Rect::new(x, y + rule_gap, width, self.metrics.border_width),
            Paint::Fill(self.theme.section_accent),
        );

        self.state.advance(height)?;
        self.state.skip(self.metrics.title_gap);
        Ok(())
    }

    /// Draw a titled section and all of its blocks.
    ///
    /// Every block is validated and measured before anything is drawn. The
    /// header stays on the same page as the opening rows of the first block.
    pub fn render_section(&mut self, title: &str, blocks: &[Block]) -> Result<(), FolioError> {
        let content_width = self.state.content_width();
        let layouts = blocks
            .iter()
            .map(|block| -> Result<BlockLayout, FolioError> {
                block.validate()?;
                Ok(measure_block(block, content_width, &self.metrics, &self.canvas))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let header_height = self.metrics.section_header_height;
        let leading = layouts
            .iter()
            .find(|layout| !layout.is_empty())
            .map(|layout| page_break::opening_height(layout, 0))
            .unwrap_or(0.0);
        let needed = header_height + self.metrics.header_gap + leading;
        if needed > self.state.page_capacity() + EPSILON {
            // No page can hold both; the header stays where it is and the
            // block starts on the next page.
            log::warn!(
                "section '{title}' needs {needed:.1}pt to open but a page holds {:.1}pt",
                self.state.page_capacity()
            );
        } else if !self.state.is_at_page_top() && needed > self.state.remaining_space() + EPSILON {
            log::debug!(
                "section '{title}' needs {needed:.1}pt to open, {:.1}pt left: moving to a new page",
                self.state.remaining_space()
            );
            self.new_page();
        }

        self.ensure_room(header_height, &format!("section header '{title}'"))?;
        self.draw_section_header(title);
        self.state.advance(header_height)?;
        self.state.skip(self.metrics.header_gap);

        for (block, layout) in blocks.iter().zip(&layouts) {
            if layout.is_empty() {
                log::debug!("skipping empty {}", block.describe());
                continue;
            }
            self.render_block(block, layout)?;
            self.state.skip(self.metrics.block_gap);
        }

        Ok(())
    }

    /// Close the document.
    pub fn finalize(self) -> Result<RenderedDocument<C::Output>, FolioError> {
        let page_count = self.state.page_number;
        let output = self.canvas.finish()?;
        log::info!(
            "rendered {page_count} page(s) with {} warning(s)",
            self.warnings.len()
        );
        Ok(RenderedDocument {
            output,
            page_count,
            warnings: self.warnings,
        })
    }

    // ─── Pagination ─────────────────────────────────────────────

    fn new_page(&mut self) {
        self.state.start_new_page(&mut self.canvas);
        self.draw_footer();
    }

    /// Make sure an unsplittable element of `height` fits, breaking the page
    /// when it doesn't. Fails when it can't fit on any page.
    fn ensure_room(&mut self, height: f64, what: &str) -> Result<(), FolioError> {
        if height <= self.state.remaining_space() + EPSILON {
            return Ok(());
        }
        if height > self.state.page_capacity() + EPSILON {
            return Err(FolioError::Sizing {
                what: what.to_string(),
                required: height,
                available: self.state.page_capacity(),
            });
        }
        self.new_page();
        Ok(())
    }

    fn render_block(&mut self, block: &Block, layout: &BlockLayout) -> Result<(), FolioError> {
        let what = block.describe();
        let fragments = plan_fragments(
            layout,
            self.state.remaining_space(),
            self.state.page_capacity(),
            self.state.is_at_page_top(),
            &what,
        )?;
        if fragments.len() > 1 {
            log::debug!("{what} split into {} fragments", fragments.len());
        }

        for fragment in fragments {
            if fragment.break_before {
                self.new_page();
            }
            let area = Rect::new(
                self.state.left_margin,
                self.state.cursor_y,
                self.state.content_width(),
                fragment.height,
            );
            match (block, layout) {
                (Block::Grid(grid), BlockLayout::Grid(l)) => self.draw_grid(grid, l, &fragment, area),
                (Block::Table(table), BlockLayout::Table(l)) => {
                    self.draw_table(table, l, &fragment, area)
                }
                (Block::Text(text), BlockLayout::Text(l)) => self.draw_text_block(text, l, &fragment, area),
                (Block::Images(pair), BlockLayout::Images(l)) => self.draw_images(pair, l, area),
                _ => {
                    return Err(FolioError::InvalidBlock(format!(
                        "layout does not belong to {what}"
                    )))
                }
            }
            self.state.advance(fragment.height)?;
        }
        Ok(())
    }

    // ─── Drawing ────────────────────────────────────────────────

    fn draw_footer(&mut self) {
        let Some(template) = self.footer.clone() else {
            return;
        };
        let style = TextStyle::new(self.metrics.footer_size, FontWeight::Regular, self.theme.footer_text);
        if self.state.bottom_reserve < style.line_height {
            log::debug!("bottom reserve too small for a footer");
            return;
        }
        // The total isn't known yet; assume it has as many digits as the
        // current page number.
        let n = self.state.page_number;
        let estimate = substitute_page_placeholders(&template, n, n);
        let width = self.canvas.text_width(&estimate, &style);
        let x = self.state.left_margin + (self.state.content_width() - width).max(0.0) / 2.0;
        let y = self.state.content_bottom() + (self.state.bottom_reserve - style.line_height) / 2.0;
        self.canvas.draw_text(&[template], x, y, &style);
    }

    fn draw_section_header(&mut self, title: &str) {
        let m = &self.metrics;
        let band = Rect::new(
            self.state.left_margin,
            self.state.cursor_y,
            self.state.content_width(),
            m.section_header_height,
        );
        let style = TextStyle::new(m.section_header_size, FontWeight::Bold, self.theme.section_text)
            .with_line_height(m.section_header_height);
        let text_x = band.x + m.accent_width + m.cell_inset * 2.0;
        let title = self.truncate(title, band.right() - text_x - m.cell_inset, &style);

        self.canvas.draw_rect(band, Paint::Fill(self.theme.section_fill));
        self.canvas.draw_rect(
            Rect::new(band.x, band.y, m.accent_width, band.height),
            Paint::Fill(self.theme.section_accent),
        );
        self.canvas.draw_text(&[title], text_x, band.y, &style);
    }

    fn draw_grid(&mut self, grid: &Grid, layout: &GridLayout, fragment: &Fragment, area: Rect) {
        self.canvas.draw_rect(area, self.border());

        let half = area.width / 2.0;
        let mut y = area.y + layout.padding / 2.0;
        for row in &layout.rows[fragment.rows.clone()] {
            match *row {
                GridRow::Pair(left, right) => {
                    self.draw_field(&grid.fields[left], Rect::new(area.x, y, half, layout.row_height));
                    if let Some(right) = right {
                        self.draw_field(
                            &grid.fields[right],
                            Rect::new(area.x + half, y, half, layout.row_height),
                        );
                    }
                }
                GridRow::Wide(index) => {
                    self.draw_field(&grid.fields[index], Rect::new(area.x, y, area.width, layout.row_height));
                }
            }
            y += layout.row_height;
        }
    }

    fn draw_field(&mut self, field: &Field, cell: Rect) {
        let m = &self.metrics;
        let inset = m.cell_inset;
        let label_width = cell.width * m.label_ratio;
        let label_style = TextStyle::new(m.label_size, FontWeight::Bold, self.theme.label_text)
            .with_line_height(cell.height);
        let value_style = TextStyle::new(m.value_size, FontWeight::Regular, self.theme.value_text)
            .with_line_height(cell.height);

        let label = self.truncate(&field.label, (label_width - 2.0 * inset).max(0.0), &label_style);
        let value = self.truncate(
            field.display_value(),
            (cell.width - label_width - 2.0 * inset).max(0.0),
            &value_style,
        );
        if !label.is_empty() {
            self.canvas.draw_text(&[label], cell.x + inset, cell.y, &label_style);
        }
        if !value.is_empty() {
            self.canvas.draw_text(&[value], cell.x + label_width + inset, cell.y, &value_style);
        }
    }

    fn draw_table(&mut self, table: &Table, layout: &TableLayout, fragment: &Fragment, area: Rect) {
        let h = layout.row_height;
        let mut y = area.y;

        if layout.repeats_header_at(fragment.rows.start) {
            self.draw_table_row(&table.headers, &layout.columns, Rect::new(area.x, y, area.width, h), None);
            y += h;
        }

        for index in fragment.rows.clone() {
            let row_rect = Rect::new(area.x, y, area.width, h);
            if index == 0 {
                self.draw_table_row(&table.headers, &layout.columns, row_rect, None);
            } else {
                // Stripes follow the data row index so they stay stable
                // across pages.
                let data_index = index - 1;
                self.draw_table_row(&table.rows[data_index], &layout.columns, row_rect, Some(data_index));
            }
            y += h;
        }
    }

    /// `data_index` is `None` for the header row.
    fn draw_table_row(&mut self, cells: &[String], columns: &[f64], rect: Rect, data_index: Option<usize>) {
        let m = &self.metrics;
        let (style, fill) = match data_index {
            None => (
                TextStyle::new(m.table_font_size, FontWeight::Bold, self.theme.table_header_text),
                Some(self.theme.table_header_fill),
            ),
            Some(i) => (
                TextStyle::new(m.table_font_size, FontWeight::Regular, self.theme.value_text),
                (i % 2 == 1).then_some(self.theme.table_stripe_fill),
            ),
        };
        let style = style.with_line_height(rect.height);
        let inset = m.cell_inset;

        if let Some(color) = fill {
            self.canvas.draw_rect(rect, Paint::Fill(color));
        }
        self.canvas.draw_rect(rect, self.border());

        let mut x = rect.x;
        for (cell, &width) in cells.iter().zip(columns) {
            let text = self.truncate(cell, width - 2.0 * inset, &style);
            self.canvas.draw_text(&[text], x + inset, rect.y, &style);
            x += width;
        }
    }

    fn draw_text_block(&mut self, block: &TextBlock, layout: &TextLayout, fragment: &Fragment, area: Rect) {
        let m = &self.metrics;
        let inset = m.text_inset;
        let label_style = TextStyle::new(m.label_size, FontWeight::Bold, self.theme.label_text)
            .with_line_height(m.text_label_height);
        let value_style = rows::text_value_style(m, self.theme.value_text);

        let label = if fragment.rows.start > 0 {
            format!("{}{}", block.label, CONTINUED_SUFFIX)
        } else {
            block.label.clone()
        };
        let label = self.truncate(&label, area.width - 2.0 * inset, &label_style);

        let top = area.y + m.text_padding / 2.0;
        let lines_top = top + m.text_label_height;

        self.canvas.draw_rect(area, self.border());
        self.canvas.draw_text(&[label], area.x + inset, top, &label_style);

        if layout.lines.is_empty() {
            self.canvas.draw_text(&["-".to_string()], area.x + inset, lines_top, &value_style);
        } else {
            self.canvas
                .draw_text(&layout.lines[fragment.rows.clone()], area.x + inset, lines_top, &value_style);
        }
    }

    fn draw_images(&mut self, pair: &ImagePair, layout: &ImageLayout, area: Rect) {
        let m = &self.metrics;
        let slot_width = area.width / 2.0;
        let top = area.y + layout.padding / 2.0;

        let slots: Vec<f64> = match pair.images.len() {
            1 => vec![area.x + slot_width / 2.0],
            _ => vec![area.x, area.x + slot_width],
        };

        let image_max_height = m.image_max_height;
        let image_inset = m.image_inset;
        for (image, slot_x) in pair.images.iter().zip(slots) {
            let frame = Rect::new(slot_x, top, slot_width, image_max_height).inset(image_inset, 0.0);
            self.draw_image_in(image, frame);

            if let Some(caption) = image.caption.as_deref().filter(|c| !c.trim().is_empty()) {
                self.draw_caption(caption, Rect::new(frame.x, frame.bottom(), frame.width, layout.row_height - image_max_height));
            }
        }
    }

    /// Scale `image` into `frame` preserving its aspect ratio; draw a
    /// placeholder when the canvas can't draw it.
    fn draw_image_in(&mut self, image: &ImageEntry, frame: Rect) {
        let (pw, ph) = if image.has_dimensions() {
            (image.pixel_width, image.pixel_height)
        } else {
            image_loader::probe_dimensions(&image.data).unwrap_or((0, 0))
        };

        let target = if pw > 0 && ph > 0 {
            let scale = (frame.width / pw as f64).min(frame.height / ph as f64);
            let (w, h) = (pw as f64 * scale, ph as f64 * scale);
            Rect::new(
                frame.x + (frame.width - w) / 2.0,
                frame.y + (frame.height - h) / 2.0,
                w,
                h,
            )
        } else {
            frame
        };

        if let Err(e) = self.canvas.draw_image(image, target) {
            log::warn!("page {}: {e}; drawing placeholder", self.state.page_number);
            self.warnings.push(RenderWarning {
                page: self.state.page_number,
                message: e.to_string(),
            });
            self.draw_image_placeholder(frame);
        }
    }

    fn draw_image_placeholder(&mut self, frame: Rect) {
        let style = TextStyle::new(self.metrics.caption_size, FontWeight::Regular, self.theme.placeholder_text)
            .with_line_height(frame.height);
        let width = self.canvas.text_width(IMAGE_PLACEHOLDER, &style);
        self.canvas.draw_rect(frame, self.border());
        self.canvas.draw_text(
            &[IMAGE_PLACEHOLDER.to_string()],
            frame.x + (frame.width - width).max(0.0) / 2.0,
            frame.y,
            &style,
        );
    }

    fn draw_caption(&mut self, caption: &str, strip: Rect) {
        let style = TextStyle::new(self.metrics.caption_size, FontWeight::Regular, self.theme.label_text)
            .with_line_height(strip.height);
        let text = self.truncate(caption, strip.width, &style);
        let width = self.canvas.text_width(&text, &style);
        self.canvas
            .draw_text(&[text], strip.x + (strip.width - width).max(0.0) / 2.0, strip.y, &style);
    }

    fn border(&self) -> Paint {
        Paint::Stroke {
            color: self.theme.border,
            width: self.metrics.border_width,
        }
    }

    /// Cut `text` to `max_width`, ending in `...` when anything was cut.
    fn truncate(&self, text: &str, max_width: f64, style: &TextStyle) -> String {
        truncate_to_width(text, max_width, |ch| {
            let mut buf = [0u8; 4];
            self.canvas.text_width(ch.encode_utf8(&mut buf), style)
        })
    }
}

/// Shorten `text` so that it, plus an ellipsis, fits in `max_width`.
///
/// Widths are summed per character in a single pass. Returns an empty string
/// when not even the ellipsis fits.
pub fn truncate_to_width(text: &str, max_width: f64, char_width: impl Fn(char) -> f64) -> String {
    let limit = max_width + EPSILON;
    if text.chars().map(&char_width).sum::<f64>() <= limit {
        return text.to_string();
    }
    let ellipsis: f64 = ELLIPSIS.chars().map(&char_width).sum();
    if ellipsis > limit {
        return String::new();
    }

    // byte end of the longest fitting prefix, trailing whitespace excluded
    let mut cut = 0;
    let mut width = 0.0;
    for (i, ch) in text.char_indices() {
        width += char_width(ch);
        if width + ellipsis > limit {
            break;
        }
        if !ch.is_whitespace() {
            cut = i + ch.len_utf8();
        }
    }
    format!("{}{ELLIPSIS}", &text[..cut])
}
