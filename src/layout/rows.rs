//! # Row-Height Calculator
//!
//! Turns a [`Block`] into its ordered list of atomic rows and their heights.
//! The result is a [`BlockLayout`], which both the fit/split decision and
//! the drawing code consume, so rows are assigned exactly once per block.
//!
//! Every block kind implements [`RowLayout`], the one capability the page
//! break logic needs: "has ordered rows with heights, plus a fixed per-fragment
//! overhead".

use std::ops::Range;

use super::LayoutMetrics;
use crate::canvas::TextMeasure;
use crate::model::{Block, Field, Span, Table};
use crate::style::{Color, FontWeight, TextStyle};

/// Ordered rows with heights.
pub trait RowLayout {
    fn row_count(&self) -> usize;

    fn row_height(&self, index: usize) -> f64;

    /// Fixed height every fragment starting at row `start` pays on top of its
    /// rows: padding, a label strip, a repeated table header.
    fn fragment_chrome(&self, _start: usize) -> f64 {
        0.0
    }

    /// No fragment is ever shorter than this.
    fn min_fragment_height(&self) -> f64 {
        0.0
    }

    /// How many rows must open a fragment starting at `start` together.
    fn min_leading_rows(&self, _start: usize) -> usize {
        1
    }

    fn rows_height(&self, rows: Range<usize>) -> f64 {
        rows.map(|i| self.row_height(i)).sum()
    }

    /// Height of a fragment holding exactly `rows`.
    fn fragment_height(&self, rows: Range<usize>) -> f64 {
        let chrome = self.fragment_chrome(rows.start);
        (chrome + self.rows_height(rows)).max(self.min_fragment_height())
    }

    fn total_height(&self) -> f64 {
        self.fragment_height(0..self.row_count())
    }
}

/// The `(row_count, row_height, total_height)` summary of a measured block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockMetrics {
    pub row_count: usize,
    pub row_height: f64,
    pub total_height: f64,
}

// ─── Grid ───────────────────────────────────────────────────────

/// One grid row, by field index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridRow {
    /// One or two single-column fields. The right cell may be empty.
    Pair(usize, Option<usize>),
    /// A field spanning both columns.
    Wide(usize),
}

/// Fill rows left to right, top to bottom. A span-2 field closes the open
/// row and takes the next row alone.
pub fn assign_grid_rows(fields: &[Field]) -> Vec<GridRow> {
    let mut rows = Vec::with_capacity(fields.len().div_ceil(2));
    let mut pending: Option<usize> = None;

    for (i, field) in fields.iter().enumerate() {
        match field.span {
            Span::Two => {
                if let Some(left) = pending.take() {
                    rows.push(GridRow::Pair(left, None));
                }
                rows.push(GridRow::Wide(i));
            }
            Span::One => match pending.take() {
                Some(left) => rows.push(GridRow::Pair(left, Some(i))),
                None => pending = Some(i),
            },
        }
    }
    if let Some(left) = pending {
        rows.push(GridRow::Pair(left, None));
    }

    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub rows: Vec<GridRow>,
    pub row_height: f64,
    pub padding: f64,
}

impl RowLayout for GridLayout {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row_height(&self, _index: usize) -> f64 {
        self.row_height
    }

    fn fragment_chrome(&self, _start: usize) -> f64 {
        self.padding
    }
}

// ─── Table ──────────────────────────────────────────────────────

/// Row 0 is the header, row `i + 1` is data row `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub body_rows: usize,
    pub row_height: f64,
    pub columns: Vec<f64>,
    pub repeat_header: bool,
}

impl TableLayout {
    /// Whether a fragment starting at `start` redraws the header above it.
    pub fn repeats_header_at(&self, start: usize) -> bool {
        start > 0 && self.repeat_header
    }
}

impl RowLayout for TableLayout {
    fn row_count(&self) -> usize {
        1 + self.body_rows
    }

    fn row_height(&self, _index: usize) -> f64 {
        self.row_height
    }

    fn fragment_chrome(&self, start: usize) -> f64 {
        if self.repeats_header_at(start) {
            self.row_height
        } else {
            0.0
        }
    }

    fn min_leading_rows(&self, start: usize) -> usize {
        // The header never ends a page on its own.
        if start == 0 && self.body_rows > 0 {
            2
        } else {
            1
        }
    }
}

// ─── Text ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<String>,
    pub line_height: f64,
    /// Label strip plus padding.
    pub chrome: f64,
    pub min_height: f64,
}

impl RowLayout for TextLayout {
    fn row_count(&self) -> usize {
        self.lines.len()
    }

    fn row_height(&self, _index: usize) -> f64 {
        self.line_height
    }

    fn fragment_chrome(&self, _start: usize) -> f64 {
        self.chrome
    }

    fn min_fragment_height(&self) -> f64 {
        self.min_height
    }
}

// ─── Images ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayout {
    pub image_count: usize,
    /// Image area plus caption strip.
    pub row_height: f64,
    pub padding: f64,
}

impl RowLayout for ImageLayout {
    fn row_count(&self) -> usize {
        usize::from(self.image_count > 0)
    }

    fn row_height(&self, _index: usize) -> f64 {
        self.row_height
    }

    fn fragment_chrome(&self, _start: usize) -> f64 {
        self.padding
    }
}

// ─── Block layout ───────────────────────────────────────────────

/// A measured block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockLayout {
    Grid(GridLayout),
    Table(TableLayout),
    Text(TextLayout),
    Images(ImageLayout),
}

impl BlockLayout {
    /// Blocks with nothing to show are skipped entirely.
    ///
    /// A text block is never empty: a blank value still draws its label and
    /// a dash at the minimum height.
    pub fn is_empty(&self) -> bool {
        match self {
            BlockLayout::Grid(g) => g.rows.is_empty(),
            BlockLayout::Table(t) => t.body_rows == 0,
            BlockLayout::Text(_) => false,
            BlockLayout::Images(i) => i.image_count == 0,
        }
    }

    pub fn metrics(&self) -> BlockMetrics {
        let row_height = match self {
            BlockLayout::Grid(g) => g.row_height,
            BlockLayout::Table(t) => t.row_height,
            BlockLayout::Text(t) => t.line_height,
            BlockLayout::Images(i) => i.row_height,
        };
        BlockMetrics {
            row_count: self.row_count(),
            row_height,
            total_height: self.total_height(),
        }
    }

    fn inner(&self) -> &dyn RowLayout {
        match self {
            BlockLayout::Grid(g) => g,
            BlockLayout::Table(t) => t,
            BlockLayout::Text(t) => t,
            BlockLayout::Images(i) => i,
        }
    }
}

impl RowLayout for BlockLayout {
    fn row_count(&self) -> usize {
        self.inner().row_count()
    }

    fn row_height(&self, index: usize) -> f64 {
        self.inner().row_height(index)
    }

    fn fragment_chrome(&self, start: usize) -> f64 {
        self.inner().fragment_chrome(start)
    }

    fn min_fragment_height(&self) -> f64 {
        self.inner().min_fragment_height()
    }

    fn min_leading_rows(&self, start: usize) -> usize {
        self.inner().min_leading_rows(start)
    }
}

/// Width available to wrapped text inside a text block.
pub fn text_wrap_width(content_width: f64, metrics: &LayoutMetrics) -> f64 {
    (content_width - 2.0 * metrics.text_inset).max(1.0)
}

/// The style text block values are measured and drawn with.
pub fn text_value_style(metrics: &LayoutMetrics, color: Color) -> TextStyle {
    TextStyle::new(metrics.value_size, FontWeight::Regular, color)
        .with_line_height(metrics.text_line_height)
}

/// Measure a block at `content_width`.
///
/// Pure: the same block, width and metrics always produce the same layout.
pub fn measure_block(
    block: &Block,
    content_width: f64,
    metrics: &LayoutMetrics,
    measurer: &dyn TextMeasure,
) -> BlockLayout {
    match block {
        Block::Grid(grid) => BlockLayout::Grid(GridLayout {
            rows: assign_grid_rows(&grid.fields),
            row_height: metrics.grid_row_height,
            padding: metrics.grid_padding,
        }),
        Block::Table(table) => BlockLayout::Table(measure_table(table, content_width, metrics)),
        Block::Text(text) => {
            let style = text_value_style(metrics, Color::BLACK);
            let lines = if text.value.trim().is_empty() {
                Vec::new()
            } else {
                measurer.measure_text(
                    text.value.trim_end(),
                    text_wrap_width(content_width, metrics),
                    &style,
                )
            };
            BlockLayout::Text(TextLayout {
                lines,
                line_height: metrics.text_line_height,
                chrome: metrics.text_label_height + metrics.text_padding,
                min_height: metrics.text_min_height,
            })
        }
        Block::Images(pair) => BlockLayout::Images(ImageLayout {
            image_count: pair.images.len(),
            row_height: metrics.image_max_height + metrics.caption_height,
            padding: metrics.image_padding,
        }),
    }
}

fn measure_table(table: &Table, content_width: f64, metrics: &LayoutMetrics) -> TableLayout {
    TableLayout {
        body_rows: table.rows.len(),
        row_height: metrics.table_row_height,
        columns: table.resolve_column_widths(content_width),
        repeat_header: table.repeat_header,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::RecordingCanvas;
    use crate::model::{Grid, ImageEntry, ImagePair, TextBlock};

    fn fields(n: usize) -> Vec<Field> {
        (0..n).map(|i| Field::new(&format!("F{i}"), "v")).collect()
    }

    #[test]
    fn test_grid_pairs_fields() {
        let rows = assign_grid_rows(&fields(5));
        assert_eq!(
            rows,
            vec![
                GridRow::Pair(0, Some(1)),
                GridRow::Pair(2, Some(3)),
                GridRow::Pair(4, None),
            ]
        );
    }

    #[test]
    fn test_wide_field_gets_own_row() {
        // span-2 field at index 1: the open row closes with one field
        let mut f = fields(5);
        f[1].span = Span::Two;
        let rows = assign_grid_rows(&f);
        assert_eq!(
            rows,
            vec![
                GridRow::Pair(0, None),
                GridRow::Wide(1),
                GridRow::Pair(2, Some(3)),
                GridRow::Pair(4, None),
            ]
        );

        // same field at index 2: the row before is already complete
        let mut f = fields(5);
        f[2].span = Span::Two;
        let rows = assign_grid_rows(&f);
        assert_eq!(
            rows,
            vec![
                GridRow::Pair(0, Some(1)),
                GridRow::Wide(2),
                GridRow::Pair(3, Some(4)),
            ]
        );
    }

    #[test]
    fn test_grid_metrics() {
        let metrics = LayoutMetrics::default();
        let canvas = RecordingCanvas::new();
        let block = Block::Grid(Grid::new(fields(5)));
        let m = measure_block(&block, 500.0, &metrics, &canvas).metrics();
        assert_eq!(m.row_count, 3);
        assert_eq!(m.row_height, metrics.grid_row_height);
        assert_eq!(m.total_height, 3.0 * metrics.grid_row_height + metrics.grid_padding);
    }

    #[test]
    fn test_table_metrics_and_chrome() {
        let metrics = LayoutMetrics::default();
        let canvas = RecordingCanvas::new();
        let rows = (0..3).map(|i| vec![format!("r{i}"), "1".to_string()]).collect();
        let layout = measure_block(
            &Block::Table(Table::new(&["Part", "Qty"], rows)),
            500.0,
            &metrics,
            &canvas,
        );
        let m = layout.metrics();
        assert_eq!(m.row_count, 4);
        assert_eq!(m.total_height, 4.0 * metrics.table_row_height);
        assert_eq!(layout.fragment_chrome(0), 0.0);
        assert_eq!(layout.fragment_chrome(2), metrics.table_row_height);
        assert_eq!(layout.min_leading_rows(0), 2);
        assert_eq!(layout.min_leading_rows(2), 1);
    }

    #[test]
    fn test_blank_text_has_minimum_height() {
        let metrics = LayoutMetrics::default();
        let canvas = RecordingCanvas::new();
        let layout = measure_block(
            &Block::Text(TextBlock::new("Notes", "   ")),
            500.0,
            &metrics,
            &canvas,
        );
        let m = layout.metrics();
        assert_eq!(m.row_count, 0);
        assert_eq!(m.total_height, metrics.text_min_height);
        assert!(m.total_height > 0.0);
        assert!(!layout.is_empty());
    }

    #[test]
    fn test_text_height_grows_with_lines() {
        let metrics = LayoutMetrics::default();
        let canvas = RecordingCanvas::with_char_width(5.0);
        let value = "word ".repeat(200);
        let layout = measure_block(
            &Block::Text(TextBlock::new("Findings", &value)),
            300.0,
            &metrics,
            &canvas,
        );
        let m = layout.metrics();
        assert!(m.row_count > 10);
        assert_eq!(
            m.total_height,
            m.row_count as f64 * metrics.text_line_height
                + metrics.text_label_height
                + metrics.text_padding
        );
    }

    #[test]
    fn test_measurement_is_idempotent() {
        let metrics = LayoutMetrics::default();
        let canvas = RecordingCanvas::new();
        let blocks = vec![
            Block::Grid(Grid::new(fields(7))),
            Block::Text(TextBlock::new("Notes", &"The seal was replaced. ".repeat(30))),
            Block::Table(Table::new(&["A"], vec![vec!["x".to_string()]; 9])),
        ];
        for block in &blocks {
            let first = measure_block(block, 515.28, &metrics, &canvas);
            let second = measure_block(block, 515.28, &metrics, &canvas);
            assert_eq!(first, second);
            assert_eq!(first.metrics(), second.metrics());
        }
    }

    #[test]
    fn test_image_pair_is_one_row() {
        let metrics = LayoutMetrics::default();
        let canvas = RecordingCanvas::new();
        let image = ImageEntry::new(vec![0xFF, 0xD8, 0, 0], 40, 30, Some("Before"));
        let pair = Block::Images(ImagePair::new(vec![image.clone(), image]));
        let layout = measure_block(&pair, 500.0, &metrics, &canvas);
        assert_eq!(layout.row_count(), 1);
        assert_eq!(
            layout.total_height(),
            metrics.image_max_height + metrics.caption_height + metrics.image_padding
        );

        let empty = measure_block(&Block::Images(ImagePair::default()), 500.0, &metrics, &canvas);
        assert_eq!(empty.row_count(), 0);
        assert!(empty.is_empty());
    }
}
