//! # Report Model
//!
//! The input representation for the layout engine. A report is an ordered list
//! of sections, each an ordered list of blocks. The data layer produces these
//! values (in code or as JSON); the engine never looks further upstream.
//!
//! There are four block kinds, each with its own row structure:
//! - [`Grid`]: label/value fields, two per row unless a field spans both columns
//! - [`Table`]: a header row plus equal-length data rows
//! - [`TextBlock`]: a labelled free-text value, one row per wrapped line
//! - [`ImagePair`]: up to two images side by side, one atomic row

use serde::{Deserialize, Serialize};

use crate::error::FolioError;
use crate::layout::LayoutMetrics;
use crate::style::Theme;

/// A complete report ready for rendering.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Title drawn at the top of the first page.
    pub title: String,

    /// Optional second line under the title (customer, site, job number...).
    #[serde(default)]
    pub subtitle: Option<String>,

    /// Document metadata embedded in the output.
    #[serde(default)]
    pub metadata: Metadata,

    /// Page size, margins and footer.
    #[serde(default)]
    pub page: PageConfig,

    /// Row heights, paddings and font sizes.
    #[serde(default)]
    pub metrics: LayoutMetrics,

    /// Colors.
    #[serde(default)]
    pub theme: Theme,

    /// The report body, in order.
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Report {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            subtitle: None,
            metadata: Metadata::default(),
            page: PageConfig::default(),
            metrics: LayoutMetrics::default(),
            theme: Theme::default(),
            sections: Vec::new(),
        }
    }

    /// Fill in missing pixel dimensions of every image by probing its bytes.
    ///
    /// This is the "fetch phase" that runs before layout; images whose bytes
    /// can't be probed keep zero dimensions and are drawn as placeholders.
    pub fn probe_image_dimensions(&mut self) {
        for section in &mut self.sections {
            for block in &mut section.blocks {
                if let Block::Images(pair) = block {
                    for image in &mut pair.images {
                        if image.has_dimensions() {
                            continue;
                        }
                        match crate::image_loader::probe_dimensions(&image.data) {
                            Ok((w, h)) => {
                                image.pixel_width = w;
                                image.pixel_height = h;
                            }
                            Err(e) => {
                                log::debug!("could not probe image dimensions: {e}");
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Document metadata embedded in the PDF.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

/// A titled group of blocks.
#[derive(Debug, Clone, Deserialize)]
pub struct Section {
    pub title: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(title: &str, blocks: Vec<Block>) -> Self {
        Self {
            title: title.to_string(),
            blocks,
        }
    }
}

/// One unit of layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    Grid(Grid),
    Table(Table),
    Text(TextBlock),
    Images(ImagePair),
}

impl Block {
    /// Short human-readable description used in log lines and sizing errors.
    pub fn describe(&self) -> String {
        match self {
            Block::Grid(g) => format!("grid of {} fields", g.fields.len()),
            Block::Table(t) => format!("table of {} rows", t.rows.len()),
            Block::Text(t) => format!("text block '{}'", t.label),
            Block::Images(p) => format!("image pair of {}", p.images.len()),
        }
    }

    /// Reject malformed blocks before any layout happens.
    pub fn validate(&self) -> Result<(), FolioError> {
        match self {
            Block::Table(t) => t.validate(),
            Block::Images(p) => p.validate(),
            Block::Grid(_) | Block::Text(_) => Ok(()),
        }
    }
}

/// How many grid columns a field occupies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Span {
    #[default]
    One,
    Two,
}

impl TryFrom<u8> for Span {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Span::One),
            2 => Ok(Span::Two),
            other => Err(format!("field span must be 1 or 2, got {other}")),
        }
    }
}

impl From<Span> for u8 {
    fn from(span: Span) -> u8 {
        match span {
            Span::One => 1,
            Span::Two => 2,
        }
    }
}

/// A label/value pair.
#[derive(Debug, Clone, Deserialize)]
pub struct Field {
    pub label: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub span: Span,
}

impl Field {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: Some(value.to_string()),
            span: Span::One,
        }
    }

    /// A field that occupies both grid columns.
    pub fn wide(label: &str, value: &str) -> Self {
        Self {
            span: Span::Two,
            ..Self::new(label, value)
        }
    }

    /// A field with no value; renders as a dash.
    pub fn empty(label: &str) -> Self {
        Self {
            label: label.to_string(),
            value: None,
            span: Span::One,
        }
    }

    /// The value to draw: the trimmed value, or `-` when absent or blank.
    pub fn display_value(&self) -> &str {
        match self.value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => v,
            _ => "-",
        }
    }
}

/// Ordered fields laid out in two columns.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Grid {
    pub fields: Vec<Field>,
}

impl Grid {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }
}

/// Column width definition for tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ColumnWidth {
    /// Fraction of available width (0.0-1.0).
    Fraction(f64),
    /// Fixed width in points.
    Fixed(f64),
    /// Distribute remaining space evenly among Auto columns.
    Auto,
}

/// A header row plus data rows of the same length.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    /// If omitted, columns divide the content width evenly.
    #[serde(default)]
    pub column_widths: Vec<ColumnWidth>,
    /// Redraw the header row at the top of each continuation page.
    #[serde(default = "default_true")]
    pub repeat_header: bool,
}

fn default_true() -> bool {
    true
}

impl Table {
    pub fn new(headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
            column_widths: Vec::new(),
            repeat_header: true,
        }
    }

    fn validate(&self) -> Result<(), FolioError> {
        if self.headers.is_empty() {
            return Err(FolioError::InvalidBlock("table has no headers".to_string()));
        }
        if !self.column_widths.is_empty() && self.column_widths.len() != self.headers.len() {
            return Err(FolioError::InvalidBlock(format!(
                "table has {} headers but {} column widths",
                self.headers.len(),
                self.column_widths.len()
            )));
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.headers.len() {
                return Err(FolioError::InvalidBlock(format!(
                    "table row {} has {} cells, expected {}",
                    i,
                    row.len(),
                    self.headers.len()
                )));
            }
        }
        Ok(())
    }

    /// Resolve column widths against the available width.
    pub fn resolve_column_widths(&self, available_width: f64) -> Vec<f64> {
        let num_cols = self.headers.len().max(1);
        if self.column_widths.is_empty() {
            return vec![available_width / num_cols as f64; num_cols];
        }

        let mut widths = Vec::with_capacity(self.column_widths.len());
        let mut remaining = available_width;
        let mut auto_count = 0;

        for def in &self.column_widths {
            match def {
                ColumnWidth::Fixed(w) => {
                    widths.push(*w);
                    remaining -= w;
                }
                ColumnWidth::Fraction(f) => {
                    let w = available_width * f;
                    widths.push(w);
                    remaining -= w;
                }
                ColumnWidth::Auto => {
                    widths.push(0.0);
                    auto_count += 1;
                }
            }
        }

        if auto_count > 0 {
            let auto_width = (remaining / auto_count as f64).max(0.0);
            for (w, def) in widths.iter_mut().zip(&self.column_widths) {
                if matches!(def, ColumnWidth::Auto) {
                    *w = auto_width;
                }
            }
        }

        widths
    }
}

/// A labelled free-text value.
#[derive(Debug, Clone, Deserialize)]
pub struct TextBlock {
    pub label: String,
    #[serde(default)]
    pub value: String,
}

impl TextBlock {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

/// Already-loaded image bytes plus their pixel size.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEntry {
    /// Encoded image bytes. In JSON this is `src`: a data URI, raw base64,
    /// or a file path.
    #[serde(rename = "src", deserialize_with = "crate::image_loader::deserialize_source")]
    pub data: Vec<u8>,
    /// Zero means unknown; see [`Report::probe_image_dimensions`].
    #[serde(default)]
    pub pixel_width: u32,
    #[serde(default)]
    pub pixel_height: u32,
    #[serde(default)]
    pub caption: Option<String>,
}

impl ImageEntry {
    pub fn new(data: Vec<u8>, pixel_width: u32, pixel_height: u32, caption: Option<&str>) -> Self {
        Self {
            data,
            pixel_width,
            pixel_height,
            caption: caption.map(str::to_string),
        }
    }

    pub fn has_dimensions(&self) -> bool {
        self.pixel_width > 0 && self.pixel_height > 0
    }
}

/// Zero, one or two images laid out side by side.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImagePair {
    #[serde(default)]
    pub images: Vec<ImageEntry>,
}

impl ImagePair {
    pub fn new(images: Vec<ImageEntry>) -> Self {
        Self { images }
    }

    fn validate(&self) -> Result<(), FolioError> {
        if self.images.len() > 2 {
            return Err(FolioError::InvalidBlock(format!(
                "an image pair holds at most 2 images, got {}",
                self.images.len()
            )));
        }
        Ok(())
    }
}

/// Configuration for every page of a report: size, margins, footer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    /// Page size. Defaults to A4.
    #[serde(default)]
    pub size: PageSize,

    /// Page margins in points (1/72 inch). The bottom margin is the reserve
    /// that holds the footer.
    #[serde(default = "default_margin")]
    pub margin: Edges,

    /// Footer text drawn inside the bottom margin of every page.
    /// `{{pageNumber}}` and `{{totalPages}}` are substituted at finish time.
    #[serde(default = "default_footer")]
    pub footer: Option<String>,
}

fn default_margin() -> Edges {
    Edges::uniform(40.0)
}

fn default_footer() -> Option<String> {
    Some("Page {{pageNumber}} of {{totalPages}}".to_string())
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            margin: default_margin(),
            footer: default_footer(),
        }
    }
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Edge values (top, right, bottom, left) used for margins and insets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}
