//! # Folio
//!
//! A paginated report layout engine.
//!
//! Service, teardown and commissioning reports are long lists of the same few
//! things: label/value grids, parts tables, free-text findings and photos.
//! Folio lays them out onto fixed-size pages and decides, before drawing
//! anything, whether each block fits where the cursor is, moves whole to the
//! next page, or splits between two of its rows. A row is never cut in half
//! and a table header never sits alone at the bottom of a page.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON/API)
//!       ↓
//!   [model]    - Report, sections, blocks, page configuration
//!       ↓
//!   [layout]   - rows → fit/split decisions → page state
//!       ↓
//!   [canvas]   - drawing capability (recording or PDF)
//!       ↓
//!   [pdf]      - Serialize to PDF bytes
//! ```

pub mod canvas;
pub mod error;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod style;
pub mod text;

pub use error::{CanvasError, FolioError};
pub use layout::{RenderWarning, RenderedDocument, ReportRenderer};
pub use model::Report;

use canvas::Canvas;
use model::Metadata;
use pdf::PdfCanvas;

/// Render a report to PDF bytes.
///
/// This is the primary entry point. Images that fail to draw become
/// placeholders; use [`render_with_canvas`] to inspect the warnings.
pub fn render(report: &Report) -> Result<Vec<u8>, FolioError> {
    let canvas = PdfCanvas::new(document_metadata(report));
    let document = render_with_canvas(report, canvas)?;
    for warning in &document.warnings {
        log::warn!("page {}: {}", warning.page, warning.message);
    }
    Ok(document.output)
}

/// Render a report described as JSON to PDF bytes.
pub fn render_json(json: &str) -> Result<Vec<u8>, FolioError> {
    let mut report: Report = serde_json::from_str(json)?;
    report.probe_image_dimensions();
    render(&report)
}

/// Lay a report out onto any canvas.
pub fn render_with_canvas<C: Canvas>(
    report: &Report,
    canvas: C,
) -> Result<RenderedDocument<C::Output>, FolioError> {
    let mut renderer = ReportRenderer::new(
        &report.page,
        report.metrics.clone(),
        report.theme.clone(),
        canvas,
    )?;
    renderer.render_title(&report.title, report.subtitle.as_deref())?;
    for section in &report.sections {
        renderer.render_section(&section.title, &section.blocks)?;
    }
    renderer.finalize()
}

/// The report title doubles as the document title unless one is set.
fn document_metadata(report: &Report) -> Metadata {
    let mut metadata = report.metadata.clone();
    if metadata.title.is_none() && !report.title.trim().is_empty() {
        metadata.title = Some(report.title.clone());
    }
    metadata
}
