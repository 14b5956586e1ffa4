//! Structured error types for the Folio layout engine.
//!
//! Fatal variants abort the whole document. Image draw failures are not
//! errors at the document level: the renderer records them as warnings and
//! draws a placeholder instead.

use thiserror::Error;

/// The unified error type returned by all public Folio API functions.
#[derive(Debug, Error)]
pub enum FolioError {
    /// Page size or margins leave no usable content area.
    #[error("invalid page configuration: {0}")]
    Configuration(String),

    /// A single row (or the rows that must open a fragment together) is
    /// taller than the usable height of a fresh page.
    #[error("{what} needs {required:.1}pt but a page only has {available:.1}pt of usable height")]
    Sizing {
        what: String,
        required: f64,
        available: f64,
    },

    /// A block is malformed (ragged table rows, too many images).
    #[error("invalid block: {0}")]
    InvalidBlock(String),

    /// The page cursor was asked to move somewhere it must never go.
    #[error("page cursor invariant violated: {0}")]
    Cursor(String),

    /// The canvas could not produce its output.
    #[error(transparent)]
    Canvas(#[from] CanvasError),

    /// JSON input failed to parse as a valid report.
    #[error("failed to parse report: {source}{}", hint_suffix(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },
}

/// Failure of a single drawing primitive.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CanvasError {
    #[error("image could not be drawn: {0}")]
    Image(String),
    #[error("canvas output failed: {0}")]
    Output(String),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {hint}")
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the report schema. Check field names, block types and spans.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        FolioError::Parse { source: e, hint }
    }
}
