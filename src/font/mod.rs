//! # Font Metrics
//!
//! Reports are set in the standard PDF Helvetica faces, which every viewer
//! ships and which therefore need no embedding. All we need on our side are
//! the advance widths for measuring and wrapping text.

mod metrics;

use crate::style::FontWeight;
use metrics::{DEFAULT_WIDTH, HELVETICA_BOLD_WIDTHS, HELVETICA_WIDTHS};

/// The standard fonts a report uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    pub fn for_weight(weight: FontWeight) -> Self {
        match weight {
            FontWeight::Regular => Self::Helvetica,
            FontWeight::Bold => Self::HelveticaBold,
        }
    }

    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Resource name used inside content streams (`/F0`, `/F1`).
    pub fn resource_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "F0",
            Self::HelveticaBold => "F1",
        }
    }

    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let table = match self {
            Self::Helvetica => &HELVETICA_WIDTHS,
            Self::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        let cp = ch as u32;
        let w = if (0x20..=0x7E).contains(&cp) {
            table[(cp - 0x20) as usize]
        } else {
            DEFAULT_WIDTH
        };
        w as f64 / 1000.0 * font_size
    }

    /// Measure the width of a string in points.
    pub fn measure_string(&self, text: &str, font_size: f64) -> f64 {
        text.chars().map(|ch| self.char_width(ch, font_size)).sum()
    }
}
