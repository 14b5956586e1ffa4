//! # Style
//!
//! Colors and text styles used when drawing. Reports all share one visual
//! language (a shaded section band with an accent bar, boxed field grids,
//! zebra-striped tables), so the style surface is a small [`Theme`] rather
//! than a per-node cascade.

use serde::{Deserialize, Serialize};

/// An RGBA color with components in 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    #[serde(default = "opaque")]
    pub a: f64,
}

fn opaque() -> f64 {
    1.0
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#rgb` or `#rrggbb`. Malformed input yields black.
    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        let (r, g, b) = match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).unwrap_or(0);
                (r, g, b)
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
                (r, g, b)
            }
            _ => (0, 0, 0),
        };
        Self::rgb(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
    }
}

/// The two weights the standard report fonts come in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

/// Everything a canvas needs to measure or draw a run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f64,
    pub weight: FontWeight,
    pub color: Color,
    /// Baseline-to-baseline distance for multi-line draws.
    pub line_height: f64,
}

impl TextStyle {
    pub fn new(size: f64, weight: FontWeight, color: Color) -> Self {
        Self {
            size,
            weight,
            color,
            line_height: size * 1.2,
        }
    }

    pub fn with_line_height(mut self, line_height: f64) -> Self {
        self.line_height = line_height;
        self
    }
}

/// How a rectangle is painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Fill(Color),
    Stroke { color: Color, width: f64 },
}

/// Report colors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Theme {
    pub title_text: Color,
    pub subtitle_text: Color,
    pub section_fill: Color,
    pub section_accent: Color,
    pub section_text: Color,
    pub label_text: Color,
    pub value_text: Color,
    pub border: Color,
    pub table_header_fill: Color,
    pub table_header_text: Color,
    pub table_stripe_fill: Color,
    pub placeholder_text: Color,
    pub footer_text: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title_text: Color::hex("#1f2937"),
            subtitle_text: Color::hex("#6b7280"),
            section_fill: Color::hex("#f1f5f9"),
            section_accent: Color::hex("#1d4ed8"),
            section_text: Color::hex("#0f172a"),
            label_text: Color::hex("#475569"),
            value_text: Color::hex("#111827"),
            border: Color::hex("#cbd5e1"),
            table_header_fill: Color::hex("#1e3a8a"),
            table_header_text: Color::WHITE,
            table_stripe_fill: Color::hex("#f8fafc"),
            placeholder_text: Color::hex("#9ca3af"),
            footer_text: Color::hex("#6b7280"),
        }
    }
}
