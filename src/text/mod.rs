//! # Text Layout
//!
//! Greedy line breaking at UAX#14 break opportunities. The width of each
//! character comes from a caller-supplied function, so the same breaker
//! serves the real Helvetica metrics and the fixed-advance measurer of the
//! recording canvas.

use unicode_linebreak::{linebreaks, BreakOpportunity};

use crate::font::StandardFont;
use crate::style::TextStyle;

/// Compute UAX#14 break opportunities indexed by char position.
///
/// Each entry is the break opportunity *before* that character position.
/// Index 0 is always `None` (no break before the first char).
fn compute_break_opportunities(text: &str) -> Vec<Option<BreakOpportunity>> {
    let char_count = text.chars().count();
    let mut result = vec![None; char_count];

    // linebreaks() yields byte offsets of the start of the next segment;
    // convert them to char indices.
    let byte_to_char: Vec<usize> = {
        let mut map = vec![0usize; text.len() + 1];
        for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
            map[byte_idx] = char_idx;
        }
        map[text.len()] = char_count;
        map
    };

    for (byte_offset, opp) in linebreaks(text) {
        let char_idx = byte_to_char[byte_offset];
        if char_idx < char_count {
            result[char_idx] = Some(opp);
        }
    }

    result
}

fn is_newline(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn make_line(chars: &[char]) -> String {
    let s: String = chars.iter().filter(|c| !is_newline(**c)).collect();
    s.trim_end().to_string()
}

/// Break `text` into lines no wider than `max_width`.
///
/// Explicit newlines always break. A word wider than `max_width` is broken
/// at the character where it overflows. Empty input yields no lines.
pub fn break_into_lines(
    text: &str,
    max_width: f64,
    char_width: impl Fn(char) -> f64,
) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let widths: Vec<f64> = chars
        .iter()
        .map(|&c| if is_newline(c) { 0.0 } else { char_width(c) })
        .collect();
    let break_opps = compute_break_opportunities(text);

    let mut lines = Vec::new();
    let mut line_start = 0;
    let mut line_width = 0.0;
    let mut last_break_point: Option<usize> = None;

    for (i, &ch) in chars.iter().enumerate() {
        if i > 0 {
            match break_opps[i] {
                Some(BreakOpportunity::Mandatory) => {
                    lines.push(make_line(&chars[line_start..i]));
                    line_start = i;
                    line_width = 0.0;
                    last_break_point = None;
                }
                Some(BreakOpportunity::Allowed) => {
                    last_break_point = Some(i);
                }
                None => {}
            }
        }

        if is_newline(ch) {
            continue;
        }

        let w = widths[i];
        if line_width + w > max_width && line_start < i {
            match last_break_point {
                Some(bp) if bp > line_start => {
                    lines.push(make_line(&chars[line_start..bp]));
                    line_start = bp;
                    line_width = widths[bp..=i].iter().sum();
                }
                _ => {
                    // No break opportunity on this line: force one here
                    lines.push(make_line(&chars[line_start..i]));
                    line_start = i;
                    line_width = w;
                }
            }
            last_break_point = None;
            continue;
        }

        line_width += w;
    }

    if line_start < chars.len() {
        lines.push(make_line(&chars[line_start..]));
    }

    lines
}

/// Break text using the standard font metrics for `style`.
pub fn wrap_standard(text: &str, max_width: f64, style: &TextStyle) -> Vec<String> {
    let font = StandardFont::for_weight(style.weight);
    break_into_lines(text, max_width, |ch| font.char_width(ch, style.size))
}

/// Width of `text` in the standard font for `style`.
pub fn standard_width(text: &str, style: &TextStyle) -> f64 {
    StandardFont::for_weight(style.weight).measure_string(text, style.size)
}
