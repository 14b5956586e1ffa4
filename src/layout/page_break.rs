//! # Page Break Decisions
//!
//! Given a block's rows and the space left on the page, decide whether the
//! block is drawn whole, moved to the next page, or split at a row boundary.
//! One decision function serves every block kind through [`RowLayout`].
//!
//! Rows are atomic. A split always happens between two rows, and the rows
//! that must open a fragment together (a table header and its first data
//! row) are never separated.

use std::ops::Range;

use super::page_state::EPSILON;
use super::rows::RowLayout;
use crate::error::FolioError;

/// What to do with the rows `[start..end)` of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitDecision {
    /// Every remaining row fits on the current page.
    FitsWhole,
    /// Not even the leading rows fit; start a new page and decide again.
    NoRoomForAny,
    /// Rows `[start..k)` fit here; `[k..end)` continue on the next page.
    SplitAtRow(usize),
}

/// A contiguous run of rows drawn on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub rows: Range<usize>,
    /// Start a new page before drawing this fragment.
    pub break_before: bool,
    /// Height including chrome.
    pub height: f64,
}

/// The smallest fragment that may open at `start`: its leading rows plus
/// chrome.
pub fn opening_height<L: RowLayout + ?Sized>(layout: &L, start: usize) -> f64 {
    let end = layout.row_count();
    let leading = layout.min_leading_rows(start).min(end.saturating_sub(start));
    layout.fragment_height(start..start + leading)
}

/// Decide how rows `[start..row_count)` fit into `remaining` points.
///
/// An exact fit counts as fitting.
pub fn decide_fit<L: RowLayout + ?Sized>(layout: &L, start: usize, remaining: f64) -> FitDecision {
    let end = layout.row_count();
    if layout.fragment_height(start..end) <= remaining + EPSILON {
        return FitDecision::FitsWhole;
    }
    if start >= end {
        return FitDecision::NoRoomForAny;
    }

    // Largest prefix of rows that fits together with the chrome
    let mut running = layout.fragment_chrome(start);
    let mut fit_count = 0;
    for i in start..end {
        let h = layout.row_height(i);
        if running + h > remaining + EPSILON {
            break;
        }
        running += h;
        fit_count += 1;
    }

    let leading = layout.min_leading_rows(start).min(end - start);
    if fit_count == 0
        || fit_count < leading
        || layout.fragment_height(start..start + fit_count) > remaining + EPSILON
    {
        return FitDecision::NoRoomForAny;
    }

    FitDecision::SplitAtRow(start + fit_count)
}

/// Plan how a whole block is spread over pages.
///
/// `remaining` is the space left on the current page, `page_capacity` the
/// usable height of a fresh one. The returned fragments cover `0..row_count`
/// exactly once, in order. Fails with [`FolioError::Sizing`] when the rows
/// that must open a fragment don't fit even on a fresh page.
pub fn plan_fragments<L: RowLayout + ?Sized>(
    layout: &L,
    remaining: f64,
    page_capacity: f64,
    at_page_top: bool,
    what: &str,
) -> Result<Vec<Fragment>, FolioError> {
    let end = layout.row_count();
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut remaining = remaining;
    let mut fresh_page = at_page_top;
    let mut break_before = false;

    loop {
        let decision = decide_fit(layout, start, remaining);
        log::debug!("{what}: rows {start}..{end} in {remaining:.1}pt -> {decision:?}");

        match decision {
            FitDecision::FitsWhole => {
                fragments.push(Fragment {
                    rows: start..end,
                    break_before,
                    height: layout.fragment_height(start..end),
                });
                return Ok(fragments);
            }
            FitDecision::SplitAtRow(k) => {
                fragments.push(Fragment {
                    rows: start..k,
                    break_before,
                    height: layout.fragment_height(start..k),
                });
                start = k;
            }
            FitDecision::NoRoomForAny => {
                if fresh_page {
                    let label = if start == 0 {
                        what.to_string()
                    } else {
                        format!("{what} (from row {start})")
                    };
                    return Err(FolioError::Sizing {
                        what: label,
                        required: opening_height(layout, start),
                        available: page_capacity,
                    });
                }
            }
        }

        remaining = page_capacity;
        fresh_page = true;
        break_before = true;
    }
}
