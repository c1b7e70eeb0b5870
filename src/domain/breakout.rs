//! Breakout entry detection.
//!
//! The breakout level is the highest high of the window excluding the
//! current bar. A long entry fires when flat and the current close reaches
//! that level.

use crate::domain::error::BreakoutError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntrySignal {
    Enter { breakout_level: f64 },
    Hold,
}

impl EntrySignal {
    pub fn fired(&self) -> bool {
        matches!(self, EntrySignal::Enter { .. })
    }
}

/// Highest high of `highs` without its final (current-day) element.
pub fn breakout_level(highs: &[f64]) -> Result<f64, BreakoutError> {
    let prior = match highs.split_last() {
        Some((_, prior)) if !prior.is_empty() => prior,
        _ => return Err(BreakoutError::InvalidWindow { len: highs.len() }),
    };
    if let Some(&bad) = prior.iter().find(|h| !h.is_finite()) {
        return Err(BreakoutError::InvalidPrice {
            series: "high",
            value: bad,
        });
    }
    Ok(prior.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

pub fn detect_breakout(
    highs: &[f64],
    current_close: f64,
    invested: bool,
) -> Result<EntrySignal, BreakoutError> {
    let level = breakout_level(highs)?;
    if !current_close.is_finite() {
        return Err(BreakoutError::InvalidPrice {
            series: "close",
            value: current_close,
        });
    }
    if !invested && current_close >= level {
        Ok(EntrySignal::Enter {
            breakout_level: level,
        })
    } else {
        Ok(EntrySignal::Hold)
    }
}
