//! Volatility-adjusted lookback window.
//!
//! Each tick the window length is scaled by the relative change in
//! close-to-close volatility, rounded half-to-even, and clamped to
//! `[floor, ceiling]`:
//!
//! ```text
//! delta = (vol_today - vol_yesterday) / vol_today
//! next  = clamp(round(current * (1 + delta)), floor, ceiling)
//! ```

use crate::domain::error::BreakoutError;
use crate::domain::volatility::volatility_pair;

pub const DEFAULT_LOOKBACK: usize = 25;
pub const DEFAULT_FLOOR: usize = 20;
pub const DEFAULT_CEILING: usize = 40;
pub const DEFAULT_HISTORY_BARS: usize = 31;

/// Smallest usable window: one prior bar plus the current bar.
pub const MIN_WINDOW: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackBounds {
    pub floor: usize,
    pub ceiling: usize,
}

impl Default for LookbackBounds {
    fn default() -> Self {
        LookbackBounds {
            floor: DEFAULT_FLOOR,
            ceiling: DEFAULT_CEILING,
        }
    }
}

impl LookbackBounds {
    /// NaN maps to the floor.
    fn clamp(&self, raw: f64) -> usize {
        let rounded = raw.round_ties_even();
        if rounded.is_nan() {
            self.floor
        } else if rounded >= self.ceiling as f64 {
            self.ceiling
        } else if rounded <= self.floor as f64 {
            self.floor
        } else {
            rounded as usize
        }
    }
}

/// Current window length. Always within its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackState {
    value: usize,
    bounds: LookbackBounds,
}

impl Default for LookbackState {
    fn default() -> Self {
        LookbackState {
            value: DEFAULT_LOOKBACK,
            bounds: LookbackBounds::default(),
        }
    }
}

impl LookbackState {
    pub fn new(initial: usize, bounds: LookbackBounds) -> Result<Self, BreakoutError> {
        if bounds.floor < MIN_WINDOW {
            return Err(BreakoutError::config_invalid(
                "strategy",
                "floor",
                format!("floor must be at least {MIN_WINDOW}"),
            ));
        }
        if bounds.ceiling < bounds.floor {
            return Err(BreakoutError::config_invalid(
                "strategy",
                "ceiling",
                "ceiling must not be below floor",
            ));
        }
        if initial < bounds.floor || initial > bounds.ceiling {
            return Err(BreakoutError::config_invalid(
                "strategy",
                "lookback",
                format!(
                    "lookback must be within [{}, {}]",
                    bounds.floor, bounds.ceiling
                ),
            ));
        }
        Ok(LookbackState {
            value: initial,
            bounds,
        })
    }

    pub fn value(&self) -> usize {
        self.value
    }

    pub fn bounds(&self) -> LookbackBounds {
        self.bounds
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LookbackChange {
    Adjusted {
        previous: usize,
        next: usize,
        delta_vol: f64,
    },
    /// Today's volatility window is flat, or its spread overflows `f64`;
    /// the window is left as-is.
    FlatVolatility,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookbackUpdate {
    pub state: LookbackState,
    pub change: LookbackChange,
}

/// Recompute the window from the trailing `history_bars` closes.
///
/// Fewer closes than `history_bars` is rejected; extra leading closes are
/// ignored.
pub fn update_lookback(
    state: LookbackState,
    closes: &[f64],
    history_bars: usize,
) -> Result<LookbackUpdate, BreakoutError> {
    if closes.len() < history_bars {
        return Err(BreakoutError::InsufficientData {
            needed: history_bars,
            got: closes.len(),
        });
    }
    let window = &closes[closes.len() - history_bars..];
    let pair = volatility_pair(window)?;

    let Some(delta_vol) = pair.relative_change() else {
        return Ok(LookbackUpdate {
            state,
            change: LookbackChange::FlatVolatility,
        });
    };

    let previous = state.value;
    let next = state.bounds.clamp(previous as f64 * (1.0 + delta_vol));
    Ok(LookbackUpdate {
        state: LookbackState {
            value: next,
            ..state
        },
        change: LookbackChange::Adjusted {
            previous,
            next,
            delta_vol,
        },
    })
}
