//! Trailing stop ratchet.
//!
//! The stop starts at `initial_risk * breakout_level` and is raised to
//! `trailing_risk * close` whenever the close makes a new high and that
//! candidate sits above the initial stop.
//!
//! The guard compares the candidate with the initial stop, not with the
//! currently active stop. Because a raise also requires a new high, the
//! candidate is above every earlier raise as well, so the held stop never
//! decreases.

pub const DEFAULT_INITIAL_STOP_RISK: f64 = 0.9;
pub const DEFAULT_TRAILING_STOP_RISK: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopRisk {
    /// Fraction of the breakout level the first stop is placed at.
    pub initial: f64,
    /// Fraction of the close a raised stop trails at.
    pub trailing: f64,
}

impl Default for StopRisk {
    fn default() -> Self {
        StopRisk {
            initial: DEFAULT_INITIAL_STOP_RISK,
            trailing: DEFAULT_TRAILING_STOP_RISK,
        }
    }
}

impl StopRisk {
    pub fn initial_stop(&self, breakout_level: f64) -> f64 {
        self.initial * breakout_level
    }

    pub fn candidate_stop(&self, close: f64) -> f64 {
        self.trailing * close
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopUpdate {
    Raise {
        new_highest_price: f64,
        new_stop_price: f64,
    },
    Unchanged,
}

pub fn update_trailing_stop(
    current_close: f64,
    breakout_level: f64,
    highest_price: f64,
    risk: &StopRisk,
) -> StopUpdate {
    let candidate = risk.candidate_stop(current_close);
    if current_close > highest_price && risk.initial_stop(breakout_level) < candidate {
        StopUpdate::Raise {
            new_highest_price: current_close,
            new_stop_price: candidate,
        }
    } else {
        StopUpdate::Unchanged
    }
}
