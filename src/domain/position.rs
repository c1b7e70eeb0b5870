//! Position tracking while a breakout entry is held.

use chrono::NaiveDate;

use super::trailing_stop::{StopRisk, StopUpdate};

/// State of an open breakout position.
///
/// `breakout_level` is fixed at entry. `stop_price` never decreases.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionState {
    breakout_level: f64,
    highest_price: f64,
    stop_price: f64,
    entry_date: NaiveDate,
}

impl PositionState {
    /// Seed a position from a fired breakout: the highest price starts at the
    /// breakout level and the stop at the initial floor.
    pub fn open(breakout_level: f64, risk: &StopRisk, entry_date: NaiveDate) -> Self {
        PositionState {
            breakout_level,
            highest_price: breakout_level,
            stop_price: risk.initial_stop(breakout_level),
            entry_date,
        }
    }

    pub fn breakout_level(&self) -> f64 {
        self.breakout_level
    }

    pub fn highest_price(&self) -> f64 {
        self.highest_price
    }

    pub fn stop_price(&self) -> f64 {
        self.stop_price
    }

    pub fn entry_date(&self) -> NaiveDate {
        self.entry_date
    }

    /// Apply a trailing-stop decision. Returns the stop price to send to the
    /// order system when it moved.
    pub fn apply_stop_update(&mut self, update: &StopUpdate) -> Option<f64> {
        match *update {
            StopUpdate::Raise {
                new_highest_price,
                new_stop_price,
            } => {
                self.highest_price = self.highest_price.max(new_highest_price);
                if new_stop_price > self.stop_price {
                    self.stop_price = new_stop_price;
                    Some(new_stop_price)
                } else {
                    None
                }
            }
            StopUpdate::Unchanged => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub symbol: String,
    pub quantity: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub pnl: f64,
}
