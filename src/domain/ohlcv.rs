//! Daily bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl DailyBar {
    /// True when the bar's range reaches down to `price`.
    pub fn touches_below(&self, price: f64) -> bool {
        self.low <= price
    }
}

/// Closing prices in bar order.
pub fn closes(bars: &[DailyBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Daily highs in bar order.
pub fn highs(bars: &[DailyBar]) -> Vec<f64> {
    bars.iter().map(|b| b.high).collect()
}
