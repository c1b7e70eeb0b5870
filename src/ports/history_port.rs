//! Historical data port trait.

use crate::domain::error::BreakoutError;
use crate::domain::ohlcv::DailyBar;
use chrono::NaiveDate;

pub trait HistoryPort {
    /// The trailing `count` completed daily bars as of the current tick,
    /// oldest first. May return fewer bars when history is short.
    fn daily_bars(&self, symbol: &str, count: usize) -> Result<Vec<DailyBar>, BreakoutError>;

    /// First date, last date and bar count held for `symbol`.
    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BreakoutError>;
}
