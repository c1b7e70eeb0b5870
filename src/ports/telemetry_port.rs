//! Telemetry sink port trait.

use crate::domain::error::BreakoutError;
use chrono::NaiveDate;

/// Receives chart points. Not behavior-bearing: callers log and continue
/// when a sink fails.
pub trait TelemetryPort {
    fn plot(
        &mut self,
        date: NaiveDate,
        chart: &str,
        series: &str,
        value: f64,
    ) -> Result<(), BreakoutError>;
}
