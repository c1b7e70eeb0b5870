//! Telemetry sinks.

use chrono::NaiveDate;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::trace;

use crate::domain::error::BreakoutError;
use crate::ports::telemetry_port::TelemetryPort;

/// Emits every chart point as a trace event.
#[derive(Debug, Default)]
pub struct TracingTelemetry;

impl TelemetryPort for TracingTelemetry {
    fn plot(
        &mut self,
        date: NaiveDate,
        chart: &str,
        series: &str,
        value: f64,
    ) -> Result<(), BreakoutError> {
        trace!(%date, chart, series, value, "plot");
        Ok(())
    }
}

/// Writes chart points as `date,chart,series,value` rows.
pub struct CsvTelemetry<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl CsvTelemetry<File> {
    pub fn create(path: &Path) -> Result<Self, BreakoutError> {
        let file = File::create(path)?;
        CsvTelemetry::new(file)
    }
}

impl<W: Write> CsvTelemetry<W> {
    pub fn new(inner: W) -> Result<Self, BreakoutError> {
        let mut writer = csv::Writer::from_writer(inner);
        writer
            .write_record(["date", "chart", "series", "value"])
            .map_err(csv_error)?;
        Ok(CsvTelemetry { writer, rows: 0 })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> Result<(), BreakoutError> {
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> TelemetryPort for CsvTelemetry<W> {
    fn plot(
        &mut self,
        date: NaiveDate,
        chart: &str,
        series: &str,
        value: f64,
    ) -> Result<(), BreakoutError> {
        let date = date.format("%Y-%m-%d").to_string();
        let value = value.to_string();
        self.writer
            .write_record([date.as_str(), chart, series, value.as_str()])
            .map_err(csv_error)?;
        self.rows += 1;
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> BreakoutError {
    BreakoutError::Io(std::io::Error::other(e))
}
