//! CSV file history adapter.
//!
//! Reads `<base>/<SYMBOL>.csv` with a `date,open,high,low,close,volume`
//! header. A movable cursor hides bars on or after the current tick date so
//! the strategy only sees completed bars.

use crate::domain::error::BreakoutError;
use crate::domain::ohlcv::DailyBar;
use crate::ports::history_port::HistoryPort;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CsvHistory {
    base_path: PathBuf,
    bars: HashMap<String, Vec<DailyBar>>,
    cursor: Option<NaiveDate>,
}

impl CsvHistory {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            bars: HashMap::new(),
            cursor: None,
        }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Load (or reload) every bar for `symbol`. Returns the bar count.
    pub fn load_symbol(&mut self, symbol: &str) -> Result<usize, BreakoutError> {
        let path = self.csv_path(symbol);
        let bars = read_bars(&path, symbol)?;
        if bars.is_empty() {
            return Err(BreakoutError::NoData {
                symbol: symbol.to_string(),
            });
        }
        debug!(symbol, bars = bars.len(), path = %path.display(), "history loaded");
        let count = bars.len();
        self.bars.insert(symbol.to_string(), bars);
        Ok(count)
    }

    /// Only bars strictly before `date` are served from now on.
    pub fn set_cursor(&mut self, date: NaiveDate) {
        self.cursor = Some(date);
    }

    pub fn clear_cursor(&mut self) {
        self.cursor = None;
    }

    /// All loaded bars for `symbol` dated within `[start, end]`.
    pub fn bars_between(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<DailyBar> {
        self.bars
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Symbols with a CSV file in the base directory.
    pub fn list_symbols(&self) -> Result<Vec<String>, BreakoutError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| BreakoutError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BreakoutError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

impl HistoryPort for CsvHistory {
    fn daily_bars(&self, symbol: &str, count: usize) -> Result<Vec<DailyBar>, BreakoutError> {
        let bars = self.bars.get(symbol).ok_or_else(|| BreakoutError::NoData {
            symbol: symbol.to_string(),
        })?;
        let visible = match self.cursor {
            Some(cursor) => bars.partition_point(|b| b.date < cursor),
            None => bars.len(),
        };
        let start = visible.saturating_sub(count);
        Ok(bars[start..visible].to_vec())
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BreakoutError> {
        Ok(self.bars.get(symbol).and_then(|bars| {
            let first = bars.first()?;
            let last = bars.last()?;
            Some((first.date, last.date, bars.len()))
        }))
    }
}

fn parse_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<T, BreakoutError>
where
    T::Err: std::fmt::Display,
{
    record
        .get(index)
        .ok_or_else(|| BreakoutError::Data {
            reason: format!("missing {} column", name),
        })?
        .trim()
        .parse::<T>()
        .map_err(|e| BreakoutError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

/// Parse a daily-bar CSV file, sorted ascending by date.
pub fn read_bars(path: &Path, symbol: &str) -> Result<Vec<DailyBar>, BreakoutError> {
    let content = fs::read_to_string(path).map_err(|e| BreakoutError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| BreakoutError::Data {
            reason: format!("CSV parse error: {}", e),
        })?;

        let date_str = record.get(0).ok_or_else(|| BreakoutError::Data {
            reason: "missing date column".into(),
        })?;
        let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
            BreakoutError::Data {
                reason: format!("invalid date format: {}", e),
            }
        })?;

        bars.push(DailyBar {
            symbol: symbol.to_string(),
            date,
            open: parse_field(&record, 1, "open")?,
            high: parse_field(&record, 2, "high")?,
            low: parse_field(&record, 3, "low")?,
            close: parse_field(&record, 4, "close")?,
            volume: parse_field(&record, 5, "volume")?,
        });
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        // Deliberately out of order.
        let csv_content = "date,open,high,low,close,volume\n\
            2021-01-06,110.0,120.0,105.0,115.0,55000\n\
            2021-01-04,100.0,110.0,90.0,105.0,50000\n\
            2021-01-05,105.0,115.0,100.0,110.0,60000\n\
            2021-01-07,115.0,118.0,111.0,112.0,40000\n";

        fs::write(path.join("QCOM.csv"), csv_content).unwrap();
        fs::write(path.join("AAPL.csv"), "date,open,high,low,close,volume\n").unwrap();
        fs::write(path.join("notes.txt"), "ignored").unwrap();

        (dir, path)
    }

    #[test]
    fn load_sorts_by_date() {
        let (_dir, path) = setup_test_data();
        let mut history = CsvHistory::new(path);
        assert_eq!(history.load_symbol("QCOM").unwrap(), 4);

        let bars = history.daily_bars("QCOM", 10).unwrap();
        let dates: Vec<_> = bars.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![date(4), date(5), date(6), date(7)]);
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000);
        assert_eq!(bars[0].symbol, "QCOM");
    }

    #[test]
    fn daily_bars_returns_trailing_count() {
        let (_dir, path) = setup_test_data();
        let mut history = CsvHistory::new(path);
        history.load_symbol("QCOM").unwrap();

        let bars = history.daily_bars("QCOM", 2).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date(6));
        assert_eq!(bars[1].date, date(7));
    }

    #[test]
    fn cursor_hides_current_and_future_bars() {
        let (_dir, path) = setup_test_data();
        let mut history = CsvHistory::new(path);
        history.load_symbol("QCOM").unwrap();

        history.set_cursor(date(6));
        let bars = history.daily_bars("QCOM", 10).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars.last().unwrap().date, date(5));

        history.clear_cursor();
        assert_eq!(history.daily_bars("QCOM", 10).unwrap().len(), 4);
    }

    #[test]
    fn empty_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let mut history = CsvHistory::new(path);
        let err = history.load_symbol("AAPL").unwrap_err();
        assert!(matches!(err, BreakoutError::NoData { symbol } if symbol == "AAPL"));
    }

    #[test]
    fn missing_file_is_data_error() {
        let (_dir, path) = setup_test_data();
        let mut history = CsvHistory::new(path);
        assert!(matches!(
            history.load_symbol("XYZ").unwrap_err(),
            BreakoutError::Data { .. }
        ));
    }

    #[test]
    fn unloaded_symbol_is_no_data() {
        let (_dir, path) = setup_test_data();
        let history = CsvHistory::new(path);
        assert!(history.daily_bars("QCOM", 5).is_err());
    }

    #[test]
    fn bad_number_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("BAD.csv"),
            "date,open,high,low,close,volume\n2021-01-04,1,2,0.5,abc,10\n",
        )
        .unwrap();
        let err = read_bars(&dir.path().join("BAD.csv"), "BAD").unwrap_err();
        assert!(err.to_string().contains("invalid close value"));
    }

    #[test]
    fn data_range_reports_bounds() {
        let (_dir, path) = setup_test_data();
        let mut history = CsvHistory::new(path);
        history.load_symbol("QCOM").unwrap();
        assert_eq!(
            history.data_range("QCOM").unwrap(),
            Some((date(4), date(7), 4))
        );
        assert_eq!(history.data_range("AAPL").unwrap(), None);
    }

    #[test]
    fn bars_between_filters_inclusive() {
        let (_dir, path) = setup_test_data();
        let mut history = CsvHistory::new(path);
        history.load_symbol("QCOM").unwrap();
        let bars = history.bars_between("QCOM", date(5), date(6));
        assert_eq!(bars.len(), 2);
    }

    #[test]
    fn list_symbols_finds_csv_files() {
        let (_dir, path) = setup_test_data();
        let history = CsvHistory::new(path);
        assert_eq!(history.list_symbols().unwrap(), vec!["AAPL", "QCOM"]);
    }
}
