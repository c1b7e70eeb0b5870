#![allow(dead_code)]

use breakout::domain::error::BreakoutError;
pub use breakout::domain::ohlcv::DailyBar;
use breakout::ports::history_port::HistoryPort;
use breakout::ports::order_port::{OrderPort, StopTicket};
use breakout::ports::telemetry_port::TelemetryPort;
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;

pub const SYMBOL: &str = "QCOM";

/// Serves a fixed bar series up to a movable `visible` count.
pub struct MockHistory {
    pub bars: Vec<DailyBar>,
    pub visible: usize,
}

impl MockHistory {
    pub fn new(bars: Vec<DailyBar>) -> Self {
        let visible = bars.len();
        Self { bars, visible }
    }

    pub fn showing(mut self, visible: usize) -> Self {
        self.visible = visible.min(self.bars.len());
        self
    }

    /// The bar a tick with `visible` completed bars trades on.
    pub fn today(&self) -> &DailyBar {
        &self.bars[self.visible]
    }
}

impl HistoryPort for MockHistory {
    fn daily_bars(&self, symbol: &str, count: usize) -> Result<Vec<DailyBar>, BreakoutError> {
        if symbol != SYMBOL {
            return Err(BreakoutError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let start = self.visible.saturating_sub(count);
        Ok(self.bars[start..self.visible].to_vec())
    }

    fn data_range(
        &self,
        _symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BreakoutError> {
        Ok(match (self.bars.first(), self.bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, self.bars.len())),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderCall {
    EnterLong { symbol: String, fraction: f64 },
    PlaceStop { symbol: String, quantity: i64, stop_price: f64 },
    UpdateStop { ticket: StopTicket, stop_price: f64 },
}

/// Order port that fills entries with a fixed quantity and records calls.
pub struct RecordingOrders {
    pub fill_quantity: i64,
    pub holdings: HashMap<String, i64>,
    pub open_orders: HashMap<String, StopTicket>,
    pub calls: Vec<OrderCall>,
    next_ticket: u64,
}

impl RecordingOrders {
    pub fn new(fill_quantity: i64) -> Self {
        Self {
            fill_quantity,
            holdings: HashMap::new(),
            open_orders: HashMap::new(),
            calls: Vec::new(),
            next_ticket: 1,
        }
    }

    pub fn holding(mut self, symbol: &str, quantity: i64) -> Self {
        self.holdings.insert(symbol.to_string(), quantity);
        self
    }

    /// Simulate the resting stop filling.
    pub fn stop_out(&mut self, symbol: &str) {
        self.holdings.remove(symbol);
        self.open_orders.remove(symbol);
    }

    pub fn take_calls(&mut self) -> Vec<OrderCall> {
        std::mem::take(&mut self.calls)
    }
}

impl OrderPort for RecordingOrders {
    fn enter_long(&mut self, symbol: &str, fraction: f64) -> Result<i64, BreakoutError> {
        self.calls.push(OrderCall::EnterLong {
            symbol: symbol.to_string(),
            fraction,
        });
        *self.holdings.entry(symbol.to_string()).or_insert(0) += self.fill_quantity;
        Ok(self.fill_quantity)
    }

    fn place_stop_order(
        &mut self,
        symbol: &str,
        quantity: i64,
        stop_price: f64,
    ) -> Result<StopTicket, BreakoutError> {
        self.calls.push(OrderCall::PlaceStop {
            symbol: symbol.to_string(),
            quantity,
            stop_price,
        });
        let ticket = StopTicket::new(self.next_ticket);
        self.next_ticket += 1;
        self.open_orders.insert(symbol.to_string(), ticket);
        Ok(ticket)
    }

    fn update_stop_order(
        &mut self,
        ticket: StopTicket,
        stop_price: f64,
    ) -> Result<(), BreakoutError> {
        self.calls.push(OrderCall::UpdateStop { ticket, stop_price });
        if self.open_orders.values().any(|t| *t == ticket) {
            Ok(())
        } else {
            Err(BreakoutError::Order {
                reason: format!("unknown stop ticket {}", ticket.id()),
            })
        }
    }

    fn has_open_orders(&self, symbol: &str) -> bool {
        self.open_orders.contains_key(symbol)
    }

    fn holdings(&self, symbol: &str) -> i64 {
        self.holdings.get(symbol).copied().unwrap_or(0)
    }
}

#[derive(Default)]
pub struct RecordingTelemetry {
    pub points: Vec<(NaiveDate, String, String, f64)>,
}

impl RecordingTelemetry {
    pub fn series(&self, series: &str) -> Vec<f64> {
        self.points
            .iter()
            .filter(|(_, _, s, _)| s == series)
            .map(|(_, _, _, v)| *v)
            .collect()
    }
}

impl TelemetryPort for RecordingTelemetry {
    fn plot(
        &mut self,
        date: NaiveDate,
        chart: &str,
        series: &str,
        value: f64,
    ) -> Result<(), BreakoutError> {
        self.points
            .push((date, chart.to_string(), series.to_string(), value));
        Ok(())
    }
}

pub fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, 1).unwrap() + Duration::days(offset)
}

/// Daily bars from closes: each bar opens at the previous close and ranges
/// half a point beyond its open and close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<DailyBar> {
    let mut prev = closes.first().copied().unwrap_or(0.0);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = prev;
            prev = close;
            DailyBar {
                symbol: SYMBOL.to_string(),
                date: day(i as i64),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: 1_000,
            }
        })
        .collect()
}

/// 40 closes alternating 100/101, a rally to 120, then a slide to 80.
pub fn breakout_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..40)
        .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
        .collect();
    closes.extend([104.0, 108.0, 112.0, 116.0, 120.0]);
    closes.extend([110.0, 100.0, 90.0, 85.0, 80.0]);
    closes
}

pub fn write_csv(dir: &std::path::Path, symbol: &str, bars: &[DailyBar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date.format("%Y-%m-%d"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    std::fs::write(dir.join(format!("{}.csv", symbol)), content).unwrap();
}
