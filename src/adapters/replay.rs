//! Daily replay of the strategy over CSV history with a paper broker.
//!
//! Each trading day inside the backtest range gets one scheduled tick. The
//! tick sees only bars completed before that day; entries fill at the day's
//! open and resting stops are checked against the day's range afterwards.

use tracing::{debug, info};

use crate::adapters::csv_adapter::CsvHistory;
use crate::adapters::paper_broker::PaperBroker;
use crate::domain::backtest::{BacktestConfig, BreakoutAlgorithm, Collaborators};
use crate::domain::error::BreakoutError;
use crate::domain::position::ClosedTrade;
use crate::domain::strategy::StrategyState;
use crate::ports::order_port::OrderPort;
use crate::ports::telemetry_port::TelemetryPort;

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySummary {
    pub ticks: usize,
    pub skipped: usize,
    pub entries: usize,
    pub trades: Vec<ClosedTrade>,
    pub initial_capital: f64,
    pub final_equity: f64,
    pub final_state: StrategyState,
}

impl ReplaySummary {
    pub fn total_return(&self) -> f64 {
        if self.initial_capital > 0.0 {
            (self.final_equity - self.initial_capital) / self.initial_capital
        } else {
            0.0
        }
    }

    pub fn final_lookback(&self) -> usize {
        self.final_state.lookback.value()
    }
}

pub fn run_replay(
    history: &mut CsvHistory,
    broker: &mut PaperBroker,
    telemetry: &mut dyn TelemetryPort,
    algorithm: &mut BreakoutAlgorithm,
    config: &BacktestConfig,
    mut state: StrategyState,
) -> Result<ReplaySummary, BreakoutError> {
    let symbol = algorithm.symbol().to_string();
    let days = history.bars_between(&symbol, config.start_date, config.end_date);
    if days.is_empty() {
        return Err(BreakoutError::NoData { symbol });
    }

    info!(
        %symbol,
        days = days.len(),
        start = %config.start_date,
        end = %config.end_date,
        minutes_after_open = config.minutes_after_open,
        "replay started"
    );

    let mut ticks = 0;
    let mut skipped = 0;
    let mut entries = 0;

    for bar in &days {
        history.set_cursor(bar.date);
        broker.begin_day(bar);

        let report = {
            let mut ports = Collaborators {
                history: &*history,
                orders: &mut *broker,
                telemetry: &mut *telemetry,
            };
            algorithm.on_market_open(state, bar.date, &mut ports)?
        };
        ticks += 1;
        if report.skipped.is_some() {
            skipped += 1;
        }
        if report.actions.entry.is_some() {
            entries += 1;
        }
        state = report.state;

        let closed = broker.process_bar(bar);
        if !closed.is_empty() && broker.holdings(&symbol) == 0 {
            debug!(date = %bar.date, "position closed by stop");
            state = algorithm.on_position_closed(state);
        }

        algorithm.on_data(bar, telemetry);
    }
    history.clear_cursor();

    let summary = ReplaySummary {
        ticks,
        skipped,
        entries,
        trades: broker.closed_trades().to_vec(),
        initial_capital: broker.initial_capital(),
        final_equity: broker.equity(),
        final_state: state,
    };
    info!(
        ticks = summary.ticks,
        skipped = summary.skipped,
        trades = summary.trades.len(),
        final_equity = summary.final_equity,
        "replay finished"
    );
    Ok(summary)
}
