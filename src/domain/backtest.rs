//! Backtest parameters and the per-tick strategy runner.
//!
//! [`BreakoutAlgorithm::on_market_open`] is the scheduled entry point: it
//! pulls history through the ports, runs the lookback, breakout and trailing
//! stop rules, and forwards the resulting orders. State is passed in and
//! returned; the runner itself only remembers the stop ticket handed out by
//! the order system.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::breakout::{detect_breakout, EntrySignal};
use super::error::BreakoutError;
use super::lookback::{update_lookback, LookbackChange};
use super::ohlcv::{self, DailyBar};
use super::position::PositionState;
use super::strategy::{StrategyParams, StrategyState};
use super::trailing_stop::update_trailing_stop;
use crate::ports::history_port::HistoryPort;
use crate::ports::order_port::{OrderPort, StopTicket};
use crate::ports::telemetry_port::TelemetryPort;

pub const DATA_CHART: &str = "Data Chart";
pub const STOP_SERIES: &str = "Stop Price";

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub symbol: String,
    pub minutes_after_open: u32,
}

/// Borrowed collaborators for one tick.
pub struct Collaborators<'a> {
    pub history: &'a dyn HistoryPort,
    pub orders: &'a mut dyn OrderPort,
    pub telemetry: &'a mut dyn TelemetryPort,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryFill {
    pub breakout_level: f64,
    pub quantity: i64,
}

/// What a tick decided, besides the new state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickActions {
    pub lookback_change: Option<LookbackChange>,
    pub entry: Option<EntryFill>,
    pub stop_placed: Option<f64>,
    pub stop_raised: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub date: NaiveDate,
    pub state: StrategyState,
    pub actions: TickActions,
    /// Set when the tick stopped early for lack of history.
    pub skipped: Option<String>,
}

impl TickReport {
    fn skipped(date: NaiveDate, state: StrategyState, actions: TickActions, err: BreakoutError) -> Self {
        warn!(%date, error = %err, "tick skipped");
        TickReport {
            date,
            state,
            actions,
            skipped: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BreakoutAlgorithm {
    symbol: String,
    params: StrategyParams,
    stop_ticket: Option<StopTicket>,
}

impl BreakoutAlgorithm {
    pub fn new(symbol: impl Into<String>, params: StrategyParams) -> Self {
        BreakoutAlgorithm {
            symbol: symbol.into(),
            params,
            stop_ticket: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    pub fn stop_ticket(&self) -> Option<StopTicket> {
        self.stop_ticket
    }

    pub fn on_market_open(
        &mut self,
        state: StrategyState,
        date: NaiveDate,
        ports: &mut Collaborators<'_>,
    ) -> Result<TickReport, BreakoutError> {
        let mut actions = TickActions::default();

        // Stage 1: adapt the lookback window
        let history = ports
            .history
            .daily_bars(&self.symbol, self.params.history_bars)?;
        let update = match update_lookback(
            state.lookback,
            &ohlcv::closes(&history),
            self.params.history_bars,
        ) {
            Ok(u) => u,
            Err(e @ BreakoutError::InsufficientData { .. }) => {
                return Ok(TickReport::skipped(date, state, actions, e));
            }
            Err(e) => return Err(e),
        };
        match update.change {
            LookbackChange::Adjusted {
                previous,
                next,
                delta_vol,
            } if previous != next => {
                debug!(%date, previous, next, delta_vol, "lookback adjusted");
            }
            LookbackChange::FlatVolatility => {
                debug!(%date, "flat volatility, lookback unchanged");
            }
            LookbackChange::Adjusted { .. } => {}
        }
        actions.lookback_change = Some(update.change);
        let mut state = StrategyState {
            lookback: update.state,
            ..state
        };

        // Stage 2: breakout entry
        let lookback = state.lookback.value();
        let window = ports.history.daily_bars(&self.symbol, lookback)?;
        let current_close = match window.last() {
            Some(bar) if window.len() >= lookback => bar.close,
            _ => {
                let err = BreakoutError::InsufficientData {
                    needed: lookback,
                    got: window.len(),
                };
                return Ok(TickReport::skipped(date, state, actions, err));
            }
        };

        let invested = ports.orders.holdings(&self.symbol) > 0;
        let signal = detect_breakout(&ohlcv::highs(&window), current_close, invested)?;
        if let EntrySignal::Enter { breakout_level } = signal {
            let quantity = ports
                .orders
                .enter_long(&self.symbol, self.params.allocation)?;
            if quantity > 0 {
                info!(
                    %date,
                    symbol = %self.symbol,
                    breakout_level,
                    quantity,
                    lookback,
                    "breakout entry"
                );
                state.position = Some(PositionState::open(breakout_level, &self.params.risk, date));
                actions.entry = Some(EntryFill {
                    breakout_level,
                    quantity,
                });
            } else {
                warn!(%date, symbol = %self.symbol, "breakout fired but capital covers no shares");
            }
        }

        // Stage 3: protective stop
        let held = ports.orders.holdings(&self.symbol);
        if held > 0 {
            if let Some(position) = state.position.as_mut() {
                if !ports.orders.has_open_orders(&self.symbol) {
                    let stop = position.stop_price();
                    let ticket = ports.orders.place_stop_order(&self.symbol, -held, stop)?;
                    info!(%date, stop, quantity = -held, ticket = ticket.id(), "stop order placed");
                    self.stop_ticket = Some(ticket);
                    actions.stop_placed = Some(stop);
                }

                let update = update_trailing_stop(
                    current_close,
                    position.breakout_level(),
                    position.highest_price(),
                    &self.params.risk,
                );
                if let Some(new_stop) = position.apply_stop_update(&update) {
                    if let Some(ticket) = self.stop_ticket {
                        ports.orders.update_stop_order(ticket, new_stop)?;
                    }
                    debug!(%date, stop = new_stop, high = position.highest_price(), "trailing stop raised");
                    actions.stop_raised = Some(new_stop);
                }

                plot(ports.telemetry, date, STOP_SERIES, position.stop_price());
            } else {
                warn!(%date, held, "holding shares without a tracked breakout position");
            }
        }

        Ok(TickReport {
            date,
            state,
            actions,
            skipped: None,
        })
    }

    /// Chart the bar's close under the symbol's series.
    pub fn on_data(&self, bar: &DailyBar, telemetry: &mut dyn TelemetryPort) {
        plot(telemetry, bar.date, &self.symbol, bar.close);
    }

    /// Holding → Flat after the order system reports the position closed.
    pub fn on_position_closed(&mut self, state: StrategyState) -> StrategyState {
        if let Some(ticket) = self.stop_ticket.take() {
            debug!(ticket = ticket.id(), "stop ticket released");
        }
        state.position_closed()
    }
}

fn plot(telemetry: &mut dyn TelemetryPort, date: NaiveDate, series: &str, value: f64) {
    if let Err(e) = telemetry.plot(date, DATA_CHART, series, value) {
        warn!(%date, series, error = %e, "telemetry sink failed");
    }
}
