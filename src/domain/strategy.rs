//! Strategy parameters and per-symbol state.

use super::error::BreakoutError;
use super::lookback::{LookbackBounds, LookbackState, DEFAULT_HISTORY_BARS, DEFAULT_LOOKBACK};
use super::position::PositionState;
use super::trailing_stop::StopRisk;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub name: String,
    pub initial_lookback: usize,
    pub bounds: LookbackBounds,
    /// Closes fetched per tick for the volatility comparison.
    pub history_bars: usize,
    pub risk: StopRisk,
    /// Fraction of portfolio value committed on entry.
    pub allocation: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            name: "Adaptive Breakout".into(),
            initial_lookback: DEFAULT_LOOKBACK,
            bounds: LookbackBounds::default(),
            history_bars: DEFAULT_HISTORY_BARS,
            risk: StopRisk::default(),
            allocation: 1.0,
        }
    }
}

impl StrategyParams {
    pub fn initial_state(&self) -> Result<StrategyState, BreakoutError> {
        Ok(StrategyState {
            lookback: LookbackState::new(self.initial_lookback, self.bounds)?,
            position: None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Flat,
    Holding,
}

/// Everything the strategy carries from one tick to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyState {
    pub lookback: LookbackState,
    pub position: Option<PositionState>,
}

impl Default for StrategyState {
    fn default() -> Self {
        StrategyState {
            lookback: LookbackState::default(),
            position: None,
        }
    }
}

impl StrategyState {
    pub fn phase(&self) -> Phase {
        if self.position.is_some() {
            Phase::Holding
        } else {
            Phase::Flat
        }
    }

    /// Holding → Flat, on notice from the order system that the position
    /// has been closed.
    pub fn position_closed(self) -> Self {
        StrategyState {
            position: None,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn default_params_match_reference_setup() {
        let p = StrategyParams::default();
        assert_eq!(p.initial_lookback, 25);
        assert_eq!(p.bounds, LookbackBounds { floor: 20, ceiling: 40 });
        assert_eq!(p.history_bars, 31);
        assert_eq!(p.risk, StopRisk { initial: 0.9, trailing: 0.9 });
        assert_eq!(p.allocation, 1.0);
    }

    #[test]
    fn initial_state_is_flat() {
        let state = StrategyParams::default().initial_state().unwrap();
        assert_eq!(state.phase(), Phase::Flat);
        assert_eq!(state.lookback.value(), 25);
    }

    #[test]
    fn initial_state_rejects_bad_lookback() {
        let params = StrategyParams {
            initial_lookback: 10,
            ..StrategyParams::default()
        };
        assert!(params.initial_state().is_err());
    }

    #[test]
    fn position_closed_resets_to_flat_and_keeps_lookback() {
        let lookback = LookbackState::new(33, LookbackBounds::default()).unwrap();
        let state = StrategyState {
            lookback,
            position: Some(PositionState::open(
                50.0,
                &StopRisk::default(),
                NaiveDate::from_ymd_opt(2021, 2, 1).unwrap(),
            )),
        };
        assert_eq!(state.phase(), Phase::Holding);

        let closed = state.position_closed();
        assert_eq!(closed.phase(), Phase::Flat);
        assert_eq!(closed.lookback.value(), 33);
    }
}
