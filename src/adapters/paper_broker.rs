//! Paper order adapter for replaying the strategy over daily bars.
//!
//! Market entries fill at the current bar's open in whole shares. Each
//! symbol holds at most one resting stop-market sell, which fills at
//! `min(open, stop)` once a bar trades down to the stop. No commissions or
//! slippage.

use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::info;

use crate::domain::error::BreakoutError;
use crate::domain::ohlcv::DailyBar;
use crate::domain::position::ClosedTrade;
use crate::ports::order_port::{OrderPort, StopTicket};

#[derive(Debug, Clone, PartialEq)]
struct Holding {
    quantity: i64,
    entry_price: f64,
    entry_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
struct StopOrder {
    symbol: String,
    quantity: i64,
    stop_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Quote {
    date: NaiveDate,
    open: f64,
    close: f64,
}

#[derive(Debug, Clone)]
pub struct PaperBroker {
    cash: f64,
    initial_capital: f64,
    holdings: HashMap<String, Holding>,
    stops: HashMap<StopTicket, StopOrder>,
    quotes: HashMap<String, Quote>,
    next_ticket: u64,
    closed_trades: Vec<ClosedTrade>,
}

impl PaperBroker {
    pub fn new(initial_capital: f64) -> Self {
        PaperBroker {
            cash: initial_capital,
            initial_capital,
            holdings: HashMap::new(),
            stops: HashMap::new(),
            quotes: HashMap::new(),
            next_ticket: 1,
            closed_trades: Vec::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed_trades
    }

    /// Make `bar` the tradable quote for its symbol. Call before the tick.
    pub fn begin_day(&mut self, bar: &DailyBar) {
        self.quotes.insert(
            bar.symbol.clone(),
            Quote {
                date: bar.date,
                open: bar.open,
                close: bar.close,
            },
        );
    }

    /// Fill any stop touched by `bar`. Returns the trades closed.
    pub fn process_bar(&mut self, bar: &DailyBar) -> Vec<ClosedTrade> {
        let triggered: Vec<StopTicket> = self
            .stops
            .iter()
            .filter(|(_, s)| s.symbol == bar.symbol && bar.touches_below(s.stop_price))
            .map(|(t, _)| *t)
            .collect();

        let mut closed = Vec::new();
        for ticket in triggered {
            let Some(stop) = self.stops.remove(&ticket) else {
                continue;
            };
            let fill_price = bar.open.min(stop.stop_price);
            if let Some(trade) = self.sell(&stop.symbol, -stop.quantity, fill_price, bar.date) {
                info!(
                    date = %bar.date,
                    symbol = %trade.symbol,
                    fill_price,
                    pnl = trade.pnl,
                    "stop filled"
                );
                closed.push(trade);
            }
        }
        closed
    }

    /// Cash plus holdings marked at each symbol's latest close.
    pub fn equity(&self) -> f64 {
        let marked: f64 = self
            .holdings
            .iter()
            .map(|(symbol, h)| {
                let price = self
                    .quotes
                    .get(symbol)
                    .map(|q| q.close)
                    .unwrap_or(h.entry_price);
                h.quantity as f64 * price
            })
            .sum();
        self.cash + marked
    }

    fn sell(
        &mut self,
        symbol: &str,
        quantity: i64,
        price: f64,
        date: NaiveDate,
    ) -> Option<ClosedTrade> {
        let holding = self.holdings.get_mut(symbol)?;
        let quantity = quantity.min(holding.quantity);
        if quantity <= 0 {
            return None;
        }
        holding.quantity -= quantity;
        self.cash += quantity as f64 * price;

        let trade = ClosedTrade {
            symbol: symbol.to_string(),
            quantity,
            entry_price: holding.entry_price,
            exit_price: price,
            entry_date: holding.entry_date,
            exit_date: date,
            pnl: quantity as f64 * (price - holding.entry_price),
        };
        if holding.quantity == 0 {
            self.holdings.remove(symbol);
        }
        self.closed_trades.push(trade.clone());
        Some(trade)
    }
}

impl OrderPort for PaperBroker {
    fn enter_long(&mut self, symbol: &str, fraction: f64) -> Result<i64, BreakoutError> {
        let quote = *self.quotes.get(symbol).ok_or_else(|| BreakoutError::Order {
            reason: format!("no quote for {}", symbol),
        })?;
        if quote.open <= 0.0 {
            return Err(BreakoutError::Order {
                reason: format!("non-positive price {} for {}", quote.open, symbol),
            });
        }

        let held = self.holdings(symbol);
        let target = ((self.equity() * fraction) / quote.open).floor() as i64;
        let affordable = (self.cash / quote.open).floor() as i64;
        let quantity = (target - held).min(affordable);
        if quantity <= 0 {
            return Ok(0);
        }

        self.cash -= quantity as f64 * quote.open;
        let holding = self.holdings.entry(symbol.to_string()).or_insert(Holding {
            quantity: 0,
            entry_price: quote.open,
            entry_date: quote.date,
        });
        let total = holding.quantity + quantity;
        holding.entry_price =
            (holding.entry_price * holding.quantity as f64 + quote.open * quantity as f64)
                / total as f64;
        holding.quantity = total;
        Ok(quantity)
    }

    fn place_stop_order(
        &mut self,
        symbol: &str,
        quantity: i64,
        stop_price: f64,
    ) -> Result<StopTicket, BreakoutError> {
        if quantity >= 0 {
            return Err(BreakoutError::Order {
                reason: format!("stop order quantity must be negative, got {}", quantity),
            });
        }
        if !(stop_price > 0.0 && stop_price.is_finite()) {
            return Err(BreakoutError::Order {
                reason: format!("invalid stop price {}", stop_price),
            });
        }
        let ticket = StopTicket::new(self.next_ticket);
        self.next_ticket += 1;
        self.stops.insert(
            ticket,
            StopOrder {
                symbol: symbol.to_string(),
                quantity,
                stop_price,
            },
        );
        Ok(ticket)
    }

    fn update_stop_order(
        &mut self,
        ticket: StopTicket,
        stop_price: f64,
    ) -> Result<(), BreakoutError> {
        let stop = self.stops.get_mut(&ticket).ok_or_else(|| BreakoutError::Order {
            reason: format!("unknown stop ticket {}", ticket.id()),
        })?;
        stop.stop_price = stop_price;
        Ok(())
    }

    fn has_open_orders(&self, symbol: &str) -> bool {
        self.stops.values().any(|s| s.symbol == symbol)
    }

    fn holdings(&self, symbol: &str) -> i64 {
        self.holdings.get(symbol).map(|h| h.quantity).unwrap_or(0)
    }
}
