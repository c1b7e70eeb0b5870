//! Order execution port trait.

use crate::domain::error::BreakoutError;

/// Opaque handle to a resting stop order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StopTicket(u64);

impl StopTicket {
    pub fn new(id: u64) -> Self {
        StopTicket(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

pub trait OrderPort {
    /// Buy up to `fraction` of portfolio value. Returns the filled quantity,
    /// zero when capital does not cover a single share.
    fn enter_long(&mut self, symbol: &str, fraction: f64) -> Result<i64, BreakoutError>;

    /// Rest a stop-market order. Negative `quantity` sells.
    fn place_stop_order(
        &mut self,
        symbol: &str,
        quantity: i64,
        stop_price: f64,
    ) -> Result<StopTicket, BreakoutError>;

    fn update_stop_order(&mut self, ticket: StopTicket, stop_price: f64)
        -> Result<(), BreakoutError>;

    fn has_open_orders(&self, symbol: &str) -> bool;

    /// Signed quantity currently held.
    fn holdings(&self, symbol: &str) -> i64;
}
