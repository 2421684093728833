// ============================================================================
// Matching Algorithm Interface
// Defines the contract for pluggable order book matching
// ============================================================================

use crate::domain::{Order, OrderBook, OrderId};

/// One execution between a buy order and a sell order
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub buy_order: OrderId,
    pub sell_order: OrderId,
    pub buyer: String,
    pub seller: String,
    pub producer_id: String,
    pub price: f64,
    pub quantity: f64,
}

impl Fill {
    /// Describe an execution of `quantity` between `buy` and `sell` at `price`
    pub fn between(buy: &Order, sell: &Order, price: f64, quantity: f64) -> Self {
        Self {
            buy_order: buy.id,
            sell_order: sell.id,
            buyer: buy.owner.clone(),
            seller: sell.owner.clone(),
            producer_id: sell.producer_id.clone().unwrap_or_default(),
            price,
            quantity,
        }
    }
}

/// Strategy pattern interface for matching algorithms
pub trait MatchingAlgorithm: Send + Sync {
    /// Cross the book in place until no executable pair remains
    ///
    /// # Arguments
    /// * `book` - Working copy of the resting orders; filled orders are
    ///   removed and partially filled ones keep their reduced quantity
    ///
    /// # Returns
    /// Executions in the order they happened
    fn match_book(&self, book: &mut OrderBook) -> Vec<Fill>;

    /// Get the algorithm name for logging
    fn name(&self) -> &str;

    /// Price at which a crossing buy and sell execute
    fn execution_price(&self, buy: &Order, sell: &Order) -> f64 {
        (buy.price + sell.price) / 2.0
    }
}
