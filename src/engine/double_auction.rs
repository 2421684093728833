// ============================================================================
// Midpoint Continuous Double Auction
// Best bid against best ask, executed halfway between the two limits
// ============================================================================

use crate::domain::{OrderBook, Side};
use crate::interfaces::{Fill, MatchingAlgorithm};

/// Price/time priority crossing with midpoint execution
///
/// The best buy (highest price, earliest sequence) meets the best sell
/// (lowest price, earliest sequence) while the buy limit reaches the sell
/// limit. Each execution takes the smaller remaining quantity.
///
/// # Example
/// ```text
/// Book:  Buy  10 @ 5.0
///        Sell 10 @ 4.0
///
/// Result: one fill of 10 @ 4.5, both orders removed
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MidpointDoubleAuction;

impl MidpointDoubleAuction {
    pub fn new() -> Self {
        Self
    }
}

impl MatchingAlgorithm for MidpointDoubleAuction {
    fn match_book(&self, book: &mut OrderBook) -> Vec<Fill> {
        let mut fills = Vec::new();

        loop {
            let fill = match (book.best(Side::Buy), book.best(Side::Sell)) {
                (Some(buy), Some(sell)) if buy.price >= sell.price => {
                    let quantity = buy.quantity.min(sell.quantity);
                    Fill::between(buy, sell, self.execution_price(buy, sell), quantity)
                },
                _ => break,
            };

            book.fill_best(Side::Buy, fill.quantity);
            book.fill_best(Side::Sell, fill.quantity);
            fills.push(fill);
        }

        fills
    }

    fn name(&self) -> &str {
        "Midpoint Double Auction"
    }
}
