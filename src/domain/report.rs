// ============================================================================
// Reporting Views
// Fixed-shape results of the read-only query surface
// ============================================================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Order;

/// Resting orders split by side: buys best (highest) first, sells best
/// (lowest) first, ties in placement order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookView {
    pub buy: Vec<Order>,
    pub sell: Vec<Order>,
}

impl OrderBookView {
    pub fn best_bid(&self) -> Option<f64> {
        self.buy.first().map(|o| o.price)
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.sell.first().map(|o| o.price)
    }

    pub fn spread(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    pub fn buy_volume(&self) -> f64 {
        self.buy.iter().map(|o| o.quantity).sum()
    }

    pub fn sell_volume(&self) -> f64 {
        self.sell.iter().map(|o| o.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buy.is_empty() && self.sell.is_empty()
    }
}

/// Latest traded price and its change over the look-back window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceInfo {
    /// Price of the most recent trade; `None` before the first trade
    pub current_price: Option<f64>,

    /// Percent change against the newest trade older than the window;
    /// zero when no such trade exists
    pub price_change: f64,
}

/// Market-wide statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStatistics {
    pub total_generation_capacity: f64,
    pub total_demand: f64,
    pub social_welfare: f64,
    pub volume_24h: Decimal,
    pub trade_count_24h: u64,
    pub average_price_24h: f64,
    pub current_price: Option<f64>,
    pub price_change_24h: f64,
    pub total_buy_volume: f64,
    pub total_sell_volume: f64,
    pub producer_count: usize,
    pub consumer_count: usize,
}
