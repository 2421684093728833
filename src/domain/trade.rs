// ============================================================================
// Trade Domain Model
// ============================================================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stored seller id of trades settled against the clearing pool
pub const CLEARING_POOL_ID: &str = "MARKET";

/// Strictly increasing trade identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Selling side of a trade
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Counterparty {
    /// A registered consumer
    Consumer(String),
    /// The anonymous clearing pool; only the buyer's balance moves
    ClearingPool,
}

impl Counterparty {
    pub fn consumer(id: impl Into<String>) -> Self {
        Counterparty::Consumer(id.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Counterparty::Consumer(id) => id,
            Counterparty::ClearingPool => CLEARING_POOL_ID,
        }
    }

    pub fn is_pool(&self) -> bool {
        matches!(self, Counterparty::ClearingPool)
    }
}

impl From<String> for Counterparty {
    fn from(id: String) -> Self {
        if id == CLEARING_POOL_ID {
            Counterparty::ClearingPool
        } else {
            Counterparty::Consumer(id)
        }
    }
}

impl From<Counterparty> for String {
    fn from(counterparty: Counterparty) -> Self {
        match counterparty {
            Counterparty::Consumer(id) => id,
            Counterparty::ClearingPool => CLEARING_POOL_ID.to_string(),
        }
    }
}

impl fmt::Display for Counterparty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What caused a trade to be settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TradeOrigin {
    /// Allocation recorded when price discovery converged
    Clearing,
    /// Crossing orders in the double auction
    OrderBook,
    /// Submitted directly through the settlement entry point
    Direct,
}

/// An executed, immutable trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: TradeId,

    #[serde(rename = "buyerId")]
    pub buyer: String,

    #[serde(rename = "sellerId")]
    pub seller: Counterparty,

    /// Producer whose energy changed hands
    pub producer_id: String,

    /// Price per unit
    pub price: f64,

    pub quantity: f64,

    /// `price * quantity` as booked on the ledger
    pub total_value: Decimal,

    pub timestamp: DateTime<Utc>,
    pub block_height: u64,
    pub transaction_id: String,
    pub origin: TradeOrigin,
}

impl Trade {
    /// Whether `user` bought or sold in this trade
    pub fn involves(&self, user: &str) -> bool {
        self.buyer == user || self.seller.as_str() == user
    }
}
