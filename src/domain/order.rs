// ============================================================================
// Order Domain Model
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Remaining quantity at or below which an order counts as filled
pub const QUANTITY_EPSILON: f64 = 1e-9;

// ============================================================================
// Value Objects
// ============================================================================

/// Deterministic order identifier.
///
/// Derived from the placing transaction id and the market-wide order
/// sequence, so every replica executing the same transaction agrees on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn derive(transaction_id: &str, sequence: u64) -> Self {
        let name = format!("order:{}:{}", transaction_id, sequence);
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(format!("order side must be 'buy' or 'sell', got '{}'", other)),
        }
    }
}

// ============================================================================
// Order Entity
// ============================================================================

/// A resting limit order in the double auction book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,

    /// Market-wide placement sequence; breaks price ties (earlier first)
    pub sequence: u64,

    /// Consumer that placed the order
    pub owner: String,

    /// Limit price per unit
    pub price: f64,

    /// Remaining quantity
    pub quantity: f64,

    pub side: Side,

    /// Producer whose energy is offered; always present on sell orders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer_id: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OrderId,
        sequence: u64,
        owner: impl Into<String>,
        side: Side,
        price: f64,
        quantity: f64,
        producer_id: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sequence,
            owner: owner.into(),
            price,
            quantity,
            side,
            producer_id,
            timestamp,
        }
    }

    /// Reduce the remaining quantity; a remainder within
    /// `QUANTITY_EPSILON` of zero is snapped to zero
    pub fn fill(&mut self, quantity: f64) {
        let remaining = self.quantity - quantity;
        self.quantity = if remaining <= QUANTITY_EPSILON { 0.0 } else { remaining };
    }

    pub fn is_filled(&self) -> bool {
        self.quantity <= QUANTITY_EPSILON
    }

    /// Whether this order and a resting opposite order can trade
    pub fn crosses(&self, other: &Order) -> bool {
        match (self.side, other.side) {
            (Side::Buy, Side::Sell) => self.price >= other.price,
            (Side::Sell, Side::Buy) => self.price <= other.price,
            _ => false,
        }
    }
}
