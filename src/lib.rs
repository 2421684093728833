// ============================================================================
// Energy Market Library
// Market clearing by dual decomposition with a continuous double auction
// ============================================================================

//! # Energy Market
//!
//! Computes a market-clearing price and allocation for energy traded between
//! producers with convex quadratic costs and consumers with concave quadratic
//! utilities, and runs a double auction order book next to it.
//!
//! ## Features
//!
//! - **Price discovery** by projected subgradient steps on the producers'
//!   prices and the consumers' demand-bound multipliers
//! - **Midpoint double auction** behind a pluggable matching trait
//! - **Single settlement path** keeping balances, volumes and the trade
//!   ledger consistent
//! - **Atomic, versioned commits** against any key-value state store
//! - **Deterministic execution**: time and identity come from the
//!   transaction context, never from the local clock
//!
//! ## Example
//!
//! ```rust
//! use energy_market::prelude::*;
//! use std::sync::Arc;
//!
//! let market = EnergyMarketBuilder::new()
//!     .with_event_handler(Arc::new(NoOpEventHandler))
//!     .build()
//!     .unwrap();
//!
//! let ctx = FixedContext::genesis();
//! market.initialize_market(&ctx).unwrap();
//!
//! // Iterate until supply meets demand; the equilibrium allocation is settled
//! let outcome = market.run_until_converged(&ctx, 500).unwrap();
//! assert!(outcome.converged);
//!
//! let price = market.get_current_price(&ctx).unwrap();
//! println!("Clearing price: {:?}", price.current_price);
//! ```

pub mod domain;
pub mod engine;
pub mod error;
pub mod interfaces;
pub mod numeric;
pub mod store;

// Re-exports for convenience
pub mod prelude {
    pub use crate::domain::{
        ClearingParameters, Consumer, ConsumerSeed, Counterparty, MarketConfig, MarketSnapshot,
        MarketStatistics, Order, OrderBookView, OrderId, PriceInfo, Producer, ProducerSeed, Side,
        Trade, TradeId, TradeOrigin, CLEARING_POOL_ID,
    };
    pub use crate::engine::{
        create_from_config, EnergyMarket, EnergyMarketBuilder, MidpointDoubleAuction,
        OrderReceipt, StepOutcome,
    };
    pub use crate::error::{MarketError, MarketResult, StoreError};
    pub use crate::interfaces::{
        EventHandler, FixedContext, LoggingEventHandler, MarketEvent, MatchingAlgorithm,
        NoOpEventHandler, StateStore, TransactionContext,
    };
    pub use crate::store::MemoryStore;
}
