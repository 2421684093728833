// ============================================================================
// Domain Models Module
// Contains all core domain entities and value objects
// ============================================================================

pub mod config;
pub mod consumer;
pub mod order;
pub mod order_book;
pub mod producer;
pub mod report;
pub mod snapshot;
pub mod trade;

pub use config::{ClearingParameters, ConsumerSeed, MarketConfig, ProducerSeed};
pub use consumer::Consumer;
pub use order::{Order, OrderId, Side, QUANTITY_EPSILON};
pub use order_book::OrderBook;
pub use producer::Producer;
pub use report::{MarketStatistics, OrderBookView, PriceInfo};
pub use snapshot::{LedgerStatistics, MarketSnapshot};
pub use trade::{Counterparty, Trade, TradeId, TradeOrigin, CLEARING_POOL_ID};
