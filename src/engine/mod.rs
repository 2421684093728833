// ============================================================================
// Engine Module
// Price discovery, order matching, settlement and the market facade
// ============================================================================

mod double_auction;
mod market;
mod price_discovery;
mod reporting;

pub mod factory;
pub mod settlement;
pub mod transaction;

pub use double_auction::MidpointDoubleAuction;
pub use factory::{create_from_config, EnergyMarketBuilder};
pub use market::{EnergyMarket, OrderReceipt};
pub use price_discovery::{PriceDiscovery, StepOutcome};
pub use reporting::{market_statistics, price_info};
pub use settlement::TradeRequest;
pub use transaction::MarketTransaction;
