// ============================================================================
// Market Factory
// Creates energy markets with validated configuration
// ============================================================================

use crate::domain::{ClearingParameters, MarketConfig};
use crate::engine::{EnergyMarket, MidpointDoubleAuction};
use crate::error::{MarketError, MarketResult};
use crate::interfaces::{EventHandler, MatchingAlgorithm, NoOpEventHandler, StateStore};
use crate::store::MemoryStore;
use std::sync::Arc;

// ============================================================================
// Factory Functions
// ============================================================================

/// Creates an in-memory energy market from configuration
///
/// # Arguments
/// * `config` - Market configuration
/// * `event_handler` - Event handler for market events
///
/// # Example
/// ```
/// use energy_market::prelude::*;
/// use energy_market::engine::factory::create_from_config;
/// use std::sync::Arc;
///
/// let market = create_from_config(MarketConfig::reference(), Arc::new(NoOpEventHandler)).unwrap();
/// assert_eq!(market.algorithm_name(), "Midpoint Double Auction");
/// ```
pub fn create_from_config(
    config: MarketConfig,
    event_handler: Arc<dyn EventHandler>,
) -> MarketResult<EnergyMarket> {
    EnergyMarketBuilder::new()
        .with_config(config)
        .with_event_handler(event_handler)
        .build()
}

// ============================================================================
// Builder Pattern for Advanced Configuration
// ============================================================================

/// Builder for creating energy markets with fluent API
///
/// Unset parts default to an in-memory store, midpoint double auction
/// matching and a no-op event handler.
///
/// # Example
/// ```
/// use energy_market::prelude::*;
/// use energy_market::engine::factory::EnergyMarketBuilder;
/// use std::sync::Arc;
///
/// let market = EnergyMarketBuilder::new()
///     .with_price_band(0.2)
///     .with_event_handler(Arc::new(LoggingEventHandler))
///     .build()
///     .unwrap();
///
/// let ctx = FixedContext::genesis();
/// market.initialize_market(&ctx).unwrap();
/// ```
pub struct EnergyMarketBuilder {
    config: MarketConfig,
    store: Option<Arc<dyn StateStore>>,
    algorithm: Option<Box<dyn MatchingAlgorithm>>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl EnergyMarketBuilder {
    /// Start from the reference market
    pub fn new() -> Self {
        Self {
            config: MarketConfig::reference(),
            store: None,
            algorithm: None,
            event_handler: None,
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Replace the whole configuration
    pub fn with_config(mut self, config: MarketConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the solver tuning
    pub fn with_clearing(mut self, clearing: ClearingParameters) -> Self {
        self.config.clearing = clearing;
        self
    }

    /// Set the allowed relative deviation of sell prices from lambda
    pub fn with_price_band(mut self, band: f64) -> Self {
        self.config.price_band = band;
        self
    }

    // ========================================================================
    // Collaborators
    // ========================================================================

    pub fn with_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_algorithm(mut self, algorithm: Box<dyn MatchingAlgorithm>) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    pub fn with_event_handler(mut self, event_handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(event_handler);
        self
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Validate the configuration and assemble the market
    pub fn build(self) -> MarketResult<EnergyMarket> {
        self.config.validate().map_err(MarketError::InvalidArgument)?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn StateStore>);
        let algorithm = self
            .algorithm
            .unwrap_or_else(|| Box::new(MidpointDoubleAuction::new()) as Box<dyn MatchingAlgorithm>);
        let event_handler = self
            .event_handler
            .unwrap_or_else(|| Arc::new(NoOpEventHandler) as Arc<dyn EventHandler>);

        Ok(EnergyMarket::new(store, self.config, algorithm, event_handler))
    }
}

impl Default for EnergyMarketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let market = EnergyMarketBuilder::new().build().unwrap();

        assert_eq!(market.algorithm_name(), "Midpoint Double Auction");
        assert_eq!(market.config(), &MarketConfig::reference());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = EnergyMarketBuilder::new().with_price_band(-0.5).build();
        assert!(matches!(result, Err(MarketError::InvalidArgument(_))));

        let mut clearing = ClearingParameters::default();
        clearing.lambda_tolerance = f64::NAN;
        assert!(EnergyMarketBuilder::new().with_clearing(clearing).build().is_err());
    }

    #[test]
    fn test_shared_store() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let writer = EnergyMarketBuilder::new().with_store(Arc::clone(&store)).build().unwrap();
        let reader = EnergyMarketBuilder::new().with_store(store).build().unwrap();

        writer
            .initialize_market(&crate::interfaces::FixedContext::genesis())
            .unwrap();
        assert_eq!(reader.get_snapshot().unwrap().consumers.len(), 6);
    }

    #[test]
    fn test_create_from_config() {
        let config = MarketConfig::reference().with_default_recent_trades(3);
        let market = create_from_config(config, Arc::new(NoOpEventHandler)).unwrap();
        assert_eq!(market.config().default_recent_trades, 3);
    }
}
