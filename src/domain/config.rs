// ============================================================================
// Market Configuration
// Solver tuning, order validation limits and the seed market layout
// ============================================================================

use crate::error::{MarketError, MarketResult};
use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Consumer, Producer};

// ============================================================================
// Clearing Parameters
// ============================================================================

/// Tuning of the dual decomposition solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClearingParameters {
    /// Base of the supply-side price step (divided by sqrt(k+1))
    pub supply_step: f64,

    /// Base of the demand-side multiplier step (divided by sqrt(k+1))
    pub demand_step: f64,

    /// Largest per-producer price move still counted as converged
    pub lambda_tolerance: f64,

    /// Largest |generation - demand| gap (MW) still counted as converged
    pub balance_tolerance: f64,

    /// Floor on the denominator when scaling demand up to its minimum
    pub demand_epsilon: f64,
}

impl Default for ClearingParameters {
    fn default() -> Self {
        Self {
            supply_step: 0.005,
            demand_step: 0.0001,
            lambda_tolerance: 9e-5,
            balance_tolerance: 1.0,
            demand_epsilon: 1e-4,
        }
    }
}

// ============================================================================
// Seed Participants
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerSeed {
    pub id: String,
    pub a: f64,
    pub b: f64,
    pub production_min: f64,
    pub production_max: f64,
    pub owner_id: String,
}

impl ProducerSeed {
    pub fn new(id: &str, a: f64, b: f64, min: f64, max: f64, owner_id: &str) -> Self {
        Self {
            id: id.to_string(),
            a,
            b,
            production_min: min,
            production_max: max,
            owner_id: owner_id.to_string(),
        }
    }

    pub fn build(&self) -> Producer {
        Producer::new(
            self.id.clone(),
            self.a,
            self.b,
            self.production_min,
            self.production_max,
            self.owner_id.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerSeed {
    pub id: String,
    pub beta: f64,
    pub theta: f64,
    pub demand_min: f64,
    pub demand_max: f64,
    pub balance: Decimal,
}

impl ConsumerSeed {
    pub fn new(id: &str, beta: f64, theta: f64, min: f64, max: f64, balance: Decimal) -> Self {
        Self {
            id: id.to_string(),
            beta,
            theta,
            demand_min: min,
            demand_max: max,
            balance,
        }
    }

    pub fn build(&self, producer_count: usize) -> Consumer {
        Consumer::new(
            self.id.clone(),
            self.beta,
            self.theta,
            self.demand_min,
            self.demand_max,
            self.balance,
            producer_count,
        )
    }
}

// ============================================================================
// Complete Market Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketConfig {
    #[serde(default)]
    pub clearing: ClearingParameters,

    /// Allowed relative distance of a sell price from the producer's lambda
    pub price_band: f64,

    /// Look-back window for price change and 24h statistics
    pub price_change_window_hours: i64,

    /// Trades returned by recent-trade queries when no limit is given
    pub default_recent_trades: usize,

    /// Producers created by market initialization
    pub seed_producers: Vec<ProducerSeed>,

    /// Consumers created by market initialization
    pub seed_consumers: Vec<ConsumerSeed>,
}

impl MarketConfig {
    /// Create an empty-market configuration with the given solver tuning
    pub fn new(clearing: ClearingParameters) -> Self {
        Self {
            clearing,
            price_band: 0.1,
            price_change_window_hours: 24,
            default_recent_trades: 10,
            seed_producers: Vec::new(),
            seed_consumers: Vec::new(),
        }
    }

    /// Builder method: Set the sell-order sanity band
    pub fn with_price_band(mut self, band: f64) -> Self {
        self.price_band = band;
        self
    }

    /// Builder method: Set the price change window
    pub fn with_price_change_window_hours(mut self, hours: i64) -> Self {
        self.price_change_window_hours = hours;
        self
    }

    /// Builder method: Set the default recent-trades limit
    pub fn with_default_recent_trades(mut self, limit: usize) -> Self {
        self.default_recent_trades = limit;
        self
    }

    /// Builder method: Add a seed consumer
    pub fn with_seed_consumer(mut self, seed: ConsumerSeed) -> Self {
        self.seed_consumers.push(seed);
        self
    }

    /// Builder method: Add a seed producer
    pub fn with_seed_producer(mut self, seed: ProducerSeed) -> Self {
        self.seed_producers.push(seed);
        self
    }

    pub fn price_change_window(&self) -> Duration {
        Duration::hours(self.price_change_window_hours)
    }

    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> MarketResult<Self> {
        let config: MarketConfig =
            serde_json::from_str(json).map_err(|e| MarketError::invalid(e.to_string()))?;
        config.validate().map_err(MarketError::InvalidArgument)?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let c = &self.clearing;
        for (name, value) in [
            ("Supply step", c.supply_step),
            ("Demand step", c.demand_step),
            ("Lambda tolerance", c.lambda_tolerance),
            ("Balance tolerance", c.balance_tolerance),
            ("Demand epsilon", c.demand_epsilon),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("{} must be positive", name));
            }
        }

        if !(self.price_band.is_finite() && self.price_band >= 0.0) {
            return Err("Price band cannot be negative".to_string());
        }

        if self.price_change_window_hours <= 0 {
            return Err("Price change window must be positive".to_string());
        }

        for seed in &self.seed_consumers {
            Consumer::validate_parameters(seed.beta, seed.theta, seed.demand_min, seed.demand_max)
                .map_err(|e| format!("Seed consumer {}: {}", seed.id, e))?;
        }

        for seed in &self.seed_producers {
            Producer::validate_parameters(seed.a, seed.b, seed.production_min, seed.production_max)
                .map_err(|e| format!("Seed producer {}: {}", seed.id, e))?;
            if !self.seed_consumers.iter().any(|c| c.id == seed.owner_id) {
                return Err(format!(
                    "Seed producer {} is owned by unknown consumer {}",
                    seed.id, seed.owner_id
                ));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Preset Configurations (Factory Methods)
// ============================================================================

impl MarketConfig {
    /// Reference market: three producers owned by the first three of six
    /// consumers, every consumer starting with a balance of 10000
    pub fn reference() -> Self {
        let balance = Decimal::from(10_000);

        Self::new(ClearingParameters::default())
            .with_seed_consumer(ConsumerSeed::new("consumer1", 8.25, 0.0720, 60.0, 150.0, balance))
            .with_seed_consumer(ConsumerSeed::new("consumer2", 7.90, 0.0660, 50.0, 100.0, balance))
            .with_seed_consumer(ConsumerSeed::new("consumer3", 7.55, 0.0700, 90.0, 145.0, balance))
            .with_seed_consumer(ConsumerSeed::new("consumer4", 8.00, 0.0550, 60.0, 140.0, balance))
            .with_seed_consumer(ConsumerSeed::new("consumer5", 7.75, 0.0750, 50.0, 150.0, balance))
            .with_seed_consumer(ConsumerSeed::new("consumer6", 8.05, 0.0450, 70.0, 170.0, balance))
            .with_seed_producer(ProducerSeed::new("producer1", 0.0080, 2.25, 10.0, 350.0, "consumer1"))
            .with_seed_producer(ProducerSeed::new("producer2", 0.0062, 4.20, 20.0, 290.0, "consumer2"))
            .with_seed_producer(ProducerSeed::new("producer3", 0.0075, 3.25, 15.0, 400.0, "consumer3"))
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_config_is_valid() {
        let config = MarketConfig::reference();

        assert!(config.validate().is_ok());
        assert_eq!(config.seed_producers.len(), 3);
        assert_eq!(config.seed_consumers.len(), 6);
        assert_eq!(config.price_band, 0.1);
    }

    #[test]
    fn test_builder_pattern() {
        let config = MarketConfig::new(ClearingParameters::default())
            .with_price_band(0.2)
            .with_default_recent_trades(5)
            .with_price_change_window_hours(12);

        assert_eq!(config.price_band, 0.2);
        assert_eq!(config.default_recent_trades, 5);
        assert_eq!(config.price_change_window(), Duration::hours(12));
    }

    #[test]
    fn test_validation() {
        let mut config = MarketConfig::reference();
        config.clearing.supply_step = 0.0;
        assert!(config.validate().is_err());

        let orphan = MarketConfig::new(ClearingParameters::default()).with_seed_producer(
            ProducerSeed::new("p1", 0.01, 2.0, 10.0, 100.0, "nobody"),
        );
        assert!(orphan.validate().is_err());
    }

    #[test]
    fn test_json_loading() {
        let json = r#"{
            "priceBand": 0.05,
            "priceChangeWindowHours": 24,
            "defaultRecentTrades": 20,
            "seedProducers": [],
            "seedConsumers": [
                { "id": "c1", "beta": 8.0, "theta": 0.05, "demandMin": 20.0, "demandMax": 120.0, "balance": "500" }
            ]
        }"#;

        let config = MarketConfig::from_json_str(json).unwrap();
        assert_eq!(config.clearing, ClearingParameters::default());
        assert_eq!(config.price_band, 0.05);
        assert_eq!(config.seed_consumers[0].balance, Decimal::from(500));

        assert!(MarketConfig::from_json_str("{").is_err());
    }
}
