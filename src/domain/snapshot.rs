// ============================================================================
// Market Snapshot
// The single aggregate read and rewritten by every market operation
// ============================================================================

use crate::error::{MarketError, MarketResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::config::{ConsumerSeed, ProducerSeed};
use super::{Consumer, Producer};

/// Running ledger counters kept inside the snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerStatistics {
    /// Trades settled so far; the last issued trade id
    pub trade_count: u64,

    /// Sum of all settled trade values
    pub traded_value: Decimal,

    /// Orders placed so far; the last issued order sequence
    pub order_sequence: u64,
}

/// Complete market state: participants, solver iterate and ledger counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub producers: Vec<Producer>,
    pub consumers: Vec<Consumer>,
    pub total_generation: f64,
    pub total_demand: f64,
    pub social_welfare: f64,
    pub iteration_count: u64,
    pub converged: bool,
    #[serde(default)]
    pub statistics: LedgerStatistics,
}

impl MarketSnapshot {
    /// Create an empty market
    pub fn empty() -> Self {
        Self {
            producers: Vec::new(),
            consumers: Vec::new(),
            total_generation: 0.0,
            total_demand: 0.0,
            social_welfare: 0.0,
            iteration_count: 0,
            converged: false,
            statistics: LedgerStatistics::default(),
        }
    }

    /// Build a fresh market from seed participants
    pub fn seeded(producers: &[ProducerSeed], consumers: &[ConsumerSeed]) -> MarketResult<Self> {
        let mut snapshot = Self::empty();
        for seed in consumers {
            snapshot.add_consumer(seed.build(0))?;
        }
        for seed in producers {
            snapshot.add_producer(seed.build())?;
        }
        Ok(snapshot)
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn producer(&self, id: &str) -> Option<&Producer> {
        self.producers.iter().find(|p| p.id == id)
    }

    pub fn producer_index(&self, id: &str) -> Option<usize> {
        self.producers.iter().position(|p| p.id == id)
    }

    pub fn consumer(&self, id: &str) -> Option<&Consumer> {
        self.consumers.iter().find(|c| c.id == id)
    }

    pub fn consumer_index(&self, id: &str) -> Option<usize> {
        self.consumers.iter().position(|c| c.id == id)
    }

    pub fn consumer_mut(&mut self, id: &str) -> Option<&mut Consumer> {
        self.consumers.iter_mut().find(|c| c.id == id)
    }

    pub fn require_consumer(&self, id: &str) -> MarketResult<&Consumer> {
        self.consumer(id)
            .ok_or_else(|| MarketError::not_found("consumer", id))
    }

    pub fn require_producer(&self, id: &str) -> MarketResult<&Producer> {
        self.producer(id)
            .ok_or_else(|| MarketError::not_found("producer", id))
    }

    // ========================================================================
    // Aggregates
    // ========================================================================

    pub fn total_cost(&self) -> f64 {
        self.producers.iter().map(|p| p.cost).sum()
    }

    pub fn total_utility(&self) -> f64 {
        self.consumers.iter().map(Consumer::total_utility).sum()
    }

    /// Social welfare recomputed from the current utilities and costs
    pub fn compute_welfare(&self) -> f64 {
        self.total_utility() - self.total_cost()
    }

    // ========================================================================
    // Membership Changes
    // ========================================================================

    /// Register a consumer; its vectors are resized to the producer count
    pub fn add_consumer(&mut self, mut consumer: Consumer) -> MarketResult<()> {
        if self.consumer(&consumer.id).is_some() {
            return Err(MarketError::invalid(format!(
                "consumer with ID {} already exists",
                consumer.id
            )));
        }

        let slots = self.producers.len();
        consumer.demands.resize(slots, 0.0);
        consumer.utilities.resize(slots, 0.0);
        consumer.producer_ids.clear();
        consumer.refresh_total_demand();

        self.consumers.push(consumer);
        Ok(())
    }

    /// Register a producer, attach it to its owner and give every consumer a
    /// zeroed slot for it
    pub fn add_producer(&mut self, producer: Producer) -> MarketResult<()> {
        if self.producer(&producer.id).is_some() {
            return Err(MarketError::invalid(format!(
                "producer with ID {} already exists",
                producer.id
            )));
        }

        let owner = self
            .consumer_index(&producer.owner_id)
            .ok_or_else(|| MarketError::not_found("owner", producer.owner_id.clone()))?;

        self.consumers[owner].producer_ids.push(producer.id.clone());
        for consumer in &mut self.consumers {
            consumer.push_producer_slot();
        }
        self.producers.push(producer);
        Ok(())
    }

    /// Move a producer from `from` to `to` as one reassignment
    pub fn transfer_producer(&mut self, producer_id: &str, from: &str, to: &str) -> MarketResult<()> {
        let producer_idx = self
            .producer_index(producer_id)
            .ok_or_else(|| MarketError::not_found("producer", producer_id))?;

        if self.producers[producer_idx].owner_id != from {
            return Err(MarketError::invalid(format!(
                "user {} is not the current owner of producer {}",
                from, producer_id
            )));
        }
        if from == to {
            return Err(MarketError::invalid(format!(
                "user {} already owns producer {}",
                to, producer_id
            )));
        }

        let new_owner = self
            .consumer_index(to)
            .ok_or_else(|| MarketError::not_found("new owner", to))?;
        let old_owner = self.consumer_index(from);

        self.producers[producer_idx].owner_id = to.to_string();
        if let Some(idx) = old_owner {
            self.consumers[idx].producer_ids.retain(|id| id != producer_id);
        }
        if !self.consumers[new_owner].owns(producer_id) {
            self.consumers[new_owner].producer_ids.push(producer_id.to_string());
        }
        Ok(())
    }
}
