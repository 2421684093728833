// ============================================================================
// Event Handler Interface
// Defines the contract for handling market events
// ============================================================================

use crate::domain::{OrderId, Side, Trade};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events emitted by the market after an operation has committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketEvent {
    /// Market state seeded with the configured participants
    MarketInitialized {
        producers: usize,
        consumers: usize,
        timestamp: DateTime<Utc>,
    },

    /// One price discovery step completed
    IterationCompleted {
        iteration: u64,
        max_lambda_change: f64,
        supply_demand_gap: f64,
        social_welfare: f64,
    },

    /// Price discovery reached equilibrium and the allocation was settled
    MarketConverged {
        iteration: u64,
        trades_recorded: usize,
        timestamp: DateTime<Utc>,
    },

    /// Order accepted into the book
    OrderPlaced {
        order_id: OrderId,
        side: Side,
        price: f64,
        quantity: f64,
        timestamp: DateTime<Utc>,
    },

    /// Order removed by its owner
    OrderCancelled {
        order_id: OrderId,
        timestamp: DateTime<Utc>,
    },

    /// Trade written to the ledger
    TradeSettled { trade: Trade },

    /// Producer changed hands
    OwnershipTransferred {
        producer_id: String,
        from: String,
        to: String,
        timestamp: DateTime<Utc>,
    },

    /// Consumer or producer registered
    ParticipantCreated {
        kind: String,
        id: String,
        timestamp: DateTime<Utc>,
    },
}

/// Event handler trait for processing market events
/// Implementations can handle logging, metrics, notifications, etc.
pub trait EventHandler: Send + Sync {
    /// Handle a market event
    fn on_event(&self, event: MarketEvent);

    /// Batch event handler (optional optimization)
    fn on_events(&self, events: Vec<MarketEvent>) {
        for event in events {
            self.on_event(event);
        }
    }
}

/// No-op event handler for testing
pub struct NoOpEventHandler;

impl EventHandler for NoOpEventHandler {
    fn on_event(&self, _event: MarketEvent) {}
}

/// Logging event handler
pub struct LoggingEventHandler;

impl EventHandler for LoggingEventHandler {
    fn on_event(&self, event: MarketEvent) {
        tracing::debug!("Market event: {:?}", event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder(Mutex<Vec<MarketEvent>>);

    impl EventHandler for Recorder {
        fn on_event(&self, event: MarketEvent) {
            self.0.lock().push(event);
        }
    }

    #[test]
    fn test_noop_handler() {
        let handler = NoOpEventHandler;
        handler.on_event(MarketEvent::OrderCancelled {
            order_id: OrderId::derive("tx", 1),
            timestamp: Utc::now(),
        });
        // Should not panic
    }

    #[test]
    fn test_batch_delivery_preserves_order() {
        let recorder = Recorder(Mutex::new(Vec::new()));
        recorder.on_events(vec![
            MarketEvent::IterationCompleted {
                iteration: 1,
                max_lambda_change: 0.1,
                supply_demand_gap: 2.0,
                social_welfare: 10.0,
            },
            MarketEvent::IterationCompleted {
                iteration: 2,
                max_lambda_change: 0.05,
                supply_demand_gap: 1.0,
                social_welfare: 11.0,
            },
        ]);

        let seen = recorder.0.lock();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[1], MarketEvent::IterationCompleted { iteration: 2, .. }));
    }
}
