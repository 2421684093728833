// ============================================================================
// Interfaces Module
// Contains all trait definitions and contracts
// ============================================================================

mod event_handler;
mod matching_algorithm;
mod state_store;
mod tx_context;

pub use event_handler::{EventHandler, LoggingEventHandler, MarketEvent, NoOpEventHandler};
pub use matching_algorithm::{Fill, MatchingAlgorithm};
pub use state_store::{StateStore, StoreResult, VersionedValue, WriteBatch, WriteOp};
pub use tx_context::{FixedContext, TransactionContext};
