// ============================================================================
// Store Module
// Ledger key layout and the in-memory state store
// ============================================================================

pub mod keys;
mod memory;

pub use memory::MemoryStore;
