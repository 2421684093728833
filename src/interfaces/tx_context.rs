// ============================================================================
// Transaction Context Interface
// Execution metadata supplied by the host for each invocation
// ============================================================================

use chrono::{DateTime, Duration, Utc};

/// Identity and time of the invocation being executed.
///
/// All record timestamps and time windows are taken from here, never from
/// the local clock, so independent executions of the same invocation agree.
pub trait TransactionContext {
    fn transaction_id(&self) -> &str;

    fn block_height(&self) -> u64;

    fn timestamp(&self) -> DateTime<Utc>;
}

/// Context with caller-chosen values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedContext {
    pub transaction_id: String,
    pub block_height: u64,
    pub timestamp: DateTime<Utc>,
}

impl FixedContext {
    pub fn new(transaction_id: impl Into<String>, block_height: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            block_height,
            timestamp,
        }
    }

    /// First block, stamped at the Unix epoch
    pub fn genesis() -> Self {
        Self::new("tx-0", 0, DateTime::<Utc>::UNIX_EPOCH)
    }

    /// The following block, `elapsed` later
    pub fn advance(&self, elapsed: Duration) -> Self {
        let height = self.block_height + 1;
        Self::new(format!("tx-{}", height), height, self.timestamp + elapsed)
    }
}

impl TransactionContext for FixedContext {
    fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    fn block_height(&self) -> u64 {
        self.block_height
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
