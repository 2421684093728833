// ============================================================================
// State Store Interface
// Contract of the external key-value store holding the market ledger
// ============================================================================

use crate::error::StoreError;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A stored value with the version it was committed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
}

impl WriteOp {
    pub fn key(&self) -> &str {
        match self {
            WriteOp::Put { key, .. } | WriteOp::Delete { key } => key,
        }
    }
}

/// Writes of one market operation, committed all-or-nothing.
///
/// Each expectation pins the version a key had when it was read (`None`
/// meaning "absent"); the commit must fail with [`StoreError::Conflict`] if
/// any pinned key has moved since.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    expectations: Vec<(String, Option<u64>)>,
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `key` to the version observed when it was read
    pub fn expect(&mut self, key: impl Into<String>, version: Option<u64>) {
        let key = key.into();
        if !self.expectations.iter().any(|(k, _)| *k == key) {
            self.expectations.push((key, version));
        }
    }

    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.ops.push(WriteOp::Put {
            key: key.into(),
            value,
        });
    }

    pub fn delete(&mut self, key: impl Into<String>) {
        self.ops.push(WriteOp::Delete { key: key.into() });
    }

    pub fn expectations(&self) -> &[(String, Option<u64>)] {
        &self.expectations
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Durable key-value store with prefix scans and atomic batch commits.
///
/// Implementations decide durability and replication; the market only relies
/// on read-your-committed-writes and on `commit` being atomic.
pub trait StateStore: Send + Sync {
    /// Point read
    fn get(&self, key: &str) -> StoreResult<Option<VersionedValue>>;

    /// All entries whose key starts with `prefix`, in ascending key order
    fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<(String, VersionedValue)>>;

    /// Apply every write of `batch` atomically after checking its expectations
    fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}
