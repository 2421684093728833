// ============================================================================
// In-Memory State Store
// ============================================================================

use crate::error::StoreError;
use crate::interfaces::{StateStore, StoreResult, VersionedValue, WriteBatch, WriteOp};
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, VersionedValue>,
    /// Number of successful commits; the version stamped on their writes
    commits: u64,
}

/// `StateStore` kept in a sorted map behind a lock.
///
/// Commits are serialized by the write lock, which makes the expectation
/// check and the writes of a batch one atomic step.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Number of successful commits so far
    pub fn commit_count(&self) -> u64 {
        self.inner.read().commits
    }

    /// Write a raw value outside any batch
    pub fn insert_raw(&self, key: impl Into<String>, value: Vec<u8>) {
        let mut inner = self.inner.write();
        inner.commits += 1;
        let version = inner.commits;
        inner.entries.insert(key.into(), VersionedValue { value, version });
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<VersionedValue>> {
        Ok(self.inner.read().entries.get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<(String, VersionedValue)>> {
        let inner = self.inner.read();
        Ok(inner
            .entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut inner = self.inner.write();

        for (key, expected) in batch.expectations() {
            let found = inner.entries.get(key).map(|v| v.version);
            if found != *expected {
                return Err(StoreError::Conflict {
                    key: key.clone(),
                    expected: *expected,
                    found,
                });
            }
        }

        inner.commits += 1;
        let version = inner.commits;
        for op in batch.ops() {
            match op {
                WriteOp::Put { key, value } => {
                    inner.entries.insert(
                        key.clone(),
                        VersionedValue {
                            value: value.clone(),
                            version,
                        },
                    );
                },
                WriteOp::Delete { key } => {
                    inner.entries.remove(key);
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let store = MemoryStore::new();

        let mut batch = WriteBatch::new();
        batch.put("a", b"1".to_vec());
        store.commit(batch).unwrap();

        let stored = store.get("a").unwrap().unwrap();
        assert_eq!(stored.value, b"1".to_vec());
        assert_eq!(stored.version, 1);

        let mut batch = WriteBatch::new();
        batch.delete("a");
        store.commit(batch).unwrap();
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn test_prefix_scan_is_sorted_and_bounded() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put("ORDER_2", vec![]);
        batch.put("ORDER_1", vec![]);
        batch.put("OTHER", vec![]);
        batch.put("TRADE_1", vec![]);
        store.commit(batch).unwrap();

        let keys: Vec<String> = store
            .scan_prefix("ORDER_")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["ORDER_1", "ORDER_2"]);
    }

    #[test]
    fn test_stale_expectation_rejects_whole_batch() {
        let store = MemoryStore::new();
        store.insert_raw("snapshot", b"v1".to_vec());
        let read_version = store.get("snapshot").unwrap().unwrap().version;

        // A competing writer commits first
        store.insert_raw("snapshot", b"v2".to_vec());

        let mut batch = WriteBatch::new();
        batch.expect("snapshot", Some(read_version));
        batch.put("snapshot", b"v3".to_vec());
        batch.put("TRADE_1", b"t".to_vec());

        let err = store.commit(batch).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.get("snapshot").unwrap().unwrap().value, b"v2".to_vec());
        assert!(store.get("TRADE_1").unwrap().is_none());
    }

    #[test]
    fn test_absent_expectation() {
        let store = MemoryStore::new();

        let mut batch = WriteBatch::new();
        batch.expect("k", None);
        batch.put("k", vec![1]);
        store.commit(batch.clone()).unwrap();

        assert!(store.commit(batch).is_err());
        assert_eq!(store.commit_count(), 1);
    }
}
