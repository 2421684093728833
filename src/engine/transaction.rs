// ============================================================================
// Market Transaction
// One invocation's view of the ledger: a pinned snapshot plus buffered writes
// ============================================================================

use crate::domain::{MarketSnapshot, Order, OrderBook, Trade};
use crate::error::{MarketError, MarketResult};
use crate::interfaces::{MarketEvent, StateStore, WriteBatch};
use crate::store::keys::{order_key, trade_key, ORDER_PREFIX, SNAPSHOT_KEY, TRADE_PREFIX};
use serde::de::DeserializeOwned;
use serde::Serialize;

// ============================================================================
// Record Codec
// ============================================================================

pub(crate) fn encode<T: Serialize>(key: &str, value: &T) -> MarketResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| MarketError::corrupted(key, e))
}

pub(crate) fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> MarketResult<T> {
    serde_json::from_slice(bytes).map_err(|e| MarketError::corrupted(key, e))
}

// ============================================================================
// Read-only Loaders
// ============================================================================

fn read_snapshot(store: &dyn StateStore) -> MarketResult<(MarketSnapshot, u64)> {
    let stored = store
        .get(SNAPSHOT_KEY)?
        .ok_or_else(|| MarketError::not_found("market state", SNAPSHOT_KEY))?;
    let snapshot = decode(SNAPSHOT_KEY, &stored.value)?;
    Ok((snapshot, stored.version))
}

/// Current committed snapshot
pub fn load_snapshot(store: &dyn StateStore) -> MarketResult<MarketSnapshot> {
    read_snapshot(store).map(|(snapshot, _)| snapshot)
}

/// Resting orders in placement order
pub fn load_orders(store: &dyn StateStore) -> MarketResult<Vec<Order>> {
    store
        .scan_prefix(ORDER_PREFIX)?
        .into_iter()
        .map(|(key, stored)| decode(&key, &stored.value))
        .collect()
}

/// Settled trades in ascending id order
pub fn load_trades(store: &dyn StateStore) -> MarketResult<Vec<Trade>> {
    store
        .scan_prefix(TRADE_PREFIX)?
        .into_iter()
        .map(|(key, stored)| decode(&key, &stored.value))
        .collect()
}

// ============================================================================
// Transaction
// ============================================================================

/// Read-modify-write unit of a market operation.
///
/// Every key read through the transaction is pinned at the version it had;
/// `commit` writes the snapshot and all buffered records in one batch, so the
/// invocation either lands completely or not at all.
pub struct MarketTransaction<'a> {
    store: &'a dyn StateStore,
    snapshot: MarketSnapshot,
    batch: WriteBatch,
    events: Vec<MarketEvent>,
}

impl<'a> MarketTransaction<'a> {
    /// Load the committed snapshot
    pub fn begin(store: &'a dyn StateStore) -> MarketResult<Self> {
        let (snapshot, version) = read_snapshot(store)?;
        let mut batch = WriteBatch::new();
        batch.expect(SNAPSHOT_KEY, Some(version));

        Ok(Self {
            store,
            snapshot,
            batch,
            events: Vec::new(),
        })
    }

    /// Start from a caller-built snapshot, replacing whatever is stored
    pub fn begin_fresh(store: &'a dyn StateStore, snapshot: MarketSnapshot) -> MarketResult<Self> {
        let current = store.get(SNAPSHOT_KEY)?.map(|stored| stored.version);
        let mut batch = WriteBatch::new();
        batch.expect(SNAPSHOT_KEY, current);

        Ok(Self {
            store,
            snapshot,
            batch,
            events: Vec::new(),
        })
    }

    pub fn snapshot(&self) -> &MarketSnapshot {
        &self.snapshot
    }

    pub fn snapshot_mut(&mut self) -> &mut MarketSnapshot {
        &mut self.snapshot
    }

    /// Load the resting orders into a working book.
    ///
    /// An undecodable order aborts the operation rather than being skipped.
    pub fn load_order_book(&mut self) -> MarketResult<OrderBook> {
        let mut orders = Vec::new();
        for (key, stored) in self.store.scan_prefix(ORDER_PREFIX)? {
            let order: Order = decode(&key, &stored.value)?;
            self.batch.expect(key, Some(stored.version));
            orders.push(order);
        }
        Ok(OrderBook::from_orders(orders))
    }

    /// Drop every stored order and trade
    pub fn clear_ledger(&mut self) -> MarketResult<usize> {
        let mut cleared = 0;
        for prefix in [ORDER_PREFIX, TRADE_PREFIX] {
            for (key, stored) in self.store.scan_prefix(prefix)? {
                self.batch.expect(key.clone(), Some(stored.version));
                self.batch.delete(key);
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    /// Persist an order. Orders not loaded earlier must not exist yet.
    pub fn put_order(&mut self, order: &Order) -> MarketResult<()> {
        let key = order_key(order.sequence);
        // No-op for orders already pinned by `load_order_book`
        self.batch.expect(key.clone(), None);
        let value = encode(&key, order)?;
        self.batch.put(key, value);
        Ok(())
    }

    pub fn delete_order(&mut self, order: &Order) {
        self.batch.delete(order_key(order.sequence));
    }

    /// Write the difference between the loaded book and its matched state
    pub fn sync_order_book(&mut self, loaded: &OrderBook, current: &OrderBook) -> MarketResult<()> {
        for order in loaded.orders() {
            match current.find(&order.id) {
                None => self.delete_order(order),
                Some(now) if now.quantity != order.quantity => self.put_order(now)?,
                Some(_) => {},
            }
        }
        for order in current.orders() {
            if loaded.find(&order.id).is_none() {
                self.put_order(order)?;
            }
        }
        Ok(())
    }

    /// Append an immutable trade record; its id must be unused
    pub fn append_trade(&mut self, trade: &Trade) -> MarketResult<()> {
        let key = trade_key(trade.id.0);
        self.batch.expect(key.clone(), None);
        let value = encode(&key, trade)?;
        self.batch.put(key, value);
        Ok(())
    }

    /// Queue an event for delivery after a successful commit
    pub fn emit(&mut self, event: MarketEvent) {
        self.events.push(event);
    }

    /// Write the snapshot together with every buffered record
    pub fn commit(mut self) -> MarketResult<(MarketSnapshot, Vec<MarketEvent>)> {
        let value = encode(SNAPSHOT_KEY, &self.snapshot)?;
        self.batch.put(SNAPSHOT_KEY, value);
        self.store.commit(self.batch)?;
        Ok((self.snapshot, self.events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderId, Side};
    use crate::store::MemoryStore;
    use chrono::{DateTime, Utc};

    fn order(seq: u64, quantity: f64) -> Order {
        Order::new(
            OrderId::derive("tx", seq),
            seq,
            "consumer1",
            Side::Buy,
            5.0,
            quantity,
            None,
            DateTime::<Utc>::UNIX_EPOCH,
        )
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        MarketTransaction::begin_fresh(&store, MarketSnapshot::empty())
            .unwrap()
            .commit()
            .unwrap();
        store
    }

    #[test]
    fn test_missing_snapshot() {
        let store = MemoryStore::new();
        let err = MarketTransaction::begin(&store).err().unwrap();
        assert!(matches!(err, MarketError::NotFound { entity: "market state", .. }));
    }

    #[test]
    fn test_malformed_snapshot() {
        let store = MemoryStore::new();
        store.insert_raw(SNAPSHOT_KEY, b"{not json".to_vec());

        let err = MarketTransaction::begin(&store).err().unwrap();
        assert!(matches!(err, MarketError::StateCorruption { .. }));
    }

    #[test]
    fn test_commit_round_trip() {
        let store = seeded_store();

        let mut tx = MarketTransaction::begin(&store).unwrap();
        tx.snapshot_mut().iteration_count = 7;
        tx.put_order(&order(1, 2.0)).unwrap();
        tx.commit().unwrap();

        assert_eq!(load_snapshot(&store).unwrap().iteration_count, 7);
        assert_eq!(load_orders(&store).unwrap().len(), 1);
    }

    #[test]
    fn test_interleaved_writer_conflicts() {
        let store = seeded_store();

        let mut first = MarketTransaction::begin(&store).unwrap();
        let second = MarketTransaction::begin(&store).unwrap();
        second.commit().unwrap();

        first.snapshot_mut().iteration_count = 1;
        let err = first.commit().unwrap_err();
        assert!(err.is_retriable());
        assert_eq!(load_snapshot(&store).unwrap().iteration_count, 0);
    }

    #[test]
    fn test_sync_writes_only_changes() {
        let store = seeded_store();
        let mut tx = MarketTransaction::begin(&store).unwrap();
        tx.put_order(&order(1, 2.0)).unwrap();
        tx.put_order(&order(2, 3.0)).unwrap();
        tx.commit().unwrap();

        let mut tx = MarketTransaction::begin(&store).unwrap();
        let loaded = tx.load_order_book().unwrap();
        let mut current = loaded.clone();
        current.fill_best(Side::Buy, 2.0);
        current.fill_best(Side::Buy, 1.0);
        current.insert(order(3, 4.0));
        tx.sync_order_book(&loaded, &current).unwrap();
        tx.commit().unwrap();

        let stored: Vec<(u64, f64)> = load_orders(&store)
            .unwrap()
            .iter()
            .map(|o| (o.sequence, o.quantity))
            .collect();
        assert_eq!(stored, vec![(2, 2.0), (3, 4.0)]);
    }

    #[test]
    fn test_corrupt_order_is_fatal() {
        let store = seeded_store();
        store.insert_raw(order_key(1), b"garbage".to_vec());

        let mut tx = MarketTransaction::begin(&store).unwrap();
        let err = tx.load_order_book().unwrap_err();
        assert!(matches!(err, MarketError::StateCorruption { .. }));
    }

    #[test]
    fn test_clear_ledger() {
        let store = seeded_store();
        let mut tx = MarketTransaction::begin(&store).unwrap();
        tx.put_order(&order(1, 2.0)).unwrap();
        tx.commit().unwrap();

        let mut tx = MarketTransaction::begin_fresh(&store, MarketSnapshot::empty()).unwrap();
        assert_eq!(tx.clear_ledger().unwrap(), 1);
        tx.commit().unwrap();
        assert!(load_orders(&store).unwrap().is_empty());
    }
}
