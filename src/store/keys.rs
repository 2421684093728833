// ============================================================================
// Ledger Key Layout
// ============================================================================
//
// MarketState                 singleton snapshot
// ORDER_<20-digit sequence>   resting orders, scan order == placement order
// TRADE_<20-digit trade id>   settled trades, scan order == settlement order

/// Key of the singleton market snapshot
pub const SNAPSHOT_KEY: &str = "MarketState";

pub const ORDER_PREFIX: &str = "ORDER_";

pub const TRADE_PREFIX: &str = "TRADE_";

pub fn order_key(sequence: u64) -> String {
    format!("{}{:020}", ORDER_PREFIX, sequence)
}

pub fn trade_key(trade_id: u64) -> String {
    format!("{}{:020}", TRADE_PREFIX, trade_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_sort_numerically() {
        assert!(order_key(9) < order_key(10));
        assert!(trade_key(99) < trade_key(100));
        assert_eq!(trade_key(7), "TRADE_00000000000000000007");
    }

    #[test]
    fn test_prefixes_do_not_overlap() {
        assert!(order_key(1).starts_with(ORDER_PREFIX));
        assert!(!trade_key(1).starts_with(ORDER_PREFIX));
        assert!(!SNAPSHOT_KEY.starts_with(TRADE_PREFIX));
    }
}
