// ============================================================================
// Reporting
// Read-only aggregates over the snapshot, the trade ledger and the book
// ============================================================================

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::domain::{MarketSnapshot, MarketStatistics, OrderBookView, PriceInfo, Trade};

/// Latest price and its percent change against the newest trade that is
/// older than `window`.
///
/// `trades` must be newest first.
pub fn price_info(trades: &[Trade], now: DateTime<Utc>, window: Duration) -> PriceInfo {
    let Some(latest) = trades.first() else {
        return PriceInfo::default();
    };

    let cutoff = now - window;
    let price_change = trades
        .iter()
        .find(|trade| trade.timestamp < cutoff)
        .filter(|reference| reference.price != 0.0)
        .map(|reference| (latest.price - reference.price) / reference.price * 100.0)
        .unwrap_or(0.0);

    PriceInfo {
        current_price: Some(latest.price),
        price_change,
    }
}

/// Market-wide statistics; `trades` must be newest first
pub fn market_statistics(
    snapshot: &MarketSnapshot,
    trades: &[Trade],
    book: &OrderBookView,
    now: DateTime<Utc>,
    window: Duration,
) -> MarketStatistics {
    let cutoff = now - window;
    let recent: Vec<&Trade> = trades.iter().filter(|t| t.timestamp > cutoff).collect();

    let volume_24h: Decimal = recent.iter().map(|t| t.total_value).sum();
    let average_price_24h = if recent.is_empty() {
        0.0
    } else {
        recent.iter().map(|t| t.price).sum::<f64>() / recent.len() as f64
    };
    let price = price_info(trades, now, window);

    MarketStatistics {
        total_generation_capacity: snapshot.total_generation,
        total_demand: snapshot.total_demand,
        social_welfare: snapshot.social_welfare,
        volume_24h,
        trade_count_24h: recent.len() as u64,
        average_price_24h,
        current_price: price.current_price,
        price_change_24h: price.price_change,
        total_buy_volume: book.buy_volume(),
        total_sell_volume: book.sell_volume(),
        producer_count: snapshot.producers.len(),
        consumer_count: snapshot.consumers.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Counterparty, TradeId, TradeOrigin};

    fn trade(id: u64, price: f64, hours_ago: i64, now: DateTime<Utc>) -> Trade {
        Trade {
            id: TradeId(id),
            buyer: "consumer4".to_string(),
            seller: Counterparty::consumer("consumer1"),
            producer_id: "producer1".to_string(),
            price,
            quantity: 2.0,
            total_value: Decimal::from(2) * Decimal::try_from(price).unwrap(),
            timestamp: now - Duration::hours(hours_ago),
            block_height: id,
            transaction_id: format!("tx-{}", id),
            origin: TradeOrigin::Direct,
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(30)
    }

    #[test]
    fn test_no_trades() {
        let info = price_info(&[], now(), Duration::hours(24));
        assert_eq!(info.current_price, None);
        assert_eq!(info.price_change, 0.0);
    }

    #[test]
    fn test_change_against_newest_stale_trade() {
        let now = now();
        let trades = vec![
            trade(4, 6.0, 1, now),
            trade(3, 5.0, 10, now),
            trade(2, 4.0, 30, now),
            trade(1, 2.0, 48, now),
        ];

        let info = price_info(&trades, now, Duration::hours(24));

        assert_eq!(info.current_price, Some(6.0));
        assert!((info.price_change - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_change_without_stale_trade() {
        let now = now();
        let trades = vec![trade(2, 6.0, 1, now), trade(1, 3.0, 2, now)];

        let info = price_info(&trades, now, Duration::hours(24));
        assert_eq!(info.price_change, 0.0);
    }

    #[test]
    fn test_window_statistics() {
        let now = now();
        let trades = vec![trade(3, 6.0, 1, now), trade(2, 4.0, 5, now), trade(1, 3.0, 30, now)];
        let mut snapshot = MarketSnapshot::empty();
        snapshot.total_generation = 120.0;
        snapshot.total_demand = 119.5;

        let stats = market_statistics(&snapshot, &trades, &OrderBookView::default(), now, Duration::hours(24));

        assert_eq!(stats.trade_count_24h, 2);
        assert_eq!(stats.volume_24h, Decimal::from(20));
        assert_eq!(stats.average_price_24h, 5.0);
        assert_eq!(stats.current_price, Some(6.0));
        assert!((stats.price_change_24h - 100.0).abs() < 1e-9);
        assert_eq!(stats.total_generation_capacity, 120.0);
        assert_eq!(stats.total_buy_volume, 0.0);
        assert_eq!(stats.producer_count, 0);
    }
}
