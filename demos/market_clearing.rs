// ============================================================================
// Market Clearing Example
// ============================================================================

use chrono::Duration;
use energy_market::prelude::*;
use std::sync::Arc;

fn main() -> Result<(), MarketError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Energy Market Clearing ===\n");

    let market = EnergyMarketBuilder::new()
        .with_event_handler(Arc::new(LoggingEventHandler))
        .build()?;

    let ctx = FixedContext::genesis();
    let snapshot = market.initialize_market(&ctx)?;
    println!(
        "Initialized {} producers and {} consumers\n",
        snapshot.producers.len(),
        snapshot.consumers.len()
    );

    // Price discovery
    let clearing_ctx = ctx.advance(Duration::minutes(1));
    let outcome = market.run_until_converged(&clearing_ctx, 1_000)?;
    println!(
        "Converged after {} iterations (gap {:.4} MW, welfare {:.2})",
        outcome.iteration + 1,
        outcome.supply_demand_gap,
        outcome.social_welfare
    );

    let snapshot = market.get_snapshot()?;
    println!("\n=== Producers ===");
    for producer in &snapshot.producers {
        println!(
            "  {:<10} owner {:<10} output {:>8.2} MW  price {:.4}",
            producer.id, producer.owner_id, producer.production, producer.lambda
        );
    }

    println!("\n=== Consumers ===");
    for consumer in &snapshot.consumers {
        println!(
            "  {:<10} demand {:>8.2} MW  balance {}",
            consumer.id, consumer.total_demand, consumer.balance
        );
    }

    // Double auction on top of the cleared prices
    let trading_ctx = clearing_ctx.advance(Duration::minutes(1));
    let offer = snapshot
        .producer("producer3")
        .map(|p| p.lambda)
        .unwrap_or_default();

    market.place_order(&trading_ctx, Side::Sell, offer, 20.0, "consumer3", Some("producer3"))?;
    let receipt = market.place_order(
        &trading_ctx.advance(Duration::seconds(10)),
        Side::Buy,
        offer * 1.02,
        12.0,
        "consumer6",
        None,
    )?;

    println!("\n=== Order Book Trades ===");
    for trade in &receipt.trades {
        println!(
            "  #{} {} buys {:.2} MW from {} at {:.4}",
            trade.id, trade.buyer, trade.quantity, trade.seller, trade.price
        );
    }

    let book = market.get_order_book()?;
    println!("\nResting: {} buys, {} sells (spread {:?})", book.buy.len(), book.sell.len(), book.spread());

    let stats = market.get_market_statistics(&trading_ctx)?;
    println!("\n=== Market Statistics ===");
    println!("  Trades (24h):   {}", stats.trade_count_24h);
    println!("  Volume (24h):   {}", stats.volume_24h);
    println!("  Average price:  {:.4}", stats.average_price_24h);
    println!("  Current price:  {:?}", stats.current_price);

    Ok(())
}
