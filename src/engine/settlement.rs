// ============================================================================
// Settlement
// The single path through which every trade reaches the ledger
// ============================================================================

use crate::domain::{Counterparty, Trade, TradeId, TradeOrigin};
use crate::error::{MarketError, MarketResult};
use crate::interfaces::{MarketEvent, TransactionContext};
use crate::numeric::to_money;

use super::transaction::MarketTransaction;

/// A trade waiting to be validated and booked
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRequest {
    pub buyer: String,
    pub seller: Counterparty,
    pub producer_id: String,
    pub price: f64,
    pub quantity: f64,
    pub origin: TradeOrigin,
}

impl TradeRequest {
    pub fn new(
        buyer: impl Into<String>,
        seller: Counterparty,
        producer_id: impl Into<String>,
        price: f64,
        quantity: f64,
        origin: TradeOrigin,
    ) -> Self {
        Self {
            buyer: buyer.into(),
            seller,
            producer_id: producer_id.into(),
            price,
            quantity,
            origin,
        }
    }
}

/// Validate and book one trade inside `tx`.
///
/// Nothing is mutated unless every check passes. The buyer is debited and a
/// consumer seller credited with the same amount; the clearing pool takes no
/// credit.
pub fn record_trade(
    tx: &mut MarketTransaction<'_>,
    ctx: &dyn TransactionContext,
    request: TradeRequest,
) -> MarketResult<Trade> {
    if !(request.price.is_finite() && request.price > 0.0) {
        return Err(MarketError::invalid("trade price must be positive"));
    }
    if !(request.quantity.is_finite() && request.quantity > 0.0) {
        return Err(MarketError::invalid("trade quantity must be positive"));
    }
    let total_value = to_money(request.price * request.quantity)
        .ok_or_else(|| MarketError::invalid("trade value is not representable"))?;

    let snapshot = tx.snapshot();
    snapshot.require_consumer(&request.buyer)?;
    if let Counterparty::Consumer(seller) = &request.seller {
        snapshot.require_consumer(seller)?;
        if *seller == request.buyer {
            return Err(MarketError::invalid(format!(
                "consumer {} cannot trade with itself",
                seller
            )));
        }
    }

    let snapshot = tx.snapshot_mut();
    if let Some(buyer) = snapshot.consumer_mut(&request.buyer) {
        buyer.balance -= total_value;
    }
    if let Counterparty::Consumer(seller) = &request.seller {
        if let Some(seller) = snapshot.consumer_mut(seller) {
            seller.balance += total_value;
        }
    }
    if let Some(idx) = snapshot.producer_index(&request.producer_id) {
        snapshot.producers[idx].traded_volume += request.quantity;
    }

    snapshot.statistics.trade_count += 1;
    snapshot.statistics.traded_value += total_value;

    let trade = Trade {
        id: TradeId(snapshot.statistics.trade_count),
        buyer: request.buyer,
        seller: request.seller,
        producer_id: request.producer_id,
        price: request.price,
        quantity: request.quantity,
        total_value,
        timestamp: ctx.timestamp(),
        block_height: ctx.block_height(),
        transaction_id: ctx.transaction_id().to_string(),
        origin: request.origin,
    };

    tx.append_trade(&trade)?;
    tx.emit(MarketEvent::TradeSettled {
        trade: trade.clone(),
    });

    tracing::debug!(
        "Settled trade {}: {} buys {} from {} at {}",
        trade.id,
        trade.buyer,
        trade.quantity,
        trade.seller,
        trade.price
    );

    Ok(trade)
}

/// Book the converged allocation: every consumer buys its demand from each
/// producer it does not own, at that producer's price
pub fn settle_allocation(
    tx: &mut MarketTransaction<'_>,
    ctx: &dyn TransactionContext,
) -> MarketResult<Vec<Trade>> {
    let snapshot = tx.snapshot();
    let mut requests = Vec::new();

    for consumer in snapshot.consumers.iter().filter(|c| c.total_demand > 0.0) {
        for (producer, demand) in snapshot.producers.iter().zip(&consumer.demands) {
            if *demand <= 0.0 || producer.owner_id == consumer.id {
                continue;
            }

            let seller = if snapshot.consumer(&producer.owner_id).is_some() {
                Counterparty::consumer(producer.owner_id.clone())
            } else {
                Counterparty::ClearingPool
            };

            requests.push(TradeRequest::new(
                consumer.id.clone(),
                seller,
                producer.id.clone(),
                producer.lambda,
                *demand,
                TradeOrigin::Clearing,
            ));
        }
    }

    requests
        .into_iter()
        .map(|request| record_trade(tx, ctx, request))
        .collect()
}
