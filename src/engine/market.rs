// ============================================================================
// Energy Market
// Operation facade over price discovery, the order book and the ledger
// ============================================================================

use crate::domain::{
    Consumer, Counterparty, MarketConfig, MarketSnapshot, MarketStatistics, Order, OrderBook,
    OrderBookView, OrderId, PriceInfo, Producer, Side, Trade, TradeOrigin, CLEARING_POOL_ID,
    QUANTITY_EPSILON,
};
use crate::error::{MarketError, MarketResult};
use crate::interfaces::{EventHandler, MarketEvent, MatchingAlgorithm, StateStore, TransactionContext};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::price_discovery::{PriceDiscovery, StepOutcome};
use super::reporting::{market_statistics, price_info};
use super::settlement::{record_trade, settle_allocation, TradeRequest};
use super::transaction::{load_orders, load_snapshot, load_trades, MarketTransaction};

/// Outcome of an order placement
#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceipt {
    /// The order as it stands after matching; a quantity of zero means it
    /// was filled completely and never rested in the book
    pub order: Order,

    /// Trades executed while matching the book after placement
    pub trades: Vec<Trade>,
}

/// Energy market with pluggable storage, matching and event handling
///
/// Every mutating operation reads the stored snapshot once, applies its
/// changes in memory and commits them in a single batch. Events reach the
/// handler only after that commit succeeded.
pub struct EnergyMarket {
    /// Ledger holding the snapshot, resting orders and trades
    store: Arc<dyn StateStore>,

    /// Market configuration
    config: MarketConfig,

    /// Dual decomposition solver
    clearing: PriceDiscovery,

    /// Pluggable order book matching
    matcher: Box<dyn MatchingAlgorithm>,

    /// Event handler for processing events
    event_handler: Arc<dyn EventHandler>,
}

impl EnergyMarket {
    /// Create a new market over `store`
    pub fn new(
        store: Arc<dyn StateStore>,
        config: MarketConfig,
        matcher: Box<dyn MatchingAlgorithm>,
        event_handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            store,
            clearing: PriceDiscovery::new(config.clearing),
            config,
            matcher,
            event_handler,
        }
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn algorithm_name(&self) -> &str {
        self.matcher.name()
    }

    fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }

    fn publish(&self, events: Vec<MarketEvent>) {
        if !events.is_empty() {
            self.event_handler.on_events(events);
        }
    }

    // ========================================================================
    // Price Discovery
    // ========================================================================

    /// Seed the configured participants, replacing any existing market.
    ///
    /// Resting orders and trades of a previous market are removed with it.
    pub fn initialize_market(&self, ctx: &dyn TransactionContext) -> MarketResult<MarketSnapshot> {
        let snapshot =
            MarketSnapshot::seeded(&self.config.seed_producers, &self.config.seed_consumers)?;

        let mut tx = MarketTransaction::begin_fresh(self.store(), snapshot)?;
        let cleared = tx.clear_ledger()?;
        tx.emit(MarketEvent::MarketInitialized {
            producers: tx.snapshot().producers.len(),
            consumers: tx.snapshot().consumers.len(),
            timestamp: ctx.timestamp(),
        });

        let (snapshot, events) = tx.commit()?;
        info!(
            "Market initialized with {} producers and {} consumers ({} stale records removed)",
            snapshot.producers.len(),
            snapshot.consumers.len(),
            cleared
        );
        self.publish(events);
        Ok(snapshot)
    }

    /// Run one price discovery step.
    ///
    /// The step that first reaches equilibrium also settles the allocation,
    /// in the same commit.
    pub fn advance_market(&self, ctx: &dyn TransactionContext) -> MarketResult<StepOutcome> {
        let mut tx = MarketTransaction::begin(self.store())?;
        let outcome = self.clearing.step(tx.snapshot_mut());

        debug!(
            "Iteration {}: max price change {:.6}, supply/demand gap {:.4}, welfare {:.4}",
            outcome.iteration,
            outcome.max_lambda_change,
            outcome.supply_demand_gap,
            outcome.social_welfare
        );
        tx.emit(MarketEvent::IterationCompleted {
            iteration: outcome.iteration,
            max_lambda_change: outcome.max_lambda_change,
            supply_demand_gap: outcome.supply_demand_gap,
            social_welfare: outcome.social_welfare,
        });

        if outcome.newly_converged {
            let trades = settle_allocation(&mut tx, ctx)?;
            info!(
                "Market converged at iteration {} with gap {:.4}; {} trades settled",
                outcome.iteration,
                outcome.supply_demand_gap,
                trades.len()
            );
            tx.emit(MarketEvent::MarketConverged {
                iteration: outcome.iteration,
                trades_recorded: trades.len(),
                timestamp: ctx.timestamp(),
            });
        }

        let (_, events) = tx.commit()?;
        self.publish(events);
        Ok(outcome)
    }

    /// Advance until converged, at most `max_iterations` times
    pub fn run_until_converged(
        &self,
        ctx: &dyn TransactionContext,
        max_iterations: u64,
    ) -> MarketResult<StepOutcome> {
        if max_iterations == 0 {
            return Err(MarketError::invalid("max iterations must be positive"));
        }

        for _ in 0..max_iterations {
            let outcome = self.advance_market(ctx)?;
            if outcome.converged {
                return Ok(outcome);
            }
        }

        warn!("Market did not converge within {} iterations", max_iterations);
        Err(MarketError::ConvergenceFailure {
            iterations: max_iterations,
        })
    }

    pub fn get_snapshot(&self) -> MarketResult<MarketSnapshot> {
        load_snapshot(self.store())
    }

    // ========================================================================
    // Order Book
    // ========================================================================

    /// Validate and store a limit order, then match the book
    pub fn place_order(
        &self,
        ctx: &dyn TransactionContext,
        side: Side,
        price: f64,
        quantity: f64,
        owner: &str,
        producer_id: Option<&str>,
    ) -> MarketResult<OrderReceipt> {
        self.try_place_order(ctx, side, price, quantity, owner, producer_id)
            .inspect_err(|e| warn!("Rejected {} order from {}: {}", side, owner, e))
    }

    fn try_place_order(
        &self,
        ctx: &dyn TransactionContext,
        side: Side,
        price: f64,
        quantity: f64,
        owner: &str,
        producer_id: Option<&str>,
    ) -> MarketResult<OrderReceipt> {
        require_positive("order price", price)?;
        require_positive("order quantity", quantity)?;
        if quantity <= QUANTITY_EPSILON {
            return Err(MarketError::invalid(format!(
                "order quantity {} is below the minimum tradable amount",
                quantity
            )));
        }

        let mut tx = MarketTransaction::begin(self.store())?;
        let producer_id = self.check_order_parties(tx.snapshot(), side, price, owner, producer_id)?;

        let loaded = tx.load_order_book()?;
        let sequence = tx.snapshot().statistics.order_sequence + 1;
        let order = Order::new(
            OrderId::derive(ctx.transaction_id(), sequence),
            sequence,
            owner,
            side,
            price,
            quantity,
            producer_id,
            ctx.timestamp(),
        );

        if loaded.orders_of(owner).any(|resting| order.crosses(resting)) {
            return Err(MarketError::invalid(format!(
                "{} order at {} would trade against a resting order of {}",
                side, price, owner
            )));
        }

        tx.snapshot_mut().statistics.order_sequence = sequence;
        tx.emit(MarketEvent::OrderPlaced {
            order_id: order.id,
            side,
            price,
            quantity,
            timestamp: ctx.timestamp(),
        });

        let mut book = loaded.clone();
        book.insert(order.clone());
        let trades = self.execute_matches(&mut tx, ctx, &mut book)?;
        tx.sync_order_book(&loaded, &book)?;

        let remaining = book.find(&order.id).cloned().unwrap_or_else(|| {
            let mut filled = order.clone();
            filled.fill(filled.quantity);
            filled
        });

        let (_, events) = tx.commit()?;
        debug!(
            "Placed {} order {} for {}: {} @ {}, {} trades",
            side,
            order.id,
            owner,
            quantity,
            price,
            trades.len()
        );
        self.publish(events);

        Ok(OrderReceipt {
            order: remaining,
            trades,
        })
    }

    /// Validate the owner and, for sells, the offered producer.
    ///
    /// Returns the producer id to store on the order.
    fn check_order_parties(
        &self,
        snapshot: &MarketSnapshot,
        side: Side,
        price: f64,
        owner: &str,
        producer_id: Option<&str>,
    ) -> MarketResult<Option<String>> {
        snapshot.require_consumer(owner)?;

        match side {
            Side::Buy => Ok(producer_id.map(str::to_string)),
            Side::Sell => {
                let producer_id = producer_id
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| MarketError::invalid("sell orders must name a producer"))?;
                let producer = snapshot.require_producer(producer_id)?;

                if producer.owner_id != owner {
                    return Err(MarketError::invalid(format!(
                        "user {} does not own producer {}",
                        owner, producer_id
                    )));
                }

                let band = self.config.price_band * producer.lambda;
                if (price - producer.lambda).abs() > band {
                    return Err(MarketError::invalid(format!(
                        "order price {:.2} deviates from producer price {:.2} by more than {}%",
                        price,
                        producer.lambda,
                        self.config.price_band * 100.0
                    )));
                }

                Ok(Some(producer_id.to_string()))
            },
        }
    }

    /// Cross the book and settle every fill
    fn execute_matches(
        &self,
        tx: &mut MarketTransaction<'_>,
        ctx: &dyn TransactionContext,
        book: &mut OrderBook,
    ) -> MarketResult<Vec<Trade>> {
        self.matcher
            .match_book(book)
            .into_iter()
            .map(|fill| {
                let request = TradeRequest::new(
                    fill.buyer,
                    Counterparty::consumer(fill.seller),
                    fill.producer_id,
                    fill.price,
                    fill.quantity,
                    TradeOrigin::OrderBook,
                );
                record_trade(tx, ctx, request)
            })
            .collect()
    }

    /// Match the resting orders; a book without crossing orders is left as is
    pub fn match_orders(&self, ctx: &dyn TransactionContext) -> MarketResult<Vec<Trade>> {
        let mut tx = MarketTransaction::begin(self.store())?;
        let loaded = tx.load_order_book()?;
        let mut book = loaded.clone();

        let trades = self.execute_matches(&mut tx, ctx, &mut book)?;
        if trades.is_empty() {
            return Ok(trades);
        }

        tx.sync_order_book(&loaded, &book)?;
        let (_, events) = tx.commit()?;
        debug!("{} matched {} trades", self.matcher.name(), trades.len());
        self.publish(events);
        Ok(trades)
    }

    /// Remove a resting order of `owner`
    pub fn cancel_order(
        &self,
        ctx: &dyn TransactionContext,
        order_id: &OrderId,
        owner: &str,
    ) -> MarketResult<Order> {
        let mut tx = MarketTransaction::begin(self.store())?;
        let book = tx.load_order_book()?;

        let order = book
            .find(order_id)
            .cloned()
            .ok_or_else(|| MarketError::not_found("order", order_id.to_string()))?;
        if order.owner != owner {
            return Err(MarketError::invalid(format!(
                "order {} does not belong to {}",
                order_id, owner
            )));
        }

        tx.delete_order(&order);
        tx.emit(MarketEvent::OrderCancelled {
            order_id: order.id,
            timestamp: ctx.timestamp(),
        });

        let (_, events) = tx.commit()?;
        debug!("Cancelled order {} of {}", order_id, owner);
        self.publish(events);
        Ok(order)
    }

    pub fn get_order_book(&self) -> MarketResult<OrderBookView> {
        Ok(OrderBook::from_orders(load_orders(self.store())?).view())
    }

    /// Resting orders of `owner` in book priority
    pub fn get_user_orders(&self, owner: &str) -> MarketResult<Vec<Order>> {
        let book = OrderBook::from_orders(load_orders(self.store())?);
        Ok(book.orders_of(owner).cloned().collect())
    }

    // ========================================================================
    // Settlement
    // ========================================================================

    /// Book a trade outside the order book.
    ///
    /// A `seller` of `"MARKET"` buys from the clearing pool.
    pub fn record_trade(
        &self,
        ctx: &dyn TransactionContext,
        buyer: &str,
        seller: &str,
        producer_id: &str,
        price: f64,
        quantity: f64,
    ) -> MarketResult<Trade> {
        let mut tx = MarketTransaction::begin(self.store())?;
        let request = TradeRequest::new(
            buyer,
            Counterparty::from(seller.to_string()),
            producer_id,
            price,
            quantity,
            TradeOrigin::Direct,
        );
        let trade = record_trade(&mut tx, ctx, request)?;

        let (_, events) = tx.commit()?;
        self.publish(events);
        Ok(trade)
    }

    // ========================================================================
    // Ledger Queries
    // ========================================================================

    /// Every trade, newest first
    pub fn get_trade_history(&self) -> MarketResult<Vec<Trade>> {
        let mut trades = load_trades(self.store())?;
        trades.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(trades)
    }

    /// The newest trades; `None` uses the configured default limit
    pub fn get_recent_trades(&self, limit: Option<usize>) -> MarketResult<Vec<Trade>> {
        let limit = limit.unwrap_or(self.config.default_recent_trades);
        let mut trades = self.get_trade_history()?;
        trades.truncate(limit);
        Ok(trades)
    }

    pub fn get_current_price(&self, ctx: &dyn TransactionContext) -> MarketResult<PriceInfo> {
        let trades = self.get_trade_history()?;
        Ok(price_info(&trades, ctx.timestamp(), self.config.price_change_window()))
    }

    pub fn get_user_balance(&self, user: &str) -> MarketResult<Decimal> {
        let snapshot = self.get_snapshot()?;
        Ok(snapshot.require_consumer(user)?.balance)
    }

    /// Trades where `user` bought or sold, newest first
    pub fn get_user_trades(&self, user: &str) -> MarketResult<Vec<Trade>> {
        let mut trades = self.get_trade_history()?;
        trades.retain(|trade| trade.involves(user));
        Ok(trades)
    }

    pub fn get_producer_details(&self, producer_id: &str) -> MarketResult<Producer> {
        let snapshot = self.get_snapshot()?;
        snapshot.require_producer(producer_id).cloned()
    }

    pub fn get_market_statistics(&self, ctx: &dyn TransactionContext) -> MarketResult<MarketStatistics> {
        let snapshot = self.get_snapshot()?;
        let trades = self.get_trade_history()?;
        let book = self.get_order_book()?;

        Ok(market_statistics(
            &snapshot,
            &trades,
            &book,
            ctx.timestamp(),
            self.config.price_change_window(),
        ))
    }

    // ========================================================================
    // Participants
    // ========================================================================

    /// Hand a producer from its current owner to another consumer.
    ///
    /// Resting sell orders on the producer are cancelled in the same commit.
    pub fn transfer_producer_ownership(
        &self,
        ctx: &dyn TransactionContext,
        producer_id: &str,
        from: &str,
        to: &str,
    ) -> MarketResult<Producer> {
        let mut tx = MarketTransaction::begin(self.store())?;
        tx.snapshot_mut().transfer_producer(producer_id, from, to)?;
        let producer = tx.snapshot().require_producer(producer_id)?.clone();

        let book = tx.load_order_book()?;
        let stale: Vec<Order> = book
            .orders()
            .filter(|o| o.side == Side::Sell && o.producer_id.as_deref() == Some(producer_id))
            .cloned()
            .collect();
        for order in &stale {
            tx.delete_order(order);
            tx.emit(MarketEvent::OrderCancelled {
                order_id: order.id,
                timestamp: ctx.timestamp(),
            });
        }

        tx.emit(MarketEvent::OwnershipTransferred {
            producer_id: producer_id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            timestamp: ctx.timestamp(),
        });

        let (_, events) = tx.commit()?;
        info!(
            "Producer {} transferred from {} to {}, {} sell orders cancelled",
            producer_id,
            from,
            to,
            stale.len()
        );
        self.publish(events);
        Ok(producer)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_consumer(
        &self,
        ctx: &dyn TransactionContext,
        id: &str,
        beta: f64,
        theta: f64,
        demand_min: f64,
        demand_max: f64,
        balance: Decimal,
    ) -> MarketResult<Consumer> {
        require_participant_id(id)?;
        Consumer::validate_parameters(beta, theta, demand_min, demand_max)
            .map_err(MarketError::InvalidArgument)?;

        let mut tx = MarketTransaction::begin(self.store())?;
        let consumer = Consumer::new(id, beta, theta, demand_min, demand_max, balance, 0);
        tx.snapshot_mut().add_consumer(consumer)?;
        let created = tx.snapshot().require_consumer(id)?.clone();

        tx.emit(MarketEvent::ParticipantCreated {
            kind: "consumer".to_string(),
            id: id.to_string(),
            timestamp: ctx.timestamp(),
        });

        let (_, events) = tx.commit()?;
        info!("Consumer {} created", id);
        self.publish(events);
        Ok(created)
    }

    /// Register a producer; every consumer gains a zeroed demand slot for it
    #[allow(clippy::too_many_arguments)]
    pub fn create_producer(
        &self,
        ctx: &dyn TransactionContext,
        id: &str,
        a: f64,
        b: f64,
        production_min: f64,
        production_max: f64,
        owner_id: &str,
    ) -> MarketResult<Producer> {
        require_participant_id(id)?;
        Producer::validate_parameters(a, b, production_min, production_max)
            .map_err(MarketError::InvalidArgument)?;

        let mut tx = MarketTransaction::begin(self.store())?;
        let producer = Producer::new(id, a, b, production_min, production_max, owner_id);
        tx.snapshot_mut().add_producer(producer)?;
        let created = tx.snapshot().require_producer(id)?.clone();

        tx.emit(MarketEvent::ParticipantCreated {
            kind: "producer".to_string(),
            id: id.to_string(),
            timestamp: ctx.timestamp(),
        });

        let (_, events) = tx.commit()?;
        info!("Producer {} created for {}", id, owner_id);
        self.publish(events);
        Ok(created)
    }
}

fn require_positive(what: &str, value: f64) -> MarketResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MarketError::invalid(format!("{} must be positive", what)))
    }
}

fn require_participant_id(id: &str) -> MarketResult<()> {
    if id.trim().is_empty() {
        return Err(MarketError::invalid("participant id cannot be empty"));
    }
    if id == CLEARING_POOL_ID {
        return Err(MarketError::invalid(format!("{} is reserved", CLEARING_POOL_ID)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MidpointDoubleAuction;
    use crate::interfaces::{FixedContext, NoOpEventHandler};
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn market() -> (EnergyMarket, FixedContext) {
        let market = EnergyMarket::new(
            Arc::new(MemoryStore::new()),
            MarketConfig::reference(),
            Box::new(MidpointDoubleAuction::new()),
            Arc::new(NoOpEventHandler),
        );
        let ctx = FixedContext::genesis();
        market.initialize_market(&ctx).unwrap();
        (market, ctx)
    }

    /// A sell price inside the band of `producer_id`
    fn fair_price(market: &EnergyMarket, producer_id: &str) -> f64 {
        market.get_producer_details(producer_id).unwrap().lambda
    }

    #[test]
    fn test_order_validation() {
        let (market, ctx) = market();
        let p1 = fair_price(&market, "producer1");

        let cases: Vec<(Side, f64, f64, &str, Option<&str>)> = vec![
            (Side::Buy, 0.0, 1.0, "consumer1", None),
            (Side::Buy, 1.0, -1.0, "consumer1", None),
            (Side::Buy, f64::INFINITY, 1.0, "consumer1", None),
            (Side::Sell, p1, 1.0, "consumer1", None),
            (Side::Sell, p1, 1.0, "consumer2", Some("producer1")),
            (Side::Sell, p1 * 1.5, 1.0, "consumer1", Some("producer1")),
        ];
        for (side, price, quantity, owner, producer) in cases {
            let err = market.place_order(&ctx, side, price, quantity, owner, producer).unwrap_err();
            assert!(matches!(err, MarketError::InvalidArgument(_)), "{:?}", err);
        }

        assert!(matches!(
            market.place_order(&ctx, Side::Buy, 1.0, 1.0, "ghost", None),
            Err(MarketError::NotFound { .. })
        ));
        assert!(matches!(
            market.place_order(&ctx, Side::Sell, p1, 1.0, "consumer1", Some("ghost")),
            Err(MarketError::NotFound { .. })
        ));
        assert!(market.get_order_book().unwrap().is_empty());
    }

    #[test]
    fn test_resting_orders_and_cancellation() {
        let (market, ctx) = market();
        let p2 = fair_price(&market, "producer2");

        let sell = market
            .place_order(&ctx, Side::Sell, p2, 5.0, "consumer2", Some("producer2"))
            .unwrap();
        let buy = market
            .place_order(&ctx, Side::Buy, p2 * 0.5, 3.0, "consumer4", None)
            .unwrap();
        assert!(sell.trades.is_empty() && buy.trades.is_empty());
        assert_eq!(buy.order.sequence, sell.order.sequence + 1);

        let view = market.get_order_book().unwrap();
        assert_eq!(view.buy.len(), 1);
        assert_eq!(view.sell.len(), 1);
        assert_eq!(market.get_user_orders("consumer2").unwrap(), vec![sell.order.clone()]);

        let err = market.cancel_order(&ctx, &sell.order.id, "consumer4").unwrap_err();
        assert!(matches!(err, MarketError::InvalidArgument(_)));

        market.cancel_order(&ctx, &sell.order.id, "consumer2").unwrap();
        assert!(market.get_user_orders("consumer2").unwrap().is_empty());
        assert!(matches!(
            market.cancel_order(&ctx, &sell.order.id, "consumer2"),
            Err(MarketError::NotFound { .. })
        ));
    }

    #[test]
    fn test_self_crossing_order_rejected() {
        let (market, ctx) = market();
        let p1 = fair_price(&market, "producer1");

        market
            .place_order(&ctx, Side::Sell, p1, 5.0, "consumer1", Some("producer1"))
            .unwrap();
        let err = market
            .place_order(&ctx, Side::Buy, p1 + 1.0, 5.0, "consumer1", None)
            .unwrap_err();

        assert!(matches!(err, MarketError::InvalidArgument(_)));
        assert!(market.get_trade_history().unwrap().is_empty());
        assert_eq!(market.get_order_book().unwrap().sell.len(), 1);
    }

    #[test]
    fn test_partial_fill_keeps_remainder() {
        let (market, ctx) = market();
        let p3 = fair_price(&market, "producer3");

        market
            .place_order(&ctx, Side::Sell, p3, 10.0, "consumer3", Some("producer3"))
            .unwrap();
        let receipt = market
            .place_order(&ctx, Side::Buy, p3 + 0.2, 4.0, "consumer5", None)
            .unwrap();

        assert_eq!(receipt.trades.len(), 1);
        assert!(receipt.order.is_filled());
        assert!((receipt.trades[0].price - (p3 + 0.1)).abs() < 1e-12);

        let view = market.get_order_book().unwrap();
        assert!(view.buy.is_empty());
        assert_eq!(view.sell[0].quantity, 6.0);
        assert_eq!(market.get_producer_details("producer3").unwrap().traded_volume, 4.0);
    }

    #[test]
    fn test_exact_fill_deletes_orders() {
        let (market, ctx) = market();
        let p1 = fair_price(&market, "producer1");

        market
            .place_order(&ctx, Side::Sell, p1, 0.1, "consumer1", Some("producer1"))
            .unwrap();
        market
            .place_order(&ctx, Side::Sell, p1, 0.2, "consumer1", Some("producer1"))
            .unwrap();
        let receipt = market
            .place_order(&ctx, Side::Buy, p1 + 0.1, 0.3, "consumer4", None)
            .unwrap();

        assert_eq!(receipt.trades.len(), 2);
        assert_eq!(receipt.order.quantity, 0.0);
        assert!(market.get_order_book().unwrap().is_empty());

        let next = market
            .place_order(&ctx, Side::Buy, p1 + 0.1, 1.0, "consumer5", None)
            .unwrap();
        assert!(next.trades.is_empty());
        assert_eq!(market.get_trade_history().unwrap().len(), 2);
        assert!(market
            .get_trade_history()
            .unwrap()
            .iter()
            .all(|t| t.total_value > Decimal::ZERO));

        assert!(matches!(
            market.place_order(&ctx, Side::Buy, p1, 1e-12, "consumer5", None),
            Err(MarketError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_match_orders_on_quiet_book() {
        let (market, ctx) = market();
        assert!(market.match_orders(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_direct_trades_and_queries() {
        let (market, ctx) = market();
        let later = ctx.advance(Duration::hours(30));

        market.record_trade(&ctx, "consumer4", "consumer1", "producer1", 4.0, 10.0).unwrap();
        market.record_trade(&later, "consumer5", CLEARING_POOL_ID, "producer2", 5.0, 2.0).unwrap();
        assert!(market.record_trade(&later, "consumer5", "consumer5", "producer2", 5.0, 2.0).is_err());

        let history = market.get_trade_history().unwrap();
        assert_eq!(history.iter().map(|t| t.id.0).collect::<Vec<_>>(), vec![2, 1]);
        assert!(history[0].seller.is_pool());
        assert_eq!(market.get_recent_trades(Some(1)).unwrap().len(), 1);
        assert_eq!(market.get_user_trades("consumer1").unwrap().len(), 1);
        assert_eq!(market.get_user_balance("consumer4").unwrap(), Decimal::from(9_960));
        assert_eq!(market.get_user_balance("consumer5").unwrap(), Decimal::from(9_990));

        let price = market.get_current_price(&later).unwrap();
        assert_eq!(price.current_price, Some(5.0));
        assert!((price.price_change - 25.0).abs() < 1e-9);

        let stats = market.get_market_statistics(&later).unwrap();
        assert_eq!(stats.trade_count_24h, 1);
        assert_eq!(stats.volume_24h, Decimal::from(10));
        assert_eq!(stats.producer_count, 3);
        assert_eq!(stats.consumer_count, 6);
    }

    #[test]
    fn test_participant_lifecycle() {
        let (market, ctx) = market();

        market
            .create_consumer(&ctx, "consumer7", 8.0, 0.05, 10.0, 50.0, Decimal::from(500))
            .unwrap();
        let producer = market
            .create_producer(&ctx, "producer4", 0.01, 3.0, 5.0, 50.0, "consumer7")
            .unwrap();
        assert_eq!(producer.production, 5.0);

        let snapshot = market.get_snapshot().unwrap();
        assert!(snapshot.consumers.iter().all(|c| c.demands.len() == 4));
        assert!(snapshot.consumer("consumer7").unwrap().owns("producer4"));

        assert!(market.create_consumer(&ctx, CLEARING_POOL_ID, 8.0, 0.05, 1.0, 2.0, Decimal::ZERO).is_err());
        assert!(market.create_consumer(&ctx, "consumer8", 8.0, 0.0, 1.0, 2.0, Decimal::ZERO).is_err());
        assert!(market.create_producer(&ctx, "producer5", -1.0, 3.0, 5.0, 50.0, "consumer7").is_err());

        let moved = market
            .transfer_producer_ownership(&ctx, "producer4", "consumer7", "consumer1")
            .unwrap();
        assert_eq!(moved.owner_id, "consumer1");
        let snapshot = market.get_snapshot().unwrap();
        assert!(!snapshot.consumer("consumer7").unwrap().owns("producer4"));
        assert!(snapshot.consumer("consumer1").unwrap().owns("producer4"));
    }

    #[test]
    fn test_transfer_cancels_resting_sell_orders() {
        let (market, ctx) = market();
        let p1 = fair_price(&market, "producer1");

        market
            .place_order(&ctx, Side::Sell, p1, 5.0, "consumer1", Some("producer1"))
            .unwrap();
        let kept = market
            .place_order(&ctx, Side::Buy, p1 * 0.5, 2.0, "consumer1", None)
            .unwrap();

        market
            .transfer_producer_ownership(&ctx, "producer1", "consumer1", "consumer4")
            .unwrap();
        let view = market.get_order_book().unwrap();
        assert!(view.sell.is_empty());
        assert_eq!(market.get_user_orders("consumer1").unwrap(), vec![kept.order]);

        // The new owner cannot end up buying its own producer's output
        let receipt = market
            .place_order(&ctx, Side::Buy, p1 + 0.1, 5.0, "consumer4", None)
            .unwrap();
        assert!(receipt.trades.is_empty());
        assert!(market.get_trade_history().unwrap().is_empty());
        assert_eq!(market.get_user_balance("consumer1").unwrap(), Decimal::from(10_000));
        assert_eq!(market.get_user_balance("consumer4").unwrap(), Decimal::from(10_000));
    }

    #[test]
    fn test_run_until_converged_bounds() {
        let (market, ctx) = market();

        assert!(matches!(
            market.run_until_converged(&ctx, 0),
            Err(MarketError::InvalidArgument(_))
        ));
        assert!(matches!(
            market.run_until_converged(&ctx, 3),
            Err(MarketError::ConvergenceFailure { iterations: 3 })
        ));
        assert_eq!(market.get_snapshot().unwrap().iteration_count, 3);
    }
}
