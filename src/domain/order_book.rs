// ============================================================================
// Order Book Domain Model
// ============================================================================

use std::cmp::Ordering;

use super::{Order, OrderBookView, OrderId, Side};

// ============================================================================
// Priority
// ============================================================================

/// Buys: higher price first. Sells: lower price first. Then earlier sequence.
fn priority(side: Side, a: &Order, b: &Order) -> Ordering {
    let by_price = match side {
        Side::Buy => b.price.total_cmp(&a.price),
        Side::Sell => a.price.total_cmp(&b.price),
    };
    by_price.then_with(|| a.sequence.cmp(&b.sequence))
}

// ============================================================================
// Order Book
// ============================================================================

/// In-memory working copy of the resting orders, each side kept in priority
/// order with the best order at index 0
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    buys: Vec<Order>,
    sells: Vec<Order>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a book from stored orders; exhausted orders are left out
    pub fn from_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let mut book = Self::new();
        for order in orders.into_iter().filter(|o| !o.is_filled()) {
            match order.side {
                Side::Buy => book.buys.push(order),
                Side::Sell => book.sells.push(order),
            }
        }
        book.buys.sort_by(|a, b| priority(Side::Buy, a, b));
        book.sells.sort_by(|a, b| priority(Side::Sell, a, b));
        book
    }

    fn side(&self, side: Side) -> &Vec<Order> {
        match side {
            Side::Buy => &self.buys,
            Side::Sell => &self.sells,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut Vec<Order> {
        match side {
            Side::Buy => &mut self.buys,
            Side::Sell => &mut self.sells,
        }
    }

    /// Insert keeping priority order
    pub fn insert(&mut self, order: Order) {
        let side = order.side;
        let orders = self.side_mut(side);
        let at = orders
            .iter()
            .position(|resting| priority(side, &order, resting) == Ordering::Less)
            .unwrap_or(orders.len());
        orders.insert(at, order);
    }

    pub fn best(&self, side: Side) -> Option<&Order> {
        self.side(side).first()
    }

    /// Reduce the best order of `side`, removing it once exhausted.
    ///
    /// Returns the order as it stands after the fill.
    pub fn fill_best(&mut self, side: Side, quantity: f64) -> Option<Order> {
        let orders = self.side_mut(side);
        let best = orders.first_mut()?;
        best.fill(quantity);
        let snapshot = best.clone();
        if snapshot.is_filled() {
            orders.remove(0);
        }
        Some(snapshot)
    }

    pub fn remove(&mut self, id: &OrderId) -> Option<Order> {
        for side in [Side::Buy, Side::Sell] {
            let orders = self.side_mut(side);
            if let Some(idx) = orders.iter().position(|o| o.id == *id) {
                return Some(orders.remove(idx));
            }
        }
        None
    }

    pub fn find(&self, id: &OrderId) -> Option<&Order> {
        self.orders().find(|o| o.id == *id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.buys.iter().chain(self.sells.iter())
    }

    pub fn orders_of<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a Order> + 'a {
        self.orders().filter(move |o| o.owner == owner)
    }

    /// Whether the best buy can trade with the best sell
    pub fn is_crossed(&self) -> bool {
        match (self.best(Side::Buy), self.best(Side::Sell)) {
            (Some(buy), Some(sell)) => buy.price >= sell.price,
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.buys.len() + self.sells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty()
    }

    pub fn view(&self) -> OrderBookView {
        OrderBookView {
            buy: self.buys.clone(),
            sell: self.sells.clone(),
        }
    }
}
