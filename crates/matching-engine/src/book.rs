//! Per-symbol order book and the matching algorithm
//!
//! This module implements the deterministic price-time priority matching
//! algorithm.
//!
//! CRITICAL PROPERTIES:
//! 1. Deterministic (same command sequence -> same event sequence, always)
//! 2. Price-time priority (best price first; FIFO within a price level)
//! 3. Makers trade at their own price
//! 4. A crossed book is never observable between commands

use common::{OrderId, Price, Quantity, Side, SymbolId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::event::{CancelRejectReason, DeleteReason, EventSender, MarketEvent, RejectReason};
use crate::level::PriceLevel;
use crate::order::Order;

/// One side of the book: price levels keyed by price, with best-price
/// access direction determined by the side (highest bid, lowest ask).
#[derive(Debug)]
struct BookSide {
    side: Side,
    levels: BTreeMap<Price, PriceLevel>,
}

impl BookSide {
    fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    /// Best price on this side: the highest bid or the lowest ask.
    fn best_price(&self) -> Option<Price> {
        match self.side {
            Side::Bid => self.levels.keys().next_back().copied(),
            Side::Ask => self.levels.keys().next().copied(),
        }
    }

    fn level_mut(&mut self, price: Price) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&price)
    }

    /// Appends a resting order at its price, creating the level on first use.
    fn append(&mut self, order: Order) {
        self.levels.entry(order.price).or_default().append(order);
    }

    /// Removes an order from its level, dropping the level once empty.
    fn remove(&mut self, price: Price, order_id: OrderId) -> Option<Order> {
        let level = self.levels.get_mut(&price)?;
        let removed = level.remove(order_id)?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Some(removed)
    }

    /// Drops the level at `price` if it has become empty.
    fn prune(&mut self, price: Price) {
        if self.levels.get(&price).is_some_and(|level| level.is_empty()) {
            self.levels.remove(&price);
        }
    }

    /// Total open quantity reachable from the best price while the price
    /// satisfies `limit` (at-or-below for asks, at-or-above for bids).
    /// `None` walks the whole side. Used for the fill-or-kill precheck.
    fn reachable_volume(&self, limit: Option<Price>) -> Quantity {
        let mut total: Quantity = 0;
        match self.side {
            Side::Ask => {
                for (price, level) in self.levels.iter() {
                    if limit.is_some_and(|max| *price > max) {
                        break;
                    }
                    total = total.saturating_add(level.volume());
                }
            }
            Side::Bid => {
                for (price, level) in self.levels.iter().rev() {
                    if limit.is_some_and(|min| *price < min) {
                        break;
                    }
                    total = total.saturating_add(level.volume());
                }
            }
        }
        total
    }

    fn volume_at(&self, price: Price) -> Quantity {
        self.levels
            .get(&price)
            .map(|level| level.volume())
            .unwrap_or(0)
    }

    fn order_count(&self) -> usize {
        self.levels.values().map(|level| level.order_count()).sum()
    }

    /// The first `limit` levels, best price first.
    fn depth(&self, limit: usize) -> Vec<LevelDepth> {
        let view = |(price, level): (&Price, &PriceLevel)| LevelDepth {
            price: *price,
            volume: level.volume(),
            order_count: level.order_count(),
        };
        match self.side {
            Side::Bid => self.levels.iter().rev().take(limit).map(view).collect(),
            Side::Ask => self.levels.iter().take(limit).map(view).collect(),
        }
    }
}

/// Aggregate view of one price level, best for market-data consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDepth {
    /// Price of the level
    pub price: Price,
    /// Total open quantity at this price
    pub volume: Quantity,
    /// Number of orders at this price
    pub order_count: usize,
}

/// Depth snapshot of a book, best prices first on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Symbol the snapshot is for
    pub symbol_id: SymbolId,
    /// Bid levels, highest price first
    pub bids: Vec<LevelDepth>,
    /// Ask levels, lowest price first
    pub asks: Vec<LevelDepth>,
}

/// True when `incoming` may trade at the opposite side's best price.
fn crosses(incoming: &Order, best_opposite: Price) -> bool {
    if incoming.is_market() {
        return true;
    }
    match incoming.side {
        Side::Bid => best_opposite <= incoming.price,
        Side::Ask => best_opposite >= incoming.price,
    }
}

/// Order book for a single symbol.
///
/// Owned by exactly one shard worker; no other component mutates it. Every
/// mutation is reported through the event sender the book was created with.
#[derive(Debug)]
pub struct OrderBook {
    symbol_id: SymbolId,
    symbol: String,
    bids: BookSide,
    asks: BookSide,
    /// Locates the level holding each resting order for cancellation.
    order_index: HashMap<OrderId, (Side, Price)>,
    events: EventSender,
}

impl OrderBook {
    /// Creates an empty book publishing into `events`.
    pub fn new(symbol_id: SymbolId, symbol: impl Into<String>, events: EventSender) -> Self {
        Self {
            symbol_id,
            symbol: symbol.into(),
            bids: BookSide::new(Side::Bid),
            asks: BookSide::new(Side::Ask),
            order_index: HashMap::new(),
            events,
        }
    }

    /// Symbol this book trades.
    pub fn symbol_id(&self) -> SymbolId {
        self.symbol_id
    }

    /// Display name of the symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Places an order: validates it, matches it against the opposite side,
    /// and rests any good-till-cancelled limit remainder.
    ///
    /// Every outcome is reported through the event stream; a rejected order
    /// leaves the book untouched.
    pub fn place(&mut self, mut order: Order) {
        debug_assert_eq!(
            order.symbol_id, self.symbol_id,
            "order routed to the wrong book"
        );

        if order.quantity == 0 {
            self.reject(order.id, RejectReason::ZeroQuantity);
            return;
        }
        if order.is_limit() && order.price == 0 {
            self.reject(order.id, RejectReason::InvalidPrice);
            return;
        }
        if self.order_index.contains_key(&order.id) {
            self.reject(order.id, RejectReason::DuplicateId);
            return;
        }

        info!(
            symbol = %self.symbol,
            order_id = order.id,
            side = %order.side,
            order_type = %order.order_type,
            time_in_force = %order.time_in_force,
            price = order.price,
            quantity = order.quantity,
            "Placing order"
        );

        // Fill-or-kill admits nothing unless the whole quantity is
        // reachable right now; checked before any mutation.
        if order.is_fok() {
            let limit = if order.is_market() {
                None
            } else {
                Some(order.price)
            };
            let reachable = self.opposite(order.side).reachable_volume(limit);
            if reachable < order.quantity {
                info!(
                    order_id = order.id,
                    reachable,
                    required = order.quantity,
                    "Fill-or-kill order rejected: insufficient liquidity"
                );
                self.reject(order.id, RejectReason::FillOrKillUnfilled);
                return;
            }
        }

        let resting_maker = self.match_incoming(&mut order);

        if order.is_filled() {
            // A fully filled taker never rests.
            self.publish(MarketEvent::OrderDeleted {
                order,
                reason: DeleteReason::Filled,
            });
        } else if order.is_market() || order.is_ioc() {
            let reason = if order.executed_quantity == 0 {
                DeleteReason::Unfilled
            } else {
                DeleteReason::PartiallyUnfilled
            };
            self.publish(MarketEvent::OrderDeleted { order, reason });
        } else {
            self.order_index.insert(order.id, (order.side, order.price));
            self.side_mut(order.side).append(order.clone());
            self.publish(MarketEvent::OrderAdded { order });
        }

        // The last maker touched may be left resting with a reduced open
        // quantity; report its new state once the taker is resolved.
        if let Some(maker) = resting_maker {
            self.publish(MarketEvent::OrderUpdated { order: maker });
        }
    }

    /// Cancels a resting order by id.
    pub fn cancel(&mut self, order_id: OrderId) {
        let Some((side, price)) = self.order_index.remove(&order_id) else {
            debug!(
                symbol = %self.symbol,
                order_id,
                "Cancel rejected: order not found"
            );
            self.publish(MarketEvent::CancelRejected {
                symbol_id: self.symbol_id,
                order_id,
                reason: CancelRejectReason::NotFound,
            });
            return;
        };

        let removed = self
            .side_mut(side)
            .remove(price, order_id)
            .expect("order index tracks resting orders");

        info!(symbol = %self.symbol, order_id, "Order cancelled");
        self.publish(MarketEvent::OrderDeleted {
            order: removed,
            reason: DeleteReason::Canceled,
        });
    }

    /// Walks the opposite side from the best price while the incoming order
    /// still crosses, filling FIFO within each level. Returns the last
    /// maker left resting with a reduced open quantity, if any.
    fn match_incoming(&mut self, order: &mut Order) -> Option<Order> {
        let Self {
            symbol_id,
            bids,
            asks,
            order_index,
            events,
            ..
        } = self;
        let opposite = match order.side {
            Side::Bid => asks,
            Side::Ask => bids,
        };

        let mut resting_maker = None;
        while !order.is_filled() {
            let Some(best_price) = opposite.best_price() else {
                break;
            };
            if !crosses(order, best_price) {
                break;
            }

            let level = opposite
                .level_mut(best_price)
                .expect("best price always has a level");
            let maker_open = level
                .front()
                .expect("levels are never left empty")
                .open_quantity();
            let fill_quantity = order.open_quantity().min(maker_open);

            // Both sides trade at the maker's price.
            order
                .execute(fill_quantity, best_price)
                .expect("fill is bounded by the taker's open quantity");
            let maker = level
                .fill_front(fill_quantity, best_price)
                .expect("fill is bounded by the maker's open quantity");

            debug!(
                symbol_id = *symbol_id,
                price = best_price,
                quantity = fill_quantity,
                maker_order_id = maker.id,
                taker_order_id = order.id,
                "Trade executed"
            );

            Self::emit(
                events,
                MarketEvent::Trade {
                    symbol_id: *symbol_id,
                    price: best_price,
                    quantity: fill_quantity,
                    maker_order_id: maker.id,
                    taker_order_id: order.id,
                },
            );
            Self::emit(
                events,
                MarketEvent::OrderExecuted {
                    symbol_id: *symbol_id,
                    order_id: maker.id,
                    executed_price: best_price,
                    executed_quantity: fill_quantity,
                    remaining_quantity: maker.open_quantity(),
                },
            );
            Self::emit(
                events,
                MarketEvent::OrderExecuted {
                    symbol_id: *symbol_id,
                    order_id: order.id,
                    executed_price: best_price,
                    executed_quantity: fill_quantity,
                    remaining_quantity: order.open_quantity(),
                },
            );

            if maker.is_filled() {
                order_index.remove(&maker.id);
                opposite.prune(best_price);
                resting_maker = None;
                Self::emit(
                    events,
                    MarketEvent::OrderDeleted {
                        order: maker,
                        reason: DeleteReason::Filled,
                    },
                );
            } else {
                resting_maker = Some(maker);
            }
        }
        resting_maker
    }

    fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    fn opposite(&self, side: Side) -> &BookSide {
        match side {
            Side::Bid => &self.asks,
            Side::Ask => &self.bids,
        }
    }

    fn reject(&self, order_id: OrderId, reason: RejectReason) {
        debug!(
            symbol = %self.symbol,
            order_id,
            ?reason,
            "Order rejected"
        );
        self.publish(MarketEvent::OrderRejected {
            symbol_id: self.symbol_id,
            order_id,
            reason,
        });
    }

    fn publish(&self, event: MarketEvent) {
        Self::emit(&self.events, event);
    }

    // The consumer can only be gone during teardown; events published after
    // that are dropped.
    fn emit(events: &EventSender, event: MarketEvent) {
        let _ = events.send(event);
    }

    /// Best (highest) bid price.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    /// Best (lowest) ask price.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    /// Difference between best ask and best bid, when both sides are populated.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Total open quantity resting at a bid price.
    pub fn bid_volume_at(&self, price: Price) -> Quantity {
        self.bids.volume_at(price)
    }

    /// Total open quantity resting at an ask price.
    pub fn ask_volume_at(&self, price: Price) -> Quantity {
        self.asks.volume_at(price)
    }

    /// Number of orders resting in the book.
    pub fn order_count(&self) -> usize {
        self.order_index.len()
    }

    /// True when neither side holds any orders.
    pub fn is_empty(&self) -> bool {
        self.order_index.is_empty()
    }

    /// Depth snapshot of the first `depth` levels on both sides.
    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        BookSnapshot {
            symbol_id: self.symbol_id,
            bids: self.bids.depth(depth),
            asks: self.asks.depth(depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::TimeInForce;
    use messaging::Receiver;

    fn test_book() -> (OrderBook, Receiver<MarketEvent>) {
        let (tx, rx) = messaging::channel();
        (OrderBook::new(1, "BTC-USD", tx), rx)
    }

    fn drain(rx: &Receiver<MarketEvent>) -> Vec<MarketEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn limit_bid(id: OrderId, price: Price, quantity: Quantity) -> Order {
        Order::limit_bid(id, 1, 1, price, quantity, TimeInForce::Gtc)
    }

    fn limit_ask(id: OrderId, price: Price, quantity: Quantity) -> Order {
        Order::limit_ask(id, 1, 1, price, quantity, TimeInForce::Gtc)
    }

    /// Checks the structural invariants that must hold between commands:
    /// level volumes equal the open quantities they cover, no empty levels
    /// or exhausted orders linger, the order index is bijective with the
    /// resting orders, and the book is never crossed.
    fn assert_invariants(book: &OrderBook) {
        for side in [&book.bids, &book.asks] {
            for (price, level) in &side.levels {
                assert!(!level.is_empty(), "empty level left at {price}");
                let open_sum: Quantity = level.iter().map(|o| o.open_quantity()).sum();
                assert_eq!(level.volume(), open_sum, "volume drift at {price}");
                for order in level.iter() {
                    assert!(order.open_quantity() > 0);
                    assert_eq!(order.price, *price);
                    assert_eq!(
                        book.order_index.get(&order.id),
                        Some(&(order.side, *price)),
                        "index out of sync for order {}",
                        order.id
                    );
                }
            }
        }
        let resting = book.bids.order_count() + book.asks.order_count();
        assert_eq!(book.order_index.len(), resting);

        if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
            assert!(bid < ask, "book is crossed: {bid} >= {ask}");
        }
    }

    #[test]
    fn test_resting_limit_bid_emits_order_added() {
        let (mut book, rx) = test_book();

        book.place(limit_bid(1, 100, 10));

        assert_eq!(
            drain(&rx),
            vec![MarketEvent::OrderAdded {
                order: limit_bid(1, 100, 10)
            }]
        );
        assert_eq!(book.best_bid(), Some(100));
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.bid_volume_at(100), 10);
        assert_invariants(&book);
    }

    #[test]
    fn test_partial_fill_against_resting_bid() {
        let (mut book, rx) = test_book();
        book.place(limit_bid(1, 100, 10));
        drain(&rx);

        book.place(limit_ask(2, 100, 4));

        let mut taker = limit_ask(2, 100, 4);
        taker.execute(4, 100).unwrap();
        let mut maker = limit_bid(1, 100, 10);
        maker.execute(4, 100).unwrap();

        assert_eq!(
            drain(&rx),
            vec![
                MarketEvent::Trade {
                    symbol_id: 1,
                    price: 100,
                    quantity: 4,
                    maker_order_id: 1,
                    taker_order_id: 2,
                },
                MarketEvent::OrderExecuted {
                    symbol_id: 1,
                    order_id: 1,
                    executed_price: 100,
                    executed_quantity: 4,
                    remaining_quantity: 6,
                },
                MarketEvent::OrderExecuted {
                    symbol_id: 1,
                    order_id: 2,
                    executed_price: 100,
                    executed_quantity: 4,
                    remaining_quantity: 0,
                },
                MarketEvent::OrderDeleted {
                    order: taker,
                    reason: DeleteReason::Filled,
                },
                MarketEvent::OrderUpdated { order: maker },
            ]
        );
        assert_eq!(book.bid_volume_at(100), 6);
        assert_eq!(book.best_ask(), None);
        assert_invariants(&book);
    }

    #[test]
    fn test_fok_rejected_when_liquidity_short() {
        let (mut book, rx) = test_book();
        book.place(limit_ask(3, 101, 5));
        drain(&rx);

        book.place(Order::limit_bid(4, 1, 1, 101, 10, TimeInForce::Fok));

        let events = drain(&rx);
        assert_eq!(
            events,
            vec![MarketEvent::OrderRejected {
                symbol_id: 1,
                order_id: 4,
                reason: RejectReason::FillOrKillUnfilled,
            }]
        );
        // Book untouched by the rejected order.
        assert_eq!(book.ask_volume_at(101), 5);
        assert_eq!(book.order_count(), 1);
        assert_invariants(&book);
    }

    #[test]
    fn test_fok_fills_exactly_across_levels() {
        let (mut book, rx) = test_book();
        book.place(limit_ask(1, 99, 4));
        book.place(limit_ask(2, 100, 7));
        drain(&rx);

        book.place(Order::limit_bid(3, 1, 1, 100, 11, TimeInForce::Fok));

        let events = drain(&rx);
        let trades: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                MarketEvent::Trade {
                    price, quantity, ..
                } => Some((*price, *quantity)),
                _ => None,
            })
            .collect();
        assert_eq!(trades, vec![(99, 4), (100, 7)]);
        assert!(matches!(
            events.last(),
            Some(MarketEvent::OrderDeleted {
                order,
                reason: DeleteReason::Filled,
            }) if order.id == 3
        ));
        assert!(book.is_empty());
        assert_invariants(&book);
    }

    #[test]
    fn test_fok_limit_ignores_levels_beyond_its_price() {
        let (mut book, rx) = test_book();
        book.place(limit_ask(1, 101, 5));
        book.place(limit_ask(2, 105, 50));
        drain(&rx);

        // Plenty of volume rests at 105, but the order only reaches 101.
        book.place(Order::limit_bid(3, 1, 1, 101, 10, TimeInForce::Fok));

        assert_eq!(
            drain(&rx),
            vec![MarketEvent::OrderRejected {
                symbol_id: 1,
                order_id: 3,
                reason: RejectReason::FillOrKillUnfilled,
            }]
        );
        assert_eq!(book.order_count(), 2);
        assert_invariants(&book);
    }

    #[test]
    fn test_ioc_walks_levels_and_cancels_remainder() {
        let (mut book, rx) = test_book();
        book.place(limit_ask(5, 101, 5));
        book.place(limit_ask(6, 102, 5));
        drain(&rx);

        book.place(Order::limit_bid(7, 1, 1, 102, 7, TimeInForce::Ioc));

        let events = drain(&rx);
        let trades: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                MarketEvent::Trade {
                    price,
                    quantity,
                    maker_order_id,
                    taker_order_id,
                    ..
                } => Some((*price, *quantity, *maker_order_id, *taker_order_id)),
                _ => None,
            })
            .collect();
        assert_eq!(trades, vec![(101, 5, 5, 7), (102, 2, 6, 7)]);
        assert!(events.iter().any(|e| matches!(
            e,
            MarketEvent::OrderDeleted {
                order,
                reason: DeleteReason::PartiallyUnfilled,
            } if order.id == 7
        )));
        assert_eq!(book.ask_volume_at(102), 3);
        assert_eq!(book.ask_volume_at(101), 0);
        assert_invariants(&book);
    }

    #[test]
    fn test_market_bid_on_empty_book_is_deleted_unfilled() {
        let (mut book, rx) = test_book();

        book.place(Order::market_bid(8, 1, 1, 1, TimeInForce::Ioc));

        assert_eq!(
            drain(&rx),
            vec![MarketEvent::OrderDeleted {
                order: Order::market_bid(8, 1, 1, 1, TimeInForce::Ioc),
                reason: DeleteReason::Unfilled,
            }]
        );
        assert!(book.is_empty());
        assert_invariants(&book);
    }

    #[test]
    fn test_market_order_sweeps_book_and_reports_partial() {
        let (mut book, rx) = test_book();
        book.place(limit_ask(1, 101, 5));
        book.place(limit_ask(2, 110, 5));
        drain(&rx);

        book.place(Order::market_bid(3, 1, 1, 25, TimeInForce::Ioc));

        let events = drain(&rx);
        let trades: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                MarketEvent::Trade {
                    price, quantity, ..
                } => Some((*price, *quantity)),
                _ => None,
            })
            .collect();
        // No price barrier: the market order walks every level.
        assert_eq!(trades, vec![(101, 5), (110, 5)]);
        assert!(events.iter().any(|e| matches!(
            e,
            MarketEvent::OrderDeleted {
                order,
                reason: DeleteReason::PartiallyUnfilled,
            } if order.id == 3 && order.executed_quantity == 10
        )));
        assert!(book.is_empty());
        assert_invariants(&book);
    }

    #[test]
    fn test_cancel_resting_order() {
        let (mut book, rx) = test_book();
        book.place(limit_bid(1, 100, 10));
        drain(&rx);

        book.cancel(1);

        assert_eq!(
            drain(&rx),
            vec![MarketEvent::OrderDeleted {
                order: limit_bid(1, 100, 10),
                reason: DeleteReason::Canceled,
            }]
        );
        assert_eq!(book.best_bid(), None);
        assert!(book.is_empty());
        assert_invariants(&book);
    }

    #[test]
    fn test_cancel_unknown_order() {
        let (mut book, rx) = test_book();

        book.cancel(999);

        assert_eq!(
            drain(&rx),
            vec![MarketEvent::CancelRejected {
                symbol_id: 1,
                order_id: 999,
                reason: CancelRejectReason::NotFound,
            }]
        );
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let (mut book, rx) = test_book();
        book.place(limit_bid(1, 100, 10));
        drain(&rx);

        book.place(limit_ask(1, 105, 5));

        assert_eq!(
            drain(&rx),
            vec![MarketEvent::OrderRejected {
                symbol_id: 1,
                order_id: 1,
                reason: RejectReason::DuplicateId,
            }]
        );
        assert_eq!(book.order_count(), 1);
        assert_invariants(&book);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let (mut book, rx) = test_book();

        book.place(limit_bid(1, 100, 0));

        assert_eq!(
            drain(&rx),
            vec![MarketEvent::OrderRejected {
                symbol_id: 1,
                order_id: 1,
                reason: RejectReason::ZeroQuantity,
            }]
        );
        assert!(book.is_empty());
    }

    #[test]
    fn test_zero_price_limit_rejected() {
        let (mut book, rx) = test_book();

        book.place(limit_bid(1, 0, 10));

        assert_eq!(
            drain(&rx),
            vec![MarketEvent::OrderRejected {
                symbol_id: 1,
                order_id: 1,
                reason: RejectReason::InvalidPrice,
            }]
        );
        assert!(book.is_empty());
    }

    #[test]
    fn test_fifo_within_level() {
        let (mut book, rx) = test_book();
        book.place(limit_ask(1, 100, 4));
        book.place(limit_ask(2, 100, 6));
        drain(&rx);

        book.place(limit_bid(3, 100, 9));

        let events = drain(&rx);
        let trades: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                MarketEvent::Trade {
                    quantity,
                    maker_order_id,
                    ..
                } => Some((*maker_order_id, *quantity)),
                _ => None,
            })
            .collect();
        // Order 1 arrived first and is consumed first.
        assert_eq!(trades, vec![(1, 4), (2, 5)]);
        assert_eq!(book.ask_volume_at(100), 1);
        assert_invariants(&book);
    }

    #[test]
    fn test_price_priority_across_levels() {
        let (mut book, rx) = test_book();
        book.place(limit_bid(1, 98, 5));
        book.place(limit_bid(2, 100, 5));
        drain(&rx);

        book.place(limit_ask(3, 97, 8));

        let events = drain(&rx);
        let trades: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                MarketEvent::Trade {
                    price,
                    quantity,
                    maker_order_id,
                    ..
                } => Some((*price, *quantity, *maker_order_id)),
                _ => None,
            })
            .collect();
        // The best (highest) bid trades first, each at its own price.
        assert_eq!(trades, vec![(100, 5, 2), (98, 3, 1)]);
        assert_eq!(book.bid_volume_at(98), 2);
        assert_invariants(&book);
    }

    #[test]
    fn test_gtc_remainder_rests_after_partial_match() {
        let (mut book, rx) = test_book();
        book.place(limit_ask(1, 100, 5));
        drain(&rx);

        book.place(limit_bid(2, 105, 10));

        let events = drain(&rx);
        let added = events.iter().find_map(|e| match e {
            MarketEvent::OrderAdded { order } => Some(order.clone()),
            _ => None,
        });
        let added = added.expect("remainder must rest");
        assert_eq!(added.executed_quantity, 5);
        assert_eq!(added.open_quantity(), 5);
        assert_eq!(book.best_bid(), Some(105));
        assert_eq!(book.best_ask(), None);
        assert_invariants(&book);
    }

    #[test]
    fn test_place_then_cancel_restores_book() {
        let (mut book, rx) = test_book();
        book.place(limit_bid(1, 100, 10));
        book.place(limit_bid(2, 100, 3));
        book.place(limit_ask(3, 105, 7));
        drain(&rx);
        let before = book.snapshot(usize::MAX);

        // A non-crossing order in, then out, must leave no trace.
        book.place(limit_bid(4, 99, 20));
        book.cancel(4);

        assert_eq!(book.snapshot(usize::MAX), before);
        assert_invariants(&book);
    }

    #[test]
    fn test_fok_rejection_emits_no_fills() {
        let (mut book, rx) = test_book();
        book.place(limit_ask(1, 101, 5));
        drain(&rx);

        book.place(Order::limit_bid(2, 1, 1, 101, 10, TimeInForce::Fok));

        for event in drain(&rx) {
            match event {
                MarketEvent::Trade { taker_order_id, .. } => {
                    assert_ne!(taker_order_id, 2, "FOK taker must not trade")
                }
                MarketEvent::OrderExecuted { order_id, .. } => {
                    assert_ne!(order_id, 2, "FOK taker must not execute")
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_identical_flows_produce_identical_events() {
        let run = || {
            let (mut book, rx) = test_book();
            book.place(limit_ask(1, 101, 5));
            book.place(limit_ask(2, 102, 5));
            book.place(limit_bid(3, 102, 7));
            book.place(Order::market_ask(4, 1, 1, 2, TimeInForce::Ioc));
            book.cancel(2);
            book.cancel(99);
            drain(&rx)
        };

        assert_eq!(run(), run());
    }

    mod random_flows {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Step {
            Place {
                side: Side,
                market: bool,
                time_in_force: TimeInForce,
                price: Price,
                quantity: Quantity,
            },
            Cancel {
                target: usize,
            },
        }

        fn step_strategy() -> impl Strategy<Value = Step> {
            prop_oneof![
                8 => (
                    prop::bool::ANY,
                    prop::bool::ANY,
                    0..3u8,
                    95u64..106,
                    0u64..30,
                )
                    .prop_map(|(bid, market, tif, price, quantity)| Step::Place {
                        side: if bid { Side::Bid } else { Side::Ask },
                        market,
                        time_in_force: match tif {
                            0 => TimeInForce::Gtc,
                            1 => TimeInForce::Ioc,
                            _ => TimeInForce::Fok,
                        },
                        price,
                        quantity,
                    }),
                2 => (0..200usize).prop_map(|target| Step::Cancel { target }),
            ]
        }

        proptest! {
            /// Structural invariants hold after every command of a random
            /// flow, and every taker's fills sum to its final executed
            /// quantity.
            #[test]
            fn invariants_hold_under_random_flow(
                steps in prop::collection::vec(step_strategy(), 1..150)
            ) {
                let (mut book, rx) = test_book();

                for (i, step) in steps.iter().enumerate() {
                    let order_id = i as OrderId + 1;
                    match step {
                        Step::Place { side, market, time_in_force, price, quantity } => {
                            let order = match (*market, *side) {
                                (false, Side::Bid) => Order::limit_bid(
                                    order_id, 1, 1, *price, *quantity, *time_in_force,
                                ),
                                (false, Side::Ask) => Order::limit_ask(
                                    order_id, 1, 1, *price, *quantity, *time_in_force,
                                ),
                                (true, Side::Bid) => Order::market_bid(
                                    order_id, 1, 1, *quantity, *time_in_force,
                                ),
                                (true, Side::Ask) => Order::market_ask(
                                    order_id, 1, 1, *quantity, *time_in_force,
                                ),
                            };
                            let quantity = order.quantity;
                            book.place(order);

                            let events = drain(&rx);
                            let filled: Quantity = events
                                .iter()
                                .filter_map(|e| match e {
                                    MarketEvent::Trade {
                                        quantity,
                                        taker_order_id,
                                        ..
                                    } if *taker_order_id == order_id => Some(*quantity),
                                    _ => None,
                                })
                                .sum();
                            prop_assert!(filled <= quantity);

                            // The terminal event for the taker reports the
                            // same executed quantity as the sum of its fills.
                            let terminal = events.iter().rev().find_map(|e| match e {
                                MarketEvent::OrderAdded { order }
                                | MarketEvent::OrderDeleted { order, .. }
                                    if order.id == order_id =>
                                {
                                    Some(order.executed_quantity)
                                }
                                MarketEvent::OrderRejected { order_id: id, .. }
                                    if *id == order_id =>
                                {
                                    Some(0)
                                }
                                _ => None,
                            });
                            prop_assert_eq!(terminal, Some(filled));
                        }
                        Step::Cancel { target } => {
                            book.cancel(*target as OrderId);
                            drain(&rx);
                        }
                    }
                    assert_invariants(&book);
                }
            }
        }
    }
}
