//! Order value type and fill accounting
//!
//! An [`Order`] is an immutable identity (who, what, which side, at what
//! price) plus mutable fill state. The book never stores an order whose
//! open quantity is zero.

use common::{OrderId, OrderType, Price, Quantity, Side, SymbolId, TimeInForce, UserId};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// A single order as seen by the matching core.
///
/// Market orders carry price 0 internally and are matched without a price
/// barrier; price 0 is therefore invalid for limit orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order ID, unique among resting orders of one book
    pub id: OrderId,
    /// User who placed the order
    pub user_id: UserId,
    /// Symbol being traded
    pub symbol_id: SymbolId,
    /// Bid or ask
    pub side: Side,
    /// Limit or market
    pub order_type: OrderType,
    /// Time-in-force
    pub time_in_force: TimeInForce,
    /// Limit price in ticks; 0 for market orders
    pub price: Price,
    /// Original size
    pub quantity: Quantity,
    /// Total quantity executed so far; never exceeds `quantity`
    pub executed_quantity: Quantity,
    /// Price of the most recent fill (0 before the first fill)
    pub last_executed_price: Price,
    /// Quantity of the most recent fill (0 before the first fill)
    pub last_executed_quantity: Quantity,
}

impl Order {
    fn new(
        id: OrderId,
        user_id: UserId,
        symbol_id: SymbolId,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
        time_in_force: TimeInForce,
    ) -> Self {
        Self {
            id,
            user_id,
            symbol_id,
            side,
            order_type,
            time_in_force,
            price,
            quantity,
            executed_quantity: 0,
            last_executed_price: 0,
            last_executed_quantity: 0,
        }
    }

    /// Create a limit bid
    pub fn limit_bid(
        id: OrderId,
        user_id: UserId,
        symbol_id: SymbolId,
        price: Price,
        quantity: Quantity,
        time_in_force: TimeInForce,
    ) -> Self {
        Self::new(
            id,
            user_id,
            symbol_id,
            Side::Bid,
            OrderType::Limit,
            price,
            quantity,
            time_in_force,
        )
    }

    /// Create a limit ask
    pub fn limit_ask(
        id: OrderId,
        user_id: UserId,
        symbol_id: SymbolId,
        price: Price,
        quantity: Quantity,
        time_in_force: TimeInForce,
    ) -> Self {
        Self::new(
            id,
            user_id,
            symbol_id,
            Side::Ask,
            OrderType::Limit,
            price,
            quantity,
            time_in_force,
        )
    }

    /// Create a market bid (price 0, matched without a price barrier)
    pub fn market_bid(
        id: OrderId,
        user_id: UserId,
        symbol_id: SymbolId,
        quantity: Quantity,
        time_in_force: TimeInForce,
    ) -> Self {
        Self::new(
            id,
            user_id,
            symbol_id,
            Side::Bid,
            OrderType::Market,
            0,
            quantity,
            time_in_force,
        )
    }

    /// Create a market ask (price 0, matched without a price barrier)
    pub fn market_ask(
        id: OrderId,
        user_id: UserId,
        symbol_id: SymbolId,
        quantity: Quantity,
        time_in_force: TimeInForce,
    ) -> Self {
        Self::new(
            id,
            user_id,
            symbol_id,
            Side::Ask,
            OrderType::Market,
            0,
            quantity,
            time_in_force,
        )
    }

    /// Quantity still open for execution
    pub fn open_quantity(&self) -> Quantity {
        self.quantity - self.executed_quantity
    }

    /// True once the order has no open quantity left
    pub fn is_filled(&self) -> bool {
        self.open_quantity() == 0
    }

    /// True if this is a limit order
    pub fn is_limit(&self) -> bool {
        self.order_type == OrderType::Limit
    }

    /// True if this is a market order
    pub fn is_market(&self) -> bool {
        self.order_type == OrderType::Market
    }

    /// True if this order is on the bid side
    pub fn is_bid(&self) -> bool {
        self.side.is_bid()
    }

    /// True if this order is on the ask side
    pub fn is_ask(&self) -> bool {
        self.side.is_ask()
    }

    /// True for good-till-cancelled orders
    pub fn is_gtc(&self) -> bool {
        self.time_in_force == TimeInForce::Gtc
    }

    /// True for immediate-or-cancel orders
    pub fn is_ioc(&self) -> bool {
        self.time_in_force == TimeInForce::Ioc
    }

    /// True for fill-or-kill orders
    pub fn is_fok(&self) -> bool {
        self.time_in_force == TimeInForce::Fok
    }

    /// Records a fill of `quantity` at `price`.
    ///
    /// Fails with [`OrderError::InvalidFill`] when the fill exceeds the
    /// open quantity; the order is left untouched in that case.
    pub fn execute(&mut self, quantity: Quantity, price: Price) -> Result<(), OrderError> {
        let open = self.open_quantity();
        if quantity > open {
            return Err(OrderError::InvalidFill {
                order_id: self.id,
                quantity,
                open,
            });
        }
        self.executed_quantity += quantity;
        self.last_executed_price = price;
        self.last_executed_quantity = quantity;
        Ok(())
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} #{} {}@{} ({} executed)",
            self.time_in_force,
            self.order_type,
            self.side,
            self.id,
            self.quantity,
            self.price,
            self.executed_quantity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_bid_constructor() {
        let order = Order::limit_bid(1, 10, 7, 100, 50, TimeInForce::Gtc);

        assert_eq!(order.id, 1);
        assert_eq!(order.user_id, 10);
        assert_eq!(order.symbol_id, 7);
        assert_eq!(order.price, 100);
        assert_eq!(order.quantity, 50);
        assert_eq!(order.executed_quantity, 0);
        assert_eq!(order.last_executed_price, 0);
        assert_eq!(order.last_executed_quantity, 0);
        assert_eq!(order.open_quantity(), 50);
        assert!(order.is_limit());
        assert!(order.is_bid());
        assert!(order.is_gtc());
        assert!(!order.is_filled());
    }

    #[test]
    fn test_market_orders_carry_price_zero() {
        let bid = Order::market_bid(2, 10, 7, 5, TimeInForce::Ioc);
        let ask = Order::market_ask(3, 10, 7, 5, TimeInForce::Fok);

        assert!(bid.is_market() && bid.is_bid() && bid.is_ioc());
        assert!(ask.is_market() && ask.is_ask() && ask.is_fok());
        assert_eq!(bid.price, 0);
        assert_eq!(ask.price, 0);
    }

    #[test]
    fn test_execute_updates_fill_state() {
        let mut order = Order::limit_ask(4, 10, 7, 105, 20, TimeInForce::Gtc);

        order.execute(8, 105).unwrap();
        assert_eq!(order.executed_quantity, 8);
        assert_eq!(order.open_quantity(), 12);
        assert_eq!(order.last_executed_price, 105);
        assert_eq!(order.last_executed_quantity, 8);

        order.execute(12, 104).unwrap();
        assert_eq!(order.open_quantity(), 0);
        assert_eq!(order.last_executed_price, 104);
        assert_eq!(order.last_executed_quantity, 12);
        assert!(order.is_filled());
    }

    #[test]
    fn test_execute_rejects_overfill() {
        let mut order = Order::limit_bid(5, 10, 7, 100, 10, TimeInForce::Gtc);
        order.execute(6, 100).unwrap();

        let err = order.execute(5, 100).unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidFill {
                order_id: 5,
                quantity: 5,
                open: 4,
            }
        );
        // Fill state untouched after the failed execute.
        assert_eq!(order.executed_quantity, 6);
        assert_eq!(order.last_executed_quantity, 6);
    }
}
