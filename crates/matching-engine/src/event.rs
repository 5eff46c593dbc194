//! Event types published by the matching core
//!
//! Every book mutation and every rejection is reported through exactly one
//! of these variants. Events for one command are published before any event
//! of the next command on the same shard, and all fields are plain integers
//! or copies of order state, so two runs over the same command sequence
//! produce comparably equal event streams.

use common::{OrderId, Price, Quantity, SymbolId};
use serde::{Deserialize, Serialize};

use crate::order::Order;

/// Sending half of the event stream, shared by every book in a shard.
pub type EventSender = messaging::Sender<MarketEvent>;

/// Why a place command was rejected without touching the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The order id is already resting in the book
    DuplicateId,
    /// The order quantity was zero
    ZeroQuantity,
    /// A limit order carried the reserved price 0
    InvalidPrice,
    /// No book exists for the symbol
    SymbolUnknown,
    /// A fill-or-kill order could not be filled in full
    FillOrKillUnfilled,
}

/// Why an order left the book (or never rested)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteReason {
    /// Fully executed
    Filled,
    /// Removed on user request
    Canceled,
    /// A market or IOC order matched nothing
    Unfilled,
    /// A market or IOC order matched only part of its quantity
    PartiallyUnfilled,
    /// Removed because the order was rejected downstream
    Rejected,
}

/// Why a cancel command was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelRejectReason {
    /// No resting order has this id
    NotFound,
    /// No book exists for the symbol
    SymbolUnknown,
}

/// Event in the matching core's outbound stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    /// A book was created for a symbol
    SymbolAdded {
        /// Symbol the book was created for
        symbol_id: SymbolId,
        /// Display name of the symbol
        name: String,
    },

    /// An order came to rest in the book
    OrderAdded {
        /// The resting order, including any partial fills it took on entry
        order: Order,
    },

    /// A resting order's open quantity changed without it leaving the book
    OrderUpdated {
        /// The resting order after the change
        order: Order,
    },

    /// An order (resting or incoming) was executed against
    OrderExecuted {
        /// Symbol the execution happened on
        symbol_id: SymbolId,
        /// Order that was executed
        order_id: OrderId,
        /// Execution price (always the maker's price)
        executed_price: Price,
        /// Quantity executed in this fill
        executed_quantity: Quantity,
        /// Open quantity remaining after the fill
        remaining_quantity: Quantity,
    },

    /// Two orders matched
    Trade {
        /// Symbol the trade happened on
        symbol_id: SymbolId,
        /// Execution price (the maker's price)
        price: Price,
        /// Executed quantity
        quantity: Quantity,
        /// The resting order that provided liquidity
        maker_order_id: OrderId,
        /// The incoming order that took liquidity
        taker_order_id: OrderId,
    },

    /// An order left the book, or an incoming order terminated unrested
    OrderDeleted {
        /// Final state of the order
        order: Order,
        /// Why the order was deleted
        reason: DeleteReason,
    },

    /// A place command was refused; the book is unchanged
    OrderRejected {
        /// Symbol the command addressed
        symbol_id: SymbolId,
        /// Order id of the refused command
        order_id: OrderId,
        /// Why the command was refused
        reason: RejectReason,
    },

    /// A cancel command was refused; the book is unchanged
    CancelRejected {
        /// Symbol the command addressed
        symbol_id: SymbolId,
        /// Order id the cancel addressed
        order_id: OrderId,
        /// Why the cancel was refused
        reason: CancelRejectReason,
    },
}
