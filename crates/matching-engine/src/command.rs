//! Command types consumed by the matching core
//!
//! Commands arrive through each shard's queue and are matched exhaustively
//! by the worker loop; there is no dynamic dispatch over message types.

use common::{OrderId, OrderType, Price, Quantity, Side, SymbolId, TimeInForce, UserId};
use serde::{Deserialize, Serialize};

/// Command in the matching core's inbound stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Create a book for a symbol. Idempotent: adding an existing symbol is
    /// a silent no-op.
    AddOrderBook {
        /// Symbol to create a book for
        symbol_id: SymbolId,
        /// Display name of the symbol
        name: String,
    },

    /// Place an order against a symbol's book
    PlaceOrder {
        /// Order id, unique among resting orders of the book
        order_id: OrderId,
        /// User placing the order
        user_id: UserId,
        /// Symbol to trade
        symbol_id: SymbolId,
        /// Bid or ask
        side: Side,
        /// Limit or market
        order_type: OrderType,
        /// Time-in-force
        time_in_force: TimeInForce,
        /// Limit price in ticks; ignored for market orders
        #[serde(default)]
        price: Price,
        /// Order size
        quantity: Quantity,
    },

    /// Cancel a resting order
    CancelOrder {
        /// Symbol whose book holds the order
        symbol_id: SymbolId,
        /// Order to cancel
        order_id: OrderId,
    },

    /// Shutdown sentinel: the receiving worker finishes the commands ahead
    /// of this one in its queue and exits.
    Shutdown,
}

impl Command {
    /// The symbol this command addresses; `None` for [`Command::Shutdown`],
    /// which is not routed by symbol.
    pub fn symbol_id(&self) -> Option<SymbolId> {
        match self {
            Command::AddOrderBook { symbol_id, .. }
            | Command::PlaceOrder { symbol_id, .. }
            | Command::CancelOrder { symbol_id, .. } => Some(*symbol_id),
            Command::Shutdown => None,
        }
    }
}
