//! Matching core error types
//!
//! Most failure modes in the matching path are business outcomes, not
//! errors: they are delivered to consumers as [`crate::event::MarketEvent`]
//! variants. The types here cover the remainder - internal fill-accounting
//! misuse and the market/router lifecycle.

use common::{OrderId, Quantity};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by order fill accounting
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderError {
    /// A fill was requested for more than the order has open
    #[error("fill of {quantity} exceeds open quantity {open} on order {order_id}")]
    InvalidFill {
        /// Order the fill was applied to
        order_id: OrderId,
        /// Requested fill quantity
        quantity: Quantity,
        /// Open quantity at the time of the fill
        open: Quantity,
    },
}

/// Errors raised by the market router
#[derive(Error, Debug)]
pub enum MarketError {
    /// The market configuration was invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A worker thread could not be spawned
    #[error("failed to spawn matching worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// The command queue for a shard is closed (its worker has exited)
    #[error("command queue for shard {shard} is closed")]
    ShardClosed {
        /// Index of the shard whose queue rejected the command
        shard: usize,
    },
}
