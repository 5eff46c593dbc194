//! Common types used across TickMatch
//!
//! This module provides the fundamental domain types used throughout
//! the matching core. Prices and quantities are unsigned integer ticks;
//! any decimal representation is a consumer-side concern.

use serde::{Deserialize, Serialize};

/// Unique identifier for orders. Uniqueness is required per book; callers
/// may reuse ids across books.
pub type OrderId = u64;

/// Identifier for the user that submitted an order.
pub type UserId = u64;

/// Identifier for a tradable symbol.
pub type SymbolId = u32;

/// Price in integer ticks. Price 0 is reserved for market orders.
pub type Price = u64;

/// Quantity in integer units.
pub type Quantity = u64;

/// Order side (bid or ask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side
    Bid,
    /// Sell side
    Ask,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// Returns true if this is the bid side
    pub fn is_bid(&self) -> bool {
        matches!(self, Side::Bid)
    }

    /// Returns true if this is the ask side
    pub fn is_ask(&self) -> bool {
        matches!(self, Side::Ask)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Limit order - execute at the specified price or better
    Limit,
    /// Market order - execute immediately at the best available prices
    Market,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Limit => write!(f, "limit"),
            OrderType::Market => write!(f, "market"),
        }
    }
}

/// Time in force for orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good till cancelled - rests in the book until filled or cancelled
    #[serde(alias = "gtc")]
    #[default]
    Gtc,
    /// Immediate or cancel - fill what is immediately available, cancel the rest
    #[serde(alias = "ioc")]
    Ioc,
    /// Fill or kill - fill entirely and immediately, or reject entirely
    #[serde(alias = "fok")]
    Fok,
}

impl std::fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeInForce::Gtc => write!(f, "GTC"),
            TimeInForce::Ioc => write!(f, "IOC"),
            TimeInForce::Fok => write!(f, "FOK"),
        }
    }
}
