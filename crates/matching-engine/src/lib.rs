//! Order Matching Core for TickMatch
//!
//! This crate implements the matching heart of the exchange: per-symbol
//! limit order books, the price-time priority matching algorithm, and the
//! sharded worker threads that process commands for those books.
//!
//! # Features
//!
//! - Price-time priority matching (FIFO within a price level)
//! - Limit and market orders with GTC, IOC, FOK time-in-force
//! - Strict fill-or-kill liquidity precheck (no partial FOK mutation)
//! - Ordered, typed event stream for every book mutation
//! - Symbol sharding across worker threads with per-symbol FIFO
//!
//! # Architecture
//!
//! Commands flow one way:
//!
//! ```text
//! Market::submit -> shard command queue -> MatchingEngine -> OrderBook
//!                                                              |
//!                                        event sink  <---------+
//! ```
//!
//! Each [`OrderBook`] is owned by exactly one shard worker, which drains its
//! command queue serially. Events produced while processing one command are
//! published before the next command is taken, so the event stream for a
//! symbol is causally ordered. Determinism follows: the same command
//! sequence against an empty book always yields the same event sequence.
//!
//! ## Core Components
//!
//! - [`order`] - Order value type and fill accounting
//! - [`level`] - FIFO queue of resting orders at one price
//! - [`book`] - Per-symbol order book and the matching algorithm
//! - [`engine`] - Shard worker that owns a set of books
//! - [`market`] - Router mapping symbols onto shards
//! - [`command`] / [`event`] - The inbound and outbound tagged unions

pub mod book;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod level;
pub mod market;
pub mod order;

pub use book::{BookSnapshot, LevelDepth, OrderBook};
pub use command::Command;
pub use config::{ConfigError, MarketConfig};
pub use engine::MatchingEngine;
pub use error::{MarketError, OrderError};
pub use event::{
    CancelRejectReason, DeleteReason, EventSender, MarketEvent, RejectReason,
};
pub use level::PriceLevel;
pub use market::Market;
pub use order::Order;
