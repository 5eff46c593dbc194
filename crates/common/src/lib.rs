//! Common types for TickMatch
//!
//! This crate provides the primitive domain types shared by every other
//! crate in the workspace.
//!
//! # Modules
//!
//! - [`types`] - Shared domain types (ids, Side, OrderType, TimeInForce)

pub mod types;

pub use types::*;
