//! Observability infrastructure for TickMatch
//!
//! This crate provides structured logging via tracing.
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("tickmatch", LogFormat::Pretty)?;
//! tracing::info!("Service started");
//! ```

pub mod logging;

pub use logging::{init_logging, LogFormat};
