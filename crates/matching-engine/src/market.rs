//! Market router: maps symbols onto shard workers
//!
//! The market owns one command queue and one worker thread per shard.
//! `shard_of(symbol_id) = symbol_id % shards`, so all commands for a symbol
//! land on the same queue and are processed in submission order. Commands
//! for different shards may interleave arbitrarily.

use common::SymbolId;
use std::thread::{self, JoinHandle};
use tracing::{error, info};

use crate::command::Command;
use crate::config::MarketConfig;
use crate::engine::MatchingEngine;
use crate::error::MarketError;
use crate::event::EventSender;

/// Entry point of the matching core: routes commands to shard workers.
pub struct Market {
    shards: Vec<messaging::Sender<Command>>,
    workers: Vec<JoinHandle<()>>,
}

impl Market {
    /// Spawns one worker thread per configured shard. Every worker
    /// publishes into the same `events` sender.
    pub fn start(config: &MarketConfig, events: EventSender) -> Result<Self, MarketError> {
        config.validate().map_err(MarketError::Config)?;

        let mut shards = Vec::with_capacity(config.shards);
        let mut workers = Vec::with_capacity(config.shards);
        for shard in 0..config.shards {
            let (command_tx, command_rx) = messaging::channel();
            let engine = MatchingEngine::new(command_rx, events.clone());
            let handle = thread::Builder::new()
                .name(format!("matching-shard-{shard}"))
                .spawn(move || engine.run())?;
            shards.push(command_tx);
            workers.push(handle);
        }

        info!(shards = config.shards, "Market started");
        Ok(Self { shards, workers })
    }

    /// Number of shards the symbol space is spread over.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// The shard that owns a symbol.
    pub fn shard_of(&self, symbol_id: SymbolId) -> usize {
        symbol_id as usize % self.shards.len()
    }

    /// Routes a command to the shard owning its symbol and enqueues it.
    /// [`Command::Shutdown`] is broadcast to every shard.
    pub fn submit(&self, command: Command) -> Result<(), MarketError> {
        match command.symbol_id() {
            Some(symbol_id) => {
                let shard = self.shard_of(symbol_id);
                self.shards[shard]
                    .send(command)
                    .map_err(|_| MarketError::ShardClosed { shard })
            }
            None => {
                for (shard, commands) in self.shards.iter().enumerate() {
                    commands
                        .send(Command::Shutdown)
                        .map_err(|_| MarketError::ShardClosed { shard })?;
                }
                Ok(())
            }
        }
    }

    /// Creates a book for `symbol_id` on its owning shard.
    pub fn add_symbol(&self, symbol_id: SymbolId, name: impl Into<String>) -> Result<(), MarketError> {
        self.submit(Command::AddOrderBook {
            symbol_id,
            name: name.into(),
        })
    }

    /// Shuts the market down: every shard receives the shutdown sentinel,
    /// finishes the commands already queued ahead of it, and exits. Blocks
    /// until all workers have terminated.
    pub fn stop(mut self) {
        info!("Market stopping");
        for commands in &self.shards {
            // A shard whose worker already exited has a closed queue; there
            // is nothing left to stop there.
            let _ = commands.send(Command::Shutdown);
        }
        self.shards.clear();

        for handle in self.workers.drain(..) {
            let name = handle
                .thread()
                .name()
                .unwrap_or("matching-shard")
                .to_string();
            if handle.join().is_err() {
                error!(worker = %name, "Matching worker panicked");
            }
        }
        info!("Market stopped");
    }
}
