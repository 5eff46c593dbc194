//! TickMatch demo binary
//!
//! Starts a market, consumes its event stream on a separate thread, and
//! feeds it commands: either a built-in demo flow or a JSON-lines script.
//! Each event is printed to stdout as one JSON object per line.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use common::{OrderType, Side, TimeInForce};
use matching_engine::{Command, Market, MarketConfig};
use observability::{init_logging, LogFormat};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "tickmatch")]
#[command(about = "TickMatch - a sharded price-time priority matching engine")]
#[command(version)]
struct Cli {
    /// Number of shard workers (overrides the config file)
    #[arg(long)]
    shards: Option<usize>,

    /// Path to a YAML market configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,

    /// JSON-lines command script to submit instead of the built-in demo
    #[arg(long)]
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging("tickmatch", cli.log_format)?;

    let mut config = match &cli.config {
        Some(path) => MarketConfig::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => MarketConfig::default(),
    };
    if let Some(shards) = cli.shards {
        config.shards = shards;
    }

    let (event_tx, event_rx) = messaging::channel();

    // The event consumer: one JSON line per event until every shard is gone.
    let consumer = thread::spawn(move || {
        while let Ok(event) = event_rx.recv() {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => error!(error = %e, "Failed to encode event"),
            }
        }
    });

    let market = Market::start(&config, event_tx)?;
    match &cli.script {
        Some(path) => submit_script(&market, path)?,
        None => run_demo(&market)?,
    }
    market.stop();

    consumer
        .join()
        .map_err(|_| anyhow!("event consumer panicked"))?;
    Ok(())
}

/// Submits each non-empty, non-comment line of `path` as a JSON command.
fn submit_script(market: &Market, path: &Path) -> Result<()> {
    let file =
        File::open(path).with_context(|| format!("opening script {}", path.display()))?;
    let mut submitted = 0usize;
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let command: Command = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid command on line {}", number + 1))?;
        market.submit(command)?;
        submitted += 1;
    }
    info!(submitted, "Script submitted");
    Ok(())
}

/// A short scripted session: two symbols, a crossing pair of orders, a
/// rejected fill-or-kill, a cancellation, and one command for a symbol
/// nobody added.
fn run_demo(market: &Market) -> Result<()> {
    market.add_symbol(1, "BTC-USD")?;
    market.add_symbol(2, "ETH-USD")?;

    market.submit(limit_order(1, 1, 1, Side::Ask, TimeInForce::Gtc, 200, 200))?;
    market.submit(limit_order(2, 2, 1, Side::Bid, TimeInForce::Gtc, 200, 120))?;
    market.submit(limit_order(3, 3, 1, Side::Bid, TimeInForce::Fok, 200, 500))?;
    market.submit(limit_order(4, 4, 2, Side::Bid, TimeInForce::Gtc, 95, 40))?;
    market.submit(Command::CancelOrder {
        symbol_id: 2,
        order_id: 4,
    })?;
    // Symbol 7 has no book: the engine answers with a rejection event.
    market.submit(limit_order(5, 5, 7, Side::Ask, TimeInForce::Gtc, 100, 10))?;
    Ok(())
}

fn limit_order(
    order_id: u64,
    user_id: u64,
    symbol_id: u32,
    side: Side,
    time_in_force: TimeInForce,
    price: u64,
    quantity: u64,
) -> Command {
    Command::PlaceOrder {
        order_id,
        user_id,
        symbol_id,
        side,
        order_type: OrderType::Limit,
        time_in_force,
        price,
        quantity,
    }
}
