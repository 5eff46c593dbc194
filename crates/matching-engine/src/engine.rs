//! Shard worker: owns a set of order books and drains one command queue
//!
//! Exactly one command is processed at a time per shard, so no locking is
//! needed around book state; each book is reached only from its owning
//! worker. Events produced while processing a command are published before
//! the next command is taken.

use common::{OrderId, OrderType, Price, Quantity, Side, SymbolId, TimeInForce, UserId};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::book::OrderBook;
use crate::command::Command;
use crate::event::{CancelRejectReason, EventSender, MarketEvent, RejectReason};
use crate::order::Order;

/// A matching worker for one shard of the symbol space.
///
/// Consumes commands from its queue and dispatches them to the owned book
/// for the addressed symbol. Runs until it receives [`Command::Shutdown`]
/// or every sender of its queue is gone.
pub struct MatchingEngine {
    books: HashMap<SymbolId, OrderBook>,
    commands: messaging::Receiver<Command>,
    events: EventSender,
}

impl MatchingEngine {
    /// Creates a worker reading from `commands` and publishing into `events`.
    pub fn new(commands: messaging::Receiver<Command>, events: EventSender) -> Self {
        Self {
            books: HashMap::new(),
            commands,
            events,
        }
    }

    /// Blocks on the command queue until shutdown.
    pub fn run(mut self) {
        info!("Matching worker started");
        while let Ok(command) = self.commands.recv() {
            if !self.dispatch(command) {
                break;
            }
        }
        info!("Matching worker stopped");
    }

    /// Processes a single command. Returns `false` once the worker should
    /// exit.
    pub fn dispatch(&mut self, command: Command) -> bool {
        match command {
            Command::AddOrderBook { symbol_id, name } => {
                self.add_order_book(symbol_id, name);
                true
            }
            Command::PlaceOrder {
                order_id,
                user_id,
                symbol_id,
                side,
                order_type,
                time_in_force,
                price,
                quantity,
            } => {
                self.place_order(
                    order_id,
                    user_id,
                    symbol_id,
                    side,
                    order_type,
                    time_in_force,
                    price,
                    quantity,
                );
                true
            }
            Command::CancelOrder {
                symbol_id,
                order_id,
            } => {
                self.cancel_order(symbol_id, order_id);
                true
            }
            Command::Shutdown => {
                debug!("Shutdown received");
                false
            }
        }
    }

    /// Number of books this worker owns.
    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    /// The book for a symbol, if one has been added.
    pub fn book(&self, symbol_id: SymbolId) -> Option<&OrderBook> {
        self.books.get(&symbol_id)
    }

    fn add_order_book(&mut self, symbol_id: SymbolId, name: String) {
        if self.books.contains_key(&symbol_id) {
            // Adding an existing symbol is a silent no-op.
            debug!(symbol_id, "Order book already exists");
            return;
        }

        info!(symbol_id, symbol = %name, "Order book added");
        self.books.insert(
            symbol_id,
            OrderBook::new(symbol_id, name.clone(), self.events.clone()),
        );
        let _ = self
            .events
            .send(MarketEvent::SymbolAdded { symbol_id, name });
    }

    #[allow(clippy::too_many_arguments)]
    fn place_order(
        &mut self,
        order_id: OrderId,
        user_id: UserId,
        symbol_id: SymbolId,
        side: Side,
        order_type: OrderType,
        time_in_force: TimeInForce,
        price: Price,
        quantity: Quantity,
    ) {
        let Some(book) = self.books.get_mut(&symbol_id) else {
            debug!(symbol_id, order_id, "Order rejected: unknown symbol");
            let _ = self.events.send(MarketEvent::OrderRejected {
                symbol_id,
                order_id,
                reason: RejectReason::SymbolUnknown,
            });
            return;
        };

        // Market orders always carry price 0 internally, whatever the
        // command said.
        let order = match (order_type, side) {
            (OrderType::Limit, Side::Bid) => {
                Order::limit_bid(order_id, user_id, symbol_id, price, quantity, time_in_force)
            }
            (OrderType::Limit, Side::Ask) => {
                Order::limit_ask(order_id, user_id, symbol_id, price, quantity, time_in_force)
            }
            (OrderType::Market, Side::Bid) => {
                Order::market_bid(order_id, user_id, symbol_id, quantity, time_in_force)
            }
            (OrderType::Market, Side::Ask) => {
                Order::market_ask(order_id, user_id, symbol_id, quantity, time_in_force)
            }
        };
        book.place(order);
    }

    fn cancel_order(&mut self, symbol_id: SymbolId, order_id: OrderId) {
        let Some(book) = self.books.get_mut(&symbol_id) else {
            debug!(symbol_id, order_id, "Cancel rejected: unknown symbol");
            let _ = self.events.send(MarketEvent::CancelRejected {
                symbol_id,
                order_id,
                reason: CancelRejectReason::SymbolUnknown,
            });
            return;
        };
        book.cancel(order_id);
    }
}
