//! # Deterministic Limit Order Book & Matching Engine
//!
//! A single-symbol, in-process limit order book and matching engine
//! with strict price-time priority, written for deterministic
//! simulation and replay. The engine is strictly single-threaded: a
//! submit runs to quiescence (including any stop cascades it sets off)
//! before returning, and a book is a plain value type, so multiple
//! instances can coexist without any shared state.
//!
//! ## Key Features
//!
//! - **Order types**: limit, market, iceberg (peak-size display
//!   refresh with explicit time-priority loss), stop-market and
//!   stop-limit orders triggered on placement or by trade prints.
//!
//! - **Time-in-force**: GTC, IOC (residual cancelled after matching),
//!   FOK (all-or-nothing pre-check, no partial fills), DAY (rests like
//!   GTC; session expiry is an external concern).
//!
//! - **Account-aware fill routing**: every trade is attributed to the
//!   owning accounts, flagged maker/taker, charged maker/taker fees,
//!   and delivered to registered callbacks. Self-trade prevention
//!   rejects a candidate trade *before* the engine commits it, leaving
//!   both orders untouched.
//!
//! - **Stop-trigger cascades**: trade prints sweep the pending-stop
//!   collections (inclusive comparison on both sides); triggered stops
//!   convert to market or limit orders and match immediately, and the
//!   trades they print can trigger further stops.
//!
//! - **Crash-safe persistence**: an append-only event log (CSV),
//!   checksummed JSON snapshots, and checkpoints combining the two.
//!   Replaying an event log into a fresh book regenerates the
//!   identical fill sequence, so recovery never re-applies fills.
//!
//! - **Simulation collaborators**: a multi-account position manager,
//!   a seeded market-data generator that drives the book with
//!   synthetic flow, and latency/fill statistics.
//!
//! ## Example
//!
//! ```
//! use matchbook_rs::{Order, OrderBook, Side, TimeInForce};
//!
//! let mut book = OrderBook::new("DEMO");
//! book.submit(Order::limit(1, Side::Buy, 100.0, 100, TimeInForce::Gtc).unwrap());
//! book.submit(Order::limit(2, Side::Sell, 100.0, 100, TimeInForce::Gtc).unwrap());
//!
//! assert_eq!(book.fills().len(), 1);
//! assert_eq!(book.fills()[0].price, 100.0);
//! assert_eq!(book.fills()[0].quantity, 100);
//! ```
//!
//! ## Determinism
//!
//! Priority ties are broken by a monotonic insertion tick assigned by
//! the book, never by wall-clock time, and every mutation appends one
//! event to the log when logging is on. Feeding a saved log into a
//! [`ReplayEngine`] reproduces the original fill sequence and terminal
//! order states exactly; FILL rows in the log are advisory and only
//! used for validation.

pub mod engine;
pub mod prelude;
pub mod sim;
mod utils;

pub use engine::read_events;
pub use engine::{
    BookSnapshot, DepthSnapshot, EngineError, EnhancedFill, EventType, FeeSchedule, Fill,
    FillCallback, FillRouter, LiquidityFlag, Order, OrderBook, OrderEvent, OrderState, OrderType,
    PersistenceError, PriceLevel, ReplayEngine, SelfTradeCallback, Side, SnapshotPackage,
    TimeInForce, EVENT_CSV_HEADER, SNAPSHOT_SCHEMA_VERSION,
};
pub use utils::{current_time_millis, current_time_nanos};
