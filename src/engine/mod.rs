//! Single-symbol limit order book, matching engine and surrounding
//! subsystems.

pub mod book;
/// Aggregated market-data views (price levels, depth snapshots).
pub mod depth;
pub mod error;
/// Event-log entries and their CSV wire form.
pub mod events;
/// Fee schedule applied by the fill router.
pub mod fees;
pub mod fill;
mod matching;
pub mod operations;
/// Order model: sides, types, TIF, states and factories.
pub mod order;
/// Persistence controller: event files, snapshots, checkpoints.
pub mod persistence;
/// Deterministic replay of saved event logs.
pub mod replay;
/// Account-aware fill routing with self-trade prevention and fees.
pub mod router;
/// Whole-book snapshot image with checksum validation.
pub mod snapshot;
mod stops;
#[cfg(test)]
mod tests;

pub use book::OrderBook;
pub use depth::{DepthSnapshot, PriceLevel};
pub use error::{EngineError, PersistenceError};
pub use events::{EventType, OrderEvent, EVENT_CSV_HEADER};
pub use fees::FeeSchedule;
pub use fill::{EnhancedFill, Fill, LiquidityFlag};
pub use order::{Order, OrderState, OrderType, Side, TimeInForce};
pub use persistence::read_events;
pub use replay::ReplayEngine;
pub use router::{FillCallback, FillRouter, SelfTradeCallback};
pub use snapshot::{BookSnapshot, SnapshotPackage, SNAPSHOT_SCHEMA_VERSION};
