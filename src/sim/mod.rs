//! Simulation collaborators around the core engine: accounts and
//! positions, the multi-account position manager, the seeded
//! market-data generator, and performance statistics.
//!
//! Nothing in this module mutates the engine from inside a callback;
//! fills flow outward from the router into these consumers.

/// Account state: cash, per-symbol positions, trade statistics.
pub mod account;
/// Seeded synthetic order flow driving a book.
pub mod market_data;
/// Latency and fill-tape statistics.
pub mod metrics;
/// Multi-account registry routing fills to both counterparties.
pub mod position_manager;

pub use account::{Account, Position};
pub use market_data::{GeneratorConfig, MarketDataGenerator, SnapshotCallback};
pub use metrics::{FillRateSummary, LatencySummary, MatchSummary};
pub use position_manager::PositionManager;
