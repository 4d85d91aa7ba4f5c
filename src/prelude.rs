//! Prelude module that re-exports the commonly used types.
//!
//! Instead of importing each type individually, you can use:
//!
//! ```rust
//! use matchbook_rs::prelude::*;
//! ```

// Core book and matching types
pub use crate::engine::{EngineError, OrderBook};
pub use crate::engine::{Order, OrderState, OrderType, Side, TimeInForce};

// Fills, routing and fees
pub use crate::engine::{EnhancedFill, FeeSchedule, Fill, FillRouter, LiquidityFlag};

// Market-data views
pub use crate::engine::{DepthSnapshot, PriceLevel};

// Persistence and replay
pub use crate::engine::{
    read_events, BookSnapshot, EventType, OrderEvent, PersistenceError, ReplayEngine,
    SnapshotPackage,
};

// Simulation collaborators
pub use crate::sim::{
    Account, GeneratorConfig, LatencySummary, MarketDataGenerator, MatchSummary, Position,
    PositionManager,
};

// Utility functions
pub use crate::utils::{current_time_millis, current_time_nanos};
