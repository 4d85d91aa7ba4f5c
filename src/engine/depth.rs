//! Aggregated market-data views of the book: price levels and the
//! read-only depth snapshot handed to external consumers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One price level: total resting quantity and order count at a price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// The level's price.
    pub price: f64,
    /// Sum of remaining quantity across orders at this price.
    pub total_quantity: u64,
    /// Number of orders at this price.
    pub num_orders: usize,
}

impl fmt::Display for PriceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} x {} ({} order{})",
            self.price,
            self.total_quantity,
            self.num_orders,
            if self.num_orders == 1 { "" } else { "s" }
        )
    }
}

/// An immutable snapshot of aggregated book depth at a point in time.
///
/// Levels are sorted best-first on both sides. Because the engine is
/// single-threaded, a snapshot taken between operations is always
/// internally consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthSnapshot {
    /// The book's symbol.
    pub symbol: String,
    /// Wall-clock nanoseconds since the Unix epoch at capture time.
    pub timestamp_ns: i64,
    /// Bid levels, highest price first.
    pub bids: Vec<PriceLevel>,
    /// Ask levels, lowest price first.
    pub asks: Vec<PriceLevel>,
}

impl DepthSnapshot {
    /// Best bid level, if any.
    #[must_use]
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Best ask level, if any.
    #[must_use]
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Best ask minus best bid.
    #[must_use]
    pub fn spread(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Average of best bid and best ask.
    #[must_use]
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / 2.0),
            _ => None,
        }
    }

    /// Total visible quantity on the bid side.
    #[must_use]
    pub fn total_bid_volume(&self) -> u64 {
        self.bids.iter().map(|l| l.total_quantity).sum()
    }

    /// Total visible quantity on the ask side.
    #[must_use]
    pub fn total_ask_volume(&self) -> u64 {
        self.asks.iter().map(|l| l.total_quantity).sum()
    }
}

impl fmt::Display for DepthSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} depth ===", self.symbol)?;
        for level in self.asks.iter().rev() {
            writeln!(f, "  ask {level}")?;
        }
        match self.spread() {
            Some(spread) => writeln!(f, "  ---- spread {spread:.4} ----")?,
            None => writeln!(f, "  ---- (one-sided or empty) ----")?,
        }
        for level in &self.bids {
            writeln!(f, "  bid {level}")?;
        }
        Ok(())
    }
}
