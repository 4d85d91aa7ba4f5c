//! Trade execution records: the base fill emitted by the matching loop
//! and the account-attributed fill produced by the router.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single trade print between two orders.
///
/// The price is always the resting order's price (passive-price rule).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Id of the buying order.
    pub buy_order_id: u64,
    /// Id of the selling order.
    pub sell_order_id: u64,
    /// Execution price.
    pub price: f64,
    /// Executed quantity.
    pub quantity: u64,
    /// Wall-clock nanoseconds since the Unix epoch.
    pub timestamp_ns: i64,
}

impl Fill {
    /// Creates a fill record.
    #[must_use]
    pub fn new(buy_order_id: u64, sell_order_id: u64, price: f64, quantity: u64, timestamp_ns: i64) -> Self {
        Self {
            buy_order_id,
            sell_order_id,
            price,
            quantity,
            timestamp_ns,
        }
    }

    /// Notional value of the trade (`price * quantity`).
    #[must_use]
    #[inline]
    pub fn notional(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

impl fmt::Display for Fill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FILL buy=#{} sell=#{} {} @ {:.2}",
            self.buy_order_id, self.sell_order_id, self.quantity, self.price
        )
    }
}

/// Liquidity role of a routed fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidityFlag {
    /// The aggressor only provided liquidity: the passive side was a
    /// market order, as routed by synthetic feeds with the roles
    /// inverted.
    Maker,
    /// The aggressor removed liquidity (market order or crossing limit).
    Taker,
    /// Symmetric print where neither side crossed; used by synthetic
    /// feeds routing fills directly.
    MakerMaker,
}

impl fmt::Display for LiquidityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiquidityFlag::Maker => write!(f, "MAKER"),
            LiquidityFlag::Taker => write!(f, "TAKER"),
            LiquidityFlag::MakerMaker => write!(f, "MAKER_MAKER"),
        }
    }
}

/// A fill enriched by the router with account attribution, liquidity
/// role and fees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedFill {
    /// Monotonic identifier assigned by the router.
    pub fill_id: u64,
    /// The underlying trade print.
    pub base_fill: Fill,
    /// Account owning the buying order.
    pub buy_account_id: u64,
    /// Account owning the selling order.
    pub sell_account_id: u64,
    /// Symbol label the book was configured with.
    pub symbol: String,
    /// Whether the aggressor was the buying side.
    pub is_aggressive_buy: bool,
    /// Liquidity role of the aggressor.
    pub liquidity_flag: LiquidityFlag,
    /// Fee charged to the buyer on this fill.
    pub buyer_fee: f64,
    /// Fee charged to the seller on this fill.
    pub seller_fee: f64,
}

impl fmt::Display for EnhancedFill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} accounts {}/{} ({})",
            self.fill_id,
            self.symbol,
            self.base_fill,
            self.buy_account_id,
            self.sell_account_id,
            self.liquidity_flag
        )
    }
}
