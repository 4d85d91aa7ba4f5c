//! Order model: sides, types, time-in-force, lifecycle states and the
//! `Order` entity itself.
//!
//! Prices are IEEE-754 doubles. Market orders carry sentinel prices
//! (`+inf` for buys, `0.0` for sells) so the crossing predicate in the
//! matching engine stays total without special-casing order type.

use super::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Bid side.
    Buy,
    /// Ask side.
    Sell,
}

impl Side {
    /// Returns the opposite side.
    #[must_use]
    #[inline]
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// The pricing type of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Executes at the stated price or better; may rest in the book.
    Limit,
    /// Executes against whatever liquidity is available; never rests.
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::Market => write!(f, "MARKET"),
        }
    }
}

/// Time-in-force policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-til-cancelled: rests until filled or cancelled.
    Gtc,
    /// Immediate-or-cancel: any residual after matching is cancelled.
    Ioc,
    /// Fill-or-kill: fully fillable up front, or cancelled with no fills.
    Fok,
    /// Day order: rests like GTC; session expiry is an external concern.
    Day,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInForce::Gtc => write!(f, "GTC"),
            TimeInForce::Ioc => write!(f, "IOC"),
            TimeInForce::Fok => write!(f, "FOK"),
            TimeInForce::Day => write!(f, "DAY"),
        }
    }
}

/// Lifecycle state of an order.
///
/// `Filled`, `Cancelled` and `Rejected` are terminal: once entered, no
/// further transition occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    /// Stop order parked in the pending-stop collection, not yet triggered.
    Pending,
    /// Live in the book (or mid-matching), nothing executed yet.
    Active,
    /// Some quantity executed, remainder still live.
    PartiallyFilled,
    /// Fully executed.
    Filled,
    /// Cancelled by the caller, by TIF policy, or by a FOK pre-check.
    Cancelled,
    /// Rejected at validation time; never entered the book.
    Rejected,
}

impl OrderState {
    /// Returns `true` for terminal states (no further transitions).
    #[must_use]
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Cancelled | OrderState::Rejected
        )
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderState::Pending => write!(f, "PENDING"),
            OrderState::Active => write!(f, "ACTIVE"),
            OrderState::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            OrderState::Filled => write!(f, "FILLED"),
            OrderState::Cancelled => write!(f, "CANCELLED"),
            OrderState::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// A single order.
///
/// The authoritative mutable copy lives in the book's by-id registry;
/// priority-queue entries reference it by id and may go stale (lazy
/// deletion). `timestamp` is a monotonic insertion tick assigned by the
/// book at submit time and reset on iceberg display refresh, which is
/// how an iceberg explicitly loses time priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier within the book's lifetime.
    pub id: u64,
    /// Owning account; `0` is permitted as "anonymous".
    pub account_id: u64,
    /// Buy or sell.
    pub side: Side,
    /// Limit or market. For stop orders this is the post-trigger type.
    pub order_type: OrderType,
    /// Time-in-force policy. Market orders coerce GTC to IOC on
    /// construction.
    pub tif: TimeInForce,
    /// Limit price; sentinel for market orders (`+inf` buy, `0.0` sell).
    /// For stop-limit orders this is the post-trigger limit price.
    pub price: f64,
    /// Original quantity, immutable after construction.
    pub quantity: u64,
    /// Unfilled quantity (visible + hidden for icebergs).
    pub remaining_qty: u64,
    /// Currently visible quantity.
    pub display_qty: u64,
    /// Hidden reserve quantity (icebergs only).
    pub hidden_qty: u64,
    /// Reveal chunk for iceberg refresh; `0` marks a non-iceberg order.
    pub peak_size: u64,
    /// Whether this order was submitted as a stop order.
    pub is_stop: bool,
    /// Whether the stop has fired. Stop orders never sit in the priced
    /// books while this is `false`.
    pub stop_triggered: bool,
    /// Trigger price for stop orders.
    pub stop_price: f64,
    /// What the stop converts to when it fires.
    pub stop_becomes: OrderType,
    /// Monotonic insertion tick; assigned by the book.
    pub timestamp: u64,
    /// Lifecycle state.
    pub state: OrderState,
}

impl Order {
    fn base(id: u64, side: Side, order_type: OrderType, tif: TimeInForce, qty: u64) -> Self {
        Self {
            id,
            account_id: 0,
            side,
            order_type,
            tif,
            price: 0.0,
            quantity: qty,
            remaining_qty: qty,
            display_qty: qty,
            hidden_qty: 0,
            peak_size: 0,
            is_stop: false,
            stop_triggered: false,
            stop_price: 0.0,
            stop_becomes: OrderType::Market,
            timestamp: 0,
            state: OrderState::Active,
        }
    }

    /// Creates a limit order.
    ///
    /// # Errors
    /// `InvalidQuantity` when `qty == 0`; `InvalidPrice` when the price
    /// is non-positive or not finite.
    pub fn limit(
        id: u64,
        side: Side,
        price: f64,
        qty: u64,
        tif: TimeInForce,
    ) -> Result<Self, EngineError> {
        if qty == 0 {
            return Err(EngineError::InvalidQuantity { quantity: qty });
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(EngineError::InvalidPrice { price });
        }
        let mut order = Self::base(id, side, OrderType::Limit, tif, qty);
        order.price = price;
        Ok(order)
    }

    /// Creates a market order.
    ///
    /// Callers cannot supply a price: the sentinel (`+inf` for buys,
    /// `0.0` for sells) is set internally so the crossing predicate
    /// stays total. A GTC time-in-force is coerced to IOC.
    ///
    /// # Errors
    /// `InvalidQuantity` when `qty == 0`.
    pub fn market(id: u64, side: Side, qty: u64, tif: TimeInForce) -> Result<Self, EngineError> {
        if qty == 0 {
            return Err(EngineError::InvalidQuantity { quantity: qty });
        }
        let tif = match tif {
            TimeInForce::Gtc => TimeInForce::Ioc,
            other => other,
        };
        let mut order = Self::base(id, side, OrderType::Market, tif, qty);
        order.price = Self::market_sentinel_price(side);
        Ok(order)
    }

    /// Creates an iceberg order revealing `peak_size` at a time.
    ///
    /// A `peak_size >= qty` degrades the order to a plain limit order of
    /// the same quantity.
    ///
    /// # Errors
    /// `InvalidQuantity` when `qty == 0`; `InvalidPeakSize` when
    /// `peak_size == 0`; `InvalidPrice` as for [`Order::limit`].
    pub fn iceberg(
        id: u64,
        side: Side,
        price: f64,
        qty: u64,
        peak_size: u64,
        tif: TimeInForce,
    ) -> Result<Self, EngineError> {
        if peak_size == 0 {
            return Err(EngineError::InvalidPeakSize {
                peak_size,
                quantity: qty,
            });
        }
        let mut order = Self::limit(id, side, price, qty, tif)?;
        if peak_size >= qty {
            // Degrades to a non-iceberg of the same quantity.
            return Ok(order);
        }
        order.peak_size = peak_size;
        order.display_qty = peak_size;
        order.hidden_qty = qty - peak_size;
        Ok(order)
    }

    /// Creates a stop-market order: parked until the trigger price is
    /// touched, then converted to a market order.
    ///
    /// # Errors
    /// `InvalidQuantity` when `qty == 0`; `InvalidStopPrice` when the
    /// trigger price is non-positive or not finite.
    pub fn stop_market(id: u64, side: Side, stop_price: f64, qty: u64) -> Result<Self, EngineError> {
        if qty == 0 {
            return Err(EngineError::InvalidQuantity { quantity: qty });
        }
        if !stop_price.is_finite() || stop_price <= 0.0 {
            return Err(EngineError::InvalidStopPrice { stop_price });
        }
        let mut order = Self::base(id, side, OrderType::Market, TimeInForce::Ioc, qty);
        order.is_stop = true;
        order.stop_price = stop_price;
        order.stop_becomes = OrderType::Market;
        order.state = OrderState::Pending;
        Ok(order)
    }

    /// Creates a stop-limit order: parked until the trigger price is
    /// touched, then converted to a limit order at `limit_price`.
    ///
    /// # Errors
    /// As for [`Order::stop_market`], plus `InvalidPrice` when the
    /// post-trigger limit price is invalid.
    pub fn stop_limit(
        id: u64,
        side: Side,
        stop_price: f64,
        limit_price: f64,
        qty: u64,
    ) -> Result<Self, EngineError> {
        if !stop_price.is_finite() || stop_price <= 0.0 {
            return Err(EngineError::InvalidStopPrice { stop_price });
        }
        let mut order = Self::limit(id, side, limit_price, qty, TimeInForce::Gtc)?;
        order.is_stop = true;
        order.stop_price = stop_price;
        order.stop_becomes = OrderType::Limit;
        order.state = OrderState::Pending;
        Ok(order)
    }

    /// Attaches an owning account for fill attribution and self-trade
    /// prevention.
    #[must_use]
    pub fn for_account(mut self, account_id: u64) -> Self {
        self.account_id = account_id;
        self
    }

    /// Sentinel price making the crossing predicate total for market
    /// orders.
    #[must_use]
    #[inline]
    pub(crate) fn market_sentinel_price(side: Side) -> f64 {
        match side {
            Side::Buy => f64::INFINITY,
            Side::Sell => 0.0,
        }
    }

    /// Whether the order is fully executed.
    #[must_use]
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.remaining_qty == 0
    }

    /// Whether the order is live (active or partially filled).
    #[must_use]
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self.state, OrderState::Active | OrderState::PartiallyFilled)
    }

    /// Whether the order executes at market.
    #[must_use]
    #[inline]
    pub fn is_market_order(&self) -> bool {
        self.order_type == OrderType::Market
    }

    /// Whether the order carries a hidden reserve.
    #[must_use]
    #[inline]
    pub fn is_iceberg(&self) -> bool {
        self.peak_size > 0
    }

    /// Whether the order is a stop still waiting for its trigger.
    #[must_use]
    #[inline]
    pub fn is_pending_stop(&self) -> bool {
        self.is_stop && !self.stop_triggered
    }

    /// Whether a residual may rest in the book after matching.
    #[must_use]
    #[inline]
    pub fn can_rest_in_book(&self) -> bool {
        matches!(self.tif, TimeInForce::Gtc | TimeInForce::Day) && !self.is_market_order()
    }

    /// Whether the visible quantity is exhausted while hidden reserve
    /// remains, i.e. an iceberg reveal is due.
    #[must_use]
    #[inline]
    pub fn needs_refresh(&self) -> bool {
        self.display_qty == 0 && self.hidden_qty > 0
    }

    /// Reveals the next iceberg chunk and resets the insertion tick.
    ///
    /// The new tick means the refreshed order re-enters the book at the
    /// back of its price level: an iceberg explicitly loses time
    /// priority on every reveal.
    pub fn refresh_display(&mut self, new_timestamp: u64) {
        let reveal = self.peak_size.min(self.hidden_qty);
        self.display_qty = reveal;
        self.hidden_qty -= reveal;
        self.timestamp = new_timestamp;
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} {}",
            self.id, self.side, self.order_type, self.tif
        )?;
        if !self.is_market_order() {
            write!(f, " @{:.2}", self.price)?;
        }
        write!(f, " qty={}/{}", self.remaining_qty, self.quantity)?;
        if self.is_iceberg() {
            write!(
                f,
                " (display={} hidden={} peak={})",
                self.display_qty, self.hidden_qty, self.peak_size
            )?;
        }
        if self.is_stop {
            write!(
                f,
                " stop@{:.2}->{}{}",
                self.stop_price,
                self.stop_becomes,
                if self.stop_triggered { " (triggered)" } else { "" }
            )?;
        }
        write!(f, " [{}]", self.state)
    }
}
