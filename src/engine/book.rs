//! Core order book state: the two priority structures, the by-id
//! registries, the stop-order collections and the read-only queries.
//!
//! The priority heaps hold lightweight `(price, timestamp, id)` entries
//! rather than order values; the authoritative mutable order lives in
//! the `active_orders` registry. Heaps cannot efficiently remove a
//! mid-queue entry, so cancelled, filled and superseded entries are
//! tombstoned and skipped when popped (lazy deletion).

use super::depth::{DepthSnapshot, PriceLevel};
use super::events::OrderEvent;
use super::fill::Fill;
use super::order::{Order, OrderState, Side};
use super::router::FillRouter;
use crate::utils::current_time_nanos;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap, VecDeque};

/// Total order over raw `f64` prices, usable as an ordered-map key.
///
/// Prices entering the book are validated finite, so the `total_cmp`
/// ordering coincides with the numeric one.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PriceKey(pub f64);

impl PartialEq for PriceKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for PriceKey {}

impl PartialOrd for PriceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// A priority-queue entry referencing an order by id.
///
/// The entry's `timestamp` is the insertion tick the order carried when
/// the entry was pushed; if the authoritative order has since been
/// re-stamped (iceberg refresh, amend resubmit), the entry is a stale
/// tombstone and is discarded on pop.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BookEntry {
    pub price: f64,
    pub timestamp: u64,
    pub order_id: u64,
}

impl BookEntry {
    pub(crate) fn for_order(order: &Order) -> Self {
        Self {
            price: order.price,
            timestamp: order.timestamp,
            order_id: order.id,
        }
    }
}

/// Bid-side heap entry: highest price first, ties broken by earlier
/// timestamp.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BidEntry(pub BookEntry);

impl PartialEq for BidEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BidEntry {}

impl PartialOrd for BidEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BidEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .price
            .total_cmp(&other.0.price)
            .then_with(|| other.0.timestamp.cmp(&self.0.timestamp))
            .then_with(|| other.0.order_id.cmp(&self.0.order_id))
    }
}

/// Ask-side heap entry: lowest price first, ties broken by earlier
/// timestamp.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AskEntry(pub BookEntry);

impl PartialEq for AskEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AskEntry {}

impl PartialOrd for AskEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AskEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .price
            .total_cmp(&self.0.price)
            .then_with(|| other.0.timestamp.cmp(&self.0.timestamp))
            .then_with(|| other.0.order_id.cmp(&self.0.order_id))
    }
}

/// A single-symbol limit order book with price-time priority matching.
///
/// The book is a plain value type: all operations run on one logical
/// task, callbacks fire synchronously inside the operation that
/// produced them, and multiple instances can coexist without shared
/// state.
pub struct OrderBook {
    /// The symbol label attached to routed fills.
    pub(super) symbol: String,

    /// Bid-side priority structure (highest price, then earliest tick).
    pub(super) bids: BinaryHeap<BidEntry>,

    /// Ask-side priority structure (lowest price, then earliest tick).
    pub(super) asks: BinaryHeap<AskEntry>,

    /// Authoritative mutable order state, keyed by id. Filled orders
    /// stay here for querying; cancelled orders move to
    /// `cancelled_orders`.
    pub(super) active_orders: HashMap<u64, Order>,

    /// Last-known state of explicitly cancelled orders.
    pub(super) cancelled_orders: HashMap<u64, Order>,

    /// Chronological tape of trade prints.
    pub(super) fills: Vec<Fill>,

    /// Account attribution, self-trade prevention and fee routing.
    pub(super) router: FillRouter,

    /// Pending buy stops keyed by trigger price; trigger when a print
    /// is at or above the key. Ties preserve insertion order.
    pub(super) stop_buys: BTreeMap<PriceKey, VecDeque<u64>>,

    /// Pending sell stops keyed by trigger price; trigger when a print
    /// is at or below the key.
    pub(super) stop_sells: BTreeMap<PriceKey, VecDeque<u64>>,

    /// Price of the most recent trade, if any.
    pub(super) last_trade_price: Option<f64>,

    /// In-memory append-only event log.
    pub(super) event_log: Vec<OrderEvent>,

    /// Whether mutations append to the event log.
    pub(super) logging_enabled: bool,

    /// Monotonic insertion tick source; also re-stamped on iceberg
    /// refresh.
    pub(super) clock_tick: u64,

    /// Count of submits accepted by the engine.
    pub(super) total_orders_processed: u64,

    /// Wall-clock latency samples, one per submit, in nanoseconds.
    pub(super) insertion_latencies_ns: Vec<u64>,

    /// Sequence number for saved snapshots.
    pub(super) snapshot_counter: u64,
}

impl OrderBook {
    /// Creates an empty book for the given symbol.
    ///
    /// Logging starts disabled; self-trade prevention starts enabled;
    /// fees default to zero.
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            bids: BinaryHeap::new(),
            asks: BinaryHeap::new(),
            active_orders: HashMap::new(),
            cancelled_orders: HashMap::new(),
            fills: Vec::new(),
            router: FillRouter::new(true),
            stop_buys: BTreeMap::new(),
            stop_sells: BTreeMap::new(),
            last_trade_price: None,
            event_log: Vec::new(),
            logging_enabled: false,
            clock_tick: 0,
            total_orders_processed: 0,
            insertion_latencies_ns: Vec::new(),
            snapshot_counter: 0,
        }
    }

    /// Creates a book with event logging already enabled.
    #[must_use]
    pub fn with_logging(symbol: &str) -> Self {
        let mut book = Self::new(symbol);
        book.logging_enabled = true;
        book
    }

    /// The symbol this book trades.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Shared access to the fill router.
    #[must_use]
    pub fn router(&self) -> &FillRouter {
        &self.router
    }

    /// Mutable access to the fill router for configuration and
    /// callback registration.
    pub fn router_mut(&mut self) -> &mut FillRouter {
        &mut self.router
    }

    /// Start appending mutations to the event log.
    pub fn enable_logging(&mut self) {
        self.logging_enabled = true;
    }

    /// Stop appending mutations to the event log.
    pub fn disable_logging(&mut self) {
        self.logging_enabled = false;
    }

    /// Whether event logging is on.
    #[must_use]
    pub fn is_logging(&self) -> bool {
        self.logging_enabled
    }

    /// The in-memory event log, in append order.
    #[must_use]
    pub fn events(&self) -> &[OrderEvent] {
        &self.event_log
    }

    /// Number of events accumulated since the last checkpoint.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.event_log.len()
    }

    /// Drops all accumulated events.
    pub fn clear_events(&mut self) {
        self.event_log.clear();
    }

    /// The chronological fill tape.
    #[must_use]
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Price of the most recent trade, if any.
    #[must_use]
    pub fn last_trade_price(&self) -> Option<f64> {
        self.last_trade_price
    }

    /// Count of submits accepted by the engine.
    #[must_use]
    pub fn total_orders_processed(&self) -> u64 {
        self.total_orders_processed
    }

    /// Per-submit wall-clock latency samples in nanoseconds.
    #[must_use]
    pub fn insertion_latencies_ns(&self) -> &[u64] {
        &self.insertion_latencies_ns
    }

    /// Number of stops waiting for their trigger.
    #[must_use]
    pub fn pending_stop_count(&self) -> usize {
        self.stop_buys.values().map(VecDeque::len).sum::<usize>()
            + self.stop_sells.values().map(VecDeque::len).sum::<usize>()
    }

    /// Next monotonic insertion tick.
    pub(super) fn next_tick(&mut self) -> u64 {
        self.clock_tick += 1;
        self.clock_tick
    }

    fn resting_orders(&self, side: Side) -> impl Iterator<Item = &Order> {
        self.active_orders.values().filter(move |o| {
            o.side == side
                && matches!(o.state, OrderState::Active | OrderState::PartiallyFilled)
                && !o.is_pending_stop()
        })
    }

    /// Top-of-book buy order, as a value copy.
    ///
    /// # Performance
    /// O(1) peek of the ordered bid heap. Tombstoned tops are pruned as
    /// each mutation completes, so the heap property makes a live top
    /// the best live order; the linear fallback only runs for a query
    /// landing mid-operation.
    #[must_use]
    pub fn get_best_bid(&self) -> Option<Order> {
        let top = self.bids.peek()?;
        if let Some(order) = self.lookup_live(&top.0) {
            return Some(order);
        }
        self.bids
            .iter()
            .filter(|entry| self.lookup_live(&entry.0).is_some())
            .max()
            .and_then(|entry| self.lookup_live(&entry.0))
    }

    /// Top-of-book sell order, as a value copy.
    ///
    /// # Performance
    /// O(1) peek of the ordered ask heap; see [`OrderBook::get_best_bid`].
    #[must_use]
    pub fn get_best_ask(&self) -> Option<Order> {
        let top = self.asks.peek()?;
        if let Some(order) = self.lookup_live(&top.0) {
            return Some(order);
        }
        self.asks
            .iter()
            .filter(|entry| self.lookup_live(&entry.0).is_some())
            .max()
            .and_then(|entry| self.lookup_live(&entry.0))
    }

    /// Pops tombstoned entries off the top of both heaps so the next
    /// peek lands on a live order. Called as mutations complete; lazy
    /// deletion keeps mid-queue tombstones where they are until they
    /// surface.
    pub(super) fn prune_stale_tops(&mut self) {
        while let Some(top) = self.bids.peek() {
            if self.lookup_live(&top.0).is_some() {
                break;
            }
            self.bids.pop();
        }
        while let Some(top) = self.asks.peek() {
            if self.lookup_live(&top.0).is_some() {
                break;
            }
            self.asks.pop();
        }
    }

    /// Best ask minus best bid; absent while either side is empty.
    #[must_use]
    pub fn get_spread(&self) -> Option<f64> {
        match (self.get_best_bid(), self.get_best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Mid price (average of best bid and best ask).
    #[must_use]
    pub fn mid_price(&self) -> Option<f64> {
        match (self.get_best_bid(), self.get_best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / 2.0),
            _ => None,
        }
    }

    /// Number of resting buy orders.
    #[must_use]
    pub fn active_bids_count(&self) -> usize {
        self.resting_orders(Side::Buy).count()
    }

    /// Number of resting sell orders.
    #[must_use]
    pub fn active_asks_count(&self) -> usize {
        self.resting_orders(Side::Sell).count()
    }

    fn levels(&self, side: Side, max_levels: usize) -> Vec<PriceLevel> {
        let mut by_price: BTreeMap<PriceKey, (u64, usize)> = BTreeMap::new();
        for order in self.resting_orders(side) {
            let slot = by_price.entry(PriceKey(order.price)).or_insert((0, 0));
            slot.0 += order.remaining_qty;
            slot.1 += 1;
        }

        let to_level = |(key, (qty, n)): (&PriceKey, &(u64, usize))| PriceLevel {
            price: key.0,
            total_quantity: *qty,
            num_orders: *n,
        };

        match side {
            Side::Buy => by_price.iter().rev().take(max_levels).map(to_level).collect(),
            Side::Sell => by_price.iter().take(max_levels).map(to_level).collect(),
        }
    }

    /// Bid levels aggregated by price, best first, up to `max_levels`.
    #[must_use]
    pub fn get_bid_levels(&self, max_levels: usize) -> Vec<PriceLevel> {
        self.levels(Side::Buy, max_levels)
    }

    /// Ask levels aggregated by price, best first, up to `max_levels`.
    #[must_use]
    pub fn get_ask_levels(&self, max_levels: usize) -> Vec<PriceLevel> {
        self.levels(Side::Sell, max_levels)
    }

    /// Immutable market-data view of the book for external consumers
    /// (strategies, feeds). Depth is capped at `max_levels` per side.
    #[must_use]
    pub fn depth_snapshot(&self, max_levels: usize) -> DepthSnapshot {
        DepthSnapshot {
            symbol: self.symbol.clone(),
            timestamp_ns: current_time_nanos(),
            bids: self.get_bid_levels(max_levels),
            asks: self.get_ask_levels(max_levels),
        }
    }

    /// One-paragraph description of the current book state.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{}: {} bids / {} asks, {} fills, {} pending stops",
            self.symbol,
            self.active_bids_count(),
            self.active_asks_count(),
            self.fills.len(),
            self.pending_stop_count()
        );
        match (self.get_best_bid(), self.get_best_ask()) {
            (Some(bid), Some(ask)) => {
                out.push_str(&format!(
                    "; top {:.2} x {:.2} (spread {:.4})",
                    bid.price,
                    ask.price,
                    ask.price - bid.price
                ));
            }
            (Some(bid), None) => out.push_str(&format!("; bid-only at {:.2}", bid.price)),
            (None, Some(ask)) => out.push_str(&format!("; ask-only at {:.2}", ask.price)),
            (None, None) => out.push_str("; empty book"),
        }
        out
    }
}
