//! The matching loop: submit entry point, cross detection, trade
//! execution with staged commit, iceberg refresh and TIF handling.
//!
//! Trades are routed through the fill router *before* any quantity is
//! decremented, because a self-trade rejection must leave both orders
//! exactly as they were. Only on router acceptance are the decrements
//! committed, the authoritative records updated, the fill recorded,
//! and stop triggers evaluated.

use super::book::{AskEntry, BidEntry, BookEntry, OrderBook};
use super::events::OrderEvent;
use super::fill::Fill;
use super::order::{Order, OrderState, Side, TimeInForce};
use crate::utils::current_time_nanos;
use std::time::Instant;
use tracing::{debug, trace};

/// Takes `qty` out of an order, keeping the iceberg accounting
/// consistent (`display_qty + hidden_qty == remaining_qty`) and the
/// non-iceberg identity (`display_qty == remaining_qty`).
fn consume_quantity(order: &mut Order, qty: u64) {
    order.remaining_qty -= qty;
    if order.is_iceberg() {
        let from_display = qty.min(order.display_qty);
        order.display_qty -= from_display;
        order.hidden_qty -= qty - from_display;
    } else {
        order.display_qty = order.remaining_qty;
    }
}

impl OrderBook {
    /// Submits an order to the engine.
    ///
    /// Stop orders are intercepted first: they either trigger
    /// immediately against the current reference price or park in the
    /// pending-stop collection. Everything else registers as ACTIVE,
    /// logs a NEW event when logging is on, and runs the matching loop
    /// to quiescence (including any stop cascades it sets off) before
    /// returning. TIF residue is finalized last.
    pub fn submit(&mut self, order: Order) {
        let started = Instant::now();
        let mut order = order;
        order.timestamp = self.next_tick();
        self.total_orders_processed += 1;
        // A re-used id supersedes any cancelled predecessor (amend path).
        self.cancelled_orders.remove(&order.id);

        trace!(order_id = order.id, %order, "submit");

        if order.is_pending_stop() {
            self.place_stop_order(order);
            self.insertion_latencies_ns
                .push(started.elapsed().as_nanos() as u64);
            return;
        }

        order.state = OrderState::Active;
        self.active_orders.insert(order.id, order.clone());

        if self.logging_enabled {
            self.event_log
                .push(OrderEvent::new_order(&order, current_time_nanos()));
        }

        match order.side {
            Side::Buy => self.match_buy_order(&mut order),
            Side::Sell => self.match_sell_order(&mut order),
        }

        self.finalize_after_matching(&mut order);
        self.prune_stale_tops();
        self.insertion_latencies_ns
            .push(started.elapsed().as_nanos() as u64);
    }

    /// Whether an aggressive order crosses a passive one. Market orders
    /// always match; the sentinel prices make this predicate total
    /// either way.
    pub(super) fn can_match(aggressive: &Order, passive: &Order) -> bool {
        if aggressive.is_market_order() {
            return true;
        }
        match aggressive.side {
            Side::Buy => aggressive.price >= passive.price,
            Side::Sell => aggressive.price <= passive.price,
        }
    }

    /// Resolves a heap entry against the authoritative registry.
    ///
    /// Returns `None` for tombstones: unknown ids, terminal orders, and
    /// entries whose insertion tick no longer matches the authoritative
    /// record (the order was re-stamped by an iceberg refresh or an
    /// amend, so this copy's priority is obsolete).
    pub(super) fn lookup_live(&self, entry: &BookEntry) -> Option<Order> {
        let order = self.active_orders.get(&entry.order_id)?;
        if order.state.is_terminal() || order.timestamp != entry.timestamp {
            return None;
        }
        Some(order.clone())
    }

    /// FOK pre-check: walks a transient copy of the opposite book and
    /// accumulates crossing quantity. On a shortfall the order is
    /// cancelled outright, before any fill is emitted.
    fn check_fok_condition(&mut self, order: &mut Order) -> bool {
        if order.tif != TimeInForce::Fok {
            return true;
        }
        if self.can_fill_order(order) {
            return true;
        }

        debug!(
            order_id = order.id,
            quantity = order.quantity,
            "FOK cancelled: insufficient crossing liquidity"
        );
        order.state = OrderState::Cancelled;
        if let Some(stored) = self.active_orders.get_mut(&order.id) {
            stored.state = OrderState::Cancelled;
        }
        false
    }

    fn can_fill_order(&self, order: &Order) -> bool {
        // Liquidity the router would reject as a self-trade must not
        // count, or a FOK could pass the pre-check and still end up
        // partially filled.
        let skip_own = |resting: &Order| {
            self.router.self_trade_prevention()
                && order.account_id != 0
                && resting.account_id == order.account_id
        };

        let mut available = 0u64;
        match order.side {
            Side::Buy => {
                let mut asks = self.asks.clone();
                while available < order.quantity {
                    let Some(AskEntry(entry)) = asks.pop() else {
                        break;
                    };
                    let Some(resting) = self.lookup_live(&entry) else {
                        continue;
                    };
                    if !Self::can_match(order, &resting) {
                        break;
                    }
                    if skip_own(&resting) {
                        continue;
                    }
                    available += resting.remaining_qty;
                }
            }
            Side::Sell => {
                let mut bids = self.bids.clone();
                while available < order.quantity {
                    let Some(BidEntry(entry)) = bids.pop() else {
                        break;
                    };
                    let Some(resting) = self.lookup_live(&entry) else {
                        continue;
                    };
                    if !Self::can_match(order, &resting) {
                        break;
                    }
                    if skip_own(&resting) {
                        continue;
                    }
                    available += resting.remaining_qty;
                }
            }
        }
        available >= order.quantity
    }

    pub(super) fn match_buy_order(&mut self, buy_order: &mut Order) {
        if !self.check_fok_condition(buy_order) {
            return;
        }

        let mut skipped: Vec<AskEntry> = Vec::new();
        while buy_order.remaining_qty > 0 {
            let Some(best) = self.asks.pop() else {
                break;
            };
            let Some(mut best_ask) = self.lookup_live(&best.0) else {
                continue;
            };
            // Stale pre-refresh copy: visible quantity exhausted while
            // the hidden reserve waits for a reveal. Discard it.
            if best_ask.display_qty == 0 && best_ask.remaining_qty > 0 {
                continue;
            }
            if !Self::can_match(buy_order, &best_ask) {
                self.asks.push(best);
                break;
            }
            if !self.execute_trade(buy_order, &mut best_ask) {
                // Self-trade prevented: both orders stay untouched. The
                // entry is parked and re-inserted after the loop so it
                // keeps its priority without being popped again for
                // this aggressor.
                skipped.push(best);
                continue;
            }
            if best_ask.needs_refresh() {
                let tick = self.next_tick();
                best_ask.refresh_display(tick);
                if let Some(stored) = self.active_orders.get_mut(&best_ask.id) {
                    stored.display_qty = best_ask.display_qty;
                    stored.hidden_qty = best_ask.hidden_qty;
                    stored.timestamp = best_ask.timestamp;
                }
                trace!(
                    order_id = best_ask.id,
                    display = best_ask.display_qty,
                    hidden = best_ask.hidden_qty,
                    "iceberg refreshed"
                );
                self.asks.push(AskEntry(BookEntry::for_order(&best_ask)));
            } else if best_ask.remaining_qty > 0 && best_ask.display_qty > 0 {
                self.asks.push(best);
            }
        }
        for entry in skipped {
            self.asks.push(entry);
        }

        self.handle_unfilled_order(buy_order);
    }

    pub(super) fn match_sell_order(&mut self, sell_order: &mut Order) {
        if !self.check_fok_condition(sell_order) {
            return;
        }

        let mut skipped: Vec<BidEntry> = Vec::new();
        while sell_order.remaining_qty > 0 {
            let Some(best) = self.bids.pop() else {
                break;
            };
            let Some(mut best_bid) = self.lookup_live(&best.0) else {
                continue;
            };
            if best_bid.display_qty == 0 && best_bid.remaining_qty > 0 {
                continue;
            }
            if !Self::can_match(sell_order, &best_bid) {
                self.bids.push(best);
                break;
            }
            if !self.execute_trade(sell_order, &mut best_bid) {
                skipped.push(best);
                continue;
            }
            if best_bid.needs_refresh() {
                let tick = self.next_tick();
                best_bid.refresh_display(tick);
                if let Some(stored) = self.active_orders.get_mut(&best_bid.id) {
                    stored.display_qty = best_bid.display_qty;
                    stored.hidden_qty = best_bid.hidden_qty;
                    stored.timestamp = best_bid.timestamp;
                }
                trace!(
                    order_id = best_bid.id,
                    display = best_bid.display_qty,
                    hidden = best_bid.hidden_qty,
                    "iceberg refreshed"
                );
                self.bids.push(BidEntry(BookEntry::for_order(&best_bid)));
            } else if best_bid.remaining_qty > 0 && best_bid.display_qty > 0 {
                self.bids.push(best);
            }
        }
        for entry in skipped {
            self.bids.push(entry);
        }

        self.handle_unfilled_order(sell_order);
    }

    /// Executes one trade between the aggressor and a passive order.
    ///
    /// Returns `false` when the router rejects the fill (self-trade);
    /// in that case neither order has been mutated. On acceptance the
    /// quantities are committed, both authoritative records updated,
    /// the fill recorded and logged, and stop triggers evaluated
    /// against the new print.
    fn execute_trade(&mut self, aggressive: &mut Order, passive: &mut Order) -> bool {
        let available = if passive.is_iceberg() {
            passive.display_qty
        } else {
            passive.remaining_qty
        };
        let trade_qty = aggressive.remaining_qty.min(available);
        // Passive-price rule: the resting order always sets the print.
        let trade_price = passive.price;

        let (buy_id, sell_id) = match aggressive.side {
            Side::Buy => (aggressive.id, passive.id),
            Side::Sell => (passive.id, aggressive.id),
        };
        let fill = Fill::new(buy_id, sell_id, trade_price, trade_qty, current_time_nanos());

        if !self
            .router
            .route_fill(&fill, aggressive, passive, &self.symbol)
        {
            return false;
        }

        consume_quantity(aggressive, trade_qty);
        consume_quantity(passive, trade_qty);
        self.sync_order_state(aggressive);
        self.sync_order_state(passive);

        trace!(
            buy_id,
            sell_id,
            price = trade_price,
            quantity = trade_qty,
            "trade executed"
        );

        if self.logging_enabled {
            self.event_log.push(OrderEvent::fill(&fill));
        }
        self.fills.push(fill);

        self.check_stop_triggers(trade_price);
        true
    }

    /// Writes a working copy's quantities and derived state back to the
    /// authoritative registry.
    fn sync_order_state(&mut self, order: &Order) {
        let Some(stored) = self.active_orders.get_mut(&order.id) else {
            return;
        };
        stored.remaining_qty = order.remaining_qty;
        stored.display_qty = order.display_qty;
        stored.hidden_qty = order.hidden_qty;
        if order.is_filled() {
            stored.state = OrderState::Filled;
        } else if order.remaining_qty < order.quantity {
            stored.state = OrderState::PartiallyFilled;
        }
    }

    /// Decides what happens to an aggressor's residual after the
    /// matching loop: rest in the book (GTC/DAY), or cancel (IOC/FOK,
    /// market orders). The residual quantity is preserved on cancel.
    fn handle_unfilled_order(&mut self, order: &mut Order) {
        if order.remaining_qty == 0 {
            return;
        }
        if order.state == OrderState::Cancelled {
            return;
        }

        if order.can_rest_in_book() {
            if order.needs_refresh() {
                let tick = self.next_tick();
                order.refresh_display(tick);
            }
            self.active_orders.insert(order.id, order.clone());
            let entry = BookEntry::for_order(order);
            match order.side {
                Side::Buy => self.bids.push(BidEntry(entry)),
                Side::Sell => self.asks.push(AskEntry(entry)),
            }
            return;
        }

        order.state = OrderState::Cancelled;
        if let Some(stored) = self.active_orders.get_mut(&order.id) {
            stored.state = OrderState::Cancelled;
            stored.remaining_qty = order.remaining_qty;
            stored.display_qty = order.display_qty;
            stored.hidden_qty = order.hidden_qty;
        }
        if order.tif == TimeInForce::Ioc {
            let filled = order.quantity - order.remaining_qty;
            if filled > 0 {
                debug!(
                    order_id = order.id,
                    filled,
                    quantity = order.quantity,
                    "IOC partially filled, remainder cancelled"
                );
            } else {
                debug!(order_id = order.id, "IOC cancelled: no immediate liquidity");
            }
        }
    }

    /// Guarantees the TIF finalization rule after a submit: IOC ends
    /// FILLED or CANCELLED (never stuck partially filled), GTC/DAY with
    /// any execution ends PARTIALLY_FILLED or FILLED, and terminal
    /// states are never overwritten.
    pub(super) fn finalize_after_matching(&mut self, order: &mut Order) {
        if let Some(stored) = self.active_orders.get(&order.id) {
            if stored.state.is_terminal() {
                return;
            }
        }

        if order.tif == TimeInForce::Ioc {
            let state = if order.remaining_qty > 0 {
                OrderState::Cancelled
            } else {
                OrderState::Filled
            };
            order.state = state;
            if let Some(stored) = self.active_orders.get_mut(&order.id) {
                stored.state = state;
            }
            return;
        }

        // FOK shortfalls were handled by the pre-check; GTC/DAY residue
        // below.
        if order.remaining_qty == 0 {
            order.state = OrderState::Filled;
            if let Some(stored) = self.active_orders.get_mut(&order.id) {
                stored.state = OrderState::Filled;
            }
        } else if order.remaining_qty < order.quantity {
            order.state = OrderState::PartiallyFilled;
            if let Some(stored) = self.active_orders.get_mut(&order.id) {
                stored.state = OrderState::PartiallyFilled;
            }
        }
    }
}
