//! Stop-order management: pending storage keyed by trigger price,
//! trigger-on-placement, and the trigger sweep driven by trade prints.
//!
//! Buy stops fire when a print is at or above their trigger price,
//! sell stops when a print is at or below it (inclusive on both
//! sides). Triggered stops convert to market or limit orders and run
//! through the normal matching loop; the trades they generate may in
//! turn trigger further stops, so a single submit can cascade until no
//! pending stop satisfies the latest print.

use super::book::{OrderBook, PriceKey};
use super::order::{Order, OrderState, OrderType, Side};
use tracing::{debug, trace};

impl OrderBook {
    /// Handles a just-submitted, untriggered stop order: trigger it
    /// immediately when the reference price already satisfies the
    /// stop, otherwise park it in the pending collection.
    pub(super) fn place_stop_order(&mut self, mut order: Order) {
        if let Some(ref_price) = self.stop_trigger_price_now(&order) {
            order.state = OrderState::Active;
            self.active_orders.insert(order.id, order.clone());
            self.trigger_stop_order(order, ref_price);
            return;
        }

        trace!(
            order_id = order.id,
            side = %order.side,
            stop_price = order.stop_price,
            "stop order parked"
        );
        order.state = OrderState::Pending;
        let key = PriceKey(order.stop_price);
        match order.side {
            Side::Buy => self.stop_buys.entry(key).or_default().push_back(order.id),
            Side::Sell => self.stop_sells.entry(key).or_default().push_back(order.id),
        }
        self.active_orders.insert(order.id, order);
    }

    /// Reference price for stop evaluation: the last trade when known,
    /// otherwise a side-appropriate fallback from the current book
    /// (sell stops take the lowest available price signal, buy stops
    /// the highest). `None` in a truly empty market: nothing triggers.
    fn trigger_reference_price(&self, side: Side) -> Option<f64> {
        if let Some(last) = self.last_trade_price {
            return Some(last);
        }
        let bid = self.get_best_bid().map(|o| o.price);
        let ask = self.get_best_ask().map(|o| o.price);
        match (bid, ask) {
            (Some(b), Some(a)) => Some(match side {
                Side::Sell => b.min(a),
                Side::Buy => b.max(a),
            }),
            (Some(b), None) => Some(b),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }

    /// Returns the reference price when the stop should fire right now.
    ///
    /// The comparison here is strict, unlike the inclusive sweep on
    /// trade prints: a stop whose trigger price merely equals the
    /// current reference parks and waits for the first print to take
    /// it out.
    fn stop_trigger_price_now(&self, order: &Order) -> Option<f64> {
        let reference = self.trigger_reference_price(order.side)?;
        let fires = match order.side {
            Side::Sell => reference < order.stop_price,
            Side::Buy => reference > order.stop_price,
        };
        fires.then_some(reference)
    }

    /// Converts a stop to its post-trigger type and routes it through
    /// the matching loop.
    fn trigger_stop_order(&mut self, mut order: Order, ref_price: f64) {
        debug!(
            order_id = order.id,
            side = %order.side,
            stop_price = order.stop_price,
            reference = ref_price,
            "stop order triggered"
        );

        order.stop_triggered = true;
        match order.stop_becomes {
            OrderType::Market => {
                order.order_type = OrderType::Market;
                order.price = Order::market_sentinel_price(order.side);
            }
            OrderType::Limit => {
                // The order's price field already holds the
                // post-trigger limit.
                order.order_type = OrderType::Limit;
            }
        }
        order.state = OrderState::Active;
        self.active_orders.insert(order.id, order.clone());

        match order.side {
            Side::Buy => self.match_buy_order(&mut order),
            Side::Sell => self.match_sell_order(&mut order),
        }
        self.finalize_after_matching(&mut order);
        self.prune_stale_tops();
    }

    /// Sweeps the pending collections against a trade print, firing
    /// every stop the print satisfies. Invoked after every trade and
    /// available as an explicit entry point for injected prints.
    ///
    /// Within one batch, stops fire in trigger-price order with ties in
    /// insertion order; each fired stop runs to quiescence before the
    /// next, and the trades it prints may re-enter this sweep.
    pub fn check_stop_triggers(&mut self, trade_price: f64) {
        self.last_trade_price = Some(trade_price);

        let mut triggered: Vec<u64> = Vec::new();

        let fired_keys: Vec<PriceKey> = self
            .stop_buys
            .range(..=PriceKey(trade_price))
            .map(|(key, _)| *key)
            .collect();
        for key in fired_keys {
            if let Some(ids) = self.stop_buys.remove(&key) {
                triggered.extend(ids);
            }
        }

        let fired_keys: Vec<PriceKey> = self
            .stop_sells
            .range(PriceKey(trade_price)..)
            .map(|(key, _)| *key)
            .collect();
        for key in fired_keys {
            if let Some(ids) = self.stop_sells.remove(&key) {
                triggered.extend(ids);
            }
        }

        for order_id in triggered {
            let Some(order) = self.active_orders.get(&order_id).cloned() else {
                continue;
            };
            if !order.is_pending_stop() {
                continue;
            }
            self.trigger_stop_order(order, trade_price);
        }
    }

    /// Drops a cancelled pending stop from its trigger-price bucket.
    pub(super) fn remove_pending_stop(&mut self, order: &Order) {
        let key = PriceKey(order.stop_price);
        let bucket = match order.side {
            Side::Buy => self.stop_buys.get_mut(&key),
            Side::Sell => self.stop_sells.get_mut(&key),
        };
        if let Some(ids) = bucket {
            ids.retain(|id| *id != order.id);
            if ids.is_empty() {
                match order.side {
                    Side::Buy => self.stop_buys.remove(&key),
                    Side::Sell => self.stop_sells.remove(&key),
                };
            }
        }
    }
}
