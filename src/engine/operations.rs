//! Order lifecycle operations: cancel, amend, lookup, plus convenience
//! submit wrappers that construct and validate the order in one call.

use super::book::OrderBook;
use super::error::EngineError;
use super::events::OrderEvent;
use super::order::{Order, OrderState, Side, TimeInForce};
use crate::utils::current_time_nanos;
use tracing::{debug, trace};

impl OrderBook {
    /// Cancels an order.
    ///
    /// Succeeds on ACTIVE, PARTIALLY_FILLED and PENDING orders; returns
    /// `false` for unknown ids and for orders already in a terminal
    /// state (cancel is idempotent). A cancelled pending stop is also
    /// removed from the stop collection. The priority-queue entry is
    /// tombstoned and skipped lazily during matching.
    pub fn cancel_order(&mut self, order_id: u64) -> bool {
        if self.logging_enabled {
            self.event_log
                .push(OrderEvent::cancel(order_id, current_time_nanos()));
        }

        let terminal = match self.active_orders.get(&order_id) {
            Some(order) => order.state.is_terminal(),
            None => {
                trace!(order_id, "cancel: order not found or already cancelled");
                return false;
            }
        };
        if terminal {
            trace!(order_id, "cancel: order already terminal");
            return false;
        }

        let Some(mut order) = self.active_orders.remove(&order_id) else {
            return false;
        };
        order.state = OrderState::Cancelled;
        if order.is_pending_stop() {
            self.remove_pending_stop(&order);
        }
        self.cancelled_orders.insert(order_id, order);
        self.prune_stale_tops();

        trace!(order_id, "order cancelled");
        true
    }

    /// Amends an order's price and/or quantity.
    ///
    /// Semantically a cancel followed by a resubmit under the same id
    /// with a fresh timestamp: the amended order loses time priority,
    /// and an amended-up price that now crosses the book executes
    /// immediately. Absent fields keep the previous price / the
    /// previous *remaining* quantity. A resting time-in-force carries
    /// over (a DAY order stays DAY); any other class resubmits as GTC.
    /// Fails on unknown or terminal orders, or when the resolved fields
    /// do not form a valid order.
    pub fn amend_order(
        &mut self,
        order_id: u64,
        new_price: Option<f64>,
        new_quantity: Option<u64>,
    ) -> bool {
        if self.logging_enabled {
            self.event_log.push(OrderEvent::amend(
                order_id,
                new_price,
                new_quantity,
                current_time_nanos(),
            ));
        }

        let Some(existing) = self.active_orders.get(&order_id) else {
            debug!(order_id, "amend: order not found");
            return false;
        };
        if existing.state.is_terminal() {
            debug!(order_id, state = %existing.state, "amend: order is terminal");
            return false;
        }

        let side = existing.side;
        let account_id = existing.account_id;
        let price = new_price.unwrap_or(existing.price);
        let quantity = new_quantity.unwrap_or(existing.remaining_qty);
        let tif = match existing.tif {
            TimeInForce::Day => TimeInForce::Day,
            _ => TimeInForce::Gtc,
        };

        let amended = match Order::limit(order_id, side, price, quantity, tif) {
            Ok(order) => order.for_account(account_id),
            Err(err) => {
                debug!(order_id, error = %err, "amend: resolved fields invalid");
                return false;
            }
        };

        // The AMEND row already captures this mutation; the inner
        // cancel + resubmit must not log again or replay would apply
        // the amendment twice.
        let was_logging = self.logging_enabled;
        self.logging_enabled = false;
        self.cancel_order(order_id);
        self.submit(amended);
        self.logging_enabled = was_logging;

        debug!(order_id, price, quantity, "order amended");
        true
    }

    /// Looks up an order by id in the active and cancelled registries,
    /// returning a value copy.
    #[must_use]
    pub fn get_order(&self, order_id: u64) -> Option<Order> {
        self.active_orders
            .get(&order_id)
            .or_else(|| self.cancelled_orders.get(&order_id))
            .cloned()
    }

    /// Constructs and submits a limit order.
    ///
    /// # Errors
    /// Validation errors from [`Order::limit`]; the book is untouched.
    pub fn submit_limit_order(
        &mut self,
        id: u64,
        side: Side,
        price: f64,
        quantity: u64,
        tif: TimeInForce,
    ) -> Result<(), EngineError> {
        self.submit(Order::limit(id, side, price, quantity, tif)?);
        Ok(())
    }

    /// Constructs and submits a limit order owned by `account_id`.
    ///
    /// # Errors
    /// Validation errors from [`Order::limit`]; the book is untouched.
    pub fn submit_limit_order_for_account(
        &mut self,
        id: u64,
        account_id: u64,
        side: Side,
        price: f64,
        quantity: u64,
        tif: TimeInForce,
    ) -> Result<(), EngineError> {
        self.submit(Order::limit(id, side, price, quantity, tif)?.for_account(account_id));
        Ok(())
    }

    /// Constructs and submits a market order.
    ///
    /// # Errors
    /// Validation errors from [`Order::market`]; the book is untouched.
    pub fn submit_market_order(
        &mut self,
        id: u64,
        side: Side,
        quantity: u64,
    ) -> Result<(), EngineError> {
        self.submit(Order::market(id, side, quantity, TimeInForce::Ioc)?);
        Ok(())
    }

    /// Constructs and submits a market order owned by `account_id`.
    ///
    /// # Errors
    /// Validation errors from [`Order::market`]; the book is untouched.
    pub fn submit_market_order_for_account(
        &mut self,
        id: u64,
        account_id: u64,
        side: Side,
        quantity: u64,
    ) -> Result<(), EngineError> {
        self.submit(Order::market(id, side, quantity, TimeInForce::Ioc)?.for_account(account_id));
        Ok(())
    }

    /// Constructs and submits an iceberg order.
    ///
    /// # Errors
    /// Validation errors from [`Order::iceberg`]; the book is untouched.
    pub fn submit_iceberg_order(
        &mut self,
        id: u64,
        side: Side,
        price: f64,
        quantity: u64,
        peak_size: u64,
        tif: TimeInForce,
    ) -> Result<(), EngineError> {
        self.submit(Order::iceberg(id, side, price, quantity, peak_size, tif)?);
        Ok(())
    }
}
