//! Persistence controller: event-log files, snapshot save/load, and
//! checkpoint (snapshot + events since) recovery.
//!
//! Failed loads never corrupt in-memory state: every file is read and
//! validated completely before the book is touched.

use super::book::{AskEntry, BidEntry, BookEntry, OrderBook, PriceKey};
use super::error::PersistenceError;
use super::events::{OrderEvent, EVENT_CSV_HEADER};
use super::order::{Order, Side};
use super::snapshot::{BookSnapshot, SnapshotPackage, SNAPSHOT_SCHEMA_VERSION};
use crate::utils::current_time_nanos;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Reads an event-log CSV file written by [`OrderBook::save_events`].
///
/// The header row is required; blank lines are skipped; any malformed
/// row is fatal.
///
/// # Errors
/// `Io` when the file cannot be read, `EventParse` on malformed rows.
pub fn read_events(path: &Path) -> Result<Vec<OrderEvent>, PersistenceError> {
    let content = fs::read_to_string(path).map_err(|err| PersistenceError::Io {
        message: err.to_string(),
        path: Some(path.to_path_buf()),
    })?;

    let mut events = Vec::new();
    let mut lines = content.lines().enumerate();
    match lines.next() {
        Some((_, header)) if header == EVENT_CSV_HEADER => {}
        Some((_, header)) => {
            return Err(PersistenceError::EventParse {
                line_number: 1,
                message: format!("unexpected header: {header:?}"),
            });
        }
        None => return Ok(events),
    }
    for (index, line) in lines {
        if line.is_empty() {
            continue;
        }
        events.push(OrderEvent::from_csv(line, index + 1)?);
    }
    Ok(events)
}

impl OrderBook {
    /// Writes the in-memory event log as CSV.
    ///
    /// # Errors
    /// `Io` when the file cannot be created or written.
    pub fn save_events(&self, path: &Path) -> Result<(), PersistenceError> {
        let io_err = |err: std::io::Error| PersistenceError::Io {
            message: err.to_string(),
            path: Some(path.to_path_buf()),
        };

        let mut file = fs::File::create(path).map_err(io_err)?;
        writeln!(file, "{EVENT_CSV_HEADER}").map_err(io_err)?;
        for event in &self.event_log {
            writeln!(file, "{}", event.to_csv()).map_err(io_err)?;
        }

        info!(
            events = self.event_log.len(),
            path = %path.display(),
            "event log saved"
        );
        Ok(())
    }

    /// Captures a complete image of the current book state.
    #[must_use]
    pub fn create_snapshot(&self) -> BookSnapshot {
        let mut active_orders: Vec<Order> = self
            .active_orders
            .values()
            .filter(|o| o.is_active() && !o.is_pending_stop())
            .cloned()
            .collect();
        active_orders.sort_by_key(|o| o.id);

        let mut pending_stops: Vec<Order> = self
            .active_orders
            .values()
            .filter(|o| o.is_pending_stop() && !o.state.is_terminal())
            .cloned()
            .collect();
        pending_stops.sort_by_key(|o| o.id);

        BookSnapshot {
            version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            snapshot_id: self.snapshot_counter,
            snapshot_time_ns: current_time_nanos(),
            symbol: self.symbol.clone(),
            last_trade_price: self.last_trade_price,
            total_orders_processed: self.total_orders_processed,
            latencies_ns: self.insertion_latencies_ns.clone(),
            active_orders,
            pending_stops,
            fills: self.fills.clone(),
        }
    }

    /// Rebuilds the book from a validated snapshot, discarding all
    /// current state.
    pub fn restore_from_snapshot(&mut self, snapshot: BookSnapshot) {
        self.bids.clear();
        self.asks.clear();
        self.active_orders.clear();
        self.cancelled_orders.clear();
        self.stop_buys.clear();
        self.stop_sells.clear();
        self.fills.clear();
        self.event_log.clear();
        self.insertion_latencies_ns.clear();

        self.symbol = snapshot.symbol;
        self.last_trade_price = snapshot.last_trade_price;
        self.total_orders_processed = snapshot.total_orders_processed;
        self.insertion_latencies_ns = snapshot.latencies_ns;
        self.fills = snapshot.fills;

        let mut max_tick = self.clock_tick;
        for order in snapshot.active_orders {
            max_tick = max_tick.max(order.timestamp);
            let entry = BookEntry::for_order(&order);
            match order.side {
                Side::Buy => self.bids.push(BidEntry(entry)),
                Side::Sell => self.asks.push(AskEntry(entry)),
            }
            self.active_orders.insert(order.id, order);
        }
        for order in snapshot.pending_stops {
            max_tick = max_tick.max(order.timestamp);
            let key = PriceKey(order.stop_price);
            match order.side {
                Side::Buy => self.stop_buys.entry(key).or_default().push_back(order.id),
                Side::Sell => self.stop_sells.entry(key).or_default().push_back(order.id),
            }
            self.active_orders.insert(order.id, order);
        }
        // Resume the tick source past every restored timestamp so
        // priority ordering continues seamlessly.
        self.clock_tick = max_tick;

        info!(
            symbol = %self.symbol,
            active = self.active_orders.len(),
            pending_stops = self.pending_stop_count(),
            fills = self.fills.len(),
            "book restored from snapshot"
        );
    }

    /// Saves a checksummed snapshot to disk and bumps the snapshot
    /// counter.
    ///
    /// # Errors
    /// `Serialization` or `Io`; the book is unchanged on failure apart
    /// from the counter.
    pub fn save_snapshot(&mut self, path: &Path) -> Result<(), PersistenceError> {
        let snapshot = self.create_snapshot();
        self.snapshot_counter += 1;
        let package = SnapshotPackage::new(snapshot)?;
        let json = package.to_json()?;
        fs::write(path, json).map_err(|err| PersistenceError::Io {
            message: err.to_string(),
            path: Some(path.to_path_buf()),
        })?;
        info!(path = %path.display(), id = package.snapshot.snapshot_id, "snapshot saved");
        Ok(())
    }

    /// Loads a snapshot from disk, fully validating it before any
    /// in-memory state is replaced.
    ///
    /// # Errors
    /// `Io`, `Deserialization`, `SnapshotSchema`, `ChecksumMismatch`,
    /// or `SnapshotInvalid`; the book is unchanged on failure.
    pub fn load_snapshot(&mut self, path: &Path) -> Result<(), PersistenceError> {
        let json = fs::read_to_string(path).map_err(|err| PersistenceError::Io {
            message: err.to_string(),
            path: Some(path.to_path_buf()),
        })?;
        let snapshot = SnapshotPackage::from_json(&json)?.into_snapshot()?;
        self.restore_from_snapshot(snapshot);
        Ok(())
    }

    /// Writes a checkpoint: a snapshot of the current state plus an
    /// event file holding everything logged since that snapshot.
    ///
    /// The in-memory event log is reset when the snapshot is taken, so
    /// the delta file starts empty; as the book keeps running, calling
    /// [`OrderBook::save_events`] on the same path refreshes the delta
    /// without touching the snapshot. Recovery re-applies exactly the
    /// events the snapshot does not already contain.
    ///
    /// # Errors
    /// Any error from [`OrderBook::save_snapshot`] or
    /// [`OrderBook::save_events`].
    pub fn save_checkpoint(
        &mut self,
        snapshot_path: &Path,
        events_path: &Path,
    ) -> Result<(), PersistenceError> {
        self.save_snapshot(snapshot_path)?;
        self.event_log.clear();
        self.save_events(events_path)?;
        info!(
            snapshot = %snapshot_path.display(),
            events = %events_path.display(),
            "checkpoint saved"
        );
        Ok(())
    }

    /// Recovers the book from a checkpoint: loads the snapshot, then
    /// re-applies the NEW/CANCEL/AMEND events in file order. FILL rows
    /// are skipped; fills are regenerated by deterministic matching.
    ///
    /// # Errors
    /// Any load error from the snapshot or event file. The event file
    /// is parsed completely before the snapshot is applied, so a
    /// malformed checkpoint leaves the book unchanged.
    pub fn recover_from_checkpoint(
        &mut self,
        snapshot_path: &Path,
        events_path: &Path,
    ) -> Result<(), PersistenceError> {
        let events = read_events(events_path)?;
        self.load_snapshot(snapshot_path)?;

        let was_logging = self.logging_enabled;
        self.logging_enabled = false;
        let mut applied = 0usize;
        for event in &events {
            if self.apply_event(event) {
                applied += 1;
            }
        }
        self.logging_enabled = was_logging;

        info!(applied, total = events.len(), "checkpoint recovery complete");
        Ok(())
    }

    /// Applies one logged event to the book as the equivalent API
    /// call. FILL events are advisory and ignored. Returns whether the
    /// event was applied.
    pub(crate) fn apply_event(&mut self, event: &OrderEvent) -> bool {
        match event {
            OrderEvent::New {
                order_id,
                side,
                order_type,
                tif,
                price,
                quantity,
                peak_size,
                account_id,
                ..
            } => {
                let order = if *peak_size > 0 {
                    Order::iceberg(*order_id, *side, *price, *quantity, *peak_size, *tif)
                } else if *order_type == super::order::OrderType::Market {
                    Order::market(*order_id, *side, *quantity, *tif)
                } else {
                    Order::limit(*order_id, *side, *price, *quantity, *tif)
                };
                match order {
                    Ok(order) => {
                        self.submit(order.for_account(*account_id));
                        true
                    }
                    Err(err) => {
                        warn!(order_id, error = %err, "skipping unappliable NEW event");
                        false
                    }
                }
            }
            OrderEvent::Cancel { order_id, .. } => {
                self.cancel_order(*order_id);
                true
            }
            OrderEvent::Amend {
                order_id,
                new_price,
                new_quantity,
                ..
            } => {
                self.amend_order(*order_id, *new_price, *new_quantity);
                true
            }
            OrderEvent::Fill { .. } => false,
        }
    }
}
