//! Deterministic replay of an event log against a fresh book.
//!
//! Replay applies NEW/CANCEL/AMEND events as the equivalent API calls
//! in file order; FILL rows are advisory and used only for validation.
//! Because matching is deterministic, the replayed book regenerates
//! the identical fill sequence the original run produced.

use super::book::OrderBook;
use super::error::PersistenceError;
use super::events::{EventType, OrderEvent};
use super::fill::Fill;
use super::persistence::read_events;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Price tolerance used when comparing regenerated fills to expected
/// ones.
const PRICE_TOLERANCE: f64 = 1e-9;

/// Replays a saved event log into a fresh [`OrderBook`].
pub struct ReplayEngine {
    book: OrderBook,
    events: Vec<OrderEvent>,
    current_idx: usize,
    events_processed: u64,
    replay_started: Option<Instant>,
}

impl ReplayEngine {
    /// Creates a replay engine with an empty book for `symbol`.
    ///
    /// The replay book has logging disabled so re-applied events are
    /// not logged twice.
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        Self {
            book: OrderBook::new(symbol),
            events: Vec::new(),
            current_idx: 0,
            events_processed: 0,
            replay_started: None,
        }
    }

    /// Loads events from a CSV file and resets the replay position.
    ///
    /// # Errors
    /// `Io` or `EventParse`; previously loaded events are kept on
    /// failure.
    pub fn load_from_file(&mut self, path: &Path) -> Result<(), PersistenceError> {
        let events = read_events(path)?;
        info!(events = events.len(), path = %path.display(), "event log loaded");
        self.events = events;
        self.reset_replay();
        Ok(())
    }

    /// Replays every remaining event as fast as possible.
    pub fn replay_instant(&mut self) {
        self.replay_started = Some(Instant::now());
        self.reset_replay();
        while self.has_next_event() {
            self.replay_next_event();
        }
        info!(
            events = self.events_processed,
            fills = self.book.fills().len(),
            "instant replay complete"
        );
    }

    /// Replays every remaining event, sleeping the recorded
    /// inter-arrival gaps scaled by `speed_multiplier` (2.0 = twice as
    /// fast). A non-positive multiplier skips the sleeps.
    pub fn replay_timed(&mut self, speed_multiplier: f64) {
        if self.events.is_empty() {
            return;
        }
        self.replay_started = Some(Instant::now());
        self.reset_replay();

        let mut last_ts = self.events[0].timestamp_ns();
        while self.has_next_event() {
            let ts = self.events[self.current_idx].timestamp_ns();
            if speed_multiplier > 0.0 {
                let gap_ns = ts.saturating_sub(last_ts).max(0) as f64 / speed_multiplier;
                if gap_ns >= 1.0 {
                    std::thread::sleep(Duration::from_nanos(gap_ns as u64));
                }
            }
            last_ts = ts;
            self.replay_next_event();
        }
        info!(
            events = self.events_processed,
            fills = self.book.fills().len(),
            "timed replay complete"
        );
    }

    /// Whether unprocessed events remain.
    #[must_use]
    pub fn has_next_event(&self) -> bool {
        self.current_idx < self.events.len()
    }

    /// The next event to be applied, if any.
    #[must_use]
    pub fn peek_next_event(&self) -> Option<&OrderEvent> {
        self.events.get(self.current_idx)
    }

    /// Applies the next event. Does nothing at end of stream.
    pub fn replay_next_event(&mut self) {
        let Some(event) = self.events.get(self.current_idx) else {
            return;
        };
        let event = event.clone();
        self.current_idx += 1;
        if event.event_type() != EventType::Fill {
            self.book.apply_event(&event);
        }
        self.events_processed += 1;
        debug!(index = self.current_idx, %event, "event replayed");
    }

    /// Applies up to `n` further events.
    pub fn replay_n_events(&mut self, n: usize) {
        let target = (self.current_idx + n).min(self.events.len());
        while self.current_idx < target {
            self.replay_next_event();
        }
    }

    /// Resets to the beginning with a fresh book.
    pub fn reset_replay(&mut self) {
        self.current_idx = 0;
        self.events_processed = 0;
        let symbol = self.book.symbol().to_string();
        self.book = OrderBook::new(&symbol);
    }

    /// Jumps to the event at `idx`, replaying from the start when the
    /// target lies behind the current position.
    ///
    /// # Errors
    /// `InvalidEvent` when `idx` is out of range.
    pub fn skip_to_event(&mut self, idx: usize) -> Result<(), PersistenceError> {
        if idx > self.events.len() {
            return Err(PersistenceError::InvalidEvent {
                message: format!("event index {idx} out of range ({})", self.events.len()),
            });
        }
        if idx < self.current_idx {
            self.reset_replay();
        }
        while self.current_idx < idx {
            self.replay_next_event();
        }
        Ok(())
    }

    /// Current position in the event stream.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_idx
    }

    /// Total number of loaded events.
    #[must_use]
    pub fn total_events(&self) -> usize {
        self.events.len()
    }

    /// Replay progress as a percentage of the event stream.
    #[must_use]
    pub fn progress_percentage(&self) -> f64 {
        if self.events.is_empty() {
            return 0.0;
        }
        self.current_idx as f64 * 100.0 / self.events.len() as f64
    }

    /// The book being driven by the replay.
    #[must_use]
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Mutable access to the replay book (inspection and testing).
    pub fn book_mut(&mut self) -> &mut OrderBook {
        &mut self.book
    }

    /// Compares the regenerated fill sequence to an expected one,
    /// element-wise on buy id, sell id, quantity and price (within a
    /// floating tolerance). Returns `true` only for an identical
    /// sequence.
    #[must_use]
    pub fn validate(&self, expected_fills: &[Fill]) -> bool {
        let replayed = self.book.fills();
        if expected_fills.len() != replayed.len() {
            warn!(
                expected = expected_fills.len(),
                replayed = replayed.len(),
                "replay validation failed: fill count mismatch"
            );
            return false;
        }

        let mut all_match = true;
        for (index, (expected, actual)) in expected_fills.iter().zip(replayed).enumerate() {
            if expected.buy_order_id != actual.buy_order_id
                || expected.sell_order_id != actual.sell_order_id
                || expected.quantity != actual.quantity
                || (expected.price - actual.price).abs() > PRICE_TOLERANCE
            {
                warn!(
                    index,
                    expected = %expected,
                    actual = %actual,
                    "replay validation mismatch"
                );
                all_match = false;
            }
        }
        if all_match {
            info!(fills = replayed.len(), "replay validation passed");
        }
        all_match
    }

    /// One-line summary of replay progress and outcomes.
    #[must_use]
    pub fn summary(&self) -> String {
        let elapsed = self
            .replay_started
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        format!(
            "replayed {}/{} events, {} fills regenerated, {} ms",
            self.current_idx,
            self.events.len(),
            self.book.fills().len(),
            elapsed
        )
    }
}
