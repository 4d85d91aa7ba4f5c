//! Whole-book snapshot image with schema versioning and checksum
//! validation.
//!
//! A snapshot is a complete, self-sufficient image of the book:
//! resting orders, pending stops, the fill tape, the last trade price
//! and the submit statistics. On disk it is wrapped in a
//! [`SnapshotPackage`] carrying a schema version and a SHA-256
//! checksum of the JSON payload.

use super::error::PersistenceError;
use super::fill::Fill;
use super::order::{Order, OrderState};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Schema version written into snapshots by this build.
pub const SNAPSHOT_SCHEMA_VERSION: &str = "1.0";

/// Format version of the on-disk package wrapper.
pub const SNAPSHOT_PACKAGE_FORMAT_VERSION: u32 = 1;

/// A complete image of the book's state at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Schema version of this snapshot.
    pub version: String,
    /// Sequence number of the snapshot within the book's lifetime.
    pub snapshot_id: u64,
    /// Wall-clock nanoseconds since the Unix epoch at capture time.
    pub snapshot_time_ns: i64,
    /// The book's symbol.
    pub symbol: String,
    /// Price of the most recent trade, if any.
    pub last_trade_price: Option<f64>,
    /// Count of submits accepted by the engine.
    pub total_orders_processed: u64,
    /// Per-submit latency samples in nanoseconds.
    pub latencies_ns: Vec<u64>,
    /// Orders resting in the book (ACTIVE or PARTIALLY_FILLED).
    pub active_orders: Vec<Order>,
    /// Untriggered stop orders.
    pub pending_stops: Vec<Order>,
    /// The chronological fill tape.
    pub fills: Vec<Fill>,
}

impl BookSnapshot {
    /// Validates internal consistency after decoding.
    ///
    /// # Errors
    /// `SnapshotSchema` on an unknown version; `SnapshotInvalid` on
    /// duplicate ids, quantity violations, a resting order in the wrong
    /// state, or a pending stop that is not actually pending.
    pub fn validate(&self) -> Result<(), PersistenceError> {
        if self.version != SNAPSHOT_SCHEMA_VERSION {
            return Err(PersistenceError::SnapshotSchema {
                found: self.version.clone(),
                expected: SNAPSHOT_SCHEMA_VERSION.to_string(),
            });
        }

        let mut seen: HashSet<u64> = HashSet::new();
        for order in self.active_orders.iter().chain(&self.pending_stops) {
            if !seen.insert(order.id) {
                return Err(PersistenceError::SnapshotInvalid {
                    message: format!("duplicate order id {}", order.id),
                });
            }
            if order.remaining_qty > order.quantity {
                return Err(PersistenceError::SnapshotInvalid {
                    message: format!(
                        "order {} has remaining {} > quantity {}",
                        order.id, order.remaining_qty, order.quantity
                    ),
                });
            }
            if order.is_iceberg() && order.display_qty + order.hidden_qty != order.remaining_qty {
                return Err(PersistenceError::SnapshotInvalid {
                    message: format!("order {} has inconsistent iceberg accounting", order.id),
                });
            }
        }

        for order in &self.active_orders {
            if !matches!(
                order.state,
                OrderState::Active | OrderState::PartiallyFilled
            ) {
                return Err(PersistenceError::SnapshotInvalid {
                    message: format!(
                        "active order {} has non-resting state {}",
                        order.id, order.state
                    ),
                });
            }
        }

        for order in &self.pending_stops {
            if !order.is_pending_stop() {
                return Err(PersistenceError::SnapshotInvalid {
                    message: format!("pending stop {} is not an untriggered stop", order.id),
                });
            }
        }

        Ok(())
    }

    /// One-line human summary for logs and demos.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "snapshot #{} {} v{}: {} active orders, {} pending stops, {} fills, last trade {:?}",
            self.snapshot_id,
            self.symbol,
            self.version,
            self.active_orders.len(),
            self.pending_stops.len(),
            self.fills.len(),
            self.last_trade_price
        )
    }
}

/// On-disk wrapper providing checksum validation for [`BookSnapshot`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPackage {
    /// Version of the package wrapper format.
    pub format_version: u32,
    /// The snapshot payload.
    pub snapshot: BookSnapshot,
    /// Hex-encoded SHA-256 of the serialized payload.
    pub checksum: String,
}

impl SnapshotPackage {
    /// Wraps a snapshot, computing its checksum.
    ///
    /// # Errors
    /// `Serialization` when the payload cannot be encoded.
    pub fn new(snapshot: BookSnapshot) -> Result<Self, PersistenceError> {
        let checksum = Self::compute_checksum(&snapshot)?;
        Ok(Self {
            format_version: SNAPSHOT_PACKAGE_FORMAT_VERSION,
            snapshot,
            checksum,
        })
    }

    /// Serializes the package to JSON.
    ///
    /// # Errors
    /// `Serialization` when encoding fails.
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        serde_json::to_string_pretty(self).map_err(|err| PersistenceError::Serialization {
            message: err.to_string(),
        })
    }

    /// Deserializes a package from JSON.
    ///
    /// # Errors
    /// `Deserialization` when decoding fails.
    pub fn from_json(data: &str) -> Result<Self, PersistenceError> {
        serde_json::from_str(data).map_err(|err| PersistenceError::Deserialization {
            message: err.to_string(),
        })
    }

    /// Validates format version, checksum, and snapshot consistency.
    ///
    /// # Errors
    /// `SnapshotSchema`, `ChecksumMismatch`, or any error from
    /// [`BookSnapshot::validate`].
    pub fn validate(&self) -> Result<(), PersistenceError> {
        if self.format_version != SNAPSHOT_PACKAGE_FORMAT_VERSION {
            return Err(PersistenceError::SnapshotSchema {
                found: self.format_version.to_string(),
                expected: SNAPSHOT_PACKAGE_FORMAT_VERSION.to_string(),
            });
        }
        let computed = Self::compute_checksum(&self.snapshot)?;
        if computed != self.checksum {
            return Err(PersistenceError::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual: computed,
            });
        }
        self.snapshot.validate()
    }

    /// Consumes the package, returning the validated snapshot.
    ///
    /// # Errors
    /// As for [`SnapshotPackage::validate`].
    pub fn into_snapshot(self) -> Result<BookSnapshot, PersistenceError> {
        self.validate()?;
        Ok(self.snapshot)
    }

    fn compute_checksum(snapshot: &BookSnapshot) -> Result<String, PersistenceError> {
        let payload =
            serde_json::to_vec(snapshot).map_err(|err| PersistenceError::Serialization {
                message: err.to_string(),
            })?;
        let mut hasher = Sha256::new();
        hasher.update(payload);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::order::{Side, TimeInForce};

    fn sample_snapshot() -> BookSnapshot {
        let mut resting = Order::limit(1, Side::Buy, 99.5, 100, TimeInForce::Gtc).unwrap();
        resting.timestamp = 1;
        let stop = Order::stop_market(2, Side::Sell, 95.0, 50).unwrap();
        BookSnapshot {
            version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            snapshot_id: 3,
            snapshot_time_ns: 1_700_000_000_000_000_000,
            symbol: "TEST".to_string(),
            last_trade_price: Some(100.0),
            total_orders_processed: 5,
            latencies_ns: vec![120, 85, 240],
            active_orders: vec![resting],
            pending_stops: vec![stop],
            fills: vec![Fill::new(3, 4, 100.0, 25, 7)],
        }
    }

    #[test]
    fn package_round_trips_through_json() {
        let package = SnapshotPackage::new(sample_snapshot()).unwrap();
        let json = package.to_json().unwrap();
        let restored = SnapshotPackage::from_json(&json).unwrap();
        let snapshot = restored.into_snapshot().unwrap();
        assert_eq!(snapshot.snapshot_id, 3);
        assert_eq!(snapshot.active_orders.len(), 1);
        assert_eq!(snapshot.pending_stops.len(), 1);
        assert_eq!(snapshot.fills.len(), 1);
    }

    #[test]
    fn tampered_payload_fails_checksum() {
        let package = SnapshotPackage::new(sample_snapshot()).unwrap();
        let json = package.to_json().unwrap();
        let tampered = json.replace("\"total_orders_processed\": 5", "\"total_orders_processed\": 6");
        assert_ne!(json, tampered);
        let restored = SnapshotPackage::from_json(&tampered).unwrap();
        assert!(matches!(
            restored.validate(),
            Err(PersistenceError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let mut snapshot = sample_snapshot();
        snapshot.version = "9.9".to_string();
        assert!(matches!(
            snapshot.validate(),
            Err(PersistenceError::SnapshotSchema { .. })
        ));
    }

    #[test]
    fn invalid_resting_state_is_rejected() {
        let mut snapshot = sample_snapshot();
        snapshot.active_orders[0].state = OrderState::Cancelled;
        assert!(matches!(
            snapshot.validate(),
            Err(PersistenceError::SnapshotInvalid { .. })
        ));
    }

    #[test]
    fn triggered_stop_in_pending_list_is_rejected() {
        let mut snapshot = sample_snapshot();
        snapshot.pending_stops[0].stop_triggered = true;
        assert!(matches!(
            snapshot.validate(),
            Err(PersistenceError::SnapshotInvalid { .. })
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut snapshot = sample_snapshot();
        let duplicate = snapshot.active_orders[0].clone();
        snapshot.active_orders.push(duplicate);
        assert!(matches!(
            snapshot.validate(),
            Err(PersistenceError::SnapshotInvalid { .. })
        ));
    }
}
