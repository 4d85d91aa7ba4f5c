//! Engine and persistence error types.

use std::fmt;
use std::path::PathBuf;

/// Errors surfaced by order construction and the synchronous engine API.
///
/// Recoverable conditions (cancel/amend on unknown or terminal orders)
/// are reported as `bool`/`Option` results on the book itself; these
/// variants cover validation failures that reject an order outright.
#[derive(Debug)]
#[non_exhaustive]
pub enum EngineError {
    /// Order quantity must be strictly positive.
    InvalidQuantity {
        /// The rejected quantity.
        quantity: u64,
    },

    /// Limit price is non-positive or not finite.
    InvalidPrice {
        /// The rejected price.
        price: f64,
    },

    /// Iceberg peak size must be strictly positive.
    InvalidPeakSize {
        /// The rejected peak size.
        peak_size: u64,
        /// The order quantity it was checked against.
        quantity: u64,
    },

    /// Stop trigger price is non-positive or not finite.
    InvalidStopPrice {
        /// The rejected trigger price.
        stop_price: f64,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidQuantity { quantity } => {
                write!(f, "invalid quantity: {quantity} (must be > 0)")
            }
            EngineError::InvalidPrice { price } => {
                write!(f, "invalid price: {price} (must be finite and > 0)")
            }
            EngineError::InvalidPeakSize {
                peak_size,
                quantity,
            } => {
                write!(
                    f,
                    "invalid iceberg peak size: {peak_size} (quantity {quantity})"
                )
            }
            EngineError::InvalidStopPrice { stop_price } => {
                write!(
                    f,
                    "invalid stop price: {stop_price} (must be finite and > 0)"
                )
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Errors raised by the persistence layer (event log, snapshots,
/// checkpoints) and the replay engine.
///
/// All of these are fatal to the operation that raised them but never
/// corrupt in-memory state: a failed load leaves the book untouched.
#[derive(Debug)]
#[non_exhaustive]
pub enum PersistenceError {
    /// An I/O error while reading or writing a persistence file.
    Io {
        /// The underlying I/O error message.
        message: String,
        /// The file path involved, if known.
        path: Option<PathBuf>,
    },

    /// The snapshot carries an unknown or unsupported schema version.
    SnapshotSchema {
        /// The version found in the file.
        found: String,
        /// The version this build understands.
        expected: String,
    },

    /// Snapshot integrity check failed.
    ChecksumMismatch {
        /// Expected checksum value.
        expected: String,
        /// Checksum computed from the payload.
        actual: String,
    },

    /// Snapshot payload failed serialization.
    Serialization {
        /// Underlying error message.
        message: String,
    },

    /// Snapshot payload failed deserialization.
    Deserialization {
        /// Underlying error message.
        message: String,
    },

    /// Snapshot content failed validation after decoding.
    SnapshotInvalid {
        /// What the validation found.
        message: String,
    },

    /// A malformed row in an event-log CSV file.
    EventParse {
        /// 1-based line number of the offending row.
        line_number: usize,
        /// What went wrong.
        message: String,
    },

    /// An event decoded cleanly but cannot be applied to a book.
    InvalidEvent {
        /// What went wrong.
        message: String,
    },
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Io { message, path } => {
                if let Some(p) = path {
                    write!(f, "I/O error at {}: {message}", p.display())
                } else {
                    write!(f, "I/O error: {message}")
                }
            }
            PersistenceError::SnapshotSchema { found, expected } => {
                write!(
                    f,
                    "unsupported snapshot schema version: {found} (expected {expected})"
                )
            }
            PersistenceError::ChecksumMismatch { expected, actual } => {
                write!(
                    f,
                    "snapshot checksum mismatch: expected {expected}, computed {actual}"
                )
            }
            PersistenceError::Serialization { message } => {
                write!(f, "serialization error: {message}")
            }
            PersistenceError::Deserialization { message } => {
                write!(f, "deserialization error: {message}")
            }
            PersistenceError::SnapshotInvalid { message } => {
                write!(f, "snapshot validation failed: {message}")
            }
            PersistenceError::EventParse {
                line_number,
                message,
            } => {
                write!(f, "event parse error at line {line_number}: {message}")
            }
            PersistenceError::InvalidEvent { message } => {
                write!(f, "invalid event: {message}")
            }
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<std::io::Error> for PersistenceError {
    #[cold]
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}
