//! Append-only event log entries and their CSV wire form.
//!
//! Every book mutation (new order, cancel, amend, fill) appends one
//! event when logging is enabled. The CSV column order is part of the
//! external contract; unused fields per event type are left empty.
//! FILL rows are advisory: replay regenerates fills deterministically
//! instead of re-applying them.

use super::error::PersistenceError;
use super::fill::Fill;
use super::order::{Order, OrderType, Side, TimeInForce};
use serde::{Deserialize, Serialize};
use std::fmt;

/// CSV header row; the column order is part of the contract.
pub const EVENT_CSV_HEADER: &str = "timestamp_ns,event_type,order_id,side,order_type,tif,price,\
     quantity,peak_size,account_id,new_price,new_quantity,buy_order_id,sell_order_id,fill_price,\
     fill_quantity";

const EVENT_CSV_COLUMNS: usize = 16;

/// Discriminant of an [`OrderEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// A new order entered the engine.
    NewOrder,
    /// A cancel request was issued.
    CancelOrder,
    /// An amend request was issued.
    AmendOrder,
    /// A trade was printed.
    Fill,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::NewOrder => write!(f, "NEW"),
            EventType::CancelOrder => write!(f, "CANCEL"),
            EventType::AmendOrder => write!(f, "AMEND"),
            EventType::Fill => write!(f, "FILL"),
        }
    }
}

/// One entry in the append-only event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderEvent {
    /// A new order was submitted. Market orders log `price = 0.0`;
    /// `peak_size > 0` marks an iceberg.
    New {
        /// Wall-clock nanoseconds since the Unix epoch.
        timestamp_ns: i64,
        /// The order id.
        order_id: u64,
        /// Buy or sell.
        side: Side,
        /// Limit or market.
        order_type: OrderType,
        /// Time-in-force.
        tif: TimeInForce,
        /// Limit price; `0.0` on the wire for market orders.
        price: f64,
        /// Original quantity.
        quantity: u64,
        /// Iceberg reveal size; `0` for plain orders.
        peak_size: u64,
        /// Owning account.
        account_id: u64,
    },

    /// A cancel was requested (logged whether or not it succeeded, so
    /// replay applies the same call sequence).
    Cancel {
        /// Wall-clock nanoseconds since the Unix epoch.
        timestamp_ns: i64,
        /// The order id.
        order_id: u64,
    },

    /// An amend was requested. Absent fields keep the previous values.
    Amend {
        /// Wall-clock nanoseconds since the Unix epoch.
        timestamp_ns: i64,
        /// The order id.
        order_id: u64,
        /// Replacement price, if any.
        new_price: Option<f64>,
        /// Replacement quantity, if any.
        new_quantity: Option<u64>,
    },

    /// A trade printed. Advisory on replay.
    Fill {
        /// Wall-clock nanoseconds since the Unix epoch.
        timestamp_ns: i64,
        /// Id of the buying order.
        buy_order_id: u64,
        /// Id of the selling order.
        sell_order_id: u64,
        /// Execution price.
        price: f64,
        /// Executed quantity.
        quantity: u64,
    },
}

impl OrderEvent {
    /// Builds a NEW event from an order about to be matched.
    ///
    /// Market orders log a zero price so the wire format never carries
    /// the internal sentinel.
    #[must_use]
    pub fn new_order(order: &Order, timestamp_ns: i64) -> Self {
        let price = if order.is_market_order() { 0.0 } else { order.price };
        OrderEvent::New {
            timestamp_ns,
            order_id: order.id,
            side: order.side,
            order_type: order.order_type,
            tif: order.tif,
            price,
            quantity: order.quantity,
            peak_size: order.peak_size,
            account_id: order.account_id,
        }
    }

    /// Builds a CANCEL event.
    #[must_use]
    pub fn cancel(order_id: u64, timestamp_ns: i64) -> Self {
        OrderEvent::Cancel {
            timestamp_ns,
            order_id,
        }
    }

    /// Builds an AMEND event.
    #[must_use]
    pub fn amend(
        order_id: u64,
        new_price: Option<f64>,
        new_quantity: Option<u64>,
        timestamp_ns: i64,
    ) -> Self {
        OrderEvent::Amend {
            timestamp_ns,
            order_id,
            new_price,
            new_quantity,
        }
    }

    /// Builds a FILL event from a trade print.
    #[must_use]
    pub fn fill(fill: &Fill) -> Self {
        OrderEvent::Fill {
            timestamp_ns: fill.timestamp_ns,
            buy_order_id: fill.buy_order_id,
            sell_order_id: fill.sell_order_id,
            price: fill.price,
            quantity: fill.quantity,
        }
    }

    /// The event discriminant.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            OrderEvent::New { .. } => EventType::NewOrder,
            OrderEvent::Cancel { .. } => EventType::CancelOrder,
            OrderEvent::Amend { .. } => EventType::AmendOrder,
            OrderEvent::Fill { .. } => EventType::Fill,
        }
    }

    /// Wall-clock timestamp of the event in nanoseconds since epoch.
    #[must_use]
    pub fn timestamp_ns(&self) -> i64 {
        match self {
            OrderEvent::New { timestamp_ns, .. }
            | OrderEvent::Cancel { timestamp_ns, .. }
            | OrderEvent::Amend { timestamp_ns, .. }
            | OrderEvent::Fill { timestamp_ns, .. } => *timestamp_ns,
        }
    }

    /// Serializes the event as one CSV row (no trailing newline).
    #[must_use]
    pub fn to_csv(&self) -> String {
        match self {
            OrderEvent::New {
                timestamp_ns,
                order_id,
                side,
                order_type,
                tif,
                price,
                quantity,
                peak_size,
                account_id,
            } => format!(
                "{timestamp_ns},NEW,{order_id},{side},{order_type},{tif},{price},{quantity},\
                 {peak_size},{account_id},,,,,,"
            ),
            OrderEvent::Cancel {
                timestamp_ns,
                order_id,
            } => format!("{timestamp_ns},CANCEL,{order_id},,,,,,,,,,,,,"),
            OrderEvent::Amend {
                timestamp_ns,
                order_id,
                new_price,
                new_quantity,
            } => {
                let np = new_price.map(|p| p.to_string()).unwrap_or_default();
                let nq = new_quantity.map(|q| q.to_string()).unwrap_or_default();
                format!("{timestamp_ns},AMEND,{order_id},,,,,,,,{np},{nq},,,,")
            }
            OrderEvent::Fill {
                timestamp_ns,
                buy_order_id,
                sell_order_id,
                price,
                quantity,
            } => format!(
                "{timestamp_ns},FILL,,,,,,,,,,,{buy_order_id},{sell_order_id},{price},{quantity}"
            ),
        }
    }

    /// Parses one CSV row.
    ///
    /// `line_number` is 1-based and only used for error reporting.
    ///
    /// # Errors
    /// `EventParse` on a wrong column count, an unknown event type, or
    /// a field that fails lexical parsing. All parse failures are fatal
    /// to the surrounding load operation.
    pub fn from_csv(line: &str, line_number: usize) -> Result<Self, PersistenceError> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != EVENT_CSV_COLUMNS {
            return Err(PersistenceError::EventParse {
                line_number,
                message: format!(
                    "expected {EVENT_CSV_COLUMNS} columns, found {}",
                    fields.len()
                ),
            });
        }

        let parse_err = |message: String| PersistenceError::EventParse {
            line_number,
            message,
        };

        let timestamp_ns: i64 = fields[0]
            .parse()
            .map_err(|_| parse_err(format!("bad timestamp: {:?}", fields[0])))?;

        match fields[1] {
            "NEW" => {
                let order_id = parse_u64(fields[2], "order_id", line_number)?;
                let side = match fields[3] {
                    "BUY" => Side::Buy,
                    "SELL" => Side::Sell,
                    other => return Err(parse_err(format!("bad side: {other:?}"))),
                };
                let order_type = match fields[4] {
                    "LIMIT" => OrderType::Limit,
                    "MARKET" => OrderType::Market,
                    other => return Err(parse_err(format!("bad order type: {other:?}"))),
                };
                let tif = match fields[5] {
                    "GTC" => TimeInForce::Gtc,
                    "IOC" => TimeInForce::Ioc,
                    "FOK" => TimeInForce::Fok,
                    "DAY" => TimeInForce::Day,
                    other => return Err(parse_err(format!("bad tif: {other:?}"))),
                };
                let price = parse_f64(fields[6], "price", line_number)?;
                let quantity = parse_u64(fields[7], "quantity", line_number)?;
                let peak_size = parse_u64(fields[8], "peak_size", line_number)?;
                let account_id = parse_u64(fields[9], "account_id", line_number)?;
                Ok(OrderEvent::New {
                    timestamp_ns,
                    order_id,
                    side,
                    order_type,
                    tif,
                    price,
                    quantity,
                    peak_size,
                    account_id,
                })
            }
            "CANCEL" => Ok(OrderEvent::Cancel {
                timestamp_ns,
                order_id: parse_u64(fields[2], "order_id", line_number)?,
            }),
            "AMEND" => {
                let order_id = parse_u64(fields[2], "order_id", line_number)?;
                let new_price = if fields[10].is_empty() {
                    None
                } else {
                    Some(parse_f64(fields[10], "new_price", line_number)?)
                };
                let new_quantity = if fields[11].is_empty() {
                    None
                } else {
                    Some(parse_u64(fields[11], "new_quantity", line_number)?)
                };
                Ok(OrderEvent::Amend {
                    timestamp_ns,
                    order_id,
                    new_price,
                    new_quantity,
                })
            }
            "FILL" => Ok(OrderEvent::Fill {
                timestamp_ns,
                buy_order_id: parse_u64(fields[12], "buy_order_id", line_number)?,
                sell_order_id: parse_u64(fields[13], "sell_order_id", line_number)?,
                price: parse_f64(fields[14], "fill_price", line_number)?,
                quantity: parse_u64(fields[15], "fill_quantity", line_number)?,
            }),
            other => Err(parse_err(format!("unknown event type: {other:?}"))),
        }
    }
}

fn parse_u64(field: &str, name: &str, line_number: usize) -> Result<u64, PersistenceError> {
    field.parse().map_err(|_| PersistenceError::EventParse {
        line_number,
        message: format!("bad {name}: {field:?}"),
    })
}

fn parse_f64(field: &str, name: &str, line_number: usize) -> Result<f64, PersistenceError> {
    field.parse().map_err(|_| PersistenceError::EventParse {
        line_number,
        message: format!("bad {name}: {field:?}"),
    })
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderEvent::New {
                order_id,
                side,
                order_type,
                tif,
                price,
                quantity,
                peak_size,
                ..
            } => {
                write!(
                    f,
                    "NEW #{order_id} {side} {order_type} {tif} @{price:.2} qty={quantity}"
                )?;
                if *peak_size > 0 {
                    write!(f, " peak={peak_size}")?;
                }
                Ok(())
            }
            OrderEvent::Cancel { order_id, .. } => write!(f, "CANCEL #{order_id}"),
            OrderEvent::Amend {
                order_id,
                new_price,
                new_quantity,
                ..
            } => {
                write!(f, "AMEND #{order_id}")?;
                if let Some(p) = new_price {
                    write!(f, " new_price={p:.2}")?;
                }
                if let Some(q) = new_quantity {
                    write!(f, " new_qty={q}")?;
                }
                Ok(())
            }
            OrderEvent::Fill {
                buy_order_id,
                sell_order_id,
                price,
                quantity,
                ..
            } => write!(
                f,
                "FILL buy=#{buy_order_id} sell=#{sell_order_id} {quantity} @ {price:.2}"
            ),
        }
    }
}
