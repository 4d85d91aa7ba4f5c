//! Performance statistics over the engine's latency samples and fill
//! tape.

use crate::engine::Fill;
use std::collections::HashSet;
use std::fmt;

/// Percentile summary of per-submit latency samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    /// Number of samples.
    pub count: usize,
    /// Smallest sample in nanoseconds.
    pub min_ns: u64,
    /// Largest sample in nanoseconds.
    pub max_ns: u64,
    /// Mean in nanoseconds.
    pub avg_ns: f64,
    /// Median in nanoseconds.
    pub p50_ns: u64,
    /// 95th percentile in nanoseconds.
    pub p95_ns: u64,
    /// 99th percentile in nanoseconds.
    pub p99_ns: u64,
}

impl LatencySummary {
    /// Summarizes a set of latency samples. Returns `None` when empty.
    #[must_use]
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();

        let n = sorted.len();
        let total: u64 = sorted.iter().sum();
        let percentile = |p: f64| sorted[((p * n as f64) as usize).min(n - 1)];

        Some(Self {
            count: n,
            min_ns: sorted[0],
            max_ns: sorted[n - 1],
            avg_ns: total as f64 / n as f64,
            p50_ns: percentile(0.50),
            p95_ns: percentile(0.95),
            p99_ns: percentile(0.99),
        })
    }
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} samples: avg {:.0} ns, min {} ns, max {} ns, p50 {} ns, p95 {} ns, p99 {} ns",
            self.count, self.avg_ns, self.min_ns, self.max_ns, self.p50_ns, self.p95_ns, self.p99_ns
        )
    }
}

/// Volume statistics over a fill tape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSummary {
    /// Number of fills.
    pub total_fills: usize,
    /// Total quantity traded.
    pub total_volume: u64,
    /// Total notional value traded.
    pub total_notional: f64,
    /// Mean fill size.
    pub avg_fill_size: f64,
    /// Volume-weighted average price.
    pub vwap: f64,
    /// Lowest trade price.
    pub min_price: f64,
    /// Highest trade price.
    pub max_price: f64,
}

impl MatchSummary {
    /// Summarizes a fill tape. Returns `None` when empty.
    #[must_use]
    pub fn from_fills(fills: &[Fill]) -> Option<Self> {
        if fills.is_empty() {
            return None;
        }

        let mut total_volume = 0u64;
        let mut total_notional = 0.0;
        let mut min_price = fills[0].price;
        let mut max_price = fills[0].price;
        for fill in fills {
            total_volume += fill.quantity;
            total_notional += fill.notional();
            min_price = min_price.min(fill.price);
            max_price = max_price.max(fill.price);
        }

        Some(Self {
            total_fills: fills.len(),
            total_volume,
            total_notional,
            avg_fill_size: total_volume as f64 / fills.len() as f64,
            vwap: total_notional / total_volume as f64,
            min_price,
            max_price,
        })
    }
}

impl fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fills, {} shares, notional {:.2}, avg size {:.1}, VWAP {:.2}, range {:.2}-{:.2}",
            self.total_fills,
            self.total_volume,
            self.total_notional,
            self.avg_fill_size,
            self.vwap,
            self.min_price,
            self.max_price
        )
    }
}

/// How many submitted orders participated in at least one fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillRateSummary {
    /// Orders submitted.
    pub total_orders: u64,
    /// Distinct orders appearing on either side of a fill.
    pub orders_with_fills: usize,
    /// `orders_with_fills / total_orders`.
    pub fill_rate: f64,
}

impl FillRateSummary {
    /// Computes the fill rate for a tape given the submit count.
    #[must_use]
    pub fn compute(total_orders: u64, fills: &[Fill]) -> Self {
        let mut filled: HashSet<u64> = HashSet::new();
        for fill in fills {
            filled.insert(fill.buy_order_id);
            filled.insert(fill.sell_order_id);
        }
        let orders_with_fills = filled.len();
        let fill_rate = if total_orders == 0 {
            0.0
        } else {
            orders_with_fills as f64 / total_orders as f64
        };
        Self {
            total_orders,
            orders_with_fills,
            fill_rate,
        }
    }
}

impl fmt::Display for FillRateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} orders generated fills ({:.1}%)",
            self.orders_with_fills,
            self.total_orders,
            self.fill_rate * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_summary_percentiles() {
        let samples: Vec<u64> = (1..=100).collect();
        let summary = LatencySummary::from_samples(&samples).unwrap();
        assert_eq!(summary.count, 100);
        assert_eq!(summary.min_ns, 1);
        assert_eq!(summary.max_ns, 100);
        assert_eq!(summary.avg_ns, 50.5);
        assert_eq!(summary.p50_ns, 51);
        assert_eq!(summary.p95_ns, 96);
        assert_eq!(summary.p99_ns, 100);
    }

    #[test]
    fn latency_summary_empty() {
        assert!(LatencySummary::from_samples(&[]).is_none());
    }

    #[test]
    fn match_summary_aggregates() {
        let fills = vec![
            Fill::new(1, 2, 100.0, 50, 0),
            Fill::new(3, 2, 102.0, 50, 0),
        ];
        let summary = MatchSummary::from_fills(&fills).unwrap();
        assert_eq!(summary.total_fills, 2);
        assert_eq!(summary.total_volume, 100);
        assert_eq!(summary.total_notional, 10_100.0);
        assert_eq!(summary.vwap, 101.0);
        assert_eq!(summary.min_price, 100.0);
        assert_eq!(summary.max_price, 102.0);
    }

    #[test]
    fn fill_rate_counts_distinct_orders() {
        let fills = vec![
            Fill::new(1, 2, 100.0, 50, 0),
            Fill::new(3, 2, 100.0, 50, 0),
        ];
        let summary = FillRateSummary::compute(4, &fills);
        assert_eq!(summary.orders_with_fills, 3);
        assert_eq!(summary.fill_rate, 0.75);
    }
}
