//! Fee schedule applied by the fill router.

use serde::{Deserialize, Serialize};

/// Maker and taker fee rates, expressed as fractions of notional
/// (`0.0005` = 5 basis points).
///
/// The taker side of a fill pays the taker rate; the maker side pays
/// the maker rate. Both rates default to zero.
///
/// # Examples
///
/// ```
/// use matchbook_rs::FeeSchedule;
///
/// let schedule = FeeSchedule::new(0.0005, 0.0010);
/// // 10 bps taker fee on a $10,000 trade = $10.00
/// assert_eq!(schedule.fee_for(10_000.0, false), 10.0);
/// // 5 bps maker fee = $5.00
/// assert_eq!(schedule.fee_for(10_000.0, true), 5.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Maker fee rate as a fraction of notional.
    pub maker_rate: f64,
    /// Taker fee rate as a fraction of notional.
    pub taker_rate: f64,
}

impl FeeSchedule {
    /// Creates a fee schedule. Rates are fractions of notional and are
    /// expected to be non-negative.
    #[must_use = "FeeSchedule does nothing unless used"]
    pub fn new(maker_rate: f64, taker_rate: f64) -> Self {
        Self {
            maker_rate,
            taker_rate,
        }
    }

    /// A schedule charging no fees on either side.
    #[must_use]
    pub fn zero_fee() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Fee amount for a trade of the given notional value.
    #[must_use = "fee calculation result must be used"]
    #[inline]
    pub fn fee_for(&self, notional: f64, is_maker: bool) -> f64 {
        let rate = if is_maker {
            self.maker_rate
        } else {
            self.taker_rate
        };
        notional * rate
    }

    /// Whether both rates are zero.
    #[must_use]
    #[inline]
    pub fn is_zero_fee(&self) -> bool {
        self.maker_rate == 0.0 && self.taker_rate == 0.0
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::zero_fee()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_fee_default() {
        let schedule = FeeSchedule::default();
        assert!(schedule.is_zero_fee());
        assert_eq!(schedule.fee_for(1_000_000.0, true), 0.0);
        assert_eq!(schedule.fee_for(1_000_000.0, false), 0.0);
    }

    #[test]
    fn test_maker_and_taker_rates() {
        let schedule = FeeSchedule::new(0.0002, 0.0005);
        let notional = 250.50 * 200.0;
        assert_eq!(schedule.fee_for(notional, true), notional * 0.0002);
        assert_eq!(schedule.fee_for(notional, false), notional * 0.0005);
        assert!(!schedule.is_zero_fee());
    }

    #[test]
    fn test_serialization_round_trip() {
        let schedule = FeeSchedule::new(0.0001, 0.0003);
        let json = serde_json::to_string(&schedule).unwrap();
        let back: FeeSchedule = serde_json::from_str(&json).unwrap();
        assert_eq!(schedule, back);
    }
}
