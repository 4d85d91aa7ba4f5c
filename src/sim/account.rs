//! Trading accounts and per-symbol positions.
//!
//! Accounts are pure consumers of routed fills: the engine never reads
//! them back, so position math can evolve independently of matching.

use crate::engine::{Fill, Side};
use std::collections::HashMap;
use std::fmt;

/// A net position in one symbol with volume-weighted entry accounting.
#[derive(Debug, Clone)]
pub struct Position {
    /// The symbol this position is in.
    pub symbol: String,
    /// Net quantity: positive = long, negative = short.
    pub quantity: i64,
    /// Volume-weighted average entry price.
    pub average_price: f64,
    /// Locked-in profit and loss from closed quantity.
    pub realized_pnl: f64,
    /// Mark-to-market profit and loss on the open quantity.
    pub unrealized_pnl: f64,
    /// Total cost of the open quantity (for VWAP maintenance).
    pub total_cost_basis: f64,
}

impl Position {
    /// Creates a flat position for `symbol`.
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            quantity: 0,
            average_price: 0.0,
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
            total_cost_basis: 0.0,
        }
    }

    /// Whether the position is flat.
    #[must_use]
    #[inline]
    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }

    /// Whether the position is net long.
    #[must_use]
    #[inline]
    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    /// Whether the position is net short.
    #[must_use]
    #[inline]
    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    /// Re-marks the open quantity against `current_price`.
    pub fn update_unrealized_pnl(&mut self, current_price: f64) {
        if self.quantity == 0 {
            self.unrealized_pnl = 0.0;
            return;
        }
        self.unrealized_pnl = (current_price - self.average_price) * self.quantity as f64;
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} @ {:.2} (realized {:+.2}, unrealized {:+.2})",
            self.symbol, self.quantity, self.average_price, self.realized_pnl, self.unrealized_pnl
        )
    }
}

/// A trading account: cash, fees, positions and trade statistics.
#[derive(Debug, Clone)]
pub struct Account {
    /// Account identifier.
    pub account_id: u64,
    /// Human-readable name.
    pub name: String,
    /// Cash the account started with.
    pub initial_cash: f64,
    /// Current cash balance.
    pub cash_balance: f64,
    /// Total fees paid across all fills.
    pub total_fees_paid: f64,
    /// Open and closed positions by symbol.
    pub positions: HashMap<String, Position>,
    /// Every fill this account participated in.
    pub trade_history: Vec<Fill>,
    /// Number of fills processed.
    pub total_trades: u64,
    /// Closing trades with positive PnL.
    pub winning_trades: u64,
    /// Closing trades with negative PnL.
    pub losing_trades: u64,
    /// Sum of positive closing PnL.
    pub gross_profit: f64,
    /// Sum of absolute negative closing PnL.
    pub gross_loss: f64,
}

impl Account {
    /// Creates an account with the given starting cash.
    #[must_use]
    pub fn new(account_id: u64, name: &str, initial_cash: f64) -> Self {
        Self {
            account_id,
            name: name.to_string(),
            initial_cash,
            cash_balance: initial_cash,
            total_fees_paid: 0.0,
            positions: HashMap::new(),
            trade_history: Vec::new(),
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            gross_profit: 0.0,
            gross_loss: 0.0,
        }
    }

    /// Applies one fill to this account as the given side.
    ///
    /// Cash moves by notional plus fee for buys, notional minus fee for
    /// sells; the per-symbol position is updated with VWAP entry
    /// accounting, realizing PnL on any closing quantity.
    pub fn process_fill(&mut self, fill: &Fill, side: Side, symbol: &str, fee_rate: f64) {
        self.trade_history.push(fill.clone());

        let notional = fill.notional();
        let fee = notional * fee_rate;
        self.total_fees_paid += fee;

        match side {
            Side::Buy => self.cash_balance -= notional + fee,
            Side::Sell => self.cash_balance += notional - fee,
        }

        self.update_position_on_fill(fill, side, symbol);
        self.total_trades += 1;
    }

    fn update_position_on_fill(&mut self, fill: &Fill, side: Side, symbol: &str) {
        let position = self
            .positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position::new(symbol));

        let fill_price = fill.price;
        let signed_qty = match side {
            Side::Buy => fill.quantity as i64,
            Side::Sell => -(fill.quantity as i64),
        };

        let old_qty = position.quantity;
        let old_avg_price = position.average_price;

        let mut closed_pnl: Option<f64> = None;

        if old_qty == 0 {
            position.quantity = signed_qty;
            position.average_price = fill_price;
            position.total_cost_basis = signed_qty.unsigned_abs() as f64 * fill_price;
        } else if (old_qty > 0) == (signed_qty > 0) {
            // Adding in the same direction: blend the entry price.
            let new_qty = old_qty + signed_qty;
            position.total_cost_basis += signed_qty.unsigned_abs() as f64 * fill_price;
            position.average_price = position.total_cost_basis / new_qty.unsigned_abs() as f64;
            position.quantity = new_qty;
        } else {
            let abs_old = old_qty.unsigned_abs();
            let abs_fill = signed_qty.unsigned_abs();

            if abs_fill <= abs_old {
                // Partially or fully closing.
                let exit_pnl = if old_qty > 0 {
                    (fill_price - old_avg_price) * abs_fill as f64
                } else {
                    (old_avg_price - fill_price) * abs_fill as f64
                };
                position.realized_pnl += exit_pnl;
                position.quantity += signed_qty;
                closed_pnl = Some(exit_pnl);

                if position.quantity == 0 {
                    position.average_price = 0.0;
                    position.total_cost_basis = 0.0;
                } else {
                    let reduction = abs_fill as f64 / abs_old as f64;
                    position.total_cost_basis *= 1.0 - reduction;
                }
            } else {
                // Reversing: close everything, open the remainder the
                // other way at the fill price.
                let exit_pnl = if old_qty > 0 {
                    (fill_price - old_avg_price) * abs_old as f64
                } else {
                    (old_avg_price - fill_price) * abs_old as f64
                };
                position.realized_pnl += exit_pnl;
                closed_pnl = Some(exit_pnl);

                let remainder = (abs_fill - abs_old) as i64;
                position.quantity = if signed_qty > 0 { remainder } else { -remainder };
                position.average_price = fill_price;
                position.total_cost_basis = remainder as f64 * fill_price;
            }
        }

        if let Some(pnl) = closed_pnl {
            if pnl > 0.0 {
                self.winning_trades += 1;
                self.gross_profit += pnl;
            } else if pnl < 0.0 {
                self.losing_trades += 1;
                self.gross_loss += pnl.abs();
            }
        }
    }

    /// Realized PnL summed across all positions.
    #[must_use]
    pub fn total_realized_pnl(&self) -> f64 {
        self.positions.values().map(|p| p.realized_pnl).sum()
    }

    /// Unrealized PnL summed across all positions (as last marked).
    #[must_use]
    pub fn total_unrealized_pnl(&self) -> f64 {
        self.positions.values().map(|p| p.unrealized_pnl).sum()
    }

    /// Realized plus mark-to-market PnL against the given prices.
    #[must_use]
    pub fn total_pnl(&self, current_prices: &HashMap<String, f64>) -> f64 {
        let mut total = self.total_realized_pnl();
        for (symbol, position) in &self.positions {
            if position.quantity != 0 {
                if let Some(price) = current_prices.get(symbol) {
                    total += (price - position.average_price) * position.quantity as f64;
                }
            }
        }
        total
    }

    /// Cash plus the market value of all open positions.
    #[must_use]
    pub fn account_value(&self, current_prices: &HashMap<String, f64>) -> f64 {
        let mut value = self.cash_balance;
        for (symbol, position) in &self.positions {
            if position.quantity != 0 {
                if let Some(price) = current_prices.get(symbol) {
                    value += price * position.quantity as f64;
                }
            }
        }
        value
    }

    /// Fraction of closing trades that realized a profit.
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        let closed = self.winning_trades + self.losing_trades;
        if closed == 0 {
            return 0.0;
        }
        self.winning_trades as f64 / closed as f64
    }

    /// Gross profit over gross loss.
    #[must_use]
    pub fn profit_factor(&self) -> f64 {
        if self.gross_loss == 0.0 {
            return if self.gross_profit > 0.0 { f64::INFINITY } else { 0.0 };
        }
        self.gross_profit / self.gross_loss
    }

    /// Realized PnL as a fraction of starting capital.
    #[must_use]
    pub fn return_on_capital(&self) -> f64 {
        if self.initial_cash == 0.0 {
            return 0.0;
        }
        self.total_realized_pnl() / self.initial_cash
    }

    /// Multi-line account report against the given prices.
    #[must_use]
    pub fn summary(&self, current_prices: &HashMap<String, f64>) -> String {
        let mut out = format!(
            "account {} ({}): cash {:.2}, fees {:.2}, {} trades, win rate {:.1}%\n",
            self.account_id,
            self.name,
            self.cash_balance,
            self.total_fees_paid,
            self.total_trades,
            self.win_rate() * 100.0
        );
        for position in self.positions.values() {
            if !position.is_flat() || position.realized_pnl != 0.0 {
                out.push_str(&format!("  {position}\n"));
            }
        }
        out.push_str(&format!(
            "  total PnL {:+.2}, account value {:.2}",
            self.total_pnl(current_prices),
            self.account_value(current_prices)
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(price: f64, qty: u64) -> Fill {
        Fill::new(1, 2, price, qty, 0)
    }

    #[test]
    fn buy_reduces_cash_and_opens_long() {
        let mut account = Account::new(1, "test", 100_000.0);
        account.process_fill(&fill(100.0, 50), Side::Buy, "SYM", 0.0);

        assert_eq!(account.cash_balance, 95_000.0);
        let position = &account.positions["SYM"];
        assert_eq!(position.quantity, 50);
        assert_eq!(position.average_price, 100.0);
        assert!(position.is_long());
    }

    #[test]
    fn adding_to_position_blends_average_price() {
        let mut account = Account::new(1, "test", 100_000.0);
        account.process_fill(&fill(100.0, 50), Side::Buy, "SYM", 0.0);
        account.process_fill(&fill(110.0, 50), Side::Buy, "SYM", 0.0);

        let position = &account.positions["SYM"];
        assert_eq!(position.quantity, 100);
        assert_eq!(position.average_price, 105.0);
    }

    #[test]
    fn closing_realizes_pnl() {
        let mut account = Account::new(1, "test", 100_000.0);
        account.process_fill(&fill(100.0, 100), Side::Buy, "SYM", 0.0);
        account.process_fill(&fill(110.0, 100), Side::Sell, "SYM", 0.0);

        let position = &account.positions["SYM"];
        assert!(position.is_flat());
        assert_eq!(position.realized_pnl, 1_000.0);
        assert_eq!(account.winning_trades, 1);
        assert_eq!(account.total_realized_pnl(), 1_000.0);
        // 100k - 10k + 11k
        assert_eq!(account.cash_balance, 101_000.0);
    }

    #[test]
    fn partial_close_keeps_cost_basis_proportional() {
        let mut account = Account::new(1, "test", 100_000.0);
        account.process_fill(&fill(100.0, 100), Side::Buy, "SYM", 0.0);
        account.process_fill(&fill(90.0, 40), Side::Sell, "SYM", 0.0);

        let position = &account.positions["SYM"];
        assert_eq!(position.quantity, 60);
        assert_eq!(position.average_price, 100.0);
        assert_eq!(position.realized_pnl, -400.0);
        assert_eq!(position.total_cost_basis, 6_000.0);
        assert_eq!(account.losing_trades, 1);
    }

    #[test]
    fn reversal_opens_opposite_position_at_fill_price() {
        let mut account = Account::new(1, "test", 100_000.0);
        account.process_fill(&fill(100.0, 50), Side::Buy, "SYM", 0.0);
        account.process_fill(&fill(105.0, 80), Side::Sell, "SYM", 0.0);

        let position = &account.positions["SYM"];
        assert_eq!(position.quantity, -30);
        assert_eq!(position.average_price, 105.0);
        assert_eq!(position.realized_pnl, 250.0);
        assert!(position.is_short());
    }

    #[test]
    fn fees_accumulate() {
        let mut account = Account::new(1, "test", 10_000.0);
        account.process_fill(&fill(100.0, 10), Side::Buy, "SYM", 0.001);
        assert_eq!(account.total_fees_paid, 1.0);
        assert_eq!(account.cash_balance, 10_000.0 - 1_000.0 - 1.0);
    }

    #[test]
    fn mark_to_market_pnl() {
        let mut account = Account::new(1, "test", 100_000.0);
        account.process_fill(&fill(100.0, 100), Side::Buy, "SYM", 0.0);

        let mut prices = HashMap::new();
        prices.insert("SYM".to_string(), 104.0);
        assert_eq!(account.total_pnl(&prices), 400.0);
        assert_eq!(account.account_value(&prices), 100_400.0);
    }
}
