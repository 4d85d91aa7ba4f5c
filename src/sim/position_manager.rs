//! Multi-account position manager.
//!
//! Receives routed fills from the book's fill router (via the
//! boundary-adapter callback) and applies each to both counterparty
//! accounts. The core engine never depends on this type existing;
//! absent registration, fills are still recorded in the router.

use super::account::Account;
use crate::engine::{Fill, Side};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Registry of accounts plus the current mark prices per symbol.
pub struct PositionManager {
    accounts: HashMap<u64, Account>,
    current_prices: HashMap<String, f64>,
    default_fee_rate: f64,
}

impl PositionManager {
    /// Creates a manager charging `fee_rate` (fraction of notional) on
    /// every account-side fill.
    #[must_use]
    pub fn new(fee_rate: f64) -> Self {
        Self {
            accounts: HashMap::new(),
            current_prices: HashMap::new(),
            default_fee_rate: fee_rate,
        }
    }

    /// Registers an account. Replaces any previous account under the
    /// same id.
    pub fn create_account(&mut self, account_id: u64, name: &str, initial_cash: f64) {
        self.accounts
            .insert(account_id, Account::new(account_id, name, initial_cash));
    }

    /// Whether an account exists.
    #[must_use]
    pub fn has_account(&self, account_id: u64) -> bool {
        self.accounts.contains_key(&account_id)
    }

    /// Shared access to an account.
    #[must_use]
    pub fn account(&self, account_id: u64) -> Option<&Account> {
        self.accounts.get(&account_id)
    }

    /// Mutable access to an account.
    pub fn account_mut(&mut self, account_id: u64) -> Option<&mut Account> {
        self.accounts.get_mut(&account_id)
    }

    /// All registered account ids, sorted.
    #[must_use]
    pub fn account_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.accounts.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Applies a fill to both counterparties and updates the symbol's
    /// mark price. Unknown accounts are skipped with a warning so a
    /// partially-configured simulation keeps running.
    pub fn process_fill(
        &mut self,
        fill: &Fill,
        buy_account_id: u64,
        sell_account_id: u64,
        symbol: &str,
    ) {
        let fee_rate = self.default_fee_rate;
        match self.accounts.get_mut(&buy_account_id) {
            Some(account) => account.process_fill(fill, Side::Buy, symbol, fee_rate),
            None => warn!(account_id = buy_account_id, "fill for unknown buy account"),
        }
        match self.accounts.get_mut(&sell_account_id) {
            Some(account) => account.process_fill(fill, Side::Sell, symbol, fee_rate),
            None => warn!(account_id = sell_account_id, "fill for unknown sell account"),
        }

        self.update_price(symbol, fill.price);
        debug!(
            buy_account_id,
            sell_account_id,
            symbol,
            price = fill.price,
            quantity = fill.quantity,
            "fill processed"
        );
    }

    /// Updates the mark price for one symbol and re-marks every
    /// account's open position in it.
    pub fn update_price(&mut self, symbol: &str, price: f64) {
        self.current_prices.insert(symbol.to_string(), price);
        for account in self.accounts.values_mut() {
            if let Some(position) = account.positions.get_mut(symbol) {
                position.update_unrealized_pnl(price);
            }
        }
    }

    /// Current mark price for a symbol.
    #[must_use]
    pub fn current_price(&self, symbol: &str) -> Option<f64> {
        self.current_prices.get(symbol).copied()
    }

    /// All current mark prices.
    #[must_use]
    pub fn current_prices(&self) -> &HashMap<String, f64> {
        &self.current_prices
    }

    /// Sum of account values across all accounts.
    #[must_use]
    pub fn total_account_value(&self) -> f64 {
        self.accounts
            .values()
            .map(|a| a.account_value(&self.current_prices))
            .sum()
    }

    /// Sum of realized + mark-to-market PnL across all accounts.
    #[must_use]
    pub fn total_pnl(&self) -> f64 {
        self.accounts
            .values()
            .map(|a| a.total_pnl(&self.current_prices))
            .sum()
    }

    /// Sum of fees paid across all accounts.
    #[must_use]
    pub fn total_fees_paid(&self) -> f64 {
        self.accounts.values().map(|a| a.total_fees_paid).sum()
    }

    /// Total fills processed across all accounts.
    #[must_use]
    pub fn total_trades(&self) -> u64 {
        self.accounts.values().map(|a| a.total_trades).sum()
    }

    /// Resets one account to its starting cash, dropping positions and
    /// history. Returns `false` for unknown accounts.
    pub fn reset_account(&mut self, account_id: u64) -> bool {
        let Some(account) = self.accounts.get_mut(&account_id) else {
            return false;
        };
        let name = account.name.clone();
        *account = Account::new(account_id, &name, account.initial_cash);
        true
    }

    /// Resets every account and clears the mark prices.
    pub fn reset(&mut self) {
        let ids = self.account_ids();
        for id in ids {
            self.reset_account(id);
        }
        self.current_prices.clear();
    }

    /// Multi-line report over all accounts.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} accounts, total value {:.2}, total PnL {:+.2}, fees {:.2}\n",
            self.accounts.len(),
            self.total_account_value(),
            self.total_pnl(),
            self.total_fees_paid()
        );
        for id in self.account_ids() {
            if let Some(account) = self.accounts.get(&id) {
                out.push_str(&account.summary(&self.current_prices));
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_fill_to_both_counterparties() {
        let mut manager = PositionManager::new(0.0);
        manager.create_account(1, "buyer", 100_000.0);
        manager.create_account(2, "seller", 100_000.0);

        let fill = Fill::new(10, 11, 100.0, 50, 0);
        manager.process_fill(&fill, 1, 2, "SYM");

        assert_eq!(manager.account(1).unwrap().positions["SYM"].quantity, 50);
        assert_eq!(manager.account(2).unwrap().positions["SYM"].quantity, -50);
        assert_eq!(manager.current_price("SYM"), Some(100.0));
        assert_eq!(manager.total_trades(), 2);
    }

    #[test]
    fn total_pnl_is_zero_sum_without_fees() {
        let mut manager = PositionManager::new(0.0);
        manager.create_account(1, "buyer", 100_000.0);
        manager.create_account(2, "seller", 100_000.0);

        manager.process_fill(&Fill::new(10, 11, 100.0, 50, 0), 1, 2, "SYM");
        manager.update_price("SYM", 110.0);

        let buyer_pnl = manager.account(1).unwrap().total_pnl(manager.current_prices());
        let seller_pnl = manager.account(2).unwrap().total_pnl(manager.current_prices());
        assert_eq!(buyer_pnl, 500.0);
        assert_eq!(seller_pnl, -500.0);
        assert_eq!(manager.total_pnl(), 0.0);
    }

    #[test]
    fn unknown_account_is_skipped() {
        let mut manager = PositionManager::new(0.0);
        manager.create_account(1, "buyer", 100_000.0);
        manager.process_fill(&Fill::new(10, 11, 100.0, 50, 0), 1, 99, "SYM");
        assert_eq!(manager.total_trades(), 1);
    }

    #[test]
    fn reset_restores_starting_state() {
        let mut manager = PositionManager::new(0.0);
        manager.create_account(1, "trader", 50_000.0);
        manager.process_fill(&Fill::new(10, 11, 100.0, 50, 0), 1, 1, "SYM");

        manager.reset();
        let account = manager.account(1).unwrap();
        assert_eq!(account.cash_balance, 50_000.0);
        assert!(account.positions.is_empty());
        assert!(manager.current_prices().is_empty());
    }
}
