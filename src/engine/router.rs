//! Account-aware fill routing: self-trade prevention, liquidity
//! flagging, fee attribution, per-account and per-symbol indexing, and
//! synchronous callback dispatch.
//!
//! The matching engine calls [`FillRouter::route_fill`] *before*
//! committing a candidate trade. A `false` return (self-trade) makes
//! the engine discard the trade with both orders untouched. Callbacks
//! run synchronously inside the submit that produced the fill and must
//! not re-enter the engine; callers buffer intended actions and
//! dispatch them after the top-level submit returns.

use super::fees::FeeSchedule;
use super::fill::{EnhancedFill, Fill, LiquidityFlag};
use super::order::{Order, Side};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Callback invoked for every routed fill.
pub type FillCallback = Arc<dyn Fn(&EnhancedFill) + Send + Sync>;

/// Callback invoked when a fill is rejected by self-trade prevention.
/// Receives the offending account id and both orders.
pub type SelfTradeCallback = Arc<dyn Fn(u64, &Order, &Order) + Send + Sync>;

/// Routes base fills into account-attributed [`EnhancedFill`]s.
pub struct FillRouter {
    next_fill_id: u64,
    fills: Vec<EnhancedFill>,
    fills_by_account: HashMap<u64, Vec<usize>>,
    fills_by_symbol: HashMap<String, Vec<usize>>,
    fill_index_by_id: HashMap<u64, usize>,
    fee_schedule: FeeSchedule,
    self_trade_prevention: bool,
    self_trades_prevented: u64,
    on_fill: Vec<FillCallback>,
    on_self_trade: Vec<SelfTradeCallback>,
}

impl FillRouter {
    /// Creates a router. Fees start at zero.
    #[must_use]
    pub fn new(self_trade_prevention: bool) -> Self {
        Self {
            next_fill_id: 1,
            fills: Vec::new(),
            fills_by_account: HashMap::new(),
            fills_by_symbol: HashMap::new(),
            fill_index_by_id: HashMap::new(),
            fee_schedule: FeeSchedule::zero_fee(),
            self_trade_prevention,
            self_trades_prevented: 0,
            on_fill: Vec::new(),
            on_self_trade: Vec::new(),
        }
    }

    /// Toggles self-trade prevention.
    pub fn set_self_trade_prevention(&mut self, enabled: bool) {
        self.self_trade_prevention = enabled;
    }

    /// Whether self-trade prevention is active.
    #[must_use]
    pub fn self_trade_prevention(&self) -> bool {
        self.self_trade_prevention
    }

    /// Sets maker and taker fee rates (fractions of notional).
    pub fn set_fee_schedule(&mut self, maker_rate: f64, taker_rate: f64) {
        self.fee_schedule = FeeSchedule::new(maker_rate, taker_rate);
    }

    /// The active fee schedule.
    #[must_use]
    pub fn fee_schedule(&self) -> FeeSchedule {
        self.fee_schedule
    }

    /// Registers a callback fired for every routed fill.
    pub fn register_fill_callback(&mut self, callback: FillCallback) {
        self.on_fill.push(callback);
    }

    /// Registers a callback fired on every prevented self-trade.
    pub fn register_self_trade_callback(&mut self, callback: SelfTradeCallback) {
        self.on_self_trade.push(callback);
    }

    /// Routes one candidate fill.
    ///
    /// Returns `false` when self-trade prevention rejects it (same
    /// non-anonymous account on both sides, prevention enabled);
    /// statistics and self-trade callbacks still fire. Account `0` is
    /// anonymous and always bypasses the check. On acceptance the
    /// enhanced fill is recorded, indexed, and delivered to the fill
    /// callbacks.
    pub fn route_fill(
        &mut self,
        fill: &Fill,
        aggressive: &Order,
        passive: &Order,
        symbol: &str,
    ) -> bool {
        if self.self_trade_prevention
            && aggressive.account_id != 0
            && aggressive.account_id == passive.account_id
        {
            self.self_trades_prevented += 1;
            debug!(
                account_id = aggressive.account_id,
                aggressive_id = aggressive.id,
                passive_id = passive.id,
                "self-trade prevented"
            );
            for callback in &self.on_self_trade {
                callback(aggressive.account_id, aggressive, passive);
            }
            return false;
        }

        let fill_id = self.next_fill_id;
        self.next_fill_id += 1;

        let is_aggressive_buy = aggressive.side == Side::Buy;
        let (buy_account_id, sell_account_id) = if is_aggressive_buy {
            (aggressive.account_id, passive.account_id)
        } else {
            (passive.account_id, aggressive.account_id)
        };

        let liquidity_flag = Self::classify_liquidity(aggressive, passive);
        let notional = fill.notional();
        let (aggressor_fee, passive_fee) = match liquidity_flag {
            LiquidityFlag::Taker => (
                self.fee_schedule.fee_for(notional, false),
                self.fee_schedule.fee_for(notional, true),
            ),
            LiquidityFlag::Maker => (
                self.fee_schedule.fee_for(notional, true),
                self.fee_schedule.fee_for(notional, false),
            ),
            LiquidityFlag::MakerMaker => (
                self.fee_schedule.fee_for(notional, true),
                self.fee_schedule.fee_for(notional, true),
            ),
        };
        let (buyer_fee, seller_fee) = if is_aggressive_buy {
            (aggressor_fee, passive_fee)
        } else {
            (passive_fee, aggressor_fee)
        };

        let enhanced = EnhancedFill {
            fill_id,
            base_fill: fill.clone(),
            buy_account_id,
            sell_account_id,
            symbol: symbol.to_string(),
            is_aggressive_buy,
            liquidity_flag,
            buyer_fee,
            seller_fee,
        };

        let index = self.fills.len();
        self.fill_index_by_id.insert(fill_id, index);
        self.fills_by_account
            .entry(buy_account_id)
            .or_default()
            .push(index);
        if sell_account_id != buy_account_id {
            self.fills_by_account
                .entry(sell_account_id)
                .or_default()
                .push(index);
        }
        self.fills_by_symbol
            .entry(symbol.to_string())
            .or_default()
            .push(index);
        self.fills.push(enhanced);

        trace!(fill_id, symbol, "fill routed");
        let enhanced = &self.fills[index];
        for callback in &self.on_fill {
            callback(enhanced);
        }
        true
    }

    /// Liquidity role of the aggressor. A market order or a crossing
    /// limit removes liquidity (TAKER). When the roles arrive inverted
    /// from a synthetic feed, with the passive side a market order
    /// hitting a non-crossing quote, the aggressor only provided
    /// liquidity (MAKER); a symmetric print where neither side crossed
    /// is MAKER_MAKER.
    fn classify_liquidity(aggressive: &Order, passive: &Order) -> LiquidityFlag {
        if aggressive.is_market_order() {
            return LiquidityFlag::Taker;
        }
        // A market order on the passive side means the roles arrived
        // inverted; its sentinel price would also satisfy the crossing
        // test below, so it is classified first.
        if passive.is_market_order() {
            return LiquidityFlag::Maker;
        }
        let crossing = match aggressive.side {
            Side::Buy => aggressive.price >= passive.price,
            Side::Sell => aggressive.price <= passive.price,
        };
        if crossing {
            LiquidityFlag::Taker
        } else {
            LiquidityFlag::MakerMaker
        }
    }

    /// All routed fills in routing order.
    #[must_use]
    pub fn all_fills(&self) -> &[EnhancedFill] {
        &self.fills
    }

    /// Fills involving the given account, in routing order.
    #[must_use]
    pub fn get_fills_for_account(&self, account_id: u64) -> Vec<&EnhancedFill> {
        self.fills_by_account
            .get(&account_id)
            .map(|indexes| indexes.iter().map(|i| &self.fills[*i]).collect())
            .unwrap_or_default()
    }

    /// Fills for the given symbol, in routing order.
    #[must_use]
    pub fn get_fills_for_symbol(&self, symbol: &str) -> Vec<&EnhancedFill> {
        self.fills_by_symbol
            .get(symbol)
            .map(|indexes| indexes.iter().map(|i| &self.fills[*i]).collect())
            .unwrap_or_default()
    }

    /// Looks up a fill by its router-assigned id.
    #[must_use]
    pub fn get_fill_by_id(&self, fill_id: u64) -> Option<&EnhancedFill> {
        self.fill_index_by_id
            .get(&fill_id)
            .map(|index| &self.fills[*index])
    }

    /// Number of fills routed.
    #[must_use]
    pub fn total_fills(&self) -> u64 {
        self.fills.len() as u64
    }

    /// Number of fills rejected by self-trade prevention.
    #[must_use]
    pub fn self_trades_prevented(&self) -> u64 {
        self.self_trades_prevented
    }

    /// Total quantity across all routed fills.
    #[must_use]
    pub fn total_volume(&self) -> u64 {
        self.fills.iter().map(|f| f.base_fill.quantity).sum()
    }

    /// Total notional value across all routed fills.
    #[must_use]
    pub fn total_notional(&self) -> f64 {
        self.fills.iter().map(|f| f.base_fill.notional()).sum()
    }

    /// Total fees collected across both sides of all routed fills.
    #[must_use]
    pub fn total_fees(&self) -> f64 {
        self.fills.iter().map(|f| f.buyer_fee + f.seller_fee).sum()
    }
}
