//! Seeded synthetic market-data generation.
//!
//! Drives a book with maker liquidity around a random-walk mid price,
//! probabilistic taker market orders, and occasional cancels of its
//! own resting orders. The RNG is a seeded ChaCha stream so a given
//! configuration always produces the same order flow.

use crate::engine::{DepthSnapshot, Order, OrderBook, Side, TimeInForce};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

/// Callback invoked with the depth snapshot emitted after each step.
pub type SnapshotCallback = Arc<dyn Fn(&DepthSnapshot) + Send + Sync>;

/// Configuration for the synthetic flow.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Mid price the walk starts from.
    pub start_price: f64,
    /// Deterministic per-step drift added to the mid.
    pub drift: f64,
    /// Half-width of the uniform per-step noise.
    pub volatility: f64,
    /// Quoted spread between the generated best bid and ask.
    pub spread: f64,
    /// Price rounding increment.
    pub tick_size: f64,
    /// Smallest generated order size.
    pub min_size: u64,
    /// Largest generated order size.
    pub max_size: u64,
    /// Number of price levels quoted on each side per step.
    pub depth_levels: usize,
    /// RNG seed; equal seeds produce equal flow.
    pub seed: u64,
    /// Account owning generated resting bids.
    pub maker_buy_account: u64,
    /// Account owning generated resting asks.
    pub maker_sell_account: u64,
    /// Account owning generated buy market orders.
    pub taker_buy_account: u64,
    /// Account owning generated sell market orders.
    pub taker_sell_account: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            start_price: 100.0,
            drift: 0.0,
            volatility: 0.5,
            spread: 0.02,
            tick_size: 0.01,
            min_size: 50,
            max_size: 200,
            depth_levels: 2,
            seed: 1337,
            maker_buy_account: 6001,
            maker_sell_account: 6002,
            taker_buy_account: 7001,
            taker_sell_account: 7002,
        }
    }
}

/// Generates synthetic order flow against a book.
pub struct MarketDataGenerator {
    config: GeneratorConfig,
    rng: ChaCha8Rng,
    last_mid: f64,
    next_order_id: u64,
    resting_orders: VecDeque<u64>,
    callbacks: Vec<SnapshotCallback>,
}

impl MarketDataGenerator {
    /// Generator order ids start here to stay clear of caller ids.
    const ID_BASE: u64 = 1_000_000;

    /// Creates a generator with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GeneratorConfig::default())
    }

    /// Creates a generator with an explicit configuration.
    #[must_use]
    pub fn with_config(config: GeneratorConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let last_mid = config.start_price;
        Self {
            config,
            rng,
            last_mid,
            next_order_id: Self::ID_BASE,
            resting_orders: VecDeque::new(),
            callbacks: Vec::new(),
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The current mid price of the walk.
    #[must_use]
    pub fn current_mid(&self) -> f64 {
        self.last_mid
    }

    /// Restarts the walk from `price`, reseeding the RNG so the flow
    /// from here on is reproducible again.
    pub fn reset(&mut self, price: f64) {
        self.last_mid = price;
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.resting_orders.clear();
    }

    /// Registers a callback for the per-step depth snapshots.
    pub fn register_callback(&mut self, callback: SnapshotCallback) {
        self.callbacks.push(callback);
    }

    /// Removes all registered callbacks.
    pub fn clear_callbacks(&mut self) {
        self.callbacks.clear();
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_order_id;
        self.next_order_id += 1;
        id
    }

    fn round_to_tick(&self, price: f64) -> f64 {
        let tick = self.config.tick_size;
        ((price / tick).round() * tick).max(tick)
    }

    fn next_mid(&mut self) -> f64 {
        let noise = self.rng.gen_range(-self.config.volatility..=self.config.volatility);
        let mid = self.last_mid + self.config.drift + noise;
        self.last_mid = self.round_to_tick(mid.max(self.config.tick_size));
        self.last_mid
    }

    fn random_quantity(&mut self) -> u64 {
        self.rng
            .gen_range(self.config.min_size..=self.config.max_size)
    }

    /// Advances the walk one step and drives the book: quotes
    /// `depth_levels` of maker liquidity on both sides, sends a taker
    /// market order with `market_order_probability`, occasionally
    /// cancels one of its own resting orders, and emits a depth
    /// snapshot to the registered callbacks.
    pub fn step(&mut self, book: &mut OrderBook, market_order_probability: f64) {
        let mid = self.next_mid();
        let half_spread = self.config.spread / 2.0;

        for level in 0..self.config.depth_levels {
            let offset = level as f64 * self.config.tick_size;
            let bid_price = self.round_to_tick(mid - half_spread - offset);
            let ask_price = self.round_to_tick(mid + half_spread + offset);

            let bid_qty = self.random_quantity();
            let bid_id = self.next_id();
            if let Ok(order) = Order::limit(bid_id, Side::Buy, bid_price, bid_qty, TimeInForce::Gtc)
            {
                book.submit(order.for_account(self.config.maker_buy_account));
                self.resting_orders.push_back(bid_id);
            }

            let ask_qty = self.random_quantity();
            let ask_id = self.next_id();
            if let Ok(order) =
                Order::limit(ask_id, Side::Sell, ask_price, ask_qty, TimeInForce::Gtc)
            {
                book.submit(order.for_account(self.config.maker_sell_account));
                self.resting_orders.push_back(ask_id);
            }
        }

        if self.rng.gen_bool(market_order_probability.clamp(0.0, 1.0)) {
            let (side, account) = if self.rng.gen_bool(0.5) {
                (Side::Buy, self.config.taker_buy_account)
            } else {
                (Side::Sell, self.config.taker_sell_account)
            };
            let qty = self.random_quantity();
            let id = self.next_id();
            if let Ok(order) = Order::market(id, side, qty, TimeInForce::Ioc) {
                trace!(order_id = id, %side, qty, "generator market order");
                book.submit(order.for_account(account));
            }
        }

        if self.resting_orders.len() > self.config.depth_levels * 8 {
            if let Some(id) = self.resting_orders.pop_front() {
                book.cancel_order(id);
            }
        }

        let snapshot = book.depth_snapshot(self.config.depth_levels.max(5));
        for callback in &self.callbacks {
            callback(&snapshot);
        }
    }

    /// Runs `steps` generator steps against the book.
    pub fn run(&mut self, book: &mut OrderBook, steps: usize, market_order_probability: f64) {
        for _ in 0..steps {
            self.step(book, market_order_probability);
        }
    }

    /// Submits a crossing buy and sell from the same account at
    /// `price`, for demonstrating self-trade prevention.
    pub fn inject_self_trade(&mut self, book: &mut OrderBook, account_id: u64, price: f64, qty: u64) {
        let sell_id = self.next_id();
        if let Ok(order) = Order::limit(sell_id, Side::Sell, price, qty, TimeInForce::Gtc) {
            book.submit(order.for_account(account_id));
        }
        let buy_id = self.next_id();
        if let Ok(order) = Order::limit(buy_id, Side::Buy, price, qty, TimeInForce::Gtc) {
            book.submit(order.for_account(account_id));
        }
    }
}

impl Default for MarketDataGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_seeds_produce_equal_flow() {
        let config = GeneratorConfig::default();
        let mut gen_a = MarketDataGenerator::with_config(config.clone());
        let mut gen_b = MarketDataGenerator::with_config(config);

        let mut book_a = OrderBook::new("GEN");
        let mut book_b = OrderBook::new("GEN");
        gen_a.run(&mut book_a, 50, 0.25);
        gen_b.run(&mut book_b, 50, 0.25);

        assert_eq!(book_a.fills().len(), book_b.fills().len());
        for (a, b) in book_a.fills().iter().zip(book_b.fills()) {
            assert_eq!(a.buy_order_id, b.buy_order_id);
            assert_eq!(a.sell_order_id, b.sell_order_id);
            assert_eq!(a.price, b.price);
            assert_eq!(a.quantity, b.quantity);
        }
        assert_eq!(gen_a.current_mid(), gen_b.current_mid());
    }

    #[test]
    fn step_quotes_both_sides() {
        let mut generator = MarketDataGenerator::new();
        let mut book = OrderBook::new("GEN");
        generator.step(&mut book, 0.0);

        assert!(book.get_best_bid().is_some());
        assert!(book.get_best_ask().is_some());
        let spread = book.get_spread().unwrap();
        assert!(spread > 0.0);
    }

    #[test]
    fn snapshot_callbacks_fire_each_step() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let mut generator = MarketDataGenerator::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        generator.register_callback(Arc::new(move |_snapshot| {
            seen.fetch_add(1, Ordering::Relaxed);
        }));

        let mut book = OrderBook::new("GEN");
        generator.run(&mut book, 10, 0.0);
        assert_eq!(counter.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn inject_self_trade_is_prevented_by_default() {
        let mut generator = MarketDataGenerator::new();
        let mut book = OrderBook::new("GEN");
        generator.inject_self_trade(&mut book, 42, 100.0, 10);

        assert!(book.fills().is_empty());
        assert_eq!(book.router().self_trades_prevented(), 1);
    }
}
