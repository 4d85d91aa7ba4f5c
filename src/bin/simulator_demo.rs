//! Full simulation wiring: the market-data generator drives the book,
//! the router forwards fills to a position manager, and the run ends
//! with account and performance reports.

use matchbook_rs::sim::{
    FillRateSummary, GeneratorConfig, LatencySummary, MarketDataGenerator, MatchSummary,
    PositionManager,
};
use matchbook_rs::{EnhancedFill, OrderBook};
use std::sync::{Arc, Mutex};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = GeneratorConfig {
        start_price: 100.0,
        volatility: 0.35,
        seed: 20_240_607,
        ..GeneratorConfig::default()
    };

    let mut book = OrderBook::new("SIM");
    book.router_mut().set_fee_schedule(0.0001, 0.0002);

    let manager = Arc::new(Mutex::new(PositionManager::new(0.0001)));
    {
        let mut manager = manager.lock().unwrap();
        manager.create_account(config.maker_buy_account, "maker-bids", 1_000_000.0);
        manager.create_account(config.maker_sell_account, "maker-asks", 1_000_000.0);
        manager.create_account(config.taker_buy_account, "taker-buys", 1_000_000.0);
        manager.create_account(config.taker_sell_account, "taker-sells", 1_000_000.0);
    }

    let sink = Arc::clone(&manager);
    book.router_mut()
        .register_fill_callback(Arc::new(move |fill: &EnhancedFill| {
            sink.lock().unwrap().process_fill(
                &fill.base_fill,
                fill.buy_account_id,
                fill.sell_account_id,
                &fill.symbol,
            );
        }));

    let mut generator = MarketDataGenerator::with_config(config);
    generator.run(&mut book, 500, 0.25);

    // A deliberate same-account cross to show prevention in action.
    generator.inject_self_trade(&mut book, 9999, generator.current_mid(), 100);

    println!("=== book ===");
    println!("{}", book.summary());
    println!("{}", book.depth_snapshot(5));

    println!("=== execution ===");
    if let Some(stats) = MatchSummary::from_fills(book.fills()) {
        println!("{stats}");
    }
    println!(
        "{}",
        FillRateSummary::compute(book.total_orders_processed(), book.fills())
    );
    println!(
        "self-trades prevented: {}",
        book.router().self_trades_prevented()
    );
    println!("fees collected: {:.4}", book.router().total_fees());
    if let Some(latency) = LatencySummary::from_samples(book.insertion_latencies_ns()) {
        println!("submit latency: {latency}");
    }

    println!("=== accounts ===");
    println!("{}", manager.lock().unwrap().summary());
}
