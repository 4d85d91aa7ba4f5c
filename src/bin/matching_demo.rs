//! Walkthrough of the matching engine: limit/market/iceberg/stop
//! orders, TIF handling, and a checkpoint at the end.

use matchbook_rs::sim::{LatencySummary, MatchSummary};
use matchbook_rs::{Order, OrderBook, Side, TimeInForce};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut book = OrderBook::with_logging("DEMO");

    println!("--- seeding the book ---");
    book.submit(Order::limit(1, Side::Buy, 99.50, 100, TimeInForce::Gtc).unwrap());
    book.submit(Order::limit(2, Side::Buy, 99.75, 80, TimeInForce::Gtc).unwrap());
    book.submit(Order::limit(3, Side::Sell, 100.25, 120, TimeInForce::Gtc).unwrap());
    book.submit(Order::iceberg(4, Side::Sell, 100.00, 400, 100, TimeInForce::Gtc).unwrap());
    println!("{}", book.depth_snapshot(5));

    println!("--- market buy sweeps the iceberg display ---");
    book.submit(Order::market(5, Side::Buy, 150, TimeInForce::Ioc).unwrap());
    for fill in book.fills() {
        println!("  {fill}");
    }
    println!("{}", book.depth_snapshot(5));

    println!("--- stop-sell parked below the market ---");
    book.submit(Order::stop_market(6, Side::Sell, 99.0, 50).unwrap());
    println!("pending stops: {}", book.pending_stop_count());

    println!("--- IOC and FOK ---");
    book.submit(Order::limit(7, Side::Buy, 100.0, 500, TimeInForce::Ioc).unwrap());
    println!(
        "order 7 after IOC: {}",
        book.get_order(7).expect("submitted above")
    );
    book.submit(Order::limit(8, Side::Buy, 100.0, 10_000, TimeInForce::Fok).unwrap());
    println!(
        "order 8 after FOK: {}",
        book.get_order(8).expect("submitted above")
    );

    println!("--- amend order 1 up to the offer ---");
    book.amend_order(1, Some(100.25), None);
    for fill in book.fills() {
        println!("  {fill}");
    }

    println!("--- summary ---");
    println!("{}", book.summary());
    if let Some(stats) = MatchSummary::from_fills(book.fills()) {
        println!("{stats}");
    }
    if let Some(latency) = LatencySummary::from_samples(book.insertion_latencies_ns()) {
        println!("{latency}");
    }

    let snap = std::env::temp_dir().join("matchbook_demo_snapshot.json");
    let events = std::env::temp_dir().join("matchbook_demo_events.csv");
    match book.save_checkpoint(&snap, &events) {
        Ok(()) => println!(
            "checkpoint written to {} / {}",
            snap.display(),
            events.display()
        ),
        Err(err) => eprintln!("checkpoint failed: {err}"),
    }
}
