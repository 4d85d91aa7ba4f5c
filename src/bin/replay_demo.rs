//! Records a trading session to an event log, then replays it into a
//! fresh book and validates the regenerated fills.

use matchbook_rs::{Order, OrderBook, ReplayEngine, Side, TimeInForce};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut book = OrderBook::with_logging("RPLY");

    for i in 0..20u64 {
        let price = 100.0 + (i % 5) as f64 * 0.25;
        book.submit(Order::limit(2 * i + 1, Side::Buy, price - 0.5, 50, TimeInForce::Gtc).unwrap());
        book.submit(Order::limit(2 * i + 2, Side::Sell, price, 50, TimeInForce::Gtc).unwrap());
        if i % 4 == 3 {
            book.submit(Order::market(100 + i, Side::Buy, 75, TimeInForce::Ioc).unwrap());
        }
        if i % 7 == 6 {
            book.cancel_order(2 * i + 1);
        }
    }

    println!(
        "session complete: {} events, {} fills",
        book.event_count(),
        book.fills().len()
    );

    let path = std::env::temp_dir().join("matchbook_replay_demo.csv");
    if let Err(err) = book.save_events(&path) {
        eprintln!("saving events failed: {err}");
        return;
    }

    let mut replay = ReplayEngine::new("RPLY");
    if let Err(err) = replay.load_from_file(&path) {
        eprintln!("loading events failed: {err}");
        return;
    }

    // Step through the first few events, then finish at full speed.
    for _ in 0..5 {
        if let Some(event) = replay.peek_next_event() {
            println!("next: {event}");
        }
        replay.replay_next_event();
    }
    while replay.has_next_event() {
        replay.replay_next_event();
    }
    println!("{}", replay.summary());

    if replay.validate(book.fills()) {
        println!("replay regenerated the identical fill sequence");
    } else {
        println!("replay DIVERGED from the recorded session");
    }

    std::fs::remove_file(&path).ok();
}
