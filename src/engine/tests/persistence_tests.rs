//! Event-log files, snapshot round-trips and checkpoint recovery.

use super::test_helpers::*;
use crate::engine::persistence::read_events;
use crate::engine::{EventType, Order, OrderBook, Side, TimeInForce};

#[test]
fn event_log_records_mutations_when_enabled() {
    let mut book = book();
    book.enable_logging();

    limit(&mut book, 1, Side::Sell, 100.0, 50);
    limit(&mut book, 2, Side::Buy, 100.0, 50);
    book.cancel_order(42);
    book.amend_order(3, Some(99.0), None);

    let types: Vec<EventType> = book.events().iter().map(|e| e.event_type()).collect();
    assert_eq!(
        types,
        vec![
            EventType::NewOrder,
            EventType::NewOrder,
            EventType::Fill,
            EventType::CancelOrder,
            EventType::AmendOrder,
        ]
    );
}

#[test]
fn logging_disabled_records_nothing() {
    let mut book = book();
    limit(&mut book, 1, Side::Sell, 100.0, 50);
    assert_eq!(book.event_count(), 0);
}

#[test]
fn amend_logs_one_event_not_the_inner_cancel_and_resubmit() {
    let mut book = book();
    book.enable_logging();
    limit(&mut book, 1, Side::Buy, 100.0, 50);
    book.amend_order(1, Some(99.0), Some(60));

    let types: Vec<EventType> = book.events().iter().map(|e| e.event_type()).collect();
    assert_eq!(types, vec![EventType::NewOrder, EventType::AmendOrder]);
}

#[test]
fn events_round_trip_through_csv_file() {
    let mut book = book();
    book.enable_logging();
    limit(&mut book, 1, Side::Sell, 100.25, 50);
    book.submit(Order::iceberg(2, Side::Sell, 101.0, 300, 100, TimeInForce::Gtc).unwrap());
    market(&mut book, 3, Side::Buy, 75);
    book.cancel_order(2);

    let path = temp_path("events.csv");
    book.save_events(&path).unwrap();
    let events = read_events(&path).unwrap();
    assert_eq!(events.len(), book.events().len());
    for (written, read) in book.events().iter().zip(&events) {
        assert_eq!(written, read);
    }
    std::fs::remove_file(&path).ok();
}

#[test]
fn snapshot_restores_book_state() {
    let mut book = book();
    limit(&mut book, 1, Side::Buy, 99.0, 100);
    limit(&mut book, 2, Side::Sell, 101.0, 80);
    limit(&mut book, 3, Side::Buy, 99.5, 30);
    limit(&mut book, 4, Side::Sell, 99.5, 10);
    book.submit(Order::stop_market(5, Side::Sell, 90.0, 25).unwrap());

    let path = temp_path("snapshot.json");
    book.save_snapshot(&path).unwrap();

    let mut restored = OrderBook::new("OTHER");
    restored.load_snapshot(&path).unwrap();

    assert_eq!(restored.symbol(), "TEST");
    assert_eq!(restored.last_trade_price(), book.last_trade_price());
    assert_eq!(restored.fills().len(), book.fills().len());
    assert_eq!(restored.pending_stop_count(), 1);
    assert_eq!(
        restored.get_best_bid().unwrap().id,
        book.get_best_bid().unwrap().id
    );
    assert_eq!(
        restored.get_best_ask().unwrap().id,
        book.get_best_ask().unwrap().id
    );
    assert_eq!(
        restored.total_orders_processed(),
        book.total_orders_processed()
    );

    // The restored book keeps matching correctly, in priority order.
    limit(&mut restored, 10, Side::Sell, 99.0, 100);
    assert!(has_fill(&restored, 3, 10, 99.5, 20));
    assert!(has_fill(&restored, 1, 10, 99.0, 80));
    std::fs::remove_file(&path).ok();
}

#[test]
fn snapshot_round_trip_is_stable_modulo_timestamps() {
    let mut book = book();
    limit(&mut book, 1, Side::Buy, 99.0, 100);
    limit(&mut book, 2, Side::Sell, 101.0, 80);

    let path_a = temp_path("snap_a.json");
    book.save_snapshot(&path_a).unwrap();

    let mut restored = OrderBook::new("TEST");
    restored.load_snapshot(&path_a).unwrap();

    let mut first = book.create_snapshot();
    let mut second = restored.create_snapshot();
    // Capture time and sequence differ by construction; everything
    // else must be identical.
    first.snapshot_time_ns = 0;
    second.snapshot_time_ns = 0;
    first.snapshot_id = 0;
    second.snapshot_id = 0;
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    std::fs::remove_file(&path_a).ok();
}

#[test]
fn loading_garbage_leaves_book_unchanged() {
    let mut book = book();
    limit(&mut book, 1, Side::Buy, 99.0, 100);

    let path = temp_path("garbage.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(book.load_snapshot(&path).is_err());

    assert_eq!(book.active_bids_count(), 1);
    assert_eq!(book.get_best_bid().unwrap().id, 1);
    std::fs::remove_file(&path).ok();
}

#[test]
fn checkpoint_recovery_reproduces_the_original_run() {
    let mut book = book();
    book.enable_logging();

    // Phase one, captured by the snapshot.
    limit(&mut book, 1, Side::Buy, 99.0, 100);
    limit(&mut book, 2, Side::Sell, 99.0, 40);
    limit(&mut book, 3, Side::Sell, 101.0, 50);

    let snap = temp_path("checkpoint_snap.json");
    let events = temp_path("checkpoint_events.csv");
    book.save_checkpoint(&snap, &events).unwrap();

    // Phase two, captured by the refreshed delta file.
    limit(&mut book, 4, Side::Buy, 101.0, 30);
    book.cancel_order(3);
    limit(&mut book, 5, Side::Sell, 98.0, 60);
    book.save_events(&events).unwrap();

    let mut recovered = OrderBook::new("TEST");
    recovered.recover_from_checkpoint(&snap, &events).unwrap();

    assert_eq!(recovered.fills().len(), book.fills().len());
    for (original, replayed) in book.fills().iter().zip(recovered.fills()) {
        assert_eq!(original.buy_order_id, replayed.buy_order_id);
        assert_eq!(original.sell_order_id, replayed.sell_order_id);
        assert_eq!(original.price, replayed.price);
        assert_eq!(original.quantity, replayed.quantity);
    }
    assert_eq!(recovered.last_trade_price(), book.last_trade_price());
    assert_eq!(recovered.active_bids_count(), book.active_bids_count());
    assert_eq!(recovered.active_asks_count(), book.active_asks_count());
    // Order 2 filled before the snapshot, so only the live set is
    // carried across; everything the checkpoint covers must agree.
    for id in [1, 3, 4, 5] {
        assert_eq!(
            recovered.get_order(id).map(|o| (o.state, o.remaining_qty)),
            book.get_order(id).map(|o| (o.state, o.remaining_qty)),
            "order {id} diverged"
        );
    }
    std::fs::remove_file(&snap).ok();
    std::fs::remove_file(&events).ok();
}

#[test]
fn recovered_stop_orders_still_trigger() {
    let mut book = book();
    book.submit(Order::stop_market(1, Side::Sell, 95.0, 50).unwrap());
    limit(&mut book, 2, Side::Buy, 94.0, 50);

    let snap = temp_path("stops_snap.json");
    book.save_snapshot(&snap).unwrap();

    let mut restored = OrderBook::new("TEST");
    restored.load_snapshot(&snap).unwrap();
    assert_eq!(restored.pending_stop_count(), 1);

    restored.check_stop_triggers(95.0);
    assert_eq!(restored.pending_stop_count(), 0);
    assert!(has_fill(&restored, 2, 1, 94.0, 50));
    std::fs::remove_file(&snap).ok();
}
