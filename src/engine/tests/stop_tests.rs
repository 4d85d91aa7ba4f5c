//! Stop-order triggering: parking, trigger-on-placement, the
//! trade-print sweep, cascades and cancellation of pending stops.

use super::test_helpers::*;
use crate::engine::{Order, OrderState, Side};

fn stop_buy_market(id: u64, stop_price: f64, qty: u64) -> Order {
    Order::stop_market(id, Side::Buy, stop_price, qty).unwrap()
}

fn stop_sell_market(id: u64, stop_price: f64, qty: u64) -> Order {
    Order::stop_market(id, Side::Sell, stop_price, qty).unwrap()
}

#[test]
fn stop_parks_when_nothing_references_it() {
    let mut book = book();
    book.submit(stop_buy_market(1, 105.0, 50));

    assert_eq!(book.pending_stop_count(), 1);
    assert_eq!(state_of(&book, 1), OrderState::Pending);
    assert_eq!(book.active_bids_count(), 0);
}

#[test]
fn stop_at_top_of_book_parks_until_a_print() {
    let mut book = book();
    limit(&mut book, 1, Side::Sell, 100.0, 50);
    limit(&mut book, 2, Side::Sell, 100.0, 50);
    book.submit(stop_buy_market(3, 100.0, 50));

    // No trade has printed and the reference merely equals the stop.
    assert_eq!(book.pending_stop_count(), 1);
    assert_eq!(state_of(&book, 3), OrderState::Pending);

    limit(&mut book, 4, Side::Buy, 100.0, 50);

    // The print at 100 takes the stop out; it matches the second ask.
    assert_eq!(book.pending_stop_count(), 0);
    assert_eq!(book.fills().len(), 2);
    assert!(has_fill(&book, 4, 1, 100.0, 50));
    assert!(has_fill(&book, 3, 2, 100.0, 50));
    assert_eq!(state_of(&book, 3), OrderState::Filled);
    assert_eq!(state_of(&book, 2), OrderState::Filled);
    assert_eq!(book.get_order(3).unwrap().remaining_qty, 0);
}

#[test]
fn buy_stop_triggers_on_placement_when_reference_exceeds_stop() {
    let mut book = book();
    limit(&mut book, 1, Side::Buy, 105.0, 50);
    limit(&mut book, 2, Side::Sell, 106.0, 50);

    // Reference is max(bid, ask) = 106 > 100: trigger immediately and
    // lift the offer.
    book.submit(stop_buy_market(3, 100.0, 50));

    assert_eq!(book.pending_stop_count(), 0);
    assert_eq!(book.fills().len(), 1);
    assert!(has_fill(&book, 3, 2, 106.0, 50));
}

#[test]
fn buy_stop_triggers_on_placement_from_one_sided_market() {
    let mut book = book();
    limit(&mut book, 1, Side::Buy, 105.0, 50);

    book.submit(stop_buy_market(2, 100.0, 50));

    // Single-side reference (only bids exist) still triggers; as a
    // market buy with no asks it cancels unfilled.
    assert_eq!(book.pending_stop_count(), 0);
    assert!(book.fills().is_empty());
    assert_eq!(state_of(&book, 2), OrderState::Cancelled);
}

#[test]
fn sell_stop_triggers_on_print_at_or_below_stop() {
    let mut book = book();
    book.submit(stop_sell_market(1, 98.0, 50));
    assert_eq!(book.pending_stop_count(), 1);

    // A print above the stop leaves it pending.
    book.check_stop_triggers(99.0);
    assert_eq!(book.pending_stop_count(), 1);

    // Liquidity for the stop to hit once it fires.
    limit(&mut book, 2, Side::Buy, 97.5, 50);

    // An equal print triggers (inclusive comparison).
    book.check_stop_triggers(98.0);
    assert_eq!(book.pending_stop_count(), 0);
    assert!(has_fill(&book, 2, 1, 97.5, 50));
    assert_eq!(state_of(&book, 1), OrderState::Filled);
}

#[test]
fn stop_limit_converts_and_rests_at_its_limit_price() {
    let mut book = book();
    book.submit(Order::stop_limit(1, Side::Buy, 102.0, 101.5, 150).unwrap());
    assert_eq!(book.pending_stop_count(), 1);

    book.check_stop_triggers(102.0);

    assert_eq!(book.pending_stop_count(), 0);
    let triggered = book.get_order(1).unwrap();
    assert_eq!(triggered.state, OrderState::Active);
    assert!(triggered.stop_triggered);
    let best = book.get_best_bid().unwrap();
    assert_eq!(best.id, 1);
    assert_eq!(best.price, 101.5);
}

#[test]
fn stop_cascade_chains_through_successive_prints() {
    let mut book = book();
    limit(&mut book, 1, Side::Buy, 98.0, 50);
    limit(&mut book, 2, Side::Buy, 96.0, 50);
    limit(&mut book, 3, Side::Buy, 95.0, 50);
    book.submit(stop_sell_market(10, 98.0, 100));
    book.submit(stop_sell_market(11, 96.0, 50));
    assert_eq!(book.pending_stop_count(), 2);

    // The injected print fires stop 10; sweeping the bids it prints
    // 98 then 96, and the 96 print cascades into stop 11.
    book.check_stop_triggers(98.0);

    assert_eq!(book.pending_stop_count(), 0);
    assert_eq!(book.fills().len(), 3);
    assert!(has_fill(&book, 1, 10, 98.0, 50));
    assert!(has_fill(&book, 2, 10, 96.0, 50));
    assert!(has_fill(&book, 3, 11, 95.0, 50));
    assert_eq!(book.last_trade_price(), Some(95.0));
    assert_eq!(state_of(&book, 10), OrderState::Filled);
    assert_eq!(state_of(&book, 11), OrderState::Filled);
}

#[test]
fn triggered_stops_fire_in_price_order_with_ties_in_insertion_order() {
    let mut book = book();
    limit(&mut book, 1, Side::Buy, 100.0, 200);
    book.submit(stop_sell_market(10, 99.0, 50));
    book.submit(stop_sell_market(11, 98.0, 50));
    book.submit(stop_sell_market(12, 99.0, 50));

    book.check_stop_triggers(98.0);

    assert_eq!(book.pending_stop_count(), 0);
    let sellers: Vec<u64> = book.fills().iter().map(|f| f.sell_order_id).collect();
    // Ascending trigger-price traversal, insertion order on the tie.
    assert_eq!(sellers, vec![11, 10, 12]);
}

#[test]
fn cancelling_pending_stop_removes_it() {
    let mut book = book();
    book.submit(stop_buy_market(1, 105.0, 50));
    assert_eq!(book.pending_stop_count(), 1);

    assert!(book.cancel_order(1));
    assert_eq!(book.pending_stop_count(), 0);
    assert_eq!(state_of(&book, 1), OrderState::Cancelled);

    // The print that would have fired it is now a no-op.
    book.check_stop_triggers(110.0);
    assert!(book.fills().is_empty());
}

#[test]
fn explicit_print_injection_updates_last_trade_price() {
    let mut book = book();
    assert_eq!(book.last_trade_price(), None);
    book.check_stop_triggers(101.25);
    assert_eq!(book.last_trade_price(), Some(101.25));
}
