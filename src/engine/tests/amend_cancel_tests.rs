//! Cancel and amend lifecycle behaviour.

use super::test_helpers::*;
use crate::engine::{OrderState, Side, TimeInForce};

#[test]
fn cancel_removes_order_from_matching() {
    let mut book = book();
    limit(&mut book, 1, Side::Sell, 100.0, 50);
    assert!(book.cancel_order(1));
    assert_eq!(state_of(&book, 1), OrderState::Cancelled);

    // The tombstoned book entry is skipped; the aggressor rests.
    limit(&mut book, 2, Side::Buy, 100.0, 50);
    assert!(book.fills().is_empty());
    assert_eq!(state_of(&book, 2), OrderState::Active);
    assert!(book.get_best_ask().is_none());
}

#[test]
fn cancel_unknown_order_returns_false() {
    let mut book = book();
    assert!(!book.cancel_order(42));
}

#[test]
fn cancel_is_idempotent() {
    let mut book = book();
    limit(&mut book, 1, Side::Sell, 100.0, 50);
    assert!(book.cancel_order(1));
    assert!(!book.cancel_order(1));
    assert_eq!(state_of(&book, 1), OrderState::Cancelled);
}

#[test]
fn cancel_filled_order_returns_false() {
    let mut book = book();
    limit(&mut book, 1, Side::Sell, 100.0, 50);
    limit(&mut book, 2, Side::Buy, 100.0, 50);
    assert_eq!(state_of(&book, 1), OrderState::Filled);
    assert!(!book.cancel_order(1));
    assert_eq!(state_of(&book, 1), OrderState::Filled);
}

#[test]
fn cancelled_order_remains_queryable() {
    let mut book = book();
    limit(&mut book, 1, Side::Sell, 100.0, 50);
    book.cancel_order(1);
    let order = book.get_order(1).unwrap();
    assert_eq!(order.state, OrderState::Cancelled);
    assert_eq!(order.remaining_qty, 50);
}

#[test]
fn amend_price_keeps_id_but_loses_priority() {
    let mut book = book();
    limit(&mut book, 1, Side::Buy, 100.0, 50);
    limit(&mut book, 2, Side::Buy, 100.0, 50);

    // Re-pricing order 1 at the same level pushes it behind order 2.
    assert!(book.amend_order(1, Some(100.0), None));

    limit(&mut book, 3, Side::Sell, 100.0, 50);
    assert_eq!(book.fills().len(), 1);
    assert!(has_fill(&book, 2, 3, 100.0, 50));
    assert_eq!(state_of(&book, 1), OrderState::Active);
}

#[test]
fn amend_to_crossing_price_executes_immediately() {
    let mut book = book();
    limit(&mut book, 1, Side::Buy, 99.0, 50);
    limit(&mut book, 2, Side::Sell, 101.0, 50);
    assert!(book.fills().is_empty());

    assert!(book.amend_order(1, Some(101.0), None));

    assert_eq!(book.fills().len(), 1);
    assert!(has_fill(&book, 1, 2, 101.0, 50));
    assert_eq!(state_of(&book, 1), OrderState::Filled);
    assert_eq!(state_of(&book, 2), OrderState::Filled);
}

#[test]
fn amend_defaults_to_remaining_quantity() {
    let mut book = book();
    limit(&mut book, 1, Side::Sell, 100.0, 100);
    limit(&mut book, 2, Side::Buy, 100.0, 40);
    assert_eq!(book.get_order(1).unwrap().remaining_qty, 60);

    // Price-only amend carries the remaining 60, not the original 100.
    assert!(book.amend_order(1, Some(101.0), None));
    let amended = book.get_order(1).unwrap();
    assert_eq!(amended.quantity, 60);
    assert_eq!(amended.remaining_qty, 60);
    assert_eq!(amended.price, 101.0);
}

#[test]
fn amend_quantity_only_keeps_price() {
    let mut book = book();
    limit(&mut book, 1, Side::Buy, 100.0, 50);
    assert!(book.amend_order(1, None, Some(80)));

    let amended = book.get_order(1).unwrap();
    assert_eq!(amended.price, 100.0);
    assert_eq!(amended.quantity, 80);
    assert_eq!(book.get_best_bid().unwrap().remaining_qty, 80);
}

#[test]
fn amend_unknown_or_terminal_fails() {
    let mut book = book();
    assert!(!book.amend_order(42, Some(100.0), None));

    limit(&mut book, 1, Side::Sell, 100.0, 50);
    limit(&mut book, 2, Side::Buy, 100.0, 50);
    assert!(!book.amend_order(1, Some(99.0), None));

    limit(&mut book, 3, Side::Sell, 100.0, 50);
    book.cancel_order(3);
    assert!(!book.amend_order(3, Some(99.0), None));
}

#[test]
fn amend_preserves_day_time_in_force() {
    let mut book = book();
    limit_tif(&mut book, 1, Side::Buy, 100.0, 50, TimeInForce::Day);

    assert!(book.amend_order(1, Some(99.5), None));

    // The amended order is still a DAY order, so a session-end sweep
    // reading its time-in-force would still expire it.
    let amended = book.get_order(1).unwrap();
    assert_eq!(amended.tif, TimeInForce::Day);
    assert_eq!(amended.state, OrderState::Active);
    assert_eq!(book.get_best_bid().unwrap().id, 1);

    // And it keeps resting and matching like any DAY order.
    limit(&mut book, 2, Side::Sell, 99.5, 50);
    assert!(has_fill(&book, 1, 2, 99.5, 50));
    assert_eq!(state_of(&book, 1), OrderState::Filled);
}

#[test]
fn amend_resubmits_gtc_for_non_day_orders() {
    let mut book = book();
    limit(&mut book, 1, Side::Buy, 100.0, 50);
    assert!(book.amend_order(1, Some(99.5), None));
    assert_eq!(book.get_order(1).unwrap().tif, TimeInForce::Gtc);
}

#[test]
fn amend_preserves_account_attribution() {
    let mut book = book();
    book.submit(
        crate::engine::Order::limit(1, Side::Buy, 100.0, 50, crate::engine::TimeInForce::Gtc)
            .unwrap()
            .for_account(9),
    );
    assert!(book.amend_order(1, Some(99.0), None));
    assert_eq!(book.get_order(1).unwrap().account_id, 9);
}

#[test]
fn amend_rejecting_invalid_fields_leaves_order_alone() {
    let mut book = book();
    limit(&mut book, 1, Side::Buy, 100.0, 50);
    assert!(!book.amend_order(1, None, Some(0)));

    let order = book.get_order(1).unwrap();
    assert_eq!(order.state, OrderState::Active);
    assert_eq!(order.remaining_qty, 50);
    assert_eq!(book.get_best_bid().unwrap().id, 1);
}
