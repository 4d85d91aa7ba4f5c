//! Fee attribution and callback wiring through the full book.

use matchbook_rs::sim::PositionManager;
use matchbook_rs::{EnhancedFill, LiquidityFlag, Order, OrderBook, Side, TimeInForce};
use std::sync::{Arc, Mutex};

#[test]
fn taker_pays_taker_rate_maker_pays_maker_rate() {
    let mut book = OrderBook::new("FEE");
    book.router_mut().set_fee_schedule(0.0002, 0.0007);

    book.submit(
        Order::limit(1, Side::Sell, 250.0, 100, TimeInForce::Gtc)
            .unwrap()
            .for_account(11),
    );
    book.submit(
        Order::market(2, Side::Buy, 100, TimeInForce::Ioc)
            .unwrap()
            .for_account(22),
    );

    let fills = book.router().all_fills();
    assert_eq!(fills.len(), 1);
    let fill = &fills[0];
    let notional = 250.0 * 100.0;
    assert_eq!(fill.liquidity_flag, LiquidityFlag::Taker);
    assert!(fill.is_aggressive_buy);
    // The buyer was the aggressor (taker); the resting seller made.
    assert!((fill.buyer_fee - notional * 0.0007).abs() < 1e-9);
    assert!((fill.seller_fee - notional * 0.0002).abs() < 1e-9);
}

#[test]
fn aggressive_sell_flips_fee_sides() {
    let mut book = OrderBook::new("FEE");
    book.router_mut().set_fee_schedule(0.0002, 0.0007);

    book.submit(
        Order::limit(1, Side::Buy, 250.0, 100, TimeInForce::Gtc)
            .unwrap()
            .for_account(11),
    );
    book.submit(
        Order::limit(2, Side::Sell, 250.0, 100, TimeInForce::Gtc)
            .unwrap()
            .for_account(22),
    );

    let fill = &book.router().all_fills()[0];
    let notional = 250.0 * 100.0;
    assert!(!fill.is_aggressive_buy);
    assert!((fill.seller_fee - notional * 0.0007).abs() < 1e-9);
    assert!((fill.buyer_fee - notional * 0.0002).abs() < 1e-9);
}

#[test]
fn zero_fee_default_charges_nothing() {
    let mut book = OrderBook::new("FEE");
    book.submit(
        Order::limit(1, Side::Sell, 100.0, 10, TimeInForce::Gtc)
            .unwrap()
            .for_account(1),
    );
    book.submit(
        Order::limit(2, Side::Buy, 100.0, 10, TimeInForce::Gtc)
            .unwrap()
            .for_account(2),
    );

    let fill = &book.router().all_fills()[0];
    assert_eq!(fill.buyer_fee, 0.0);
    assert_eq!(fill.seller_fee, 0.0);
    assert_eq!(book.router().total_fees(), 0.0);
}

#[test]
fn fill_callback_forwards_to_position_manager() {
    let mut book = OrderBook::new("FEE");

    let manager = Arc::new(Mutex::new(PositionManager::new(0.0)));
    {
        let mut manager = manager.lock().unwrap();
        manager.create_account(11, "maker", 1_000_000.0);
        manager.create_account(22, "taker", 1_000_000.0);
    }

    // The boundary adapter: forward each routed fill to the position
    // manager. The callback only touches external state, never the
    // book.
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

    book.submit(
        Order::limit(1, Side::Sell, 100.0, 50, TimeInForce::Gtc)
            .unwrap()
            .for_account(11),
    );
    book.submit(
        Order::limit(2, Side::Buy, 100.0, 50, TimeInForce::Gtc)
            .unwrap()
            .for_account(22),
    );

    let manager = manager.lock().unwrap();
    assert_eq!(manager.total_trades(), 2);
    assert_eq!(manager.account(22).unwrap().positions["FEE"].quantity, 50);
    assert_eq!(manager.account(11).unwrap().positions["FEE"].quantity, -50);
    assert_eq!(manager.current_price("FEE"), Some(100.0));
}

#[test]
fn per_account_and_per_symbol_indexes_stay_consistent() {
    let mut book = OrderBook::new("IDX");
    for i in 0..3u64 {
        book.submit(
            Order::limit(10 + i, Side::Sell, 100.0 + i as f64, 10, TimeInForce::Gtc)
                .unwrap()
                .for_account(5),
        );
    }
    book.submit(
        Order::limit(20, Side::Buy, 102.0, 30, TimeInForce::Gtc)
            .unwrap()
            .for_account(6),
    );

    let router = book.router();
    assert_eq!(router.total_fills(), 3);
    assert_eq!(router.get_fills_for_account(5).len(), 3);
    assert_eq!(router.get_fills_for_account(6).len(), 3);
    assert_eq!(router.get_fills_for_symbol("IDX").len(), 3);
    assert!(router.get_fills_for_symbol("OTHER").is_empty());
    assert_eq!(router.total_volume(), 30);
    for fill in router.all_fills() {
        assert_eq!(
            router.get_fill_by_id(fill.fill_id).unwrap().fill_id,
            fill.fill_id
        );
    }
}
