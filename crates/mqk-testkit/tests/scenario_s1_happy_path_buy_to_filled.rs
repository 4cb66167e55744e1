//! S1 — Happy path, BUY through to FILLED (§8).

use rust_decimal_macros::dec;

use mqk_execution::{NewOrderParams, Oms, OrderState};
use mqk_portfolio::PositionTracker;
use mqk_risk::types::{OrderKind, Side, TimeInForce};
use mqk_testkit::default_risk_manager;

#[test]
fn buy_order_approved_then_filled_updates_position() {
    let manager = default_risk_manager();

    let report = manager.check_order(
        "AAPL",
        Side::Buy,
        dec!(100),
        dec!(150.00),
        "p1",
        dec!(100000),
        5,
        dec!(40000),
        dec!(0),
        dec!(0),
        None,
        None,
        Some(dec!(147.00)),
    );
    assert!(report.approved, "expected approval, got {:?}", report.violations);

    let oms = Oms::new();
    let order = oms.create_order(
        "bid1",
        NewOrderParams {
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            quantity: dec!(100),
            kind: OrderKind::Limit,
            limit_price: Some(dec!(150.00)),
            stop_price: None,
            time_in_force: TimeInForce::Day,
            producer_id: "p1".to_string(),
            stop_loss_price: Some(dec!(147.00)),
        },
    );
    assert_eq!(order.state, OrderState::Pending);

    let submitted = oms.submit_order("bid1", "b1").unwrap();
    assert_eq!(submitted.state, OrderState::Submitted);

    let filled = oms.fill_order("b1", dec!(100), dec!(150.10), dec!(1)).unwrap();
    assert_eq!(filled.state, OrderState::Filled);

    let tracker = PositionTracker::new();
    let position = tracker.open_position("AAPL", "p1", dec!(100), dec!(150.10));
    assert_eq!(position.signed_quantity, dec!(100));
    assert_eq!(position.average_entry_price, dec!(150.10));
    assert_eq!(position.cost_basis, dec!(15010));
    assert_eq!(position.realized_pnl, dec!(0));
}
