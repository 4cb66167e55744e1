//! S3 — Idempotent create under repeated attempts (§8).

use rust_decimal_macros::dec;

use mqk_execution::{NewOrderParams, Oms};
use mqk_risk::types::{OrderKind, Side, TimeInForce};

fn params(quantity: rust_decimal::Decimal) -> NewOrderParams {
    NewOrderParams {
        symbol: "AAPL".to_string(),
        side: Side::Buy,
        quantity,
        kind: OrderKind::Market,
        limit_price: None,
        stop_price: None,
        time_in_force: TimeInForce::Day,
        producer_id: "p1".to_string(),
        stop_loss_price: None,
    }
}

#[test]
fn repeated_create_with_same_client_id_returns_same_order() {
    let oms = Oms::new();

    let first = oms.create_order("K", params(dec!(10)));
    let second = oms.create_order("K", params(dec!(999)));

    assert_eq!(first.internal_id, second.internal_id);
    assert_eq!(second.quantity, dec!(10), "second call's args must be ignored");
    assert!(oms.has_order("K"));
    assert_eq!(oms.orders_by_producer("p1").len(), 1);
}
