//! Universal invariant (§8): while the kill switch is active, the risk gate
//! rejects before the OMS is ever consulted — no order is created as a
//! result of a blocked intent.

use rust_decimal_macros::dec;

use mqk_execution::Oms;
use mqk_risk::types::Side;
use mqk_testkit::default_risk_manager;

#[test]
fn global_kill_switch_blocks_before_oms_creates_anything() {
    let manager = default_risk_manager();
    manager.kill_switch.activate_global("manual halt", "operator");

    let report = manager.check_order(
        "AAPL", Side::Buy, dec!(10), dec!(150), "p1", dec!(100000), 0, dec!(0), dec!(0), dec!(0), None, None, None,
    );
    assert!(!report.approved);

    let oms = Oms::new();
    assert!(!oms.has_order("would-be-k1"), "no order should exist before a caller ever submits to the OMS");
}
