//! S6 — Reconciliation discrepancy (§8).

use rust_decimal_macros::dec;

use mqk_broker_paper::PaperBroker;
use mqk_portfolio::PositionTracker;
use mqk_reconcile::{reconcile, DiscrepancyKind, Severity};

#[tokio::test]
async fn local_vs_broker_mismatch_is_reported() {
    let tracker = PositionTracker::new();
    tracker.open_position("AAPL", "p1", dec!(100), dec!(150));

    let broker = PaperBroker::new();
    broker.set_position("AAPL", dec!(90), dec!(150));
    broker.set_position("MSFT", dec!(10), dec!(300));

    let report = reconcile(&tracker, &broker).await.unwrap();

    assert_eq!(report.discrepancies.len(), 2);
    assert_eq!(report.matched_positions, 0);
    assert_eq!(report.local_positions, 1);
    assert_eq!(report.broker_positions, 2);

    let aapl = report
        .discrepancies
        .iter()
        .find(|d| d.symbol == "AAPL")
        .expect("AAPL discrepancy present");
    assert_eq!(aapl.kind, DiscrepancyKind::QuantityMismatch);
    assert_eq!(aapl.severity, Severity::Error);

    let msft = report
        .discrepancies
        .iter()
        .find(|d| d.symbol == "MSFT")
        .expect("MSFT discrepancy present");
    assert_eq!(msft.kind, DiscrepancyKind::MissingLocal);
    assert_eq!(msft.severity, Severity::Warning);
}
