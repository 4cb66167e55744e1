//! Reconciler (§4.G): fetches the broker's position snapshot and compares it
//! against the local tracker's aggregate holdings per symbol. Read-only.

use std::collections::BTreeSet;

use rust_decimal::Decimal;

use mqk_execution::{BrokerCapability, BrokerError};
use mqk_portfolio::PositionTracker;

use crate::types::{Discrepancy, DiscrepancyKind, ReconciliationReport, Severity};

pub async fn reconcile(
    tracker: &PositionTracker,
    broker: &dyn BrokerCapability,
) -> Result<ReconciliationReport, BrokerError> {
    let broker_positions = broker.list_positions().await?;

    let local_open = tracker.open_positions(None);
    let mut local_qty: std::collections::BTreeMap<String, Decimal> = Default::default();
    for p in &local_open {
        *local_qty.entry(p.symbol.clone()).or_default() += p.signed_quantity;
    }

    let mut broker_qty: std::collections::BTreeMap<String, Decimal> = Default::default();
    for p in &broker_positions {
        *broker_qty.entry(p.symbol.clone()).or_default() += p.signed_quantity;
    }

    let symbols: BTreeSet<String> = local_qty
        .keys()
        .cloned()
        .chain(broker_qty.keys().cloned())
        .collect();

    let mut discrepancies = Vec::new();
    let mut matched = 0usize;

    for symbol in &symbols {
        let local = local_qty.get(symbol).copied();
        let brok = broker_qty.get(symbol).copied();

        match (local, brok) {
            (Some(l), None) if !l.is_zero() => {
                discrepancies.push(Discrepancy {
                    symbol: symbol.clone(),
                    kind: DiscrepancyKind::MissingBroker,
                    severity: Severity::Error,
                    local_qty: Some(l),
                    broker_qty: None,
                });
            }
            (None, Some(b)) if !b.is_zero() => {
                discrepancies.push(Discrepancy {
                    symbol: symbol.clone(),
                    kind: DiscrepancyKind::MissingLocal,
                    severity: Severity::Warning,
                    local_qty: None,
                    broker_qty: Some(b),
                });
            }
            (Some(l), Some(b)) => {
                if l == b {
                    matched += 1;
                } else {
                    discrepancies.push(Discrepancy {
                        symbol: symbol.clone(),
                        kind: DiscrepancyKind::QuantityMismatch,
                        severity: Severity::Error,
                        local_qty: Some(l),
                        broker_qty: Some(b),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(ReconciliationReport {
        discrepancies,
        local_positions: local_qty.values().filter(|q| !q.is_zero()).count(),
        broker_positions: broker_qty.values().filter(|q| !q.is_zero()).count(),
        matched_positions: matched,
    })
}
