use rust_decimal::Decimal;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DiscrepancyKind {
    /// Present locally, absent at the broker.
    MissingBroker,
    /// Absent locally, present at the broker (may predate the tracker).
    MissingLocal,
    /// Both present, quantities differ.
    QuantityMismatch,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Discrepancy {
    pub symbol: String,
    pub kind: DiscrepancyKind,
    pub severity: Severity,
    pub local_qty: Option<Decimal>,
    pub broker_qty: Option<Decimal>,
}

/// Read-only comparison result. Reconciliation never mutates local state;
/// remediation is an operator decision (§4.G, §9).
#[derive(Clone, Debug, PartialEq)]
pub struct ReconciliationReport {
    pub discrepancies: Vec<Discrepancy>,
    pub local_positions: usize,
    pub broker_positions: usize,
    pub matched_positions: usize,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty()
    }
}
