//! Reconciliation (§4.G): read-only comparison of local positions to a
//! broker snapshot, yielding a typed discrepancy report.

pub mod engine;
pub mod types;

pub use engine::reconcile;
pub use types::{Discrepancy, DiscrepancyKind, ReconciliationReport, Severity};
