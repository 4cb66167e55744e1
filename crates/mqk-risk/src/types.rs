//! Shared value types for the risk gate: order intent shape, violation
//! taxonomy, and severities. Kept decimal-exact throughout — no floats touch
//! a money or quantity value anywhere in this crate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of an order intent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// Order kind as carried on an intent; the risk gate itself does not route
/// orders, it only reasons about price fields required per kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
    StopLimit,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    Day,
    Gtc,
    Ioc,
    Fok,
}

/// Severity of a single risk-limit violation. Warnings never block approval;
/// errors always do.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

/// Closed set of violation kinds the risk gate can raise. Keeping this a
/// single enum (rather than a free-form string per limit object) means a new
/// check is a single match arm, not a new ad hoc string constant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    KillSwitchActive,
    CircuitBreakerOpen,
    MaxDailyDrawdown,
    MaxTotalDrawdown,
    MaxDeployedCapital,
    MaxOpenPositions,
    StrategyPaused,
    MaxStrategyAllocation,
    MaxNotional,
    MaxRiskPerTrade,
    PriceTooLow,
    PriceDeviation,
    BlockedSymbol,
    MinAdv,
    MaxPctOfAdv,
    PortfolioValueZero,
}

/// A single typed violation produced by a pure `check_*` function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub configured: Decimal,
    pub actual: Decimal,
    pub message: String,
    pub severity: Severity,
}

impl Violation {
    pub fn error(kind: ViolationKind, configured: Decimal, actual: Decimal, message: impl Into<String>) -> Self {
        Self {
            kind,
            configured,
            actual,
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(kind: ViolationKind, configured: Decimal, actual: Decimal, message: impl Into<String>) -> Self {
        Self {
            kind,
            configured,
            actual,
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

/// A candidate order as presented to the risk gate (`check_order`'s inputs
/// bundled for convenience by callers that already have an intent).
#[derive(Clone, Debug, PartialEq)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub producer_id: String,
    pub stop_loss_price: Option<Decimal>,
    pub last_traded_price: Option<Decimal>,
    pub avg_daily_volume: Option<Decimal>,
}

/// Timestamped evaluation result for a single `check_order` call.
#[derive(Clone, Debug, PartialEq)]
pub struct RiskReport {
    pub approved: bool,
    pub violations: Vec<Violation>,
    pub warnings: Vec<Violation>,
    pub rejection_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RiskReport {
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self {
            approved: true,
            violations: Vec::new(),
            warnings: Vec::new(),
            rejection_reason: None,
            timestamp: now,
        }
    }

    /// Push a violation; warnings accumulate, errors also flip `approved` and
    /// latch the first rejection reason.
    pub(crate) fn push(&mut self, v: Violation) {
        match v.severity {
            Severity::Warning => self.warnings.push(v),
            Severity::Error => {
                if self.approved {
                    self.approved = false;
                    self.rejection_reason = Some(v.message.clone());
                }
                self.violations.push(v);
            }
        }
    }
}
