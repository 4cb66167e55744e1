//! Circuit Breaker (§4.C): a three-state drawdown-driven automaton that can
//! trip the Kill Switch. OPEN is only cleared by an explicit, admin-coded
//! `reset`, which itself deactivates the global kill switch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::kill_switch::{KillSwitch, KillSwitchError};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    HalfOpen,
    Open,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BreakerThresholds {
    pub daily_warn_pct: Decimal,
    pub daily_halt_pct: Decimal,
    pub total_warn_pct: Decimal,
    pub total_halt_pct: Decimal,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub from_state: BreakerState,
    pub to_state: BreakerState,
    pub trigger: String,
    pub value_crossed: Option<Decimal>,
    pub threshold_crossed: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CircuitBreakerError {
    #[error(transparent)]
    KillSwitch(#[from] KillSwitchError),
    #[error("breaker is not open")]
    NotOpen,
}

struct Inner {
    state: BreakerState,
    audit_log: Vec<AuditEvent>,
}

pub struct CircuitBreaker {
    thresholds: BreakerThresholds,
    kill_switch: Arc<KillSwitch>,
    inner: RwLock<Inner>,
}

impl CircuitBreaker {
    pub fn new(thresholds: BreakerThresholds, kill_switch: Arc<KillSwitch>) -> Self {
        Self {
            thresholds,
            kill_switch,
            inner: RwLock::new(Inner {
                state: BreakerState::Closed,
                audit_log: Vec::new(),
            }),
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.read().state
    }

    /// Performs one transition and returns the new state. Tie-break when
    /// both daily and total would trip the same tier: prefer the
    /// higher-severity (halt over warn) event and record both thresholds in
    /// the trigger message.
    pub fn update_drawdown(&self, daily_dd_pct: Decimal, total_dd_pct: Decimal) -> BreakerState {
        let t = &self.thresholds;
        let daily_halts = daily_dd_pct >= t.daily_halt_pct;
        let total_halts = total_dd_pct >= t.total_halt_pct;

        if daily_halts || total_halts {
            return self.transition_to_open(daily_dd_pct, total_dd_pct, daily_halts, total_halts);
        }

        let daily_warns = daily_dd_pct >= t.daily_warn_pct;
        let total_warns = total_dd_pct >= t.total_warn_pct;

        if daily_warns || total_warns {
            return self.transition_to_half_open(daily_dd_pct, total_dd_pct, daily_warns, total_warns);
        }

        self.maybe_recover()
    }

    fn transition_to_open(
        &self,
        daily_dd_pct: Decimal,
        total_dd_pct: Decimal,
        daily_halts: bool,
        total_halts: bool,
    ) -> BreakerState {
        let t = &self.thresholds;
        let (value, threshold, trigger) = match (daily_halts, total_halts) {
            (true, true) => (
                total_dd_pct.max(daily_dd_pct),
                t.total_halt_pct,
                format!(
                    "daily_dd {daily_dd_pct}% >= {} AND total_dd {total_dd_pct}% >= {}",
                    t.daily_halt_pct, t.total_halt_pct
                ),
            ),
            (false, true) => (
                total_dd_pct,
                t.total_halt_pct,
                format!("total_dd {total_dd_pct}% >= {}", t.total_halt_pct),
            ),
            (true, false) => (
                daily_dd_pct,
                t.daily_halt_pct,
                format!("daily_dd {daily_dd_pct}% >= {}", t.daily_halt_pct),
            ),
            (false, false) => unreachable!("transition_to_open called without a halt breach"),
        };

        let now = Utc::now();
        let mut inner = self.inner.write();
        let from = inner.state;
        inner.state = BreakerState::Open;
        let ev = AuditEvent {
            event_id: Uuid::new_v4(),
            from_state: from,
            to_state: BreakerState::Open,
            trigger: trigger.clone(),
            value_crossed: Some(value),
            threshold_crossed: Some(threshold),
            timestamp: now,
        };
        inner.audit_log.push(ev);
        drop(inner);

        self.kill_switch
            .activate_global(format!("circuit breaker tripped: {trigger}"), "circuit_breaker");

        BreakerState::Open
    }

    fn transition_to_half_open(
        &self,
        daily_dd_pct: Decimal,
        total_dd_pct: Decimal,
        daily_warns: bool,
        total_warns: bool,
    ) -> BreakerState {
        let mut inner = self.inner.write();
        if inner.state != BreakerState::Closed {
            // One-shot: no-op if already HALF_OPEN or OPEN.
            return inner.state;
        }
        let t = &self.thresholds;
        let trigger = match (daily_warns, total_warns) {
            (true, true) => format!(
                "daily_dd {daily_dd_pct}% >= {} AND total_dd {total_dd_pct}% >= {}",
                t.daily_warn_pct, t.total_warn_pct
            ),
            (false, true) => format!("total_dd {total_dd_pct}% >= {}", t.total_warn_pct),
            (true, false) => format!("daily_dd {daily_dd_pct}% >= {}", t.daily_warn_pct),
            (false, false) => unreachable!(),
        };
        let now = Utc::now();
        let ev = AuditEvent {
            event_id: Uuid::new_v4(),
            from_state: BreakerState::Closed,
            to_state: BreakerState::HalfOpen,
            trigger,
            value_crossed: Some(total_dd_pct.max(daily_dd_pct)),
            threshold_crossed: Some(t.total_warn_pct.min(t.daily_warn_pct)),
            timestamp: now,
        };
        inner.state = BreakerState::HalfOpen;
        inner.audit_log.push(ev);
        BreakerState::HalfOpen
    }

    /// HALF_OPEN -> CLOSED recovery when drawdowns fall back below warn
    /// thresholds. No-op from CLOSED or OPEN (OPEN only clears via `reset`).
    fn maybe_recover(&self) -> BreakerState {
        let mut inner = self.inner.write();
        if inner.state != BreakerState::HalfOpen {
            return inner.state;
        }
        let now = Utc::now();
        let ev = AuditEvent {
            event_id: Uuid::new_v4(),
            from_state: BreakerState::HalfOpen,
            to_state: BreakerState::Closed,
            trigger: "drawdown recovered below warn thresholds".to_string(),
            value_crossed: None,
            threshold_crossed: None,
            timestamp: now,
        };
        inner.state = BreakerState::Closed;
        inner.audit_log.push(ev);
        BreakerState::Closed
    }

    /// OPEN -> CLOSED, the only path out of OPEN. Requires the admin code and
    /// itself deactivates the global kill switch.
    pub fn reset(&self, admin_code: &str) -> Result<BreakerState, CircuitBreakerError> {
        {
            let inner = self.inner.read();
            if inner.state != BreakerState::Open {
                return Err(CircuitBreakerError::NotOpen);
            }
        }
        self.kill_switch.deactivate_global(admin_code, "circuit breaker reset by operator")?;

        let now = Utc::now();
        let mut inner = self.inner.write();
        let ev = AuditEvent {
            event_id: Uuid::new_v4(),
            from_state: BreakerState::Open,
            to_state: BreakerState::Closed,
            trigger: "operator reset".to_string(),
            value_crossed: None,
            threshold_crossed: None,
            timestamp: now,
        };
        inner.state = BreakerState::Closed;
        inner.audit_log.push(ev);
        Ok(BreakerState::Closed)
    }

    pub fn events(&self, limit: usize) -> Vec<AuditEvent> {
        self.inner.read().audit_log.iter().rev().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqk_config::AdminCode;
    use rust_decimal_macros::dec;

    fn breaker() -> CircuitBreaker {
        let ks = Arc::new(KillSwitch::new(AdminCode::new("secret")));
        CircuitBreaker::new(
            BreakerThresholds {
                daily_warn_pct: dec!(2),
                daily_halt_pct: dec!(3),
                total_warn_pct: dec!(8),
                total_halt_pct: dec!(10),
            },
            ks,
        )
    }

    #[test]
    fn s4_circuit_breaker_trip_scenario() {
        let cb = breaker();
        assert_eq!(cb.update_drawdown(dec!(1.5), dec!(4.0)), BreakerState::HalfOpen);
        assert_eq!(cb.update_drawdown(dec!(1.5), dec!(10.0)), BreakerState::Open);
        assert!(cb.kill_switch.is_global_active());

        assert_eq!(cb.reset("wrong").unwrap_err(), CircuitBreakerError::KillSwitch(KillSwitchError::PermissionDenied));
        assert_eq!(cb.reset("secret").unwrap(), BreakerState::Closed);
        assert!(!cb.kill_switch.is_global_active());
    }

    #[test]
    fn exact_daily_warn_boundary_trips_half_open() {
        let cb = breaker();
        assert_eq!(cb.update_drawdown(dec!(2), dec!(0)), BreakerState::HalfOpen);
    }

    #[test]
    fn exact_daily_halt_boundary_opens_and_activates_kill_switch() {
        let cb = breaker();
        assert_eq!(cb.update_drawdown(dec!(3), dec!(0)), BreakerState::Open);
        assert!(cb.kill_switch.is_global_active());
    }

    #[test]
    fn half_open_recovers_to_closed_when_drawdown_subsides() {
        let cb = breaker();
        cb.update_drawdown(dec!(2.5), dec!(0));
        assert_eq!(cb.state(), BreakerState::HalfOpen);
        assert_eq!(cb.update_drawdown(dec!(0), dec!(0)), BreakerState::Closed);
    }

    #[test]
    fn half_open_is_one_shot_and_does_not_reopen_on_repeated_warn() {
        let cb = breaker();
        cb.update_drawdown(dec!(2.5), dec!(0));
        assert_eq!(cb.update_drawdown(dec!(2.5), dec!(0)), BreakerState::HalfOpen);
    }
}
