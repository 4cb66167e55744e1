//! Kill Switch (§4.B): a global bit and a `{producer -> bit}` map. Active set
//! is the union — a producer is halted iff the global bit is set OR its own
//! bit is set. Every state change appends to an in-memory audit log; there is
//! no path from a system trigger to deactivation, only an authenticated
//! operator can clear the state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use mqk_config::AdminCode;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KillSwitchEventKind {
    GlobalActivate,
    GlobalDeactivate,
    StrategyActivate,
    StrategyDeactivate,
}

/// One entry in the kill switch's append-only audit log (§3 "Audit events").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub kind: KillSwitchEventKind,
    pub producer_id: Option<String>,
    pub from_active: bool,
    pub to_active: bool,
    pub reason: String,
    pub trigger_source: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum KillSwitchError {
    #[error("admin code does not match")]
    PermissionDenied,
    #[error("kill switch is not active")]
    InvalidState,
}

#[derive(Clone, Debug)]
struct HaltState {
    reason: String,
    trigger_source: String,
    activated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    global: Option<HaltState>,
    producers: HashMap<String, HaltState>,
    audit_log: Vec<AuditEvent>,
}

pub struct KillSwitch {
    admin_code: AdminCode,
    inner: RwLock<Inner>,
}

impl KillSwitch {
    pub fn new(admin_code: AdminCode) -> Self {
        Self {
            admin_code,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Global OR (producer present AND producer bit set).
    pub fn is_active(&self, producer_id: Option<&str>) -> bool {
        let inner = self.inner.read();
        if inner.global.is_some() {
            return true;
        }
        match producer_id {
            Some(p) => inner.producers.contains_key(p),
            None => false,
        }
    }

    pub fn is_global_active(&self) -> bool {
        self.inner.read().global.is_some()
    }

    pub fn is_strategy_active(&self, producer_id: &str) -> bool {
        self.inner.read().producers.contains_key(producer_id)
    }

    /// Always succeeds. Idempotent re-activation overwrites the reason.
    pub fn activate_global(&self, reason: impl Into<String>, source: impl Into<String>) -> AuditEvent {
        let reason = reason.into();
        let source = source.into();
        let now = Utc::now();
        let mut inner = self.inner.write();
        let was_active = inner.global.is_some();
        inner.global = Some(HaltState {
            reason: reason.clone(),
            trigger_source: source.clone(),
            activated_at: now,
        });
        let ev = AuditEvent {
            event_id: Uuid::new_v4(),
            kind: KillSwitchEventKind::GlobalActivate,
            producer_id: None,
            from_active: was_active,
            to_active: true,
            reason,
            trigger_source: source,
            timestamp: now,
        };
        inner.audit_log.push(ev.clone());
        ev
    }

    /// Requires a matching admin code. Fails `InvalidState` if not active.
    pub fn deactivate_global(
        &self,
        admin_code: &str,
        reason: impl Into<String>,
    ) -> Result<AuditEvent, KillSwitchError> {
        if !self.admin_code.verify(admin_code) {
            return Err(KillSwitchError::PermissionDenied);
        }
        let reason = reason.into();
        let now = Utc::now();
        let mut inner = self.inner.write();
        if inner.global.is_none() {
            return Err(KillSwitchError::InvalidState);
        }
        inner.global = None;
        let ev = AuditEvent {
            event_id: Uuid::new_v4(),
            kind: KillSwitchEventKind::GlobalDeactivate,
            producer_id: None,
            from_active: true,
            to_active: false,
            reason,
            trigger_source: "operator".to_string(),
            timestamp: now,
        };
        inner.audit_log.push(ev.clone());
        Ok(ev)
    }

    pub fn activate_strategy(
        &self,
        producer_id: impl Into<String>,
        reason: impl Into<String>,
        source: impl Into<String>,
    ) -> AuditEvent {
        let producer_id = producer_id.into();
        let reason = reason.into();
        let source = source.into();
        let now = Utc::now();
        let mut inner = self.inner.write();
        let was_active = inner.producers.contains_key(&producer_id);
        inner.producers.insert(
            producer_id.clone(),
            HaltState {
                reason: reason.clone(),
                trigger_source: source.clone(),
                activated_at: now,
            },
        );
        let ev = AuditEvent {
            event_id: Uuid::new_v4(),
            kind: KillSwitchEventKind::StrategyActivate,
            producer_id: Some(producer_id),
            from_active: was_active,
            to_active: true,
            reason,
            trigger_source: source,
            timestamp: now,
        };
        inner.audit_log.push(ev.clone());
        ev
    }

    pub fn deactivate_strategy(
        &self,
        producer_id: &str,
        admin_code: &str,
        reason: impl Into<String>,
    ) -> Result<AuditEvent, KillSwitchError> {
        if !self.admin_code.verify(admin_code) {
            return Err(KillSwitchError::PermissionDenied);
        }
        let reason = reason.into();
        let now = Utc::now();
        let mut inner = self.inner.write();
        if inner.producers.remove(producer_id).is_none() {
            return Err(KillSwitchError::InvalidState);
        }
        let ev = AuditEvent {
            event_id: Uuid::new_v4(),
            kind: KillSwitchEventKind::StrategyDeactivate,
            producer_id: Some(producer_id.to_string()),
            from_active: true,
            to_active: false,
            reason,
            trigger_source: "operator".to_string(),
            timestamp: now,
        };
        inner.audit_log.push(ev.clone());
        Ok(ev)
    }

    /// Read the audit log, most recent first, optionally filtered by
    /// producer (global events are always included since they affect every
    /// producer).
    pub fn events(&self, limit: usize, producer_id: Option<&str>) -> Vec<AuditEvent> {
        let inner = self.inner.read();
        inner
            .audit_log
            .iter()
            .rev()
            .filter(|e| match producer_id {
                None => true,
                Some(p) => e.producer_id.is_none() || e.producer_id.as_deref() == Some(p),
            })
            .take(limit)
            .cloned()
            .collect()
    }
}
