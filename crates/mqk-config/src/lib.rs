//! Process-wide configuration values for the execution core.
//!
//! Mirrors the single-source-of-truth secret-resolution discipline the rest
//! of this codebase's ancestry uses: never scatter `std::env::var` calls
//! across the crate graph, resolve once at startup, and never let a secret
//! reach a log line or error message unredacted.

use std::env;

/// The env var a host application should set to configure the admin code.
pub const ADMIN_CODE_ENV_VAR: &str = "MQK_ADMIN_CODE";

/// Default admin code used only when the env var is unset. §9 Open Questions:
/// "the default admin code is a hard-coded string intended to be overridden;
/// the core must treat the default as acceptable for tests only."
pub const DEFAULT_ADMIN_CODE: &str = "dev-only-admin-code";

/// A process-wide admin secret used to authorize kill-switch deactivation and
/// circuit-breaker reset. Never implements `Display`; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCode(String);

impl AdminCode {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Reads `MQK_ADMIN_CODE` from the environment, falling back to the
    /// test-only default if unset.
    pub fn from_env() -> Self {
        match env::var(ADMIN_CODE_ENV_VAR) {
            Ok(v) if !v.is_empty() => Self(v),
            _ => Self(DEFAULT_ADMIN_CODE.to_string()),
        }
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_ADMIN_CODE
    }

    /// Constant-time equality check: always walks the full, longer of the
    /// two buffers so execution time does not leak a byte-position match.
    pub fn verify(&self, candidate: &str) -> bool {
        let a = self.0.as_bytes();
        let b = candidate.as_bytes();
        let len = a.len().max(b.len());
        let mut diff: u8 = (a.len() != b.len()) as u8;
        for i in 0..len {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            diff |= x ^ y;
        }
        diff == 0
    }
}

impl std::fmt::Debug for AdminCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let visible: String = self.0.chars().take(4).collect();
        write!(f, "AdminCode(\"{visible}…<redacted>\")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_matching_code() {
        let c = AdminCode::new("secret123");
        assert!(c.verify("secret123"));
        assert!(!c.verify("wrong"));
    }

    #[test]
    fn debug_redacts_after_four_chars() {
        let c = AdminCode::new("secret123");
        let s = format!("{c:?}");
        assert!(s.contains("secr"));
        assert!(!s.contains("secret123"));
    }

    #[test]
    fn different_length_candidates_still_rejected() {
        let c = AdminCode::new("abc");
        assert!(!c.verify("abcd"));
        assert!(!c.verify("ab"));
    }
}
