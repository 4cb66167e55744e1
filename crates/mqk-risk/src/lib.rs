//! Risk gate: limit definitions (§4.A), kill switch (§4.B), circuit breaker
//! (§4.C), and the risk manager that composes them into the single pre-trade
//! gate (§4.D).

pub mod circuit_breaker;
pub mod kill_switch;
pub mod limits;
pub mod manager;
pub mod types;

pub use circuit_breaker::{BreakerState, BreakerThresholds, CircuitBreaker, CircuitBreakerError};
pub use kill_switch::{KillSwitch, KillSwitchError};
pub use limits::{OrderLimits, PortfolioLimits, StrategyLimits};
pub use manager::RiskManager;
pub use types::{OrderIntent, OrderKind, RiskReport, Severity, Side, TimeInForce, Violation, ViolationKind};
