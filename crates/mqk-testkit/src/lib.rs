//! Shared scenario-wiring helpers for the integration tests under `tests/`.
//! No production code lives here; this crate exists to exercise S1–S6 (§8)
//! against the real crates wired together.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use mqk_config::AdminCode;
use mqk_risk::circuit_breaker::{BreakerThresholds, CircuitBreaker};
use mqk_risk::kill_switch::KillSwitch;
use mqk_risk::limits::{OrderLimits, PortfolioLimits};
use mqk_risk::manager::RiskManager;

/// S1's config: default portfolio/order limits, no kill switch active.
pub fn default_risk_manager() -> RiskManager {
    let kill_switch = Arc::new(KillSwitch::new(AdminCode::new("test-admin-code")));
    let circuit_breaker = Arc::new(CircuitBreaker::new(
        BreakerThresholds {
            daily_warn_pct: dec!(2),
            daily_halt_pct: dec!(3),
            total_warn_pct: dec!(8),
            total_halt_pct: dec!(10),
        },
        kill_switch.clone(),
    ));

    RiskManager::new(
        kill_switch,
        circuit_breaker,
        PortfolioLimits {
            max_daily_drawdown_pct: dec!(3),
            max_total_drawdown_pct: dec!(10),
            max_deployed_capital_pct: dec!(80),
            max_open_positions: 20,
        },
        OrderLimits {
            max_risk_per_trade_pct: dec!(2),
            max_notional: dec!(25000),
            max_price_deviation_pct: dec!(5),
            min_instrument_price: dec!(5),
            max_pct_of_avg_daily_volume: dec!(10),
            min_avg_daily_volume: dec!(100000),
            blocked_symbols: Default::default(),
        },
    )
}

pub fn zero() -> Decimal {
    Decimal::ZERO
}
