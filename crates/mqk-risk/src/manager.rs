//! Risk Manager (§4.D): the sole pre-trade gate. Composes the Kill Switch,
//! Circuit Breaker, and the three limit objects into one `check_order` call.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::circuit_breaker::{BreakerState, CircuitBreaker};
use crate::kill_switch::KillSwitch;
use crate::limits::{OrderLimits, PortfolioLimits, StrategyLimits};
use crate::types::{RiskReport, Severity, Side, Violation, ViolationKind};

pub struct RiskManager {
    pub kill_switch: Arc<KillSwitch>,
    pub circuit_breaker: Arc<CircuitBreaker>,
    portfolio_limits: PortfolioLimits,
    order_limits: OrderLimits,
    strategy_limits: RwLock<HashMap<String, StrategyLimits>>,
}

impl RiskManager {
    pub fn new(
        kill_switch: Arc<KillSwitch>,
        circuit_breaker: Arc<CircuitBreaker>,
        portfolio_limits: PortfolioLimits,
        order_limits: OrderLimits,
    ) -> Self {
        Self {
            kill_switch,
            circuit_breaker,
            portfolio_limits,
            order_limits,
            strategy_limits: RwLock::new(HashMap::new()),
        }
    }

    /// Admin operation: register or update a producer's strategy limits
    /// (§6 "register/update strategy limits").
    pub fn register_strategy_limits(&self, producer_id: impl Into<String>, limits: StrategyLimits) {
        self.strategy_limits.write().insert(producer_id.into(), limits);
    }

    pub fn strategy_limits(&self, producer_id: &str) -> Option<StrategyLimits> {
        self.strategy_limits.read().get(producer_id).cloned()
    }

    /// The sole public operation of the risk gate. Evaluation order,
    /// short-circuiting at the first error class, per §4.D:
    /// 1. kill switch, 2. circuit breaker, 3. portfolio limits,
    /// 4. strategy limits, 5. order limits.
    #[allow(clippy::too_many_arguments)]
    pub fn check_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        producer_id: &str,
        portfolio_value: Decimal,
        current_open_positions: u32,
        capital_deployed: Decimal,
        daily_drawdown_pct: Decimal,
        total_drawdown_pct: Decimal,
        last_traded_price: Option<Decimal>,
        avg_daily_volume: Option<Decimal>,
        stop_loss_price: Option<Decimal>,
    ) -> RiskReport {
        let now = Utc::now();
        let mut report = RiskReport::new(now);

        // 1. Kill-switch gate: global first, then producer.
        if self.kill_switch.is_global_active() {
            report.push(Violation::error(
                ViolationKind::KillSwitchActive,
                Decimal::ZERO,
                Decimal::ZERO,
                "global kill switch is active".to_string(),
            ));
            return report;
        }
        if self.kill_switch.is_strategy_active(producer_id) {
            report.push(Violation::error(
                ViolationKind::KillSwitchActive,
                Decimal::ZERO,
                Decimal::ZERO,
                format!("kill switch is active for producer {producer_id}"),
            ));
            return report;
        }

        // 2. Drawdown update and circuit-breaker check.
        let breaker_state = self.circuit_breaker.update_drawdown(daily_drawdown_pct, total_drawdown_pct);
        if breaker_state == BreakerState::Open {
            report.push(Violation::error(
                ViolationKind::CircuitBreakerOpen,
                Decimal::ZERO,
                Decimal::ZERO,
                "circuit breaker is OPEN".to_string(),
            ));
            return report;
        }

        // 3. Portfolio limits (always check drawdowns; opening orders also
        // check capital deployed and open-position count). All applicable
        // checks still run from here on so the returned report is complete
        // (§4.D) — only the kill-switch and circuit-breaker gates above
        // short-circuit the evaluation.
        let is_opening = side == Side::Buy;
        let capital_deployed_pct = if portfolio_value.is_zero() {
            Decimal::ZERO
        } else {
            (capital_deployed / portfolio_value) * Decimal::ONE_HUNDRED
        };
        for v in self.portfolio_limits.check(
            daily_drawdown_pct,
            total_drawdown_pct,
            is_opening,
            capital_deployed_pct,
            current_open_positions,
        ) {
            report.push(v);
        }

        // 4. Strategy limits. A paused strategy stops only the strategy-level
        // evaluation (the projected-allocation sub-check is skipped); order
        // limits below still run regardless.
        if let Some(limits) = self.strategy_limits(producer_id) {
            let notional = quantity * price;
            let projected_allocation_pct = if portfolio_value.is_zero() {
                Decimal::ZERO
            } else {
                ((capital_deployed + notional) / portfolio_value) * Decimal::ONE_HUNDRED
            };
            for v in limits.check(projected_allocation_pct) {
                report.push(v);
            }
        }

        // 5. Order limits.
        let notional = quantity * price;
        let risk_amount = match stop_loss_price {
            Some(sl) => match side {
                Side::Buy => (price - sl) * quantity,
                Side::Sell => (sl - price) * quantity,
            },
            None => notional * Decimal::new(10, 2), // 10% of notional by default
        };

        for v in self.order_limits.check(
            symbol,
            notional,
            risk_amount,
            portfolio_value,
            price,
            last_traded_price,
            quantity,
            avg_daily_volume,
        ) {
            report.push(v);
        }

        report
    }
}

/// True iff the violation severity is [`Severity::Error`]; a small helper
/// kept here so callers filtering a report's combined violations+warnings
/// don't need to re-derive the rule.
pub fn is_blocking(v: &Violation) -> bool {
    matches!(v.severity, Severity::Error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::BreakerThresholds;
    use mqk_config::AdminCode;
    use rust_decimal_macros::dec;

    fn default_manager() -> RiskManager {
        let ks = Arc::new(KillSwitch::new(AdminCode::new("secret")));
        let cb = Arc::new(CircuitBreaker::new(
            BreakerThresholds {
                daily_warn_pct: dec!(2),
                daily_halt_pct: dec!(3),
                total_warn_pct: dec!(8),
                total_halt_pct: dec!(10),
            },
            ks.clone(),
        ));
        RiskManager::new(
            ks,
            cb,
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
                min_avg_daily_volume: dec!(0),
                blocked_symbols: Default::default(),
            },
        )
    }

    #[test]
    fn s1_happy_path_buy_is_approved() {
        let m = default_manager();
        let r = m.check_order(
            "AAPL",
            Side::Buy,
            dec!(100),
            dec!(150.00),
            "p1",
            dec!(100000),
            5,
            dec!(40000),
            dec!(0),
            dec!(0),
            None,
            None,
            Some(dec!(147.00)),
        );
        assert!(r.approved, "{:?}", r.violations);
    }

    #[test]
    fn s2_notional_cap_rejects_googl() {
        let m = default_manager();
        let r = m.check_order(
            "GOOGL",
            Side::Buy,
            dec!(200),
            dec!(150.00),
            "p1",
            dec!(100000),
            5,
            dec!(40000),
            dec!(0),
            dec!(0),
            None,
            None,
            Some(dec!(148.00)),
        );
        assert!(!r.approved);
        assert_eq!(r.violations.len(), 1);
        assert_eq!(r.violations[0].kind, ViolationKind::MaxNotional);
        let reason = r.rejection_reason.unwrap();
        assert!(reason.contains("30000.00"));
        assert!(reason.contains("25000.00"));
    }

    #[test]
    fn global_kill_switch_rejects_with_single_violation() {
        let m = default_manager();
        m.kill_switch.activate_global("halt", "operator");
        let r = m.check_order(
            "AAPL", Side::Buy, dec!(1), dec!(10), "p1", dec!(10000), 0, dec!(0), dec!(0), dec!(0),
            None, None, None,
        );
        assert!(!r.approved);
        assert_eq!(r.violations.len(), 1);
        assert_eq!(r.violations[0].kind, ViolationKind::KillSwitchActive);
    }

    #[test]
    fn paused_strategy_skips_only_allocation_check_order_limits_still_run() {
        let m = default_manager();
        m.register_strategy_limits(
            "p1",
            StrategyLimits {
                max_allocation_pct: dec!(50),
                max_drawdown_pct: dec!(10),
                daily_loss_limit_pct: dec!(5),
                paused: true,
                pause_reason: Some("manual pause".to_string()),
            },
        );
        // quantity*price = 30000 > max_notional (25000): a paused strategy's
        // order-level violations must still surface alongside StrategyPaused.
        let r = m.check_order(
            "GOOGL", Side::Buy, dec!(200), dec!(150.00), "p1", dec!(100000), 5, dec!(40000), dec!(0), dec!(0),
            None, None, Some(dec!(148.00)),
        );
        assert!(!r.approved);
        assert_eq!(r.violations.len(), 2, "{:?}", r.violations);
        assert!(r.violations.iter().any(|v| v.kind == ViolationKind::StrategyPaused));
        assert!(r.violations.iter().any(|v| v.kind == ViolationKind::MaxNotional));
    }

    #[test]
    fn portfolio_violation_does_not_suppress_order_limit_violations() {
        let m = default_manager();
        // max_deployed_capital_pct is 80; capital_deployed/portfolio_value
        // is exactly at the boundary, and the order notional busts
        // max_notional too — both must be reported.
        let r = m.check_order(
            "GOOGL", Side::Buy, dec!(200), dec!(150.00), "p1", dec!(100000), 5, dec!(80000), dec!(0), dec!(0),
            None, None, Some(dec!(148.00)),
        );
        assert!(!r.approved);
        assert!(r.violations.iter().any(|v| v.kind == ViolationKind::MaxDeployedCapital));
        assert!(r.violations.iter().any(|v| v.kind == ViolationKind::MaxNotional));
    }

    #[test]
    fn circuit_breaker_open_blocks_every_subsequent_check() {
        let m = default_manager();
        let r1 = m.check_order(
            "AAPL", Side::Buy, dec!(1), dec!(10), "p1", dec!(10000), 0, dec!(0), dec!(3), dec!(0),
            None, None, None,
        );
        assert!(!r1.approved);
        assert_eq!(r1.violations[0].kind, ViolationKind::CircuitBreakerOpen);
        assert!(m.kill_switch.is_global_active());

        let r2 = m.check_order(
            "AAPL", Side::Buy, dec!(1), dec!(10), "p1", dec!(10000), 0, dec!(0), dec!(0), dec!(0),
            None, None, None,
        );
        assert!(!r2.approved);
        assert_eq!(r2.violations[0].kind, ViolationKind::KillSwitchActive);
    }
}
