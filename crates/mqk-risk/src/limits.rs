//! Limit definitions (§4.A): three immutable-after-registration value
//! objects, each with a pure `check_*` function that takes only the numeric
//! quantities it compares and returns zero or more typed [`Violation`]s.
//!
//! No side effects, no I/O. Warnings do not block; errors do. Every limit is
//! a "no more than" bound checked with `>=` at the threshold, per §8's
//! boundary convention ("at exactly the limit boundary: error, not
//! approved").

use rust_decimal::Decimal;

use crate::types::{Severity, Violation, ViolationKind};

/// Portfolio-wide thresholds.
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioLimits {
    pub max_daily_drawdown_pct: Decimal,
    pub max_total_drawdown_pct: Decimal,
    pub max_deployed_capital_pct: Decimal,
    pub max_open_positions: u32,
}

impl PortfolioLimits {
    /// Drawdown checks always run; deployed-capital and open-position checks
    /// only apply to orders that open new exposure (BUY side, per §4.D.3).
    pub fn check(
        &self,
        daily_drawdown_pct: Decimal,
        total_drawdown_pct: Decimal,
        is_opening: bool,
        capital_deployed_pct: Decimal,
        open_positions: u32,
    ) -> Vec<Violation> {
        let mut out = Vec::new();

        if daily_drawdown_pct >= self.max_daily_drawdown_pct {
            out.push(Violation::error(
                ViolationKind::MaxDailyDrawdown,
                self.max_daily_drawdown_pct,
                daily_drawdown_pct,
                format!(
                    "daily drawdown {daily_drawdown_pct}% >= limit {}%",
                    self.max_daily_drawdown_pct
                ),
            ));
        }
        if total_drawdown_pct >= self.max_total_drawdown_pct {
            out.push(Violation::error(
                ViolationKind::MaxTotalDrawdown,
                self.max_total_drawdown_pct,
                total_drawdown_pct,
                format!(
                    "total drawdown {total_drawdown_pct}% >= limit {}%",
                    self.max_total_drawdown_pct
                ),
            ));
        }

        if is_opening {
            if capital_deployed_pct >= self.max_deployed_capital_pct {
                out.push(Violation::error(
                    ViolationKind::MaxDeployedCapital,
                    self.max_deployed_capital_pct,
                    capital_deployed_pct,
                    format!(
                        "capital deployed {capital_deployed_pct}% >= limit {}%",
                        self.max_deployed_capital_pct
                    ),
                ));
            }
            if open_positions as u64 >= self.max_open_positions as u64 {
                out.push(Violation::error(
                    ViolationKind::MaxOpenPositions,
                    Decimal::from(self.max_open_positions),
                    Decimal::from(open_positions),
                    format!(
                        "open positions {open_positions} >= limit {}",
                        self.max_open_positions
                    ),
                ));
            }
        }

        out
    }
}

/// Per-producer ("strategy") thresholds.
#[derive(Clone, Debug, PartialEq)]
pub struct StrategyLimits {
    pub max_allocation_pct: Decimal,
    pub max_drawdown_pct: Decimal,
    pub daily_loss_limit_pct: Decimal,
    pub paused: bool,
    pub pause_reason: Option<String>,
}

impl StrategyLimits {
    /// If paused, only a `StrategyPaused` violation is returned — callers
    /// must stop further strategy-level evaluation on this result (§4.D.4).
    pub fn check(&self, projected_allocation_pct: Decimal) -> Vec<Violation> {
        if self.paused {
            let reason = self.pause_reason.as_deref().unwrap_or("strategy paused");
            return vec![Violation::error(
                ViolationKind::StrategyPaused,
                Decimal::ZERO,
                Decimal::ZERO,
                format!("strategy is paused: {reason}"),
            )];
        }

        let mut out = Vec::new();
        if projected_allocation_pct >= self.max_allocation_pct {
            out.push(Violation::error(
                ViolationKind::MaxStrategyAllocation,
                self.max_allocation_pct,
                projected_allocation_pct,
                format!(
                    "projected allocation {projected_allocation_pct}% >= limit {}%",
                    self.max_allocation_pct
                ),
            ));
        }
        out
    }
}

/// Per-order thresholds.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderLimits {
    pub max_risk_per_trade_pct: Decimal,
    pub max_notional: Decimal,
    pub max_price_deviation_pct: Decimal,
    pub min_instrument_price: Decimal,
    pub max_pct_of_avg_daily_volume: Decimal,
    pub min_avg_daily_volume: Decimal,
    pub blocked_symbols: std::collections::BTreeSet<String>,
}

#[allow(clippy::too_many_arguments)]
impl OrderLimits {
    /// `risk_amount` is the caller-computed cash-at-risk (§4.D.5); this
    /// function only compares it against the portfolio-relative cap.
    pub fn check(
        &self,
        symbol: &str,
        notional: Decimal,
        risk_amount: Decimal,
        portfolio_value: Decimal,
        price: Decimal,
        last_traded_price: Option<Decimal>,
        quantity: Decimal,
        avg_daily_volume: Option<Decimal>,
    ) -> Vec<Violation> {
        let mut out = Vec::new();

        if notional >= self.max_notional {
            out.push(Violation::error(
                ViolationKind::MaxNotional,
                self.max_notional,
                notional,
                format!(
                    "order notional {notional:.2} >= limit {:.2}",
                    self.max_notional
                ),
            ));
        }

        if portfolio_value.is_zero() {
            out.push(Violation::warning(
                ViolationKind::PortfolioValueZero,
                Decimal::ZERO,
                Decimal::ZERO,
                "portfolio_value is zero; risk-per-trade check skipped",
            ));
        } else {
            let risk_pct = (risk_amount / portfolio_value) * Decimal::ONE_HUNDRED;
            if risk_pct >= self.max_risk_per_trade_pct {
                out.push(Violation::error(
                    ViolationKind::MaxRiskPerTrade,
                    self.max_risk_per_trade_pct,
                    risk_pct,
                    format!(
                        "risk per trade {risk_pct:.4}% >= limit {}%",
                        self.max_risk_per_trade_pct
                    ),
                ));
            }
        }

        if price < self.min_instrument_price {
            out.push(Violation::error(
                ViolationKind::PriceTooLow,
                self.min_instrument_price,
                price,
                format!(
                    "price {price:.4} below minimum instrument price {:.4}",
                    self.min_instrument_price
                ),
            ));
        }

        if let Some(ltp) = last_traded_price {
            if !ltp.is_zero() {
                let deviation_pct = ((price - ltp).abs() / ltp) * Decimal::ONE_HUNDRED;
                if deviation_pct >= self.max_price_deviation_pct {
                    out.push(Violation::error(
                        ViolationKind::PriceDeviation,
                        self.max_price_deviation_pct,
                        deviation_pct,
                        format!(
                            "price deviates {deviation_pct:.4}% from last traded price, limit {}%",
                            self.max_price_deviation_pct
                        ),
                    ));
                }
            }
        }

        if self.blocked_symbols.contains(symbol) {
            out.push(Violation::error(
                ViolationKind::BlockedSymbol,
                Decimal::ZERO,
                Decimal::ZERO,
                format!("symbol {symbol} is blocked"),
            ));
        }

        if let Some(adv) = avg_daily_volume {
            if adv < self.min_avg_daily_volume {
                out.push(Violation::warning(
                    ViolationKind::MinAdv,
                    self.min_avg_daily_volume,
                    adv,
                    format!(
                        "average daily volume {adv} below minimum {}",
                        self.min_avg_daily_volume
                    ),
                ));
            }
            if !adv.is_zero() {
                let pct_of_adv = (quantity / adv) * Decimal::ONE_HUNDRED;
                if pct_of_adv >= self.max_pct_of_avg_daily_volume {
                    out.push(Violation::error(
                        ViolationKind::MaxPctOfAdv,
                        self.max_pct_of_avg_daily_volume,
                        pct_of_adv,
                        format!(
                            "order is {pct_of_adv:.4}% of ADV, limit {}%",
                            self.max_pct_of_avg_daily_volume
                        ),
                    ));
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn portfolio() -> PortfolioLimits {
        PortfolioLimits {
            max_daily_drawdown_pct: dec!(3),
            max_total_drawdown_pct: dec!(10),
            max_deployed_capital_pct: dec!(80),
            max_open_positions: 20,
        }
    }

    #[test]
    fn drawdown_at_exact_boundary_is_a_violation() {
        let v = portfolio().check(dec!(3), dec!(0), false, dec!(0), 0);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].kind, ViolationKind::MaxDailyDrawdown);
    }

    #[test]
    fn closing_orders_skip_deployed_capital_and_position_count() {
        let v = portfolio().check(dec!(0), dec!(0), false, dec!(999), 999);
        assert!(v.is_empty());
    }

    #[test]
    fn notional_cap_boundary_is_a_violation() {
        let ol = OrderLimits {
            max_risk_per_trade_pct: dec!(2),
            max_notional: dec!(25000),
            max_price_deviation_pct: dec!(5),
            min_instrument_price: dec!(5),
            max_pct_of_avg_daily_volume: dec!(10),
            min_avg_daily_volume: dec!(1000),
            blocked_symbols: Default::default(),
        };
        let v = ol.check(
            "GOOGL",
            dec!(25000),
            dec!(100),
            dec!(100000),
            dec!(150),
            None,
            dec!(200),
            None,
        );
        assert!(v.iter().any(|x| x.kind == ViolationKind::MaxNotional));
    }

    #[test]
    fn zero_portfolio_value_skips_risk_check_with_warning() {
        let ol = OrderLimits {
            max_risk_per_trade_pct: dec!(2),
            max_notional: dec!(25000),
            max_price_deviation_pct: dec!(5),
            min_instrument_price: dec!(5),
            max_pct_of_avg_daily_volume: dec!(10),
            min_avg_daily_volume: dec!(1000),
            blocked_symbols: Default::default(),
        };
        let v = ol.check(
            "AAPL",
            dec!(1000),
            dec!(50),
            dec!(0),
            dec!(150),
            None,
            dec!(10),
            None,
        );
        assert!(v.iter().any(|x| x.kind == ViolationKind::PortfolioValueZero
            && x.severity == Severity::Warning));
        assert!(!v.iter().any(|x| x.kind == ViolationKind::MaxRiskPerTrade));
    }
}
