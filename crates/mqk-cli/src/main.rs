//! Thin admin-operator surface (§6) over an in-process `RiskManager`.
//!
//! The core keeps no persisted state (§6 "Persisted state: none required"),
//! so this binary wires up a fresh kill switch / circuit breaker / risk
//! manager per invocation and exercises the four admin operations against
//! it, printing the resulting audit event as JSON. A host application with a
//! durability wrapper would instead load state before dispatching a command
//! and snapshot it after.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use mqk_config::AdminCode;
use mqk_risk::circuit_breaker::{BreakerThresholds, CircuitBreaker};
use mqk_risk::kill_switch::KillSwitch;
use mqk_risk::limits::{OrderLimits, PortfolioLimits, StrategyLimits};
use mqk_risk::manager::RiskManager;

#[derive(Parser)]
#[command(name = "mqk")]
#[command(about = "Execution & risk control core admin CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Kill switch operations
    KillSwitch {
        #[command(subcommand)]
        cmd: KillSwitchCmd,
    },
    /// Circuit breaker operations
    CircuitBreaker {
        #[command(subcommand)]
        cmd: CircuitBreakerCmd,
    },
    /// Strategy limit registration
    StrategyLimits {
        #[command(subcommand)]
        cmd: StrategyLimitsCmd,
    },
}

#[derive(Subcommand)]
enum KillSwitchCmd {
    /// Activate the kill switch, globally or for one producer
    Activate {
        #[arg(long)]
        producer: Option<String>,
        #[arg(long)]
        reason: String,
        #[arg(long, default_value = "operator")]
        source: String,
    },
    /// Deactivate the kill switch; requires the admin code
    Deactivate {
        #[arg(long)]
        producer: Option<String>,
        #[arg(long)]
        admin_code: String,
        #[arg(long)]
        reason: String,
    },
}

#[derive(Subcommand)]
enum CircuitBreakerCmd {
    /// Reset an OPEN circuit breaker to CLOSED; requires the admin code
    Reset {
        #[arg(long)]
        admin_code: String,
    },
}

#[derive(Subcommand)]
enum StrategyLimitsCmd {
    /// Register or update a producer's strategy limits
    Register {
        #[arg(long)]
        producer: String,
        #[arg(long)]
        max_allocation_pct: Decimal,
        #[arg(long)]
        max_drawdown_pct: Decimal,
        #[arg(long)]
        daily_loss_limit_pct: Decimal,
        #[arg(long)]
        paused: bool,
    },
}

fn demo_risk_manager() -> RiskManager {
    let kill_switch = Arc::new(KillSwitch::new(AdminCode::from_env()));
    let circuit_breaker = Arc::new(CircuitBreaker::new(
        BreakerThresholds {
            daily_warn_pct: Decimal::new(3, 0),
            daily_halt_pct: Decimal::new(5, 0),
            total_warn_pct: Decimal::new(10, 0),
            total_halt_pct: Decimal::new(15, 0),
        },
        kill_switch.clone(),
    ));

    RiskManager::new(
        kill_switch,
        circuit_breaker,
        PortfolioLimits {
            max_daily_drawdown_pct: Decimal::new(5, 0),
            max_total_drawdown_pct: Decimal::new(15, 0),
            max_deployed_capital_pct: Decimal::new(80, 0),
            max_open_positions: 20,
        },
        OrderLimits {
            max_risk_per_trade_pct: Decimal::new(2, 0),
            max_notional: Decimal::new(30_000, 0),
            max_price_deviation_pct: Decimal::new(5, 0),
            min_instrument_price: Decimal::new(1, 0),
            max_pct_of_avg_daily_volume: Decimal::new(10, 0),
            min_avg_daily_volume: Decimal::new(100_000, 0),
            blocked_symbols: std::collections::BTreeSet::new(),
        },
    )
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    let manager = demo_risk_manager();

    match cli.cmd {
        Commands::KillSwitch { cmd } => match cmd {
            KillSwitchCmd::Activate {
                producer,
                reason,
                source,
            } => {
                let event = match producer {
                    Some(producer_id) => manager.kill_switch.activate_strategy(producer_id, reason, source),
                    None => manager.kill_switch.activate_global(reason, source),
                };
                println!("{}", serde_json::to_string_pretty(&event_json(&event))?);
            }
            KillSwitchCmd::Deactivate {
                producer,
                admin_code,
                reason,
            } => {
                let result = match producer {
                    Some(producer_id) => {
                        manager
                            .kill_switch
                            .deactivate_strategy(&producer_id, &admin_code, reason)
                    }
                    None => manager.kill_switch.deactivate_global(&admin_code, reason),
                };
                match result {
                    Ok(event) => println!("{}", serde_json::to_string_pretty(&event_json(&event))?),
                    Err(e) => {
                        eprintln!("error: {e}");
                        std::process::exit(1);
                    }
                }
            }
        },
        Commands::CircuitBreaker { cmd } => match cmd {
            CircuitBreakerCmd::Reset { admin_code } => match manager.circuit_breaker.reset(&admin_code) {
                Ok(state) => println!("circuit_breaker_state={state:?}"),
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            },
        },
        Commands::StrategyLimits { cmd } => match cmd {
            StrategyLimitsCmd::Register {
                producer,
                max_allocation_pct,
                max_drawdown_pct,
                daily_loss_limit_pct,
                paused,
            } => {
                manager.register_strategy_limits(
                    producer.clone(),
                    StrategyLimits {
                        max_allocation_pct,
                        max_drawdown_pct,
                        daily_loss_limit_pct,
                        paused,
                        pause_reason: None,
                    },
                );
                println!("registered strategy limits for producer={producer}");
            }
        },
    }

    Ok(())
}

fn event_json(event: &mqk_risk::kill_switch::AuditEvent) -> serde_json::Value {
    serde_json::json!({
        "event_id": event.event_id.to_string(),
        "kind": format!("{:?}", event.kind),
        "producer_id": event.producer_id,
        "from_active": event.from_active,
        "to_active": event.to_active,
        "reason": event.reason,
        "trigger_source": event.trigger_source,
        "timestamp": event.timestamp.to_rfc3339(),
    })
}
