//! Broker Capability (§4.E): the minimal contract the OMS and Position
//! Tracker require from any broker adapter. No concrete adapter is named
//! here — see `mqk-broker-paper` and `mqk-broker-alpaca`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use mqk_risk::types::Side;

/// The seven broker-neutral order statuses every adapter must translate its
/// provider's vocabulary onto. The core treats `Accepted` as equivalent to
/// `Submitted` and `Expired` as equivalent to `Cancelled` (§4.E).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BrokerStatus {
    Pending,
    Submitted,
    Accepted,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    Expired,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderResult {
    pub broker_id: String,
    pub client_id: Option<String>,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
    pub average_fill_price: Option<Decimal>,
    pub status: BrokerStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PositionSnapshot {
    pub symbol: String,
    pub signed_quantity: Decimal,
    pub average_entry_price: Decimal,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AccountSnapshot {
    pub cash: Decimal,
    pub equity: Decimal,
    pub buying_power: Decimal,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BrokerError {
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("order not found: {0}")]
    OrderNotFound(String),
    #[error("broker error: {0}")]
    Other(String),
}

/// An order submission, as the OMS hands it to a broker adapter.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderSubmission {
    pub client_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
}

/// The minimum contract consumed by the OMS (§4.F) and Position Tracker
/// (§4.G). Every method may suspend on network I/O (§5); callers apply their
/// own timeout.
#[async_trait]
pub trait BrokerCapability: Send + Sync {
    async fn place_order(&self, order: OrderSubmission) -> Result<OrderResult, BrokerError>;
    async fn cancel_order(&self, broker_id: &str) -> Result<bool, BrokerError>;
    async fn list_positions(&self) -> Result<Vec<PositionSnapshot>, BrokerError>;
    async fn get_account(&self) -> Result<AccountSnapshot, BrokerError>;
    async fn get_order(&self, broker_id: &str) -> Result<OrderResult, BrokerError>;
    async fn list_orders(
        &self,
        status_filter: Option<BrokerStatus>,
        limit: usize,
    ) -> Result<Vec<OrderResult>, BrokerError>;
    fn connected(&self) -> bool;
    fn is_paper(&self) -> bool;
}
