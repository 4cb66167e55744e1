//! Wire types for Alpaca's trading API (orders/positions/account), scoped to
//! the fields this adapter actually consumes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlpacaSide {
    Buy,
    Sell,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlpacaOrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlpacaTimeInForce {
    Day,
    Gtc,
    Ioc,
    Fok,
}

/// Order lifecycle states Alpaca reports. The adapter maps these onto the
/// core's broker-neutral `BrokerStatus` (§4.E).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlpacaOrderStatus {
    New,
    Accepted,
    PendingNew,
    PartiallyFilled,
    Filled,
    DoneForDay,
    Canceled,
    Expired,
    Replaced,
    PendingCancel,
    PendingReplace,
    Rejected,
    Suspended,
    Stopped,
    Calculated,
    AcceptedForBidding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlpacaOrderRequest {
    pub symbol: String,
    pub qty: String,
    pub side: AlpacaSide,
    #[serde(rename = "type")]
    pub order_type: AlpacaOrderType,
    pub time_in_force: AlpacaTimeInForce,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<String>,
    pub client_order_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaOrder {
    pub id: String,
    pub client_order_id: String,
    pub symbol: String,
    pub side: AlpacaSide,
    pub qty: Decimal,
    pub filled_qty: Decimal,
    pub filled_avg_price: Option<Decimal>,
    pub status: AlpacaOrderStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaPosition {
    pub symbol: String,
    /// Signed quantity: Alpaca reports magnitude plus a separate `side`.
    pub qty: Decimal,
    pub side: AlpacaSide,
    pub avg_entry_price: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaAccount {
    pub cash: Decimal,
    pub equity: Decimal,
    pub buying_power: Decimal,
}
