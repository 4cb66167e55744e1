//! Live broker adapter for Alpaca's trading API (§4.E).
//!
//! Thin translation layer: builds Alpaca wire requests from `OrderSubmission`,
//! issues them over `reqwest`, and maps Alpaca's order-status vocabulary onto
//! the core's broker-neutral `BrokerStatus`. No retry/backoff policy lives
//! here; callers apply their own timeout around each call (§5).

pub mod types;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use mqk_execution::{
    AccountSnapshot, BrokerCapability, BrokerError, BrokerStatus, OrderResult, OrderSubmission,
    PositionSnapshot,
};
use mqk_risk::types::Side;

use types::{
    AlpacaAccount, AlpacaOrder, AlpacaOrderRequest, AlpacaOrderStatus, AlpacaOrderType,
    AlpacaPosition, AlpacaSide, AlpacaTimeInForce,
};

pub struct AlpacaBroker {
    client: Client,
    base_url: String,
    key_id: String,
    secret_key: String,
}

impl AlpacaBroker {
    pub fn new(base_url: impl Into<String>, key_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            key_id: key_id.into(),
            secret_key: secret_key.into(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("APCA-API-KEY-ID", &self.key_id)
            .header("APCA-API-SECRET-KEY", &self.secret_key)
    }

    async fn map_error(resp: reqwest::Response) -> BrokerError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(%status, %body, "alpaca request failed");
        match status {
            StatusCode::FORBIDDEN | StatusCode::UNPROCESSABLE_ENTITY if body.contains("insufficient") => {
                BrokerError::InsufficientFunds
            }
            StatusCode::NOT_FOUND => BrokerError::OrderNotFound(body),
            _ => BrokerError::Other(format!("{status}: {body}")),
        }
    }
}

fn map_side(side: Side) -> AlpacaSide {
    match side {
        Side::Buy => AlpacaSide::Buy,
        Side::Sell => AlpacaSide::Sell,
    }
}

fn unmap_side(side: AlpacaSide) -> Side {
    match side {
        AlpacaSide::Buy => Side::Buy,
        AlpacaSide::Sell => Side::Sell,
    }
}

fn map_order_kind(limit_price: &Option<rust_decimal::Decimal>, stop_price: &Option<rust_decimal::Decimal>) -> AlpacaOrderType {
    match (limit_price.is_some(), stop_price.is_some()) {
        (false, false) => AlpacaOrderType::Market,
        (true, false) => AlpacaOrderType::Limit,
        (false, true) => AlpacaOrderType::Stop,
        (true, true) => AlpacaOrderType::StopLimit,
    }
}

/// Maps Alpaca's order-status vocabulary onto the core's seven broker-neutral
/// statuses (§4.E): `pending_new`/`pending_replace` fold to `Pending`,
/// `accepted`/`pending_cancel` fold to `Accepted`, `done_for_day`/`replaced`/
/// `stopped`/`suspended`/`calculated`/`accepted_for_bidding` are treated as
/// still-open and fold to `Submitted` since none has a direct counterpart.
fn map_status(status: AlpacaOrderStatus) -> BrokerStatus {
    use AlpacaOrderStatus::*;
    match status {
        PendingNew | PendingReplace => BrokerStatus::Pending,
        New => BrokerStatus::Submitted,
        Accepted | PendingCancel => BrokerStatus::Accepted,
        PartiallyFilled => BrokerStatus::PartiallyFilled,
        Filled => BrokerStatus::Filled,
        Canceled => BrokerStatus::Cancelled,
        Expired => BrokerStatus::Expired,
        Rejected => BrokerStatus::Rejected,
        DoneForDay | Replaced | Stopped | Suspended | Calculated | AcceptedForBidding => {
            BrokerStatus::Submitted
        }
    }
}

fn to_order_result(order: AlpacaOrder) -> OrderResult {
    OrderResult {
        broker_id: order.id,
        client_id: Some(order.client_order_id),
        symbol: order.symbol,
        side: unmap_side(order.side),
        quantity: order.qty,
        filled_quantity: order.filled_qty,
        average_fill_price: order.filled_avg_price,
        status: map_status(order.status),
        updated_at: order.updated_at,
    }
}

fn signed_quantity(position: &AlpacaPosition) -> rust_decimal::Decimal {
    match position.side {
        AlpacaSide::Buy => position.qty,
        AlpacaSide::Sell => -position.qty,
    }
}

#[async_trait]
impl BrokerCapability for AlpacaBroker {
    async fn place_order(&self, order: OrderSubmission) -> Result<OrderResult, BrokerError> {
        let body = AlpacaOrderRequest {
            symbol: order.symbol,
            qty: order.quantity.to_string(),
            side: map_side(order.side),
            order_type: map_order_kind(&order.limit_price, &order.stop_price),
            time_in_force: AlpacaTimeInForce::Day,
            limit_price: order.limit_price.map(|p| p.to_string()),
            stop_price: order.stop_price.map(|p| p.to_string()),
            client_order_id: order.client_id,
        };

        let resp = self
            .request(reqwest::Method::POST, "/v2/orders")
            .json(&body)
            .send()
            .await
            .map_err(|e| BrokerError::Other(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::map_error(resp).await);
        }

        let order: AlpacaOrder = resp
            .json()
            .await
            .map_err(|e| BrokerError::Other(e.to_string()))?;
        Ok(to_order_result(order))
    }

    async fn cancel_order(&self, broker_id: &str) -> Result<bool, BrokerError> {
        let resp = self
            .request(reqwest::Method::DELETE, &format!("/v2/orders/{broker_id}"))
            .send()
            .await
            .map_err(|e| BrokerError::Other(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(BrokerError::OrderNotFound(broker_id.to_string()));
        }
        Ok(resp.status().is_success())
    }

    async fn list_positions(&self) -> Result<Vec<PositionSnapshot>, BrokerError> {
        let resp = self
            .request(reqwest::Method::GET, "/v2/positions")
            .send()
            .await
            .map_err(|e| BrokerError::Other(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::map_error(resp).await);
        }

        let positions: Vec<AlpacaPosition> = resp
            .json()
            .await
            .map_err(|e| BrokerError::Other(e.to_string()))?;

        Ok(positions
            .into_iter()
            .map(|p| PositionSnapshot {
                symbol: p.symbol.clone(),
                signed_quantity: signed_quantity(&p),
                average_entry_price: p.avg_entry_price,
            })
            .collect())
    }

    async fn get_account(&self) -> Result<AccountSnapshot, BrokerError> {
        let resp = self
            .request(reqwest::Method::GET, "/v2/account")
            .send()
            .await
            .map_err(|e| BrokerError::Other(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::map_error(resp).await);
        }

        let account: AlpacaAccount = resp
            .json()
            .await
            .map_err(|e| BrokerError::Other(e.to_string()))?;

        Ok(AccountSnapshot {
            cash: account.cash,
            equity: account.equity,
            buying_power: account.buying_power,
        })
    }

    async fn get_order(&self, broker_id: &str) -> Result<OrderResult, BrokerError> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/v2/orders/{broker_id}"))
            .send()
            .await
            .map_err(|e| BrokerError::Other(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(BrokerError::OrderNotFound(broker_id.to_string()));
        }
        if !resp.status().is_success() {
            return Err(Self::map_error(resp).await);
        }

        let order: AlpacaOrder = resp
            .json()
            .await
            .map_err(|e| BrokerError::Other(e.to_string()))?;
        Ok(to_order_result(order))
    }

    async fn list_orders(
        &self,
        status_filter: Option<BrokerStatus>,
        limit: usize,
    ) -> Result<Vec<OrderResult>, BrokerError> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/v2/orders?limit={limit}"))
            .send()
            .await
            .map_err(|e| BrokerError::Other(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::map_error(resp).await);
        }

        let orders: Vec<AlpacaOrder> = resp
            .json()
            .await
            .map_err(|e| BrokerError::Other(e.to_string()))?;

        Ok(orders
            .into_iter()
            .map(to_order_result)
            .filter(|o| status_filter.map(|s| s == o.status).unwrap_or(true))
            .collect())
    }

    fn connected(&self) -> bool {
        !self.key_id.is_empty() && !self.secret_key.is_empty()
    }

    fn is_paper(&self) -> bool {
        self.base_url.contains("paper")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_alpaca_status_to_a_broker_status() {
        use AlpacaOrderStatus::*;
        for status in [
            New, Accepted, PendingNew, PartiallyFilled, Filled, DoneForDay, Canceled, Expired,
            Replaced, PendingCancel, PendingReplace, Rejected, Suspended, Stopped, Calculated,
            AcceptedForBidding,
        ] {
            let _ = map_status(status);
        }
    }

    #[test]
    fn paper_base_url_is_detected() {
        let broker = AlpacaBroker::new("https://paper-api.alpaca.markets", "k", "s");
        assert!(broker.is_paper());
        let broker = AlpacaBroker::new("https://api.alpaca.markets", "k", "s");
        assert!(!broker.is_paper());
    }

    #[test]
    fn connected_requires_credentials() {
        let broker = AlpacaBroker::new("https://paper-api.alpaca.markets", "", "");
        assert!(!broker.connected());
    }
}
