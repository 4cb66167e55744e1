//! Deterministic in-memory "paper" broker adapter (§4.E).
//!
//! Design decisions (kept intentionally simple/deterministic):
//! - `broker_id` is exactly `client_id`.
//! - Submit is idempotent: resubmitting a known `client_id` returns the
//!   existing order unchanged.
//! - This broker accepts every order immediately; it never auto-generates
//!   fills. Tests that need fills call `apply_fill` directly.
//! - Positions are not derived from fills; they're set explicitly via
//!   `set_position`, matching how scenario tests wire up a known broker
//!   state to compare against the local tracker.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use mqk_execution::{
    AccountSnapshot, BrokerCapability, BrokerError, BrokerStatus, OrderResult, OrderSubmission,
    PositionSnapshot,
};

struct Inner {
    orders: BTreeMap<String, OrderResult>,
    positions: BTreeMap<String, PositionSnapshot>,
    account: AccountSnapshot,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            orders: BTreeMap::new(),
            positions: BTreeMap::new(),
            account: AccountSnapshot {
                cash: Decimal::ZERO,
                equity: Decimal::ZERO,
                buying_power: Decimal::ZERO,
            },
        }
    }
}

pub struct PaperBroker {
    inner: RwLock<Inner>,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Set a position deterministically for test setup / scenario wiring.
    pub fn set_position(&self, symbol: impl Into<String>, signed_quantity: Decimal, average_entry_price: Decimal) {
        let symbol = symbol.into();
        self.inner.write().positions.insert(
            symbol.clone(),
            PositionSnapshot {
                symbol,
                signed_quantity,
                average_entry_price,
            },
        );
    }

    pub fn set_account(&self, account: AccountSnapshot) {
        self.inner.write().account = account;
    }

    /// Apply a fill to a known order deterministically; no-op if unknown.
    pub fn apply_fill(&self, broker_id: &str, filled_quantity: Decimal, average_fill_price: Decimal) {
        let mut guard = self.inner.write();
        if let Some(order) = guard.orders.get_mut(broker_id) {
            order.filled_quantity = filled_quantity;
            order.average_fill_price = Some(average_fill_price);
            order.status = if filled_quantity >= order.quantity {
                BrokerStatus::Filled
            } else {
                BrokerStatus::PartiallyFilled
            };
            order.updated_at = Utc::now();
        }
    }
}

impl Default for PaperBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerCapability for PaperBroker {
    async fn place_order(&self, order: OrderSubmission) -> Result<OrderResult, BrokerError> {
        let mut guard = self.inner.write();

        if let Some(existing) = guard.orders.get(&order.client_id) {
            return Ok(existing.clone());
        }

        let result = OrderResult {
            broker_id: order.client_id.clone(),
            client_id: Some(order.client_id.clone()),
            symbol: order.symbol,
            side: order.side,
            quantity: order.quantity,
            filled_quantity: Decimal::ZERO,
            average_fill_price: None,
            status: BrokerStatus::Accepted,
            updated_at: Utc::now(),
        };

        guard.orders.insert(order.client_id, result.clone());
        Ok(result)
    }

    async fn cancel_order(&self, broker_id: &str) -> Result<bool, BrokerError> {
        let mut guard = self.inner.write();
        match guard.orders.get_mut(broker_id) {
            Some(order) => {
                order.status = BrokerStatus::Cancelled;
                order.updated_at = Utc::now();
                Ok(true)
            }
            None => Err(BrokerError::OrderNotFound(broker_id.to_string())),
        }
    }

    async fn list_positions(&self) -> Result<Vec<PositionSnapshot>, BrokerError> {
        Ok(self.inner.read().positions.values().cloned().collect())
    }

    async fn get_account(&self) -> Result<AccountSnapshot, BrokerError> {
        Ok(self.inner.read().account.clone())
    }

    async fn get_order(&self, broker_id: &str) -> Result<OrderResult, BrokerError> {
        self.inner
            .read()
            .orders
            .get(broker_id)
            .cloned()
            .ok_or_else(|| BrokerError::OrderNotFound(broker_id.to_string()))
    }

    async fn list_orders(
        &self,
        status_filter: Option<BrokerStatus>,
        limit: usize,
    ) -> Result<Vec<OrderResult>, BrokerError> {
        let guard = self.inner.read();
        let mut orders: Vec<OrderResult> = guard
            .orders
            .values()
            .filter(|o| status_filter.map(|s| s == o.status).unwrap_or(true))
            .cloned()
            .collect();
        orders.truncate(limit);
        Ok(orders)
    }

    fn connected(&self) -> bool {
        true
    }

    fn is_paper(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqk_risk::types::Side;
    use rust_decimal_macros::dec;

    fn submission(client_id: &str) -> OrderSubmission {
        OrderSubmission {
            client_id: client_id.to_string(),
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            quantity: dec!(10),
            limit_price: None,
            stop_price: None,
        }
    }

    #[tokio::test]
    async fn submit_is_idempotent_on_client_id() {
        let broker = PaperBroker::new();
        let first = broker.place_order(submission("c1")).await.unwrap();
        let second = broker.place_order(submission("c1")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(broker.list_orders(None, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancel_unknown_order_errors() {
        let broker = PaperBroker::new();
        let err = broker.cancel_order("missing").await.unwrap_err();
        assert_eq!(err, BrokerError::OrderNotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn cancel_known_order_marks_cancelled() {
        let broker = PaperBroker::new();
        broker.place_order(submission("c1")).await.unwrap();
        assert!(broker.cancel_order("c1").await.unwrap());
        let order = broker.get_order("c1").await.unwrap();
        assert_eq!(order.status, BrokerStatus::Cancelled);
    }

    #[tokio::test]
    async fn apply_fill_updates_status() {
        let broker = PaperBroker::new();
        broker.place_order(submission("c1")).await.unwrap();
        broker.apply_fill("c1", dec!(4), dec!(150));
        let order = broker.get_order("c1").await.unwrap();
        assert_eq!(order.status, BrokerStatus::PartiallyFilled);

        broker.apply_fill("c1", dec!(10), dec!(151));
        let order = broker.get_order("c1").await.unwrap();
        assert_eq!(order.status, BrokerStatus::Filled);
    }

    #[tokio::test]
    async fn positions_reflect_set_position_calls() {
        let broker = PaperBroker::new();
        broker.set_position("AAPL", dec!(100), dec!(150));
        let positions = broker.list_positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].signed_quantity, dec!(100));
    }
}
