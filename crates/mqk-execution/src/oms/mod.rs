//! Order Management System (§4.F): owns the per-order state machine,
//! enforces idempotency by client-supplied identifier, and indexes orders by
//! internal / client / broker id and by producer.

pub mod state_machine;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use uuid::Uuid;

use mqk_risk::types::{OrderKind, Side, TimeInForce};

use crate::broker::{BrokerStatus, OrderResult};
pub use state_machine::{is_legal_transition, OrderState};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OmsError {
    #[error("illegal transition from {from:?} to {to:?}")]
    InvalidStateTransition { from: OrderState, to: OrderState },
    #[error("order not found")]
    OrderNotFound,
}

/// A managed order: all intent fields plus OMS-owned bookkeeping (§3).
#[derive(Clone, Debug, PartialEq)]
pub struct ManagedOrder {
    pub internal_id: Uuid,
    pub client_id: String,
    pub broker_id: Option<String>,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub kind: OrderKind,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub producer_id: String,
    pub stop_loss_price: Option<Decimal>,

    pub filled_quantity: Decimal,
    pub average_fill_price: Option<Decimal>,
    pub fees: Decimal,
    pub rejection_reason: Option<String>,
    pub state: OrderState,

    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub filled_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ManagedOrder {
    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Parameters for creating a new order; grouped so `create_order` doesn't
/// need a dozen positional arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrderParams {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub kind: OrderKind,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub producer_id: String,
    pub stop_loss_price: Option<Decimal>,
}

#[derive(Default)]
struct Indices {
    orders: HashMap<Uuid, ManagedOrder>,
    by_client: HashMap<String, Uuid>,
    by_broker: HashMap<String, Uuid>,
    by_producer: HashMap<String, HashSet<Uuid>>,
}

pub struct Oms {
    inner: RwLock<Indices>,
}

impl Default for Oms {
    fn default() -> Self {
        Self::new()
    }
}

impl Oms {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Indices::default()),
        }
    }

    /// `producer_symbol_YYYYMMDDhhmmss_<random8hex>` — callers may instead
    /// supply their own id; the only requirement is process-lifetime
    /// uniqueness (§4.F).
    pub fn generate_client_order_id(&self, producer_id: &str, symbol: &str) -> String {
        let now = Utc::now();
        let rand_suffix: u32 = rand::random();
        format!(
            "{producer_id}_{symbol}_{}_{:08x}",
            now.format("%Y%m%d%H%M%S"),
            rand_suffix
        )
    }

    /// Idempotent: if `client_id` already exists, returns the existing order
    /// unchanged. Never raises, never creates a duplicate.
    pub fn create_order(&self, client_id: impl Into<String>, params: NewOrderParams) -> ManagedOrder {
        let client_id = client_id.into();
        let mut inner = self.inner.write();
        if let Some(existing_id) = inner.by_client.get(&client_id) {
            return inner.orders.get(existing_id).cloned().expect("index must point at a live order");
        }

        let now = Utc::now();
        let internal_id = Uuid::new_v4();
        let order = ManagedOrder {
            internal_id,
            client_id: client_id.clone(),
            broker_id: None,
            symbol: params.symbol,
            side: params.side,
            quantity: params.quantity,
            kind: params.kind,
            limit_price: params.limit_price,
            stop_price: params.stop_price,
            time_in_force: params.time_in_force,
            producer_id: params.producer_id.clone(),
            stop_loss_price: params.stop_loss_price,
            filled_quantity: Decimal::ZERO,
            average_fill_price: None,
            fees: Decimal::ZERO,
            rejection_reason: None,
            state: OrderState::Pending,
            created_at: now,
            submitted_at: None,
            filled_at: None,
            cancelled_at: None,
            updated_at: now,
        };

        inner.by_client.insert(client_id, internal_id);
        inner
            .by_producer
            .entry(params.producer_id)
            .or_default()
            .insert(internal_id);
        inner.orders.insert(internal_id, order.clone());
        order
    }

    pub fn submit_order(&self, client_id: &str, broker_id: impl Into<String>) -> Result<ManagedOrder, OmsError> {
        let broker_id = broker_id.into();
        let mut inner = self.inner.write();
        let internal_id = *inner.by_client.get(client_id).ok_or(OmsError::OrderNotFound)?;
        let order = inner.orders.get_mut(&internal_id).ok_or(OmsError::OrderNotFound)?;
        if order.state != OrderState::Pending {
            return Err(OmsError::InvalidStateTransition {
                from: order.state,
                to: OrderState::Submitted,
            });
        }
        order.state = OrderState::Submitted;
        order.broker_id = Some(broker_id.clone());
        order.submitted_at = Some(Utc::now());
        order.updated_at = Utc::now();
        let snapshot = order.clone();
        inner.by_broker.insert(broker_id, internal_id);
        Ok(snapshot)
    }

    pub fn reject_order(&self, client_id: &str, reason: impl Into<String>) -> Result<ManagedOrder, OmsError> {
        let mut inner = self.inner.write();
        let internal_id = *inner.by_client.get(client_id).ok_or(OmsError::OrderNotFound)?;
        let order = inner.orders.get_mut(&internal_id).ok_or(OmsError::OrderNotFound)?;
        if !is_legal_transition(order.state, OrderState::Rejected) {
            return Err(OmsError::InvalidStateTransition {
                from: order.state,
                to: OrderState::Rejected,
            });
        }
        order.state = OrderState::Rejected;
        order.rejection_reason = Some(reason.into());
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    /// Cumulative fill update. Regressions in `filled_qty` are ignored (log,
    /// do not fail) — see §4.F.
    pub fn fill_order(
        &self,
        broker_id: &str,
        filled_qty: Decimal,
        avg_price: Decimal,
        fees: Decimal,
    ) -> Result<ManagedOrder, OmsError> {
        let mut inner = self.inner.write();
        let internal_id = *inner.by_broker.get(broker_id).ok_or(OmsError::OrderNotFound)?;
        let order = inner.orders.get_mut(&internal_id).ok_or(OmsError::OrderNotFound)?;

        if filled_qty < order.filled_quantity {
            tracing::warn!(
                broker_id,
                prior = %order.filled_quantity,
                incoming = %filled_qty,
                "ignoring regressive fill quantity"
            );
            return Ok(order.clone());
        }

        order.filled_quantity = filled_qty;
        order.average_fill_price = Some(avg_price);
        order.fees = fees;
        order.updated_at = Utc::now();

        if filled_qty >= order.quantity {
            order.state = OrderState::Filled;
            order.filled_at = Some(Utc::now());
        } else if filled_qty > Decimal::ZERO && order.state == OrderState::Submitted {
            order.state = OrderState::PartiallyFilled;
        }

        Ok(order.clone())
    }

    /// Best-effort, idempotent at the caller: re-cancelling an already
    /// cancelled order is not an error (§5).
    pub fn cancel_order(&self, client_id: Option<&str>, broker_id: Option<&str>) -> Result<ManagedOrder, OmsError> {
        let mut inner = self.inner.write();
        let internal_id = match (client_id, broker_id) {
            (Some(c), _) => *inner.by_client.get(c).ok_or(OmsError::OrderNotFound)?,
            (None, Some(b)) => *inner.by_broker.get(b).ok_or(OmsError::OrderNotFound)?,
            (None, None) => return Err(OmsError::OrderNotFound),
        };
        let order = inner.orders.get_mut(&internal_id).ok_or(OmsError::OrderNotFound)?;

        if order.state == OrderState::Cancelled {
            return Ok(order.clone());
        }
        if !is_legal_transition(order.state, OrderState::Cancelled) {
            return Err(OmsError::InvalidStateTransition {
                from: order.state,
                to: OrderState::Cancelled,
            });
        }
        order.state = OrderState::Cancelled;
        order.cancelled_at = Some(Utc::now());
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    /// Maps a broker-neutral [`OrderResult`] onto internal state. Tolerates a
    /// broker skipping states by attempting a multi-step walk; if no walk
    /// exists, logs and retains current state but still applies fill
    /// quantities (§4.F).
    pub fn update_from_broker(&self, result: &OrderResult) -> Result<ManagedOrder, OmsError> {
        let mut inner = self.inner.write();
        let internal_id = *inner
            .by_broker
            .get(&result.broker_id)
            .ok_or(OmsError::OrderNotFound)?;
        let order = inner.orders.get_mut(&internal_id).ok_or(OmsError::OrderNotFound)?;

        let target = map_broker_status(result.status);

        if result.filled_quantity >= order.filled_quantity {
            order.filled_quantity = result.filled_quantity;
            if let Some(p) = result.average_fill_price {
                order.average_fill_price = Some(p);
            }
        }

        if order.state == target {
            order.updated_at = Utc::now();
            return Ok(order.clone());
        }

        if is_legal_transition(order.state, target) {
            order.state = target;
        } else if let Some(path) = state_machine::find_legal_path(order.state, target) {
            for step in path {
                order.state = step;
            }
        } else {
            tracing::warn!(
                broker_id = %result.broker_id,
                from = ?order.state,
                to = ?target,
                "illegal broker-reported transition tolerated: retaining current state"
            );
        }

        match order.state {
            OrderState::Filled if order.filled_at.is_none() => order.filled_at = Some(Utc::now()),
            OrderState::Cancelled if order.cancelled_at.is_none() => order.cancelled_at = Some(Utc::now()),
            _ => {}
        }
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    pub fn get(&self, internal_id: Uuid) -> Option<ManagedOrder> {
        self.inner.read().orders.get(&internal_id).cloned()
    }

    pub fn get_by_client(&self, client_id: &str) -> Option<ManagedOrder> {
        let inner = self.inner.read();
        inner.by_client.get(client_id).and_then(|id| inner.orders.get(id)).cloned()
    }

    pub fn get_by_broker(&self, broker_id: &str) -> Option<ManagedOrder> {
        let inner = self.inner.read();
        inner.by_broker.get(broker_id).and_then(|id| inner.orders.get(id)).cloned()
    }

    pub fn has_order(&self, client_id: &str) -> bool {
        self.inner.read().by_client.contains_key(client_id)
    }

    pub fn orders_by_producer(&self, producer_id: &str) -> Vec<ManagedOrder> {
        let inner = self.inner.read();
        inner
            .by_producer
            .get(producer_id)
            .map(|ids| ids.iter().filter_map(|id| inner.orders.get(id)).cloned().collect())
            .unwrap_or_default()
    }

    pub fn open_orders(&self, producer_id: Option<&str>) -> Vec<ManagedOrder> {
        let inner = self.inner.read();
        match producer_id {
            Some(p) => inner
                .by_producer
                .get(p)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| inner.orders.get(id))
                        .filter(|o| o.is_open())
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            None => inner.orders.values().filter(|o| o.is_open()).cloned().collect(),
        }
    }

    /// Best-effort sweep: iterates open orders and cancels each, ignoring
    /// individual failures.
    pub fn cancel_all_open(&self, producer_id: Option<&str>) -> Vec<ManagedOrder> {
        let targets = self.open_orders(producer_id);
        let mut cancelled = Vec::new();
        for o in targets {
            if let Ok(updated) = self.cancel_order(Some(&o.client_id), None) {
                cancelled.push(updated);
            }
        }
        cancelled
    }

    /// Rebuilds every secondary index from the primary store and asserts
    /// equality with the live indices — used by invariant-checking tests
    /// (§9 "indices vs source of truth").
    #[cfg(test)]
    fn rebuilt_indices_match(&self) -> bool {
        let inner = self.inner.read();
        let mut by_client = HashMap::new();
        let mut by_broker = HashMap::new();
        let mut by_producer: HashMap<String, HashSet<Uuid>> = HashMap::new();
        for (id, o) in inner.orders.iter() {
            by_client.insert(o.client_id.clone(), *id);
            if let Some(b) = &o.broker_id {
                by_broker.insert(b.clone(), *id);
            }
            by_producer.entry(o.producer_id.clone()).or_default().insert(*id);
        }
        by_client == inner.by_client && by_broker == inner.by_broker && by_producer == inner.by_producer
    }
}

fn map_broker_status(status: BrokerStatus) -> OrderState {
    match status {
        BrokerStatus::Pending => OrderState::Pending,
        BrokerStatus::Submitted | BrokerStatus::Accepted => OrderState::Submitted,
        BrokerStatus::PartiallyFilled => OrderState::PartiallyFilled,
        BrokerStatus::Filled => OrderState::Filled,
        BrokerStatus::Cancelled | BrokerStatus::Expired => OrderState::Cancelled,
        BrokerStatus::Rejected => OrderState::Rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params() -> NewOrderParams {
        NewOrderParams {
            symbol: "AAPL".into(),
            side: Side::Buy,
            quantity: dec!(100),
            kind: OrderKind::Limit,
            limit_price: Some(dec!(150)),
            stop_price: None,
            time_in_force: TimeInForce::Day,
            producer_id: "p1".into(),
            stop_loss_price: Some(dec!(147)),
        }
    }

    #[test]
    fn s1_happy_path_through_to_filled() {
        let oms = Oms::new();
        let o = oms.create_order("bid1", params());
        assert_eq!(o.state, OrderState::Pending);

        let o = oms.submit_order("bid1", "b1").unwrap();
        assert_eq!(o.state, OrderState::Submitted);

        let o = oms.fill_order("b1", dec!(100), dec!(150.10), dec!(1)).unwrap();
        assert_eq!(o.state, OrderState::Filled);
        assert_eq!(o.filled_quantity, dec!(100));
        assert!(oms.rebuilt_indices_match());
    }

    #[test]
    fn s3_idempotent_create_under_repeated_calls() {
        let oms = Oms::new();
        let a = oms.create_order("K", params());
        let mut other = params();
        other.quantity = dec!(999); // different args, must be ignored
        let b = oms.create_order("K", other);
        assert_eq!(a.internal_id, b.internal_id);
        assert!(oms.has_order("K"));
        assert_eq!(oms.orders_by_producer("p1").len(), 1);
    }

    #[test]
    fn s5_partial_fill_then_cancel() {
        let oms = Oms::new();
        oms.create_order("bid5", params());
        oms.submit_order("bid5", "b5").unwrap();
        let o = oms.fill_order("b5", dec!(40), dec!(150.00), dec!(1)).unwrap();
        assert_eq!(o.state, OrderState::PartiallyFilled);
        assert_eq!(o.filled_quantity, dec!(40));

        let o = oms.cancel_order(None, Some("b5")).unwrap();
        assert_eq!(o.state, OrderState::Cancelled);
        assert_eq!(o.filled_quantity, dec!(40));

        assert_eq!(oms.cancel_order(None, Some("b5")).unwrap().state, OrderState::Cancelled);
    }

    #[test]
    fn illegal_transition_raises_and_does_not_mutate() {
        let oms = Oms::new();
        oms.create_order("bidX", params());
        let err = oms.submit_order("nonexistent", "bX").unwrap_err();
        assert_eq!(err, OmsError::OrderNotFound);

        oms.submit_order("bidX", "bX").unwrap();
        oms.fill_order("bX", dec!(100), dec!(150), dec!(0)).unwrap();
        let err = oms.cancel_order(Some("bidX"), None).unwrap_err();
        assert!(matches!(err, OmsError::InvalidStateTransition { from: OrderState::Filled, to: OrderState::Cancelled }));
    }

    #[test]
    fn update_from_broker_tolerates_skipped_states() {
        let oms = Oms::new();
        oms.create_order("bidY", params());
        oms.submit_order("bidY", "bY").unwrap();

        let result = OrderResult {
            broker_id: "bY".into(),
            client_id: Some("bidY".into()),
            symbol: "AAPL".into(),
            side: Side::Buy,
            quantity: dec!(100),
            filled_quantity: dec!(100),
            average_fill_price: Some(dec!(150)),
            status: BrokerStatus::Filled,
            updated_at: Utc::now(),
        };
        let o = oms.update_from_broker(&result).unwrap();
        assert_eq!(o.state, OrderState::Filled);
        // applying twice is idempotent
        let o2 = oms.update_from_broker(&result).unwrap();
        assert_eq!(o2.state, OrderState::Filled);
        assert_eq!(o2.filled_quantity, dec!(100));
    }

    #[test]
    fn regressive_fill_quantity_is_ignored() {
        let oms = Oms::new();
        oms.create_order("bidZ", params());
        oms.submit_order("bidZ", "bZ").unwrap();
        oms.fill_order("bZ", dec!(60), dec!(150), dec!(0)).unwrap();
        let o = oms.fill_order("bZ", dec!(30), dec!(150), dec!(0)).unwrap();
        assert_eq!(o.filled_quantity, dec!(60));
    }

    #[test]
    fn cancel_all_open_is_best_effort_per_producer() {
        let oms = Oms::new();
        oms.create_order("a1", params());
        let mut p2 = params();
        p2.producer_id = "p2".into();
        oms.create_order("a2", p2);
        oms.submit_order("a1", "ba1").unwrap();
        oms.submit_order("a2", "ba2").unwrap();

        let cancelled = oms.cancel_all_open(Some("p1"));
        assert_eq!(cancelled.len(), 1);
        assert_eq!(oms.get_by_client("a2").unwrap().state, OrderState::Submitted);
    }
}
