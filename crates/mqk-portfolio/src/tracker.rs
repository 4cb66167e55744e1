//! Position Tracker (§4.G, tracker half): multi-producer attribution of
//! holdings and weighted-average-cost accounting. Reconciliation against a
//! broker lives in `mqk-reconcile`, which consumes [`PositionTracker::open_positions`].

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::types::TrackedPosition;

#[derive(Default)]
struct Indices {
    positions: HashMap<Uuid, TrackedPosition>,
    /// (producer_id, symbol) -> position_id, only while the position is open.
    open_by_producer_symbol: HashMap<(String, String), Uuid>,
    by_symbol: HashMap<String, HashSet<Uuid>>,
    by_producer: HashMap<String, HashSet<Uuid>>,
    /// Aggregate signed quantity per symbol, summed across all producers'
    /// open positions (§3 invariant).
    aggregate_by_symbol: BTreeMap<String, Decimal>,
}

pub struct PositionTracker {
    inner: RwLock<Indices>,
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionTracker {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Indices::default()),
        }
    }

    /// If an open (producer, symbol) row already exists, delegates to
    /// `update_position`. Otherwise allocates a new row.
    pub fn open_position(
        &self,
        symbol: impl Into<String>,
        producer_id: impl Into<String>,
        signed_qty: Decimal,
        entry_price: Decimal,
    ) -> TrackedPosition {
        let symbol = symbol.into();
        let producer_id = producer_id.into();
        let existing_id = {
            let inner = self.inner.read();
            inner
                .open_by_producer_symbol
                .get(&(producer_id.clone(), symbol.clone()))
                .copied()
        };
        if let Some(id) = existing_id {
            return self.update_position(id, signed_qty, entry_price).expect("indexed position must exist");
        }

        let now = Utc::now();
        let position_id = Uuid::new_v4();
        let position = TrackedPosition {
            position_id,
            symbol: symbol.clone(),
            producer_id: producer_id.clone(),
            signed_quantity: signed_qty,
            average_entry_price: entry_price,
            cost_basis: signed_qty.abs() * entry_price,
            last_price: None,
            market_value: None,
            unrealized_pnl: None,
            realized_pnl: Decimal::ZERO,
            opened_at: now,
            closed_at: None,
            updated_at: now,
        };

        let mut inner = self.inner.write();
        inner
            .open_by_producer_symbol
            .insert((producer_id.clone(), symbol.clone()), position_id);
        inner.by_symbol.entry(symbol.clone()).or_default().insert(position_id);
        inner.by_producer.entry(producer_id).or_default().insert(position_id);
        *inner.aggregate_by_symbol.entry(symbol).or_default() += signed_qty;
        inner.positions.insert(position_id, position.clone());
        position
    }

    /// The central accounting operation (§4.G). Same-direction adds fold into
    /// a cost-weighted average; opposite-direction fills close/reduce at the
    /// existing average (never mutating it) and bank realized P&L; a delta
    /// that crosses zero opens a fresh leg at `price` with a new average.
    pub fn update_position(&self, position_id: Uuid, delta: Decimal, price: Decimal) -> Option<TrackedPosition> {
        let mut inner = self.inner.write();
        let pos = inner.positions.get(&position_id)?.clone();

        let current_qty = pos.signed_quantity;
        let same_direction = current_qty.is_zero()
            || delta.is_zero()
            || (current_qty.is_sign_positive() == delta.is_sign_positive());

        let (new_qty, new_avg, new_cost_basis, realized_delta) = if same_direction {
            let new_qty = current_qty + delta;
            let total_cost = current_qty.abs() * pos.average_entry_price + delta.abs() * price;
            let new_avg = if new_qty.is_zero() {
                pos.average_entry_price
            } else {
                total_cost / new_qty.abs()
            };
            (new_qty, new_avg, total_cost, Decimal::ZERO)
        } else {
            let closing_qty = delta.abs().min(current_qty.abs());
            let realized = if current_qty.is_sign_positive() {
                (price - pos.average_entry_price) * closing_qty
            } else {
                (pos.average_entry_price - price) * closing_qty
            };

            let naive_new_qty = current_qty + delta;
            let crosses_zero = !naive_new_qty.is_zero()
                && naive_new_qty.is_sign_positive() != current_qty.is_sign_positive();

            if crosses_zero {
                // The excess beyond flattening opens a fresh leg at `price`.
                let excess = naive_new_qty;
                (excess, price, excess.abs() * price, realized)
            } else {
                // Average of the remaining position is unchanged.
                (naive_new_qty, pos.average_entry_price, naive_new_qty.abs() * pos.average_entry_price, realized)
            }
        };

        let now = Utc::now();
        let symbol = pos.symbol.clone();
        let producer_id = pos.producer_id.clone();

        let updated = TrackedPosition {
            signed_quantity: new_qty,
            average_entry_price: new_avg,
            cost_basis: new_cost_basis,
            realized_pnl: pos.realized_pnl + realized_delta,
            closed_at: if new_qty.is_zero() { Some(now) } else { None },
            updated_at: now,
            ..pos
        };

        *inner.aggregate_by_symbol.entry(symbol.clone()).or_default() += delta;
        if updated.signed_quantity.is_zero() {
            inner.open_by_producer_symbol.remove(&(producer_id, symbol));
        }
        inner.positions.insert(position_id, updated.clone());
        Some(updated)
    }

    /// Shortcut: flattens a position entirely via `update_position`.
    pub fn close_position(&self, position_id: Uuid, exit_price: Decimal) -> Option<TrackedPosition> {
        let current_qty = self.inner.read().positions.get(&position_id)?.signed_quantity;
        self.update_position(position_id, -current_qty, exit_price)
    }

    /// For every open position on a listed symbol, recomputes market value
    /// and unrealized P&L from the supplied price.
    pub fn update_market_prices(&self, prices: &HashMap<String, Decimal>) {
        let mut inner = self.inner.write();
        for (symbol, price) in prices {
            let Some(ids) = inner.by_symbol.get(symbol).cloned() else {
                continue;
            };
            for id in ids {
                if let Some(pos) = inner.positions.get_mut(&id) {
                    if !pos.is_open() {
                        continue;
                    }
                    pos.last_price = Some(*price);
                    pos.market_value = Some(pos.signed_quantity.abs() * price);
                    pos.unrealized_pnl = Some((*price - pos.average_entry_price) * pos.signed_quantity);
                    pos.updated_at = Utc::now();
                }
            }
        }
    }

    pub fn get(&self, position_id: Uuid) -> Option<TrackedPosition> {
        self.inner.read().positions.get(&position_id).cloned()
    }

    pub fn open_positions(&self, producer_id: Option<&str>) -> Vec<TrackedPosition> {
        let inner = self.inner.read();
        match producer_id {
            Some(p) => inner
                .by_producer
                .get(p)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| inner.positions.get(id))
                        .filter(|p| p.is_open())
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            None => inner.positions.values().filter(|p| p.is_open()).cloned().collect(),
        }
    }

    pub fn by_symbol(&self, symbol: &str) -> Vec<TrackedPosition> {
        let inner = self.inner.read();
        inner
            .by_symbol
            .get(symbol)
            .map(|ids| ids.iter().filter_map(|id| inner.positions.get(id)).cloned().collect())
            .unwrap_or_default()
    }

    pub fn aggregate_signed_quantity(&self, symbol: &str) -> Decimal {
        self.inner.read().aggregate_by_symbol.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn total_unrealized_pnl(&self) -> Decimal {
        self.inner
            .read()
            .positions
            .values()
            .filter(|p| p.is_open())
            .filter_map(|p| p.unrealized_pnl)
            .sum()
    }

    pub fn total_realized_pnl(&self) -> Decimal {
        self.inner.read().positions.values().map(|p| p.realized_pnl).sum()
    }

    /// Rebuilds every secondary index from the primary store and compares —
    /// used by invariant-checking tests (§9).
    #[cfg(test)]
    fn rebuilt_indices_match(&self) -> bool {
        let inner = self.inner.read();
        let mut open_idx = HashMap::new();
        let mut by_symbol: HashMap<String, HashSet<Uuid>> = HashMap::new();
        let mut by_producer: HashMap<String, HashSet<Uuid>> = HashMap::new();
        let mut aggregate: BTreeMap<String, Decimal> = BTreeMap::new();
        for (id, p) in inner.positions.iter() {
            by_symbol.entry(p.symbol.clone()).or_default().insert(*id);
            by_producer.entry(p.producer_id.clone()).or_default().insert(*id);
            if p.is_open() {
                open_idx.insert((p.producer_id.clone(), p.symbol.clone()), *id);
            }
            *aggregate.entry(p.symbol.clone()).or_default() += p.signed_quantity;
        }
        open_idx == inner.open_by_producer_symbol
            && by_symbol == inner.by_symbol
            && by_producer == inner.by_producer
            && aggregate == inner.aggregate_by_symbol
    }
}
