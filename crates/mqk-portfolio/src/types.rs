//! Tracked position (§3): one open row per (producer, symbol). Additions
//! fold into the existing row; the average entry price is a cost-weighted
//! mean over same-direction adds and is never mutated by reducing fills.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub struct TrackedPosition {
    pub position_id: Uuid,
    pub symbol: String,
    pub producer_id: String,
    pub signed_quantity: Decimal,
    pub average_entry_price: Decimal,
    pub cost_basis: Decimal,
    pub last_price: Option<Decimal>,
    pub market_value: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>,
    pub realized_pnl: Decimal,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl TrackedPosition {
    pub fn is_open(&self) -> bool {
        !self.signed_quantity.is_zero()
    }

    pub fn is_long(&self) -> bool {
        self.signed_quantity.is_sign_positive() && !self.signed_quantity.is_zero()
    }

    pub fn is_short(&self) -> bool {
        self.signed_quantity.is_sign_negative()
    }
}
