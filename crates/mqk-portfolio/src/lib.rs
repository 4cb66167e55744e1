//! Position Tracker (§4.G): multi-producer attribution of holdings,
//! weighted-average-cost accounting, realized/unrealized P&L.

pub mod tracker;
pub mod types;

pub use tracker::PositionTracker;
pub use types::TrackedPosition;
