//! Order state (§3): a closed enum with legality expressed as a static
//! adjacency table, per §9 "sum-typed state machine — do not model state
//! with booleans scattered across the record". A new legality rule is a
//! single table edit, not a scattered set of `if` checks.

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OrderState {
    Pending,
    Submitted,
    PartiallyFilled,
    Filled,
    Rejected,
    Cancelled,
}

impl OrderState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Rejected | Self::Cancelled)
    }

    pub fn is_open(self) -> bool {
        !self.is_terminal()
    }
}

/// The exact adjacency table of §3. Anything not listed here is illegal.
const TRANSITIONS: &[(OrderState, &[OrderState])] = &[
    (OrderState::Pending, &[OrderState::Submitted, OrderState::Rejected]),
    (
        OrderState::Submitted,
        &[
            OrderState::PartiallyFilled,
            OrderState::Filled,
            OrderState::Rejected,
            OrderState::Cancelled,
        ],
    ),
    (
        OrderState::PartiallyFilled,
        &[OrderState::Filled, OrderState::Cancelled],
    ),
    (OrderState::Filled, &[]),
    (OrderState::Rejected, &[]),
    (OrderState::Cancelled, &[]),
];

pub fn is_legal_transition(from: OrderState, to: OrderState) -> bool {
    TRANSITIONS
        .iter()
        .find(|(f, _)| *f == from)
        .map(|(_, allowed)| allowed.contains(&to))
        .unwrap_or(false)
}

/// Attempts a multi-step walk from `from` to `to` following only legal single
/// steps. Used by `update_from_broker` to tolerate a broker skipping states
/// (e.g. PENDING -> FILLED directly). Returns the path taken (excluding
/// `from`), or `None` if no such walk exists.
pub fn find_legal_path(from: OrderState, to: OrderState) -> Option<Vec<OrderState>> {
    if from == to {
        return Some(vec![]);
    }
    // The transition graph is a DAG (states only ever move forward), so a
    // plain stack without a visited-set is sufficient: no cycles to avoid.
    let mut stack = vec![(from, vec![])];
    while let Some((cur, path)) = stack.pop() {
        for (f, allowed) in TRANSITIONS {
            if *f != cur {
                continue;
            }
            for &next in *allowed {
                let mut next_path = path.clone();
                next_path.push(next);
                if next == to {
                    return Some(next_path);
                }
                if !next.is_terminal() {
                    stack.push((next, next_path));
                }
            }
        }
    }
    None
}
