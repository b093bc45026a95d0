//! Explicit movement lifecycle: every relocation the simulation requests is
//! identified by a token, and nothing happens to the mover until the
//! embedder reports that token complete.
//!
//! The presentation layer is free to animate the path however it likes; the
//! simulation only cares that each requested move either completes exactly
//! once or is cancelled wholesale by a level reset.

use crate::id::PassengerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Handle for one in-flight move, monotonically assigned.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MoveToken(pub u64);

/// Who is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveSubject {
    Passenger(PassengerId),
    Bus,
}

/// What to do when the move completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingAction {
    /// Seat the passenger on the current bus.
    Board,
    /// Settle the passenger into its claimed queue slot.
    EnterQueue { slot: usize },
    /// The next bus finished pulling in; open boarding.
    BusArrival,
}

/// All moves currently in flight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementTracker {
    next_token: u64,
    in_flight: BTreeMap<MoveToken, (MoveSubject, PendingAction)>,
}

impl MovementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a move and hand out its token.
    pub fn request(&mut self, subject: MoveSubject, action: PendingAction) -> MoveToken {
        let token = MoveToken(self.next_token);
        self.next_token += 1;
        self.in_flight.insert(token, (subject, action));
        token
    }

    /// Retire a token. `None` when it was never issued or already completed.
    pub fn complete(&mut self, token: MoveToken) -> Option<(MoveSubject, PendingAction)> {
        self.in_flight.remove(&token)
    }

    /// Whether this passenger has a move in flight. Such a passenger is off
    /// the grid and not reselectable.
    pub fn is_moving(&self, passenger: PassengerId) -> bool {
        self.in_flight
            .values()
            .any(|(subject, _)| *subject == MoveSubject::Passenger(passenger))
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Passengers currently in flight, in token order.
    pub fn moving_passengers(&self) -> impl Iterator<Item = PassengerId> + '_ {
        self.in_flight.values().filter_map(|(subject, _)| match subject {
            MoveSubject::Passenger(id) => Some(*id),
            MoveSubject::Bus => None,
        })
    }

    /// Cancel every in-flight move. Only a level reset calls this; tokens
    /// from before the clear are dead afterwards.
    pub fn clear(&mut self) {
        self.in_flight.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================
