//! Versioned binary snapshots of a quiescent simulation.
//!
//! Snapshots capture the settled state only: the movement tracker must be
//! empty, so every requested move has either completed or been cancelled by
//! a reset. Restoring rebuilds a simulation with a fresh event bus and an
//! empty tracker; the envelope version is checked before anything else is
//! trusted.

use crate::bus::BusSystem;
use crate::event::EventBus;
use crate::grid::GridModel;
use crate::id::{PassengerId, TunnelId};
use crate::level::LevelData;
use crate::movement::MovementTracker;
use crate::passenger::Passenger;
use crate::queue::WaitingQueue;
use crate::sim::{GamePhase, PuzzleSimulation};
use crate::tunnel::Tunnel;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// Bumped whenever the payload layout changes.
pub const SNAPSHOT_VERSION: u16 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("cannot snapshot with {0} moves in flight")]
    MovesInFlight(usize),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] bitcode::Error),
    #[error("failed to decode snapshot: {0}")]
    Decode(#[source] bitcode::Error),
}

#[derive(Serialize, Deserialize)]
struct SnapshotPayload {
    version: u16,
    level: LevelData,
    grid: GridModel,
    passengers: SlotMap<PassengerId, Passenger>,
    tunnels: SlotMap<TunnelId, Tunnel>,
    buses: BusSystem,
    queue: WaitingQueue,
    phase: GamePhase,
}

impl PuzzleSimulation {
    /// Encode the full settled state. Fails while any move is in flight.
    pub fn snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        let in_flight = self.tracker.in_flight_count();
        if in_flight > 0 {
            return Err(SnapshotError::MovesInFlight(in_flight));
        }
        let payload = SnapshotPayload {
            version: SNAPSHOT_VERSION,
            level: self.level.clone(),
            grid: self.grid.clone(),
            passengers: self.passengers.clone(),
            tunnels: self.tunnels.clone(),
            buses: self.buses.clone(),
            queue: self.queue.clone(),
            phase: self.phase,
        };
        bitcode::serialize(&payload).map_err(SnapshotError::Encode)
    }

    /// Rebuild a simulation from snapshot bytes.
    pub fn restore(bytes: &[u8]) -> Result<PuzzleSimulation, SnapshotError> {
        let payload: SnapshotPayload =
            bitcode::deserialize(bytes).map_err(SnapshotError::Decode)?;
        if payload.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(payload.version));
        }
        // The level validated when it was first loaded.
        let load_warnings = payload.level.validate().unwrap_or_default();
        Ok(PuzzleSimulation {
            level: payload.level,
            load_warnings,
            grid: payload.grid,
            passengers: payload.passengers,
            tunnels: payload.tunnels,
            buses: payload.buses,
            queue: payload.queue,
            tracker: MovementTracker::new(),
            events: EventBus::new(),
            phase: payload.phase,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
