//! Deterministic, engine-independent simulation core for a bus-boarding
//! grid puzzle.
//!
//! Passengers stand on a bounded grid. Selecting a reachable passenger
//! sends it to the bus at the stop (color permitting) or to a five-slot
//! waiting queue; vacated cells are refilled by tunnels and re-flooded for
//! reachability; a full bus departs and the next one pulls in. The losing
//! condition is a full queue with nobody left who could board; the winning
//! condition is everyone gone and every tunnel exhausted.
//!
//! The crate is a pure library: no clock, no rendering, no global state.
//! All mutation goes through [`sim::PuzzleSimulation::select_passenger`]
//! and [`sim::PuzzleSimulation::complete_move`], every requested relocation
//! is an explicit token the embedder completes, and all observable output
//! is typed [`event::Event`]s. Identical inputs produce identical states,
//! verifiable via [`sim::PuzzleSimulation::state_hash`] and the [`replay`]
//! module.
//!
//! Optional features:
//! - `data-loader` — JSON level parsing ([`data_loader`]).
//! - `test-utils` — level builders and test drivers ([`test_utils`]).

pub mod bus;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod event;
pub mod flood;
pub mod grid;
pub mod id;
pub mod level;
pub mod movement;
pub mod passenger;
pub mod pathfind;
pub mod queue;
pub mod replay;
pub mod sim;
pub mod snapshot;
#[cfg(feature = "test-utils")]
pub mod test_utils;
pub mod traits;
pub mod tunnel;

pub use bus::{Bus, BusSystem, BusTemplate, BUS_CAPACITY};
pub use event::{Event, EventBus, EventKind};
pub use grid::{Direction, GridError, GridModel, GridPosition, Occupant};
pub use id::{PassengerId, TunnelId};
pub use level::{LevelData, LevelError, LoadWarning, PassengerSpec, TraitConfig, TunnelSpec};
pub use movement::{MoveSubject, MoveToken, MovementTracker, PendingAction};
pub use passenger::{Passenger, PassengerColor};
pub use pathfind::Pathfinder;
pub use queue::{WaitingQueue, QUEUE_CAPACITY};
pub use replay::{InputLog, InputRecord, InputRecorder, ReplayOutcome};
pub use sim::{GamePhase, PuzzleSimulation, SelectionOutcome, SimError};
pub use snapshot::{SnapshotError, SNAPSHOT_VERSION};
pub use traits::{BusTrait, PassengerTrait, TraitKind};
pub use tunnel::Tunnel;
