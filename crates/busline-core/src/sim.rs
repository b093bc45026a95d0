//! The simulation context: one object owning the grid, the passengers, the
//! bus line, the waiting queue, and the movement tracker, advanced only by
//! [`PuzzleSimulation::select_passenger`] and
//! [`PuzzleSimulation::complete_move`].
//!
//! There is no ambient state and no clock. Given the same level data and the
//! same call sequence, two simulations pass through identical states, which
//! [`PuzzleSimulation::state_hash`] makes checkable.

use crate::bus::{BusSystem, BUS_CAPACITY};
use crate::event::{Event, EventBus, EventKind, EventListener};
use crate::flood;
use crate::grid::{GridError, GridModel, GridPosition, Occupant};
use crate::id::{PassengerId, TunnelId};
use crate::level::{LevelData, LevelError, LoadWarning, TraitConfig};
use crate::movement::{MoveSubject, MoveToken, MovementTracker, PendingAction};
use crate::passenger::Passenger;
use crate::pathfind::Pathfinder;
use crate::queue::WaitingQueue;
use crate::traits::{
    PassengerTrait, TraitKind, TraitReaction, DEFAULT_BOMB_COUNTDOWN, DEFAULT_FROZEN_TURNS,
};
use crate::tunnel::{self, Tunnel};
use serde::{Deserialize, Serialize};
use slotmap::{Key, SlotMap};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where the puzzle stands. Both end phases are terminal until a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Running,
    GameOver,
    Cleared,
}

/// What a selection did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The passenger reserved a seat and is moving to board.
    Boarding { token: MoveToken },
    /// The passenger claimed a waiting slot and is moving to it.
    Queued { token: MoveToken, slot: usize },
    /// A trait pinned the passenger down; trait hooks still ran.
    Blocked,
    /// No seat and no waiting slot; the passenger stays put.
    QueueFull,
    /// The selection did not apply (terminal phase, off-grid passenger, not
    /// yet reachable, or already moving). No side effects.
    Ignored,
}

/// Caller errors. Infeasible selections are [`SelectionOutcome`]s, not
/// errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SimError {
    #[error("unknown passenger")]
    UnknownPassenger,
    #[error("unknown or already completed move token")]
    UnknownToken,
    #[error(transparent)]
    Grid(#[from] GridError),
}

// ---------------------------------------------------------------------------
// PuzzleSimulation
// ---------------------------------------------------------------------------

pub struct PuzzleSimulation {
    pub(crate) level: LevelData,
    pub(crate) load_warnings: Vec<LoadWarning>,
    pub(crate) grid: GridModel,
    pub(crate) passengers: SlotMap<PassengerId, Passenger>,
    pub(crate) tunnels: SlotMap<TunnelId, Tunnel>,
    pub(crate) buses: BusSystem,
    pub(crate) queue: WaitingQueue,
    pub(crate) tracker: MovementTracker,
    pub(crate) events: EventBus,
    pub(crate) phase: GamePhase,
}

impl PuzzleSimulation {
    /// Build a simulation from level data. Fails on contradictory levels;
    /// recoverable issues land in [`Self::load_warnings`] with the offending
    /// entries skipped.
    pub fn new(level: LevelData) -> Result<Self, LevelError> {
        let load_warnings = level.validate()?;
        let mut sim = Self {
            grid: GridModel::new(level.width, level.height),
            level,
            load_warnings,
            passengers: SlotMap::with_key(),
            tunnels: SlotMap::with_key(),
            buses: BusSystem::new(Vec::new()),
            queue: WaitingQueue::new(),
            tracker: MovementTracker::new(),
            events: EventBus::new(),
            phase: GamePhase::Running,
        };
        sim.populate()?;
        sim.events.deliver();
        Ok(sim)
    }

    /// Rebuild everything from the retained level data: queue emptied,
    /// in-flight moves cancelled, tunnels rewound, the bus line restored.
    /// Listeners and suppression flags survive; buffered events do not.
    pub fn reset(&mut self) -> Result<(), LevelError> {
        self.grid = GridModel::new(self.level.width, self.level.height);
        // Fresh slot maps so entity keys repeat across identical runs.
        self.passengers = SlotMap::with_key();
        self.tunnels = SlotMap::with_key();
        self.buses = BusSystem::new(Vec::new());
        self.queue.clear();
        self.tracker.clear();
        self.events.clear();
        self.phase = GamePhase::Running;
        self.populate()?;
        self.events.deliver();
        Ok(())
    }

    fn populate(&mut self) -> Result<(), LevelError> {
        let level = self.level.clone();

        // Occupants first, traits after, so ropes see their neighbors.
        let mut placed: Vec<(PassengerId, GridPosition, Vec<TraitConfig>)> = Vec::new();
        for spec in &level.passengers {
            if !self.grid.is_valid(spec.position) {
                continue; // warned during validation
            }
            let id = self.passengers.insert(Passenger::new(spec.color));
            self.grid.place(spec.position, Occupant::Passenger(id))?;
            placed.push((id, spec.position, spec.traits.clone()));
        }
        for &wall in &level.walls {
            if self.grid.is_valid(wall) {
                self.grid.place(wall, Occupant::Wall)?;
            }
        }
        for spec in &level.tunnels {
            if !self.grid.is_valid(spec.position) {
                continue;
            }
            let id = self.tunnels.insert(Tunnel::new(
                spec.position,
                spec.direction,
                spec.templates.clone(),
            ));
            self.grid.place(spec.position, Occupant::Tunnel(id))?;
        }
        for (id, pos, configs) in placed {
            self.attach_traits(id, pos, &configs);
        }

        self.buses = BusSystem::new(level.buses.clone());
        if self.buses.spawn_next() {
            let token = self.tracker.request(MoveSubject::Bus, PendingAction::BusArrival);
            self.events.emit(Event::BusArriving { token });
        }

        let reached = flood::initial_reachable(&self.grid);
        self.mark_reached(reached);
        self.check_level_cleared();
        Ok(())
    }

    fn attach_traits(&mut self, id: PassengerId, pos: GridPosition, configs: &[TraitConfig]) {
        for config in configs {
            let built = match config.kind {
                TraitKind::Roped => PassengerTrait::roped(pos, &self.grid),
                TraitKind::Bombed => Some(PassengerTrait::bombed(
                    config.int_value.unwrap_or(DEFAULT_BOMB_COUNTDOWN),
                )),
                TraitKind::Cloaked => {
                    Some(PassengerTrait::cloaked(config.bool_value.unwrap_or(true)))
                }
                TraitKind::Frozen => Some(PassengerTrait::frozen(
                    config.int_value.unwrap_or(DEFAULT_FROZEN_TURNS),
                )),
                TraitKind::Reserved => Some(PassengerTrait::reserved()),
            };
            if let (Some(t), Some(p)) = (built, self.passengers.get_mut(id)) {
                // Duplicates were warned at validation; attach skips them.
                p.attach(t);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Input surface
    // -----------------------------------------------------------------------

    /// Select a passenger on the grid. The full pipeline runs in one call:
    /// gates, own-trait hooks, the selection broadcast, the movement gate,
    /// destination resolution, the vacancy cascade, and the move request.
    pub fn select_passenger(&mut self, id: PassengerId) -> Result<SelectionOutcome, SimError> {
        if !self.passengers.contains_key(id) {
            return Err(SimError::UnknownPassenger);
        }
        if self.phase != GamePhase::Running || self.tracker.is_moving(id) {
            return Ok(SelectionOutcome::Ignored);
        }
        let Some(pos) = self.passenger_position(id) else {
            return Ok(SelectionOutcome::Ignored);
        };
        if !self.passengers[id].is_interactable() {
            return Ok(SelectionOutcome::Ignored);
        }

        // Own traits react first (a live bomb is defused), then every grid
        // passenger hears about the selection, blocked attempts included.
        let own_changes = self.passengers[id].notify_selected();
        self.apply_trait_changes(id, own_changes);
        self.broadcast_selection(pos);

        if !self.passengers[id].can_move() {
            self.events.deliver();
            return Ok(SelectionOutcome::Blocked);
        }

        let (color, is_reserved, boardable) = {
            let p = &self.passengers[id];
            (p.color(), p.is_reserved(), p.can_board())
        };
        let action = if boardable
            && self.buses.boarding_open()
            && self
                .buses
                .current_mut()
                .is_some_and(|bus| bus.try_reserve_spot(color, is_reserved))
        {
            PendingAction::Board
        } else {
            match self.queue.add(id) {
                Some(slot) => PendingAction::EnterQueue { slot },
                None => {
                    self.evaluate_game_over();
                    self.events.deliver();
                    return Ok(SelectionOutcome::QueueFull);
                }
            }
        };

        // The staging path is computed while the mover still occupies its
        // cell, then the cell is vacated atomically (spawn, then flood).
        let path = Pathfinder::new(&self.grid).find_path_to_highest_empty(pos);
        self.vacate(pos)?;

        let token = self.tracker.request(MoveSubject::Passenger(id), action);
        self.events.emit(Event::MoveRequested {
            token,
            passenger: id,
            path,
            action,
        });
        self.events.deliver();
        Ok(match action {
            PendingAction::Board => SelectionOutcome::Boarding { token },
            PendingAction::EnterQueue { slot } => SelectionOutcome::Queued { token, slot },
            // Selection never issues a bus move.
            PendingAction::BusArrival => SelectionOutcome::Ignored,
        })
    }

    /// Report a requested move finished. State advances exactly here: the
    /// boarder is seated (or turned away), the queuer settles, the arriving
    /// bus opens.
    pub fn complete_move(&mut self, token: MoveToken) -> Result<(), SimError> {
        let Some((subject, action)) = self.tracker.complete(token) else {
            return Err(SimError::UnknownToken);
        };
        let result = match (subject, action) {
            (MoveSubject::Passenger(id), PendingAction::Board) => self.finish_boarding(id),
            (MoveSubject::Passenger(id), PendingAction::EnterQueue { slot }) => {
                self.finish_queueing(id, slot)
            }
            (MoveSubject::Bus, _) => self.finish_bus_arrival(),
            // Never issued for passengers.
            (MoveSubject::Passenger(_), PendingAction::BusArrival) => Ok(()),
        };
        self.events.deliver();
        result
    }

    // -----------------------------------------------------------------------
    // Pipeline pieces
    // -----------------------------------------------------------------------

    fn broadcast_selection(&mut self, clicked: GridPosition) {
        let on_grid: Vec<(PassengerId, GridPosition)> = self
            .grid
            .passengers()
            .map(|(pos, id)| (id, pos))
            .collect();
        for (pid, pos) in on_grid {
            let changes = match self.passengers.get_mut(pid) {
                Some(p) => p.notify_nearby_selection(clicked, pos, &self.grid),
                None => continue,
            };
            self.apply_trait_changes(pid, changes);
        }
    }

    fn apply_trait_changes(&mut self, pid: PassengerId, changes: Vec<(TraitKind, TraitReaction)>) {
        for (kind, reaction) in changes {
            match reaction {
                TraitReaction::Armed => {
                    self.events.emit(Event::TraitArmed { passenger: pid, kind });
                }
                TraitReaction::Detach => {
                    self.events
                        .emit(Event::TraitDetached { passenger: pid, kind });
                }
                TraitReaction::Exploded => {
                    self.events.emit(Event::BombExploded { passenger: pid });
                }
                TraitReaction::None => {}
            }
        }
    }

    /// Empty a cell and run the vacancy cascade: the feeding tunnel (if any)
    /// refills the cell first, then reachability floods from it. A
    /// tunnel-fed passenger is typically reached by that very flood.
    fn vacate(&mut self, pos: GridPosition) -> Result<(), GridError> {
        self.grid.remove(pos)?;
        if let Some(tid) = tunnel::feeding_tunnel(&self.grid, &self.tunnels, pos) {
            if let Some(template) = self.tunnels[tid].consume() {
                let id = self.passengers.insert(Passenger::new(template.color));
                self.grid.place(pos, Occupant::Passenger(id))?;
                self.attach_traits(id, pos, &template.traits);
                self.events.emit(Event::TunnelSpawned {
                    tunnel: tid,
                    passenger: id,
                    position: pos,
                });
            }
        }
        let reached = flood::flood_from(&self.grid, pos);
        self.mark_reached(reached);
        Ok(())
    }

    fn mark_reached(&mut self, reached: Vec<PassengerId>) {
        for pid in reached {
            let newly = match self.passengers.get_mut(pid) {
                Some(p) if !p.is_interactable() => {
                    p.mark_interactable();
                    true
                }
                _ => false,
            };
            if newly {
                self.events
                    .emit(Event::PassengerInteractable { passenger: pid });
                let changes = match self.passengers.get_mut(pid) {
                    Some(p) => p.notify_flood_reached(),
                    None => continue,
                };
                self.apply_trait_changes(pid, changes);
            }
        }
    }

    fn finish_boarding(&mut self, id: PassengerId) -> Result<(), SimError> {
        let Some(p) = self.passengers.get(id) else {
            return Err(SimError::UnknownPassenger);
        };
        let (is_reserved, still_boardable) = (p.is_reserved(), p.can_board());
        // The bus cannot have changed mid-flight: it only departs once all
        // three reservations finalize, and ours is still open.
        let seat = match self.buses.current_mut() {
            Some(bus) if still_boardable => bus.finalize_boarding(id, is_reserved),
            Some(bus) => {
                bus.release_spot(is_reserved);
                None
            }
            None => None,
        };
        match seat {
            Some(seat) => {
                self.events
                    .emit(Event::PassengerBoarded { passenger: id, seat });
                if self.buses.current().is_some_and(|bus| bus.is_full()) {
                    self.depart_current_bus();
                }
                self.check_level_cleared();
                Ok(())
            }
            // Turned away at the door (a bomb went off mid-flight): the
            // passenger falls back to the waiting queue.
            None => self.deflect_to_queue(id),
        }
    }

    fn deflect_to_queue(&mut self, id: PassengerId) -> Result<(), SimError> {
        match self.queue.add(id) {
            Some(slot) => {
                self.events
                    .emit(Event::PassengerQueued { passenger: id, slot });
                if self.queue.is_full() {
                    self.evaluate_game_over();
                }
                Ok(())
            }
            None => {
                if self.phase == GamePhase::Running {
                    self.phase = GamePhase::GameOver;
                    self.events.emit(Event::GameOver);
                }
                Ok(())
            }
        }
    }

    fn finish_queueing(&mut self, id: PassengerId, claimed: usize) -> Result<(), SimError> {
        // Compaction may have shifted the claimed slot while in transit.
        let slot = self.queue.slot_of(id).unwrap_or(claimed);
        self.events
            .emit(Event::PassengerQueued { passenger: id, slot });
        // A bus may have opened while this passenger was walking over.
        if self.buses.boarding_open() {
            self.process_queue_for_bus();
        }
        if self.queue.is_full() {
            self.evaluate_game_over();
        }
        Ok(())
    }

    fn finish_bus_arrival(&mut self) -> Result<(), SimError> {
        self.buses.open_boarding();
        if let Some(bus) = self.buses.current() {
            self.events.emit(Event::BusArrived { color: bus.color() });
        }
        self.process_queue_for_bus();
        if self.queue.is_full() {
            self.evaluate_game_over();
        }
        Ok(())
    }

    /// Send eligible waiters to the bus that just opened, front slot first,
    /// at most one busload per call.
    fn process_queue_for_bus(&mut self) {
        let members: Vec<PassengerId> = self.queue.iter().collect();
        let mut boards = 0;
        for pid in members {
            if boards >= BUS_CAPACITY {
                break;
            }
            // Still walking to its slot: it gets its chance on settling.
            if self.tracker.is_moving(pid) {
                continue;
            }
            let Some(p) = self.passengers.get(pid) else {
                continue;
            };
            let (color, is_reserved, boardable) = (p.color(), p.is_reserved(), p.can_board());
            if !boardable || !self.buses.accepts(color, is_reserved) {
                continue;
            }
            if !self
                .buses
                .current_mut()
                .is_some_and(|bus| bus.try_reserve_spot(color, is_reserved))
            {
                continue;
            }
            if let Some(moved) = self.queue.remove(pid) {
                for (shifted, slot) in moved {
                    self.events.emit(Event::QueueShifted {
                        passenger: shifted,
                        slot,
                    });
                }
            }
            let token = self
                .tracker
                .request(MoveSubject::Passenger(pid), PendingAction::Board);
            self.events.emit(Event::MoveRequested {
                token,
                passenger: pid,
                path: Vec::new(),
                action: PendingAction::Board,
            });
            boards += 1;
        }
    }

    /// The losing condition: every waiting slot taken and no reachable grid
    /// passenger the current bus would seat. With no bus at the stop nobody
    /// can board.
    fn evaluate_game_over(&mut self) {
        if self.phase != GamePhase::Running || !self.queue.is_full() {
            return;
        }
        let any_boardable = self.grid.passengers().any(|(_, pid)| {
            self.passengers.get(pid).is_some_and(|p| {
                p.is_interactable()
                    && p.can_board()
                    && self.buses.accepts(p.color(), p.is_reserved())
            })
        });
        if !any_boardable {
            self.phase = GamePhase::GameOver;
            self.events.emit(Event::GameOver);
        }
    }

    /// The winning condition: no passenger on the grid, waiting, or in
    /// transit, and every tunnel roster exhausted. Passengers seated on a
    /// bus that never filled count as gone.
    fn check_level_cleared(&mut self) {
        if self.phase != GamePhase::Running {
            return;
        }
        let grid_occupied = self.grid.passengers().next().is_some();
        let in_transit = self.tracker.moving_passengers().next().is_some();
        if !grid_occupied
            && !in_transit
            && self.queue.is_empty()
            && self.tunnels.values().all(|t| !t.has_remaining())
        {
            self.phase = GamePhase::Cleared;
            self.events.emit(Event::LevelCleared);
        }
    }

    fn depart_current_bus(&mut self) {
        let Some(bus) = self.buses.depart() else {
            return;
        };
        let passengers = bus.boarded().to_vec();
        for pid in &passengers {
            self.passengers.remove(*pid);
        }
        self.events.emit(Event::BusDeparted {
            color: bus.color(),
            passengers,
        });
        if self.buses.spawn_next() {
            let token = self.tracker.request(MoveSubject::Bus, PendingAction::BusArrival);
            self.events.emit(Event::BusArriving { token });
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    pub fn queue(&self) -> &WaitingQueue {
        &self.queue
    }

    pub fn buses(&self) -> &BusSystem {
        &self.buses
    }

    pub fn level(&self) -> &LevelData {
        &self.level
    }

    pub fn load_warnings(&self) -> &[LoadWarning] {
        &self.load_warnings
    }

    pub fn passenger(&self, id: PassengerId) -> Option<&Passenger> {
        self.passengers.get(id)
    }

    pub fn passenger_position(&self, id: PassengerId) -> Option<GridPosition> {
        self.grid
            .passengers()
            .find(|&(_, pid)| pid == id)
            .map(|(pos, _)| pos)
    }

    pub fn tunnel(&self, id: TunnelId) -> Option<&Tunnel> {
        self.tunnels.get(id)
    }

    pub fn tunnels(&self) -> impl Iterator<Item = (TunnelId, &Tunnel)> {
        self.tunnels.iter()
    }

    pub fn moves_in_flight(&self) -> usize {
        self.tracker.in_flight_count()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Take every buffered event in emit order.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }

    pub fn add_listener(&mut self, listener: EventListener) {
        self.events.add_listener(listener);
    }

    pub fn set_event_suppressed(&mut self, kind: EventKind, suppressed: bool) {
        self.events.set_suppressed(kind, suppressed);
    }

    // -----------------------------------------------------------------------
    // State hash
    // -----------------------------------------------------------------------

    /// FNV-1a digest of the full observable state, for replay verification
    /// and determinism tests. In-flight move bookkeeping is excluded; two
    /// states that differ only in token numbering hash alike.
    pub fn state_hash(&self) -> u64 {
        let mut h = Fnv1a::new();
        h.write_u8(self.phase as u8);
        h.write_i32(self.grid.width());
        h.write_i32(self.grid.height());
        for (pos, occ) in self.grid.occupants() {
            h.write_i32(pos.x);
            h.write_i32(pos.y);
            match occ {
                Occupant::Passenger(id) => {
                    h.write_u8(0);
                    h.write_u64(id.data().as_ffi());
                }
                Occupant::Wall => h.write_u8(1),
                Occupant::Tunnel(id) => {
                    h.write_u8(2);
                    h.write_u64(id.data().as_ffi());
                }
            }
        }
        for (id, p) in &self.passengers {
            h.write_u64(id.data().as_ffi());
            h.write_u8(p.color() as u8);
            h.write_bool(p.is_interactable());
            for t in p.traits() {
                hash_trait(&mut h, t);
            }
        }
        for (id, t) in &self.tunnels {
            h.write_u64(id.data().as_ffi());
            h.write_i32(t.position().x);
            h.write_i32(t.position().y);
            h.write_u8(t.direction() as u8);
            h.write_u64(t.remaining() as u64);
        }
        h.write_u64(self.queue.len() as u64);
        for pid in self.queue.iter() {
            h.write_u64(pid.data().as_ffi());
        }
        match self.buses.current() {
            Some(bus) => {
                h.write_u8(1);
                h.write_u8(bus.color() as u8);
                h.write_bool(bus.is_locked());
                h.write_u64(bus.boarded().len() as u64);
                for pid in bus.boarded() {
                    h.write_u64(pid.data().as_ffi());
                }
            }
            None => h.write_u8(0),
        }
        h.write_bool(self.buses.boarding_open());
        h.write_u64(self.buses.upcoming_count() as u64);
        h.finish()
    }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

struct Fnv1a(u64);

impl Fnv1a {
    fn new() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }

    fn write_u8(&mut self, b: u8) {
        self.0 ^= u64::from(b);
        self.0 = self.0.wrapping_mul(0x0000_0100_0000_01b3);
    }

    fn write_u32(&mut self, v: u32) {
        for b in v.to_le_bytes() {
            self.write_u8(b);
        }
    }

    fn write_u64(&mut self, v: u64) {
        for b in v.to_le_bytes() {
            self.write_u8(b);
        }
    }

    fn write_i32(&mut self, v: i32) {
        self.write_u32(v as u32);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn finish(self) -> u64 {
        self.0
    }
}

fn hash_trait(h: &mut Fnv1a, t: &PassengerTrait) {
    h.write_u8(t.kind() as u8);
    match t {
        PassengerTrait::Roped {
            anchors,
            required,
            freed_seen,
        } => {
            h.write_u64(anchors.len() as u64);
            for a in anchors {
                h.write_i32(a.x);
                h.write_i32(a.y);
            }
            h.write_u32(*required);
            h.write_u32(*freed_seen);
        }
        PassengerTrait::Bombed {
            countdown,
            armed,
            exploded,
        } => {
            h.write_u32(*countdown);
            h.write_bool(*armed);
            h.write_bool(*exploded);
        }
        PassengerTrait::Cloaked { cloaked } => h.write_bool(*cloaked),
        PassengerTrait::Frozen { countdown, armed } => {
            h.write_u32(*countdown);
            h.write_bool(*armed);
        }
        PassengerTrait::Reserved => {}
    }
}

// ===========================================================================
// Tests
// ===========================================================================
