//! Typed output events: the simulation's entire contract with the
//! presentation layer.
//!
//! Events accumulate in a single chronological buffer with a per-kind cap
//! (oldest of that kind dropped on overflow, so one chatty kind cannot
//! starve the rest). Consumers either poll with [`EventBus::drain`] or
//! register passive listeners invoked in registration order at explicit
//! [`EventBus::deliver`] points. Kinds can be suppressed wholesale, which
//! drops matching events at emit time.

use crate::grid::GridPosition;
use crate::id::{PassengerId, TunnelId};
use crate::movement::{MoveToken, PendingAction};
use crate::passenger::PassengerColor;
use crate::traits::TraitKind;
use std::collections::VecDeque;

/// Buffered events per kind before the oldest is dropped.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A passenger became reachable and is now selectable.
    PassengerInteractable { passenger: PassengerId },
    /// A passenger started moving; the embedder animates `path` and reports
    /// `token` complete.
    MoveRequested {
        token: MoveToken,
        passenger: PassengerId,
        path: Vec<GridPosition>,
        action: PendingAction,
    },
    /// A passenger took its seat.
    PassengerBoarded { passenger: PassengerId, seat: usize },
    /// A passenger settled into a waiting slot.
    PassengerQueued { passenger: PassengerId, slot: usize },
    /// Queue compaction moved a waiting passenger to a new slot.
    QueueShifted { passenger: PassengerId, slot: usize },
    /// The next bus started pulling in; report `token` complete when it is
    /// at the stop.
    BusArriving { token: MoveToken },
    /// The bus at the stop opened for boarding.
    BusArrived { color: PassengerColor },
    /// A full bus left with its passengers.
    BusDeparted {
        color: PassengerColor,
        passengers: Vec<PassengerId>,
    },
    /// A tunnel fed a passenger into a vacated cell.
    TunnelSpawned {
        tunnel: TunnelId,
        passenger: PassengerId,
        position: GridPosition,
    },
    /// A dormant trait armed (flood reach).
    TraitArmed {
        passenger: PassengerId,
        kind: TraitKind,
    },
    /// A trait detached from its passenger.
    TraitDetached {
        passenger: PassengerId,
        kind: TraitKind,
    },
    /// A bomb countdown hit zero; the passenger can never board.
    BombExploded { passenger: PassengerId },
    GameOver,
    LevelCleared,
}

/// Discriminant used for suppression and capacity bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PassengerInteractable,
    MoveRequested,
    PassengerBoarded,
    PassengerQueued,
    QueueShifted,
    BusArriving,
    BusArrived,
    BusDeparted,
    TunnelSpawned,
    TraitArmed,
    TraitDetached,
    BombExploded,
    GameOver,
    LevelCleared,
}

pub const EVENT_KIND_COUNT: usize = 14;

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PassengerInteractable { .. } => EventKind::PassengerInteractable,
            Event::MoveRequested { .. } => EventKind::MoveRequested,
            Event::PassengerBoarded { .. } => EventKind::PassengerBoarded,
            Event::PassengerQueued { .. } => EventKind::PassengerQueued,
            Event::QueueShifted { .. } => EventKind::QueueShifted,
            Event::BusArriving { .. } => EventKind::BusArriving,
            Event::BusArrived { .. } => EventKind::BusArrived,
            Event::BusDeparted { .. } => EventKind::BusDeparted,
            Event::TunnelSpawned { .. } => EventKind::TunnelSpawned,
            Event::TraitArmed { .. } => EventKind::TraitArmed,
            Event::TraitDetached { .. } => EventKind::TraitDetached,
            Event::BombExploded { .. } => EventKind::BombExploded,
            Event::GameOver => EventKind::GameOver,
            Event::LevelCleared => EventKind::LevelCleared,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

pub type EventListener = Box<dyn FnMut(&Event)>;

pub struct EventBus {
    events: VecDeque<Event>,
    counts: [usize; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: Vec<EventListener>,
    /// Events before this index have been shown to listeners.
    cursor: usize,
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            counts: [0; EVENT_KIND_COUNT],
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Vec::new(),
            cursor: 0,
            capacity,
        }
    }

    /// Buffer an event, dropping the oldest of its kind when at capacity.
    pub fn emit(&mut self, event: Event) {
        let kind = event.kind();
        if self.suppressed[kind.index()] {
            return;
        }
        if self.counts[kind.index()] >= self.capacity {
            if let Some(idx) = self.events.iter().position(|e| e.kind() == kind) {
                self.events.remove(idx);
                self.counts[kind.index()] -= 1;
                if idx < self.cursor {
                    self.cursor -= 1;
                }
            }
        }
        self.events.push_back(event);
        self.counts[kind.index()] += 1;
    }

    /// Drop events of this kind at emit time until un-suppressed.
    pub fn set_suppressed(&mut self, kind: EventKind, suppressed: bool) {
        self.suppressed[kind.index()] = suppressed;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Register a passive listener. Listeners see every event exactly once,
    /// in emit order, at [`Self::deliver`] points.
    pub fn add_listener(&mut self, listener: EventListener) {
        self.listeners.push(listener);
    }

    /// Show listeners everything emitted since the last delivery. Buffered
    /// events remain available to [`Self::drain`].
    pub fn deliver(&mut self) {
        for i in self.cursor..self.events.len() {
            let event = &self.events[i];
            for listener in &mut self.listeners {
                listener(event);
            }
        }
        self.cursor = self.events.len();
    }

    /// Deliver, then take every buffered event in emit order.
    pub fn drain(&mut self) -> Vec<Event> {
        self.deliver();
        self.counts = [0; EVENT_KIND_COUNT];
        self.cursor = 0;
        self.events.drain(..).collect()
    }

    /// Drop everything buffered without delivering it. Listeners and
    /// suppression flags survive; a level reset starts from a quiet bus.
    pub fn clear(&mut self) {
        self.events.clear();
        self.counts = [0; EVENT_KIND_COUNT];
        self.cursor = 0;
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
