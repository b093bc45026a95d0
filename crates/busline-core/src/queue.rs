//! The waiting queue: five ordered slots beside the bus stop.
//!
//! Passengers land in the leftmost free slot and shift left when someone
//! ahead of them leaves. Slot indices are presentation-visible (the queue
//! shift events carry them), so compaction reports every repositioning.

use crate::id::PassengerId;
use serde::{Deserialize, Serialize};

/// Number of waiting slots. Filling the last one triggers the game-over
/// evaluation.
pub const QUEUE_CAPACITY: usize = 5;

/// Fixed-capacity, left-packed waiting queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitingQueue {
    slots: [Option<PassengerId>; QUEUE_CAPACITY],
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self {
            slots: [None; QUEUE_CAPACITY],
        }
    }

    /// Claim the leftmost free slot. Returns the slot index, or `None` when
    /// the queue is full.
    pub fn add(&mut self, passenger: PassengerId) -> Option<usize> {
        let slot = self.slots.iter().position(Option::is_none)?;
        self.slots[slot] = Some(passenger);
        Some(slot)
    }

    /// Remove a passenger and close the gap. Returns the repositioning of
    /// everyone who shifted, or `None` when the passenger was not queued.
    pub fn remove(&mut self, passenger: PassengerId) -> Option<Vec<(PassengerId, usize)>> {
        let slot = self.slot_of(passenger)?;
        self.slots[slot] = None;
        Some(self.compact())
    }

    /// Evict the front passenger when the queue is full, making room for a
    /// forced arrival. No-op on a queue with any free slot.
    pub fn remove_oldest_if_full(&mut self) -> Option<PassengerId> {
        if !self.is_full() {
            return None;
        }
        let oldest = self.slots[0].take();
        self.compact();
        oldest
    }

    /// Left-pack the occupied slots, preserving order. Returns each moved
    /// passenger with its new slot index.
    pub fn compact(&mut self) -> Vec<(PassengerId, usize)> {
        let mut moved = Vec::new();
        let mut write = 0;
        for read in 0..QUEUE_CAPACITY {
            if let Some(id) = self.slots[read].take() {
                if write != read {
                    moved.push((id, write));
                }
                self.slots[write] = Some(id);
                write += 1;
            }
        }
        moved
    }

    pub fn contains(&self, passenger: PassengerId) -> bool {
        self.slot_of(passenger).is_some()
    }

    pub fn slot_of(&self, passenger: PassengerId) -> Option<usize> {
        self.slots.iter().position(|s| *s == Some(passenger))
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn clear(&mut self) {
        self.slots = [None; QUEUE_CAPACITY];
    }

    /// Occupied slots front to back.
    pub fn iter(&self) -> impl Iterator<Item = PassengerId> + '_ {
        self.slots.iter().filter_map(|s| *s)
    }
}

impl Default for WaitingQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
