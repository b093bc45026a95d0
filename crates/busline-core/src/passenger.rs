//! Passengers: color, interactability, and the attached trait set.
//!
//! A passenger's position is not stored here; the grid's occupancy map is
//! the single source of truth for where everyone stands. This struct holds
//! what travels with the passenger off the grid too (queue, transit, bus).

use crate::grid::{GridModel, GridPosition};
use crate::traits::{PassengerTrait, TraitKind, TraitReaction};
use serde::{Deserialize, Serialize};

/// The boarding color. Passengers board buses of their own color only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassengerColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
}

/// One passenger, wherever it currently is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    color: PassengerColor,
    traits: Vec<PassengerTrait>,
    interactable: bool,
}

impl Passenger {
    /// A fresh passenger: no traits, not yet reachable.
    pub fn new(color: PassengerColor) -> Self {
        Self {
            color,
            traits: Vec::new(),
            interactable: false,
        }
    }

    pub fn color(&self) -> PassengerColor {
        self.color
    }

    pub fn is_interactable(&self) -> bool {
        self.interactable
    }

    /// Interactability is one-way during play; only a level reset rebuilds
    /// passengers from scratch.
    pub fn mark_interactable(&mut self) {
        self.interactable = true;
    }

    /// Attach a trait. Returns false (and attaches nothing) when a trait of
    /// the same kind is already present.
    pub fn attach(&mut self, new_trait: PassengerTrait) -> bool {
        if self.has_trait(new_trait.kind()) {
            return false;
        }
        self.traits.push(new_trait);
        true
    }

    pub fn has_trait(&self, kind: TraitKind) -> bool {
        self.traits.iter().any(|t| t.kind() == kind)
    }

    pub fn is_reserved(&self) -> bool {
        self.has_trait(TraitKind::Reserved)
    }

    pub fn traits(&self) -> &[PassengerTrait] {
        &self.traits
    }

    /// Whether every attached trait currently allows leaving the grid.
    pub fn can_move(&self) -> bool {
        self.traits.iter().all(|t| !t.blocks_movement())
    }

    /// Whether every attached trait currently allows boarding a bus. Seat
    /// matching for reserved passengers is decided bus-side on top of this.
    pub fn can_board(&self) -> bool {
        self.traits.iter().all(|t| !t.blocks_boarding())
    }

    /// This passenger was selected. Returns the non-trivial reactions in
    /// trait order; detached traits are already removed.
    pub fn notify_selected(&mut self) -> Vec<(TraitKind, TraitReaction)> {
        self.apply(|t| t.on_selected())
    }

    /// Some passenger on the grid was selected at `clicked`.
    pub fn notify_nearby_selection(
        &mut self,
        clicked: GridPosition,
        own_pos: GridPosition,
        grid: &GridModel,
    ) -> Vec<(TraitKind, TraitReaction)> {
        self.apply(|t| t.on_nearby_selection(clicked, own_pos, grid))
    }

    /// The flood reached this passenger.
    pub fn notify_flood_reached(&mut self) -> Vec<(TraitKind, TraitReaction)> {
        self.apply(|t| t.on_reached_by_flood())
    }

    fn apply<F>(&mut self, mut hook: F) -> Vec<(TraitKind, TraitReaction)>
    where
        F: FnMut(&mut PassengerTrait) -> TraitReaction,
    {
        let mut changes = Vec::new();
        let mut i = 0;
        while i < self.traits.len() {
            match hook(&mut self.traits[i]) {
                TraitReaction::None => i += 1,
                TraitReaction::Detach => {
                    changes.push((self.traits[i].kind(), TraitReaction::Detach));
                    self.traits.remove(i);
                }
                reaction => {
                    changes.push((self.traits[i].kind(), reaction));
                    i += 1;
                }
            }
        }
        changes
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_trait_kinds_are_rejected() {
        let mut p = Passenger::new(PassengerColor::Red);
        assert!(p.attach(PassengerTrait::bombed(5)));
        assert!(!p.attach(PassengerTrait::bombed(2)));
        assert_eq!(p.traits().len(), 1);
    }

    #[test]
    fn movement_gate_aggregates_all_traits() {
        let mut p = Passenger::new(PassengerColor::Blue);
        assert!(p.can_move());
        p.attach(PassengerTrait::frozen(4));
        p.attach(PassengerTrait::bombed(5));
        assert!(!p.can_move());
    }

    #[test]
    fn selecting_the_owner_removes_a_defused_bomb() {
        let mut p = Passenger::new(PassengerColor::Green);
        p.attach(PassengerTrait::bombed(5));
        let changes = p.notify_selected();
        assert_eq!(changes, vec![(TraitKind::Bombed, TraitReaction::Detach)]);
        assert!(!p.has_trait(TraitKind::Bombed));
    }

    #[test]
    fn exploded_bomb_stays_attached_and_blocks_boarding() {
        let grid = GridModel::new(3, 3);
        let own = GridPosition::new(0, 0);
        let far = GridPosition::new(2, 2);
        let mut p = Passenger::new(PassengerColor::Red);
        p.attach(PassengerTrait::bombed(1));
        p.notify_flood_reached();

        let changes = p.notify_nearby_selection(far, own, &grid);
        assert_eq!(changes, vec![(TraitKind::Bombed, TraitReaction::Exploded)]);
        assert!(p.has_trait(TraitKind::Bombed));
        assert!(!p.can_board());
        assert!(p.can_move());
    }

    #[test]
    fn flood_reach_arms_without_detaching() {
        let mut p = Passenger::new(PassengerColor::Yellow);
        p.attach(PassengerTrait::frozen(4));
        let changes = p.notify_flood_reached();
        assert_eq!(changes, vec![(TraitKind::Frozen, TraitReaction::Armed)]);
        assert!(p.has_trait(TraitKind::Frozen));
        // Re-reaching is quiet.
        assert!(p.notify_flood_reached().is_empty());
    }
}
