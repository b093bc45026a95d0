//! Passenger and bus traits: per-passenger modifiers that gate movement and
//! boarding, react to selections and flood reach, and detach when spent.
//!
//! Traits are a closed sum type. The simulation owns the dispatch: it calls
//! the hooks below and applies the returned [`TraitReaction`]s (removing
//! detached traits, emitting events for armed/exploded ones). Hooks never
//! touch the grid or other passengers; they only read the grid and mutate
//! their own state, which keeps broadcast order irrelevant.

use crate::grid::{GridModel, GridPosition};
use serde::{Deserialize, Serialize};

/// Default bomb countdown when level data leaves it unset.
pub const DEFAULT_BOMB_COUNTDOWN: u32 = 5;
/// Default frozen countdown when level data leaves it unset.
pub const DEFAULT_FROZEN_TURNS: u32 = 4;
/// A rope never requires more than this many freed neighbors.
pub const ROPE_MAX_REQUIRED: u32 = 3;
/// Squared radius within which a selection tugs at nearby ropes.
pub const ROPE_TRIGGER_RADIUS_SQ: u32 = 4;

// ---------------------------------------------------------------------------
// Passenger traits
// ---------------------------------------------------------------------------

/// Discriminant for trait identity checks and duplicate detection. At most
/// one trait of a kind per passenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraitKind {
    Roped,
    Bombed,
    Cloaked,
    Frozen,
    Reserved,
}

/// What a trait hook asks the simulation to do with it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraitReaction {
    /// Nothing to apply.
    None,
    /// The trait just armed; emit the armed event, keep the trait.
    Armed,
    /// The trait is spent; remove it from the passenger.
    Detach,
    /// A bomb went off; the trait stays, the passenger is unboardable.
    Exploded,
}

/// A trait instance attached to one passenger, with its live state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PassengerTrait {
    /// Tied to the occupants around it at attach time. Unties once enough of
    /// those anchor cells have emptied.
    Roped {
        anchors: Vec<GridPosition>,
        required: u32,
        freed_seen: u32,
    },
    /// Inert until the flood first reaches its owner, then counts down one
    /// per selection anywhere. At zero it explodes and the owner can never
    /// board. Selecting the owner before that defuses it.
    Bombed {
        countdown: u32,
        armed: bool,
        exploded: bool,
    },
    /// Unselectable while cloaked; every selection elsewhere flips it.
    Cloaked { cloaked: bool },
    /// Inert until flood-reached, then counts down one per selection
    /// (including blocked attempts on its owner) and detaches at zero.
    Frozen { countdown: u32, armed: bool },
    /// Restricted to buses holding a matching reserved seat. The seat
    /// accounting lives on [`BusTrait::ReservedBus`].
    Reserved,
}

impl PassengerTrait {
    /// Attach a rope anchored to the occupied cells in the 8-neighborhood of
    /// `own_pos`. Returns `None` when nothing around it is occupied; a rope
    /// tied to nothing is already free and is never attached.
    pub fn roped(own_pos: GridPosition, grid: &GridModel) -> Option<PassengerTrait> {
        let mut anchors = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let pos = own_pos.offset(dx, dy);
                if grid.is_valid(pos) && grid.is_occupied(pos) {
                    anchors.push(pos);
                }
            }
        }
        if anchors.is_empty() {
            return None;
        }
        let required = (anchors.len() as u32).min(ROPE_MAX_REQUIRED);
        Some(PassengerTrait::Roped {
            anchors,
            required,
            freed_seen: 0,
        })
    }

    pub fn bombed(countdown: u32) -> PassengerTrait {
        PassengerTrait::Bombed {
            countdown,
            armed: false,
            exploded: false,
        }
    }

    pub fn cloaked(cloaked: bool) -> PassengerTrait {
        PassengerTrait::Cloaked { cloaked }
    }

    pub fn frozen(countdown: u32) -> PassengerTrait {
        PassengerTrait::Frozen {
            countdown,
            armed: false,
        }
    }

    pub fn reserved() -> PassengerTrait {
        PassengerTrait::Reserved
    }

    pub fn kind(&self) -> TraitKind {
        match self {
            PassengerTrait::Roped { .. } => TraitKind::Roped,
            PassengerTrait::Bombed { .. } => TraitKind::Bombed,
            PassengerTrait::Cloaked { .. } => TraitKind::Cloaked,
            PassengerTrait::Frozen { .. } => TraitKind::Frozen,
            PassengerTrait::Reserved => TraitKind::Reserved,
        }
    }

    /// Whether this trait currently pins its owner to the grid.
    pub fn blocks_movement(&self) -> bool {
        match self {
            PassengerTrait::Roped { .. } => true,
            PassengerTrait::Bombed { .. } => false,
            PassengerTrait::Cloaked { cloaked } => *cloaked,
            PassengerTrait::Frozen { .. } => true,
            PassengerTrait::Reserved => false,
        }
    }

    /// Whether this trait currently forbids boarding any bus. Seat matching
    /// for `Reserved` is the bus side's decision, not a blanket block.
    pub fn blocks_boarding(&self) -> bool {
        match self {
            PassengerTrait::Roped { .. } => true,
            PassengerTrait::Bombed { exploded, .. } => *exploded,
            PassengerTrait::Cloaked { cloaked } => *cloaked,
            PassengerTrait::Frozen { .. } => true,
            PassengerTrait::Reserved => false,
        }
    }

    /// The owner itself was selected. Runs before the selection broadcast,
    /// so a defused bomb never also counts the selection.
    pub fn on_selected(&mut self) -> TraitReaction {
        match self {
            PassengerTrait::Bombed { exploded, .. } if !*exploded => TraitReaction::Detach,
            _ => TraitReaction::None,
        }
    }

    /// A passenger somewhere on the grid was selected (possibly the owner,
    /// possibly a blocked attempt).
    pub fn on_nearby_selection(
        &mut self,
        clicked: GridPosition,
        own_pos: GridPosition,
        grid: &GridModel,
    ) -> TraitReaction {
        match self {
            PassengerTrait::Roped {
                anchors,
                required,
                freed_seen,
            } => {
                if clicked.distance_squared(&own_pos) > ROPE_TRIGGER_RADIUS_SQ {
                    return TraitReaction::None;
                }
                let freed = anchors.iter().filter(|p| !grid.is_occupied(**p)).count() as u32;
                if freed > *freed_seen {
                    *freed_seen = freed;
                }
                if *freed_seen >= *required {
                    TraitReaction::Detach
                } else {
                    TraitReaction::None
                }
            }
            PassengerTrait::Bombed {
                countdown,
                armed,
                exploded,
            } => {
                if !*armed || *exploded {
                    return TraitReaction::None;
                }
                *countdown = countdown.saturating_sub(1);
                if *countdown == 0 {
                    *exploded = true;
                    TraitReaction::Exploded
                } else {
                    TraitReaction::None
                }
            }
            PassengerTrait::Cloaked { cloaked } => {
                if clicked != own_pos {
                    *cloaked = !*cloaked;
                }
                TraitReaction::None
            }
            PassengerTrait::Frozen { countdown, armed } => {
                if !*armed {
                    return TraitReaction::None;
                }
                *countdown = countdown.saturating_sub(1);
                if *countdown == 0 {
                    TraitReaction::Detach
                } else {
                    TraitReaction::None
                }
            }
            PassengerTrait::Reserved => TraitReaction::None,
        }
    }

    /// The flood just reached the owner for the first time this pass.
    pub fn on_reached_by_flood(&mut self) -> TraitReaction {
        match self {
            PassengerTrait::Bombed { armed, exploded, .. } if !*armed && !*exploded => {
                *armed = true;
                TraitReaction::Armed
            }
            PassengerTrait::Frozen { armed, .. } if !*armed => {
                *armed = true;
                TraitReaction::Armed
            }
            _ => TraitReaction::None,
        }
    }
}

// ---------------------------------------------------------------------------
// Bus traits
// ---------------------------------------------------------------------------

/// A trait instance attached to one bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BusTrait {
    /// Holds seats for reserved passengers. `reserved_boarded` counts the
    /// reserved passengers already seated; in-flight reservations are the
    /// bus's counter and are passed in at decision time.
    ReservedBus {
        reserved_capacity: u32,
        reserved_boarded: u32,
    },
}

impl BusTrait {
    pub fn reserved_bus(reserved_capacity: u32) -> BusTrait {
        BusTrait::ReservedBus {
            reserved_capacity,
            reserved_boarded: 0,
        }
    }

    /// Seat check. `free_spots` is the bus's unreserved-and-unclaimed seat
    /// count (capacity minus boarded minus every in-flight reservation);
    /// `reserved_in_flight` counts reserved passengers currently moving to
    /// board. Both reserved seats taken and seats promised to in-flight
    /// boarders are unavailable, so a slow boarder can never be displaced.
    pub fn can_accept(&self, is_reserved: bool, free_spots: u32, reserved_in_flight: u32) -> bool {
        match self {
            BusTrait::ReservedBus {
                reserved_capacity,
                reserved_boarded,
            } => {
                let claimed = reserved_boarded + reserved_in_flight;
                if is_reserved {
                    claimed < *reserved_capacity
                } else {
                    // Leave every still-owed reserved seat open.
                    free_spots > reserved_capacity.saturating_sub(claimed)
                }
            }
        }
    }

    /// A passenger finished boarding the owning bus.
    pub fn on_bus_boarded(&mut self, is_reserved: bool) {
        match self {
            BusTrait::ReservedBus {
                reserved_boarded, ..
            } => {
                if is_reserved {
                    *reserved_boarded += 1;
                }
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Occupant;
    use crate::id::PassengerId;
    use slotmap::SlotMap;

    fn pid() -> PassengerId {
        let mut sm = SlotMap::<PassengerId, ()>::with_key();
        sm.insert(())
    }

    fn grid_with_neighbors(center: GridPosition, neighbors: &[GridPosition]) -> GridModel {
        let mut grid = GridModel::new(7, 7);
        grid.place(center, Occupant::Passenger(pid())).unwrap();
        for &pos in neighbors {
            grid.place(pos, Occupant::Passenger(pid())).unwrap();
        }
        grid
    }

    #[test]
    fn rope_requires_at_most_three_freed_neighbors() {
        let center = GridPosition::new(3, 3);
        let neighbors: Vec<GridPosition> = [(2, 2), (3, 2), (4, 2), (2, 3), (4, 3)]
            .iter()
            .map(|&(x, y)| GridPosition::new(x, y))
            .collect();
        let grid = grid_with_neighbors(center, &neighbors);
        match PassengerTrait::roped(center, &grid) {
            Some(PassengerTrait::Roped {
                anchors, required, ..
            }) => {
                assert_eq!(anchors.len(), 5);
                assert_eq!(required, 3);
            }
            other => panic!("expected a rope, got {other:?}"),
        }
    }

    #[test]
    fn rope_with_no_neighbors_never_attaches() {
        let mut grid = GridModel::new(5, 5);
        let center = GridPosition::new(2, 2);
        grid.place(center, Occupant::Passenger(pid())).unwrap();
        assert_eq!(PassengerTrait::roped(center, &grid), None);
    }

    #[test]
    fn rope_unties_after_enough_anchor_cells_empty() {
        let center = GridPosition::new(3, 3);
        let neighbors: Vec<GridPosition> = [(2, 3), (4, 3), (3, 4)]
            .iter()
            .map(|&(x, y)| GridPosition::new(x, y))
            .collect();
        let mut grid = grid_with_neighbors(center, &neighbors);
        let mut rope = PassengerTrait::roped(center, &grid).unwrap();

        // Two anchors empty: still tied.
        grid.remove(neighbors[0]).unwrap();
        grid.remove(neighbors[1]).unwrap();
        assert_eq!(
            rope.on_nearby_selection(neighbors[0], center, &grid),
            TraitReaction::None
        );
        assert!(rope.blocks_movement());

        // Third anchor empties: the next nearby selection unties it.
        grid.remove(neighbors[2]).unwrap();
        assert_eq!(
            rope.on_nearby_selection(neighbors[2], center, &grid),
            TraitReaction::Detach
        );
    }

    #[test]
    fn rope_ignores_selections_out_of_reach() {
        let center = GridPosition::new(3, 3);
        let neighbor = GridPosition::new(3, 4);
        let mut grid = grid_with_neighbors(center, &[neighbor]);
        let mut rope = PassengerTrait::roped(center, &grid).unwrap();
        grid.remove(neighbor).unwrap();

        // Selection three cells away: squared distance 9 > 4, no recount.
        assert_eq!(
            rope.on_nearby_selection(GridPosition::new(6, 3), center, &grid),
            TraitReaction::None
        );
        // Within reach it notices the freed anchor and unties.
        assert_eq!(
            rope.on_nearby_selection(GridPosition::new(3, 5), center, &grid),
            TraitReaction::Detach
        );
    }

    #[test]
    fn bomb_is_inert_until_armed_then_counts_down_to_explosion() {
        let grid = GridModel::new(5, 5);
        let own = GridPosition::new(0, 0);
        let far = GridPosition::new(4, 4);
        let mut bomb = PassengerTrait::bombed(3);
        assert!(!bomb.blocks_boarding());

        // Unarmed: selections do nothing.
        assert_eq!(bomb.on_nearby_selection(far, own, &grid), TraitReaction::None);
        assert_eq!(bomb.on_reached_by_flood(), TraitReaction::Armed);
        // Second flood reach does not re-arm.
        assert_eq!(bomb.on_reached_by_flood(), TraitReaction::None);

        assert_eq!(bomb.on_nearby_selection(far, own, &grid), TraitReaction::None);
        assert_eq!(bomb.on_nearby_selection(far, own, &grid), TraitReaction::None);
        assert_eq!(
            bomb.on_nearby_selection(far, own, &grid),
            TraitReaction::Exploded
        );

        // Exploded: permanently unboardable, still free to move, inert.
        assert!(bomb.blocks_boarding());
        assert!(!bomb.blocks_movement());
        assert_eq!(bomb.on_nearby_selection(far, own, &grid), TraitReaction::None);
        assert_eq!(bomb.on_selected(), TraitReaction::None);
    }

    #[test]
    fn selecting_the_owner_defuses_a_live_bomb() {
        let mut bomb = PassengerTrait::bombed(DEFAULT_BOMB_COUNTDOWN);
        bomb.on_reached_by_flood();
        assert_eq!(bomb.on_selected(), TraitReaction::Detach);
    }

    #[test]
    fn cloak_toggles_on_every_foreign_selection() {
        let grid = GridModel::new(5, 5);
        let own = GridPosition::new(1, 1);
        let mut cloak = PassengerTrait::cloaked(true);
        assert!(cloak.blocks_movement());
        assert!(cloak.blocks_boarding());

        cloak.on_nearby_selection(GridPosition::new(4, 4), own, &grid);
        assert!(!cloak.blocks_movement());

        // A blocked attempt on the owner itself does not toggle.
        cloak.on_nearby_selection(own, own, &grid);
        assert!(!cloak.blocks_movement());

        cloak.on_nearby_selection(GridPosition::new(0, 0), own, &grid);
        assert!(cloak.blocks_movement());
    }

    #[test]
    fn frozen_arms_then_thaws_after_its_countdown() {
        let grid = GridModel::new(5, 5);
        let own = GridPosition::new(2, 2);
        let far = GridPosition::new(0, 0);
        let mut frozen = PassengerTrait::frozen(2);
        assert!(frozen.blocks_movement());

        assert_eq!(frozen.on_nearby_selection(far, own, &grid), TraitReaction::None);
        assert_eq!(frozen.on_reached_by_flood(), TraitReaction::Armed);
        assert_eq!(frozen.on_nearby_selection(far, own, &grid), TraitReaction::None);
        assert_eq!(
            frozen.on_nearby_selection(own, own, &grid),
            TraitReaction::Detach
        );
    }

    #[test]
    fn reserved_bus_holds_seats_for_reserved_passengers() {
        let seat = BusTrait::reserved_bus(1);
        // Bus of capacity 3, empty: 3 free spots, no one in flight.
        assert!(seat.can_accept(true, 3, 0));
        // A non-reserved passenger may board only while a spare seat remains
        // beyond the one still owed.
        assert!(seat.can_accept(false, 3, 0));
        assert!(seat.can_accept(false, 2, 0));
        assert!(!seat.can_accept(false, 1, 0));
    }

    #[test]
    fn reserved_seat_accounting_includes_in_flight_boarders() {
        let mut seat = BusTrait::reserved_bus(1);
        // A reserved passenger in flight claims the seat.
        assert!(!seat.can_accept(true, 2, 1));
        // And frees the general pool for everyone else.
        assert!(seat.can_accept(false, 1, 1));

        seat.on_bus_boarded(true);
        assert!(!seat.can_accept(true, 2, 0));
        assert!(seat.can_accept(false, 1, 0));
    }
}
