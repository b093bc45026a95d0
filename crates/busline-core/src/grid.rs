//! The occupancy grid: positions, directions, occupants, and the
//! [`GridModel`] that owns which cell holds what.
//!
//! The occupant map is the single source of truth for both pathfinding
//! obstruction and flood-fill blocking. Cells are mutated only through
//! [`GridModel::place`] and [`GridModel::remove`]; the vacancy cascade
//! (tunnel spawns, reachability refresh) is orchestrated by the simulation,
//! never here.

use crate::id::{PassengerId, TunnelId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A position on the 2D grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another position.
    pub fn manhattan_distance(&self, other: &GridPosition) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    /// Squared Euclidean distance to another position. Exact in integers,
    /// used for trait proximity checks.
    pub fn distance_squared(&self, other: &GridPosition) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx * dx + dy * dy
    }

    /// The position offset by (dx, dy).
    pub fn offset(&self, dx: i32, dy: i32) -> GridPosition {
        GridPosition::new(self.x + dx, self.y + dy)
    }

    /// The neighboring position one step in `dir`.
    pub fn step(&self, dir: Direction) -> GridPosition {
        let (dx, dy) = dir.offset();
        self.offset(dx, dy)
    }

    /// The position one step against `dir` (where a spawner pointing `dir`
    /// at this cell would sit).
    pub fn step_back(&self, dir: Direction) -> GridPosition {
        let (dx, dy) = dir.offset();
        self.offset(-dx, -dy)
    }
}

/// Cardinal directions. `ALL` order is gameplay-visible: tunnel spawn
/// checks probe directions in exactly this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Right,
    Left,
}

impl Direction {
    /// All four cardinal directions, in probe order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Right,
        Direction::Left,
    ];

    /// Unit offset for this direction. Up is +y.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, 1),
            Direction::Down => (0, -1),
            Direction::Right => (1, 0),
            Direction::Left => (-1, 0),
        }
    }
}

/// What occupies a grid cell. Every variant obstructs pathfinding; flood
/// propagation rules differ per variant (see the `flood` module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occupant {
    Passenger(PassengerId),
    Wall,
    Tunnel(TunnelId),
}

impl Occupant {
    /// Whether this occupant obstructs pathfinding. True for all current
    /// variants; kept explicit so the pathfinder never hardcodes variants.
    pub fn blocks_path(&self) -> bool {
        match self {
            Occupant::Passenger(_) | Occupant::Wall | Occupant::Tunnel(_) => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Grid invariant violations. These indicate a corrupted occupancy map or a
/// caller bug and are propagated fail-fast.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GridError {
    #[error("cell ({0}, {1}) is already occupied")]
    Occupied(i32, i32),
    #[error("cell ({0}, {1}) is empty")]
    Empty(i32, i32),
    #[error("position ({0}, {1}) is outside the grid")]
    OutOfBounds(i32, i32),
}

// ---------------------------------------------------------------------------
// GridModel
// ---------------------------------------------------------------------------

/// A bounded 2D occupancy grid. At most one occupant per cell.
///
/// Backed by a `BTreeMap` so iteration order is deterministic, which the
/// state hash and the game-over scan rely on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridModel {
    width: i32,
    height: i32,
    cells: BTreeMap<GridPosition, Occupant>,
}

impl GridModel {
    /// Create an empty grid with the given bounds.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            cells: BTreeMap::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// A position is valid iff `0 <= x < width` and `0 <= y < height`.
    pub fn is_valid(&self, pos: GridPosition) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    /// The occupant at `pos`, if any.
    pub fn occupant_at(&self, pos: GridPosition) -> Option<Occupant> {
        self.cells.get(&pos).copied()
    }

    /// The passenger at `pos`, if the cell holds one.
    pub fn passenger_at(&self, pos: GridPosition) -> Option<PassengerId> {
        match self.cells.get(&pos) {
            Some(Occupant::Passenger(id)) => Some(*id),
            _ => None,
        }
    }

    /// Whether `pos` holds any occupant.
    pub fn is_occupied(&self, pos: GridPosition) -> bool {
        self.cells.contains_key(&pos)
    }

    /// Place an occupant at `pos`. Fails if the cell is occupied or out of
    /// bounds.
    pub fn place(&mut self, pos: GridPosition, occupant: Occupant) -> Result<(), GridError> {
        if !self.is_valid(pos) {
            return Err(GridError::OutOfBounds(pos.x, pos.y));
        }
        if self.cells.contains_key(&pos) {
            return Err(GridError::Occupied(pos.x, pos.y));
        }
        self.cells.insert(pos, occupant);
        Ok(())
    }

    /// Remove and return the occupant at `pos`. Fails if the cell is empty.
    /// Downstream recomputation (tunnel spawns, reachability) belongs to the
    /// caller; from its perspective this is a single atomic step.
    pub fn remove(&mut self, pos: GridPosition) -> Result<Occupant, GridError> {
        self.cells
            .remove(&pos)
            .ok_or(GridError::Empty(pos.x, pos.y))
    }

    /// Iterate over all occupied cells in position order.
    pub fn occupants(&self) -> impl Iterator<Item = (GridPosition, Occupant)> + '_ {
        self.cells.iter().map(|(&pos, &occ)| (pos, occ))
    }

    /// Iterate over all passenger-occupied cells in position order.
    pub fn passengers(&self) -> impl Iterator<Item = (GridPosition, PassengerId)> + '_ {
        self.cells.iter().filter_map(|(&pos, &occ)| match occ {
            Occupant::Passenger(id) => Some((pos, id)),
            _ => None,
        })
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.cells.len()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use slotmap::SlotMap;

    fn pid() -> PassengerId {
        let mut sm = SlotMap::<PassengerId, ()>::with_key();
        sm.insert(())
    }

    #[test]
    fn place_then_query_returns_occupant() {
        let mut grid = GridModel::new(5, 5);
        let id = pid();
        grid.place(GridPosition::new(2, 3), Occupant::Passenger(id))
            .unwrap();
        assert_eq!(
            grid.occupant_at(GridPosition::new(2, 3)),
            Some(Occupant::Passenger(id))
        );
        assert_eq!(grid.passenger_at(GridPosition::new(2, 3)), Some(id));
    }

    #[test]
    fn double_place_fails_with_occupied() {
        let mut grid = GridModel::new(5, 5);
        let pos = GridPosition::new(1, 1);
        grid.place(pos, Occupant::Wall).unwrap();
        assert_eq!(
            grid.place(pos, Occupant::Wall),
            Err(GridError::Occupied(1, 1))
        );
    }

    #[test]
    fn remove_from_empty_cell_fails() {
        let mut grid = GridModel::new(5, 5);
        assert_eq!(
            grid.remove(GridPosition::new(0, 0)),
            Err(GridError::Empty(0, 0))
        );
    }

    #[test]
    fn place_out_of_bounds_fails() {
        let mut grid = GridModel::new(3, 3);
        assert_eq!(
            grid.place(GridPosition::new(3, 0), Occupant::Wall),
            Err(GridError::OutOfBounds(3, 0))
        );
        assert_eq!(
            grid.place(GridPosition::new(0, -1), Occupant::Wall),
            Err(GridError::OutOfBounds(0, -1))
        );
    }

    #[test]
    fn remove_returns_the_occupant_and_vacates() {
        let mut grid = GridModel::new(4, 4);
        let pos = GridPosition::new(1, 2);
        grid.place(pos, Occupant::Wall).unwrap();
        assert_eq!(grid.remove(pos), Ok(Occupant::Wall));
        assert!(!grid.is_occupied(pos));
    }

    #[test]
    fn validity_matches_bounds() {
        let grid = GridModel::new(4, 6);
        assert!(grid.is_valid(GridPosition::new(0, 0)));
        assert!(grid.is_valid(GridPosition::new(3, 5)));
        assert!(!grid.is_valid(GridPosition::new(4, 0)));
        assert!(!grid.is_valid(GridPosition::new(0, 6)));
        assert!(!grid.is_valid(GridPosition::new(-1, 2)));
    }

    #[test]
    fn direction_offsets_are_cardinal_units() {
        for dir in Direction::ALL {
            let (dx, dy) = dir.offset();
            assert_eq!(dx.abs() + dy.abs(), 1);
        }
    }

    #[test]
    fn step_back_inverts_step() {
        let pos = GridPosition::new(3, 3);
        for dir in Direction::ALL {
            assert_eq!(pos.step(dir).step_back(dir), pos);
        }
    }

    #[test]
    fn occupants_iterate_in_position_order() {
        let mut grid = GridModel::new(8, 8);
        grid.place(GridPosition::new(5, 1), Occupant::Wall).unwrap();
        grid.place(GridPosition::new(0, 7), Occupant::Wall).unwrap();
        grid.place(GridPosition::new(0, 2), Occupant::Wall).unwrap();
        let order: Vec<GridPosition> = grid.occupants().map(|(pos, _)| pos).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }

    proptest! {
        #[test]
        fn place_remove_roundtrip(x in 0i32..10, y in 0i32..10) {
            let mut grid = GridModel::new(10, 10);
            let pos = GridPosition::new(x, y);
            grid.place(pos, Occupant::Wall).unwrap();
            prop_assert!(grid.is_occupied(pos));
            prop_assert_eq!(grid.remove(pos).unwrap(), Occupant::Wall);
            prop_assert!(!grid.is_occupied(pos));
            prop_assert_eq!(grid.occupied_count(), 0);
        }

        #[test]
        fn manhattan_distance_is_symmetric(
            ax in -20i32..20, ay in -20i32..20,
            bx in -20i32..20, by in -20i32..20,
        ) {
            let a = GridPosition::new(ax, ay);
            let b = GridPosition::new(bx, by);
            prop_assert_eq!(a.manhattan_distance(&b), b.manhattan_distance(&a));
        }
    }
}
