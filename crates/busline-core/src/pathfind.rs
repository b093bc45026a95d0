//! A* pathfinding over the occupancy grid.
//!
//! Paths are orthogonal, unit-cost, and avoid every occupied cell. The
//! open-set tie-break (lowest f, then lowest h, then earliest insertion) is
//! part of the simulation's observable behavior: it decides where a selected
//! passenger relocates before boarding or queueing, so it must stay exactly
//! as specified for deterministic replay.

use crate::grid::{Direction, GridModel, GridPosition};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// A* pathfinder borrowing the grid it searches.
pub struct Pathfinder<'a> {
    grid: &'a GridModel,
}

/// Open-set entry. Ordering is (f, h, insertion sequence, position); the
/// heap pops the minimum, so equal-cost entries resolve to the earliest
/// inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OpenEntry {
    f: u32,
    h: u32,
    seq: u64,
    pos: GridPosition,
}

impl<'a> Pathfinder<'a> {
    pub fn new(grid: &'a GridModel) -> Self {
        Self { grid }
    }

    /// Shortest path from `start` to `goal` inclusive of both endpoints.
    /// Empty if unreachable. The start cell is exempt from the obstruction
    /// check (the mover still occupies it); the goal must be empty.
    pub fn find_path(&self, start: GridPosition, goal: GridPosition) -> Vec<GridPosition> {
        if start == goal {
            return vec![start];
        }
        if !self.grid.is_valid(start) || !self.grid.is_valid(goal) {
            return Vec::new();
        }

        let mut open = BinaryHeap::new();
        let mut g_cost: HashMap<GridPosition, u32> = HashMap::new();
        let mut came_from: HashMap<GridPosition, GridPosition> = HashMap::new();
        let mut closed: HashSet<GridPosition> = HashSet::new();
        let mut seq: u64 = 0;

        g_cost.insert(start, 0);
        open.push(Reverse(OpenEntry {
            f: start.manhattan_distance(&goal),
            h: start.manhattan_distance(&goal),
            seq,
            pos: start,
        }));

        while let Some(Reverse(entry)) = open.pop() {
            let current = entry.pos;
            if !closed.insert(current) {
                continue; // stale heap entry
            }
            if current == goal {
                return reconstruct(&came_from, current);
            }

            let current_g = g_cost[&current];
            for dir in Direction::ALL {
                let next = current.step(dir);
                if !self.grid.is_valid(next) || closed.contains(&next) {
                    continue;
                }
                if self.is_obstructed(next) {
                    continue;
                }
                let tentative = current_g + 1;
                if g_cost.get(&next).is_none_or(|&g| tentative < g) {
                    g_cost.insert(next, tentative);
                    came_from.insert(next, current);
                    seq += 1;
                    let h = next.manhattan_distance(&goal);
                    open.push(Reverse(OpenEntry {
                        f: tentative + h,
                        h,
                        seq,
                        pos: next,
                    }));
                }
            }
        }

        Vec::new()
    }

    /// The empty, reachable cell maximizing row index, ties broken by the
    /// smallest horizontal distance to the grid-center column. Returns
    /// `from` when no better cell is reachable. Scan order (x ascending,
    /// y descending) resolves any remaining ties to the first candidate.
    pub fn find_highest_empty(&self, from: GridPosition) -> GridPosition {
        let width = self.grid.width();
        let mut best = from;
        let mut best_y = from.y;
        // Distance to center in doubled units, so a grid with an even width
        // ranks its two middle columns equally without fractions.
        let mut best_center = (2 * from.x - (width - 1)).unsigned_abs();

        for x in 0..width {
            for y in (0..self.grid.height()).rev() {
                if y < best_y {
                    break; // nothing lower in this column can win
                }
                let pos = GridPosition::new(x, y);
                if self.is_obstructed(pos) {
                    continue;
                }
                let center = (2 * x - (width - 1)).unsigned_abs();
                if y == best_y && center >= best_center {
                    continue;
                }
                if self.find_path(from, pos).is_empty() {
                    continue;
                }
                best = pos;
                best_y = y;
                best_center = center;
            }
        }
        best
    }

    /// Path to [`Self::find_highest_empty`], or `[from]` when `from`
    /// already is the best cell.
    pub fn find_path_to_highest_empty(&self, from: GridPosition) -> Vec<GridPosition> {
        let best = self.find_highest_empty(from);
        if best == from {
            return vec![from];
        }
        self.find_path(from, best)
    }

    fn is_obstructed(&self, pos: GridPosition) -> bool {
        self.grid
            .occupant_at(pos)
            .is_some_and(|occ| occ.blocks_path())
    }
}

fn reconstruct(
    came_from: &HashMap<GridPosition, GridPosition>,
    end: GridPosition,
) -> Vec<GridPosition> {
    let mut path = vec![end];
    let mut current = end;
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

// ===========================================================================
// Tests
// ===========================================================================
