//! Reachability analysis: which passengers can currently be selected.
//!
//! Reachability propagates breadth-first from open air at the top of the
//! grid. A reached passenger is selectable but stops further propagation
//! through its cell; walls and tunnels block outright. Two entry points:
//!
//! - [`initial_reachable`] — full per-column analysis at level load/reset.
//! - [`flood_from`] — local flood from a single vacated cell. This is
//!   deliberately local: it never re-evaluates passengers unaffected by the
//!   new vacancy, trading completeness for cost.
//!
//! Both are pure over [`GridModel`]; the simulation applies the marking and
//! fires trait flood-reach hooks.

use crate::grid::{Direction, GridModel, GridPosition, Occupant};
use crate::id::PassengerId;
use std::collections::{HashSet, VecDeque};

/// Passengers reachable from the top of the grid, in BFS discovery order.
///
/// For each column the starting cell is the top-row cell: empty cells seed a
/// flood; a passenger sitting in the top row is reachable directly even with
/// no empty cell above it; walls and tunnels seed nothing. A shared visited
/// set keeps overlapping column floods from repeating work.
pub fn initial_reachable(grid: &GridModel) -> Vec<PassengerId> {
    let mut visited = HashSet::new();
    let mut reached = Vec::new();
    let top = grid.height() - 1;

    for x in 0..grid.width() {
        let start = GridPosition::new(x, top);
        if visited.contains(&start) {
            continue;
        }
        match grid.occupant_at(start) {
            None => flood(grid, start, &mut visited, &mut reached),
            Some(Occupant::Passenger(id)) => {
                visited.insert(start);
                if !reached.contains(&id) {
                    reached.push(id);
                }
            }
            Some(_) => {
                visited.insert(start);
            }
        }
    }
    reached
}

/// Passengers newly reachable from a single vacated cell, in BFS discovery
/// order. If the cell has been refilled (e.g. by a tunnel spawn) the flood
/// reaches exactly that occupant.
pub fn flood_from(grid: &GridModel, start: GridPosition) -> Vec<PassengerId> {
    let mut visited = HashSet::new();
    let mut reached = Vec::new();
    flood(grid, start, &mut visited, &mut reached);
    reached
}

fn flood(
    grid: &GridModel,
    start: GridPosition,
    visited: &mut HashSet<GridPosition>,
    reached: &mut Vec<PassengerId>,
) {
    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        match grid.occupant_at(current) {
            Some(Occupant::Passenger(id)) => {
                // Reachable, but the cell still blocks propagation.
                if !reached.contains(&id) {
                    reached.push(id);
                }
                continue;
            }
            Some(Occupant::Wall) | Some(Occupant::Tunnel(_)) => continue,
            None => {}
        }
        for dir in Direction::ALL {
            let next = current.step(dir);
            if grid.is_valid(next) && visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
