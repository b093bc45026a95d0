//! Tunnels: grid-occupying spawners that feed passengers into the cell they
//! point at whenever it empties.

use crate::grid::{Direction, GridModel, GridPosition, Occupant};
use crate::id::TunnelId;
use crate::level::PassengerTemplate;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// A tunnel and its remaining spawn roster. The spawn index only ever moves
/// forward; a level reset rewinds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tunnel {
    position: GridPosition,
    direction: Direction,
    templates: Vec<PassengerTemplate>,
    spawn_index: usize,
}

impl Tunnel {
    pub fn new(
        position: GridPosition,
        direction: Direction,
        templates: Vec<PassengerTemplate>,
    ) -> Self {
        Self {
            position,
            direction,
            templates,
            spawn_index: 0,
        }
    }

    pub fn position(&self) -> GridPosition {
        self.position
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The cell this tunnel spawns into.
    pub fn spawn_target(&self) -> GridPosition {
        self.position.step(self.direction)
    }

    pub fn has_remaining(&self) -> bool {
        self.spawn_index < self.templates.len()
    }

    pub fn remaining(&self) -> usize {
        self.templates.len() - self.spawn_index
    }

    pub fn peek(&self) -> Option<&PassengerTemplate> {
        self.templates.get(self.spawn_index)
    }

    /// Take the next template off the roster.
    pub fn consume(&mut self) -> Option<PassengerTemplate> {
        let template = self.templates.get(self.spawn_index).cloned()?;
        self.spawn_index += 1;
        Some(template)
    }

    pub fn reset_spawn_index(&mut self) {
        self.spawn_index = 0;
    }
}

/// The tunnel feeding a just-vacated cell, if any. Each candidate direction
/// is probed in [`Direction::ALL`] order: the adjacent cell opposite D must
/// hold a tunnel pointing D with templates left. The first match wins, so at
/// most one tunnel fills any vacancy.
pub fn feeding_tunnel(
    grid: &GridModel,
    tunnels: &SlotMap<TunnelId, Tunnel>,
    vacancy: GridPosition,
) -> Option<TunnelId> {
    for dir in Direction::ALL {
        let source = vacancy.step_back(dir);
        if let Some(Occupant::Tunnel(id)) = grid.occupant_at(source) {
            if let Some(tunnel) = tunnels.get(id) {
                if tunnel.direction() == dir && tunnel.has_remaining() {
                    return Some(id);
                }
            }
        }
    }
    None
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passenger::PassengerColor;

    fn roster(colors: &[PassengerColor]) -> Vec<PassengerTemplate> {
        colors
            .iter()
            .map(|&color| PassengerTemplate {
                color,
                traits: Vec::new(),
            })
            .collect()
    }

    fn place_tunnel(
        grid: &mut GridModel,
        tunnels: &mut SlotMap<TunnelId, Tunnel>,
        pos: GridPosition,
        dir: Direction,
        colors: &[PassengerColor],
    ) -> TunnelId {
        let id = tunnels.insert(Tunnel::new(pos, dir, roster(colors)));
        grid.place(pos, Occupant::Tunnel(id)).unwrap();
        id
    }

    #[test]
    fn roster_is_consumed_in_order_then_runs_dry() {
        let mut tunnel = Tunnel::new(
            GridPosition::new(0, 0),
            Direction::Up,
            roster(&[PassengerColor::Red, PassengerColor::Blue]),
        );
        assert_eq!(tunnel.remaining(), 2);
        assert_eq!(tunnel.consume().unwrap().color, PassengerColor::Red);
        assert_eq!(tunnel.consume().unwrap().color, PassengerColor::Blue);
        assert!(!tunnel.has_remaining());
        assert!(tunnel.consume().is_none());

        tunnel.reset_spawn_index();
        assert_eq!(tunnel.remaining(), 2);
        assert_eq!(tunnel.peek().unwrap().color, PassengerColor::Red);
    }

    #[test]
    fn vacancy_is_fed_by_the_tunnel_pointing_at_it() {
        let mut grid = GridModel::new(5, 5);
        let mut tunnels = SlotMap::with_key();
        let vacancy = GridPosition::new(2, 2);
        let id = place_tunnel(
            &mut grid,
            &mut tunnels,
            GridPosition::new(2, 1),
            Direction::Up,
            &[PassengerColor::Red],
        );
        assert_eq!(feeding_tunnel(&grid, &tunnels, vacancy), Some(id));
    }

    #[test]
    fn adjacent_tunnel_pointing_elsewhere_does_not_feed() {
        let mut grid = GridModel::new(5, 5);
        let mut tunnels = SlotMap::with_key();
        // Below the vacancy but pointing right, not up.
        place_tunnel(
            &mut grid,
            &mut tunnels,
            GridPosition::new(2, 1),
            Direction::Right,
            &[PassengerColor::Red],
        );
        assert_eq!(feeding_tunnel(&grid, &tunnels, GridPosition::new(2, 2)), None);
    }

    #[test]
    fn probe_order_breaks_ties_between_competing_tunnels() {
        let mut grid = GridModel::new(5, 5);
        let mut tunnels = SlotMap::with_key();
        let vacancy = GridPosition::new(2, 2);
        let below = place_tunnel(
            &mut grid,
            &mut tunnels,
            GridPosition::new(2, 1),
            Direction::Up,
            &[PassengerColor::Red],
        );
        let left = place_tunnel(
            &mut grid,
            &mut tunnels,
            GridPosition::new(1, 2),
            Direction::Right,
            &[PassengerColor::Blue],
        );
        // Up is probed before Right.
        assert_eq!(feeding_tunnel(&grid, &tunnels, vacancy), Some(below));

        // With the up-tunnel exhausted, the right-pointing one takes over.
        tunnels[below].consume();
        assert_eq!(feeding_tunnel(&grid, &tunnels, vacancy), Some(left));
    }

    #[test]
    fn exhausted_tunnel_never_feeds() {
        let mut grid = GridModel::new(5, 5);
        let mut tunnels = SlotMap::with_key();
        let id = place_tunnel(
            &mut grid,
            &mut tunnels,
            GridPosition::new(2, 1),
            Direction::Up,
            &[PassengerColor::Red],
        );
        tunnels[id].consume();
        assert_eq!(feeding_tunnel(&grid, &tunnels, GridPosition::new(2, 2)), None);
    }
}
