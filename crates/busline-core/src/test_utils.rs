//! Shared helpers for unit tests, integration tests, and benches. Only
//! compiled with the `test-utils` feature.

use crate::bus::BusTemplate;
use crate::event::Event;
use crate::grid::{Direction, GridPosition};
use crate::id::PassengerId;
use crate::level::{LevelData, PassengerSpec, PassengerTemplate, TraitConfig, TunnelSpec};
use crate::movement::MoveToken;
use crate::passenger::PassengerColor;
use crate::sim::PuzzleSimulation;

/// Fluent construction of [`LevelData`] for tests.
pub struct LevelBuilder {
    width: i32,
    height: i32,
    passengers: Vec<PassengerSpec>,
    walls: Vec<GridPosition>,
    tunnels: Vec<TunnelSpec>,
    buses: Vec<BusTemplate>,
}

impl LevelBuilder {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            passengers: Vec::new(),
            walls: Vec::new(),
            tunnels: Vec::new(),
            buses: Vec::new(),
        }
    }

    pub fn passenger(self, x: i32, y: i32, color: PassengerColor) -> Self {
        self.passenger_with(x, y, color, Vec::new())
    }

    pub fn passenger_with(
        mut self,
        x: i32,
        y: i32,
        color: PassengerColor,
        traits: Vec<TraitConfig>,
    ) -> Self {
        self.passengers.push(PassengerSpec {
            position: GridPosition::new(x, y),
            color,
            traits,
        });
        self
    }

    pub fn wall(mut self, x: i32, y: i32) -> Self {
        self.walls.push(GridPosition::new(x, y));
        self
    }

    /// A tunnel with a roster of plain (trait-less) passengers.
    pub fn tunnel(self, x: i32, y: i32, direction: Direction, colors: Vec<PassengerColor>) -> Self {
        let templates = colors
            .into_iter()
            .map(|color| PassengerTemplate {
                color,
                traits: Vec::new(),
            })
            .collect();
        self.tunnel_with(x, y, direction, templates)
    }

    pub fn tunnel_with(
        mut self,
        x: i32,
        y: i32,
        direction: Direction,
        templates: Vec<PassengerTemplate>,
    ) -> Self {
        self.tunnels.push(TunnelSpec {
            position: GridPosition::new(x, y),
            direction,
            templates,
        });
        self
    }

    pub fn bus(mut self, color: PassengerColor) -> Self {
        self.buses.push(BusTemplate::plain(color));
        self
    }

    pub fn reserved_bus(mut self, color: PassengerColor, seats: u32) -> Self {
        self.buses.push(BusTemplate::with_reserved_seats(color, seats));
        self
    }

    pub fn build(self) -> LevelData {
        LevelData {
            width: self.width,
            height: self.height,
            passengers: self.passengers,
            walls: self.walls,
            tunnels: self.tunnels,
            buses: self.buses,
        }
    }
}

/// The passenger standing at (x, y). Panics when the cell holds none.
pub fn passenger_at(sim: &PuzzleSimulation, x: i32, y: i32) -> PassengerId {
    sim.grid()
        .passenger_at(GridPosition::new(x, y))
        .expect("no passenger at the given cell")
}

/// Complete the initial bus arrival so boarding is open.
pub fn arrive_first_bus(sim: &mut PuzzleSimulation) {
    let events = sim.drain_events();
    let token = events
        .iter()
        .find_map(|event| match event {
            Event::BusArriving { token } => Some(*token),
            _ => None,
        })
        .expect("no bus is arriving");
    sim.complete_move(token).expect("bus arrival failed");
}

/// Complete every requested move, in request order, until the simulation is
/// quiescent. Returns everything emitted along the way.
pub fn drive(sim: &mut PuzzleSimulation) -> Vec<Event> {
    let mut log = Vec::new();
    loop {
        let events = sim.drain_events();
        let tokens: Vec<MoveToken> = events
            .iter()
            .filter_map(|event| match event {
                Event::MoveRequested { token, .. } => Some(*token),
                Event::BusArriving { token } => Some(*token),
                _ => None,
            })
            .collect();
        log.extend(events);
        if tokens.is_empty() {
            return log;
        }
        for token in tokens {
            let _ = sim.complete_move(token);
        }
    }
}
