//! Authored puzzle content, expressed as typed [`LevelData`] constructors
//! on top of `busline-core`.
//!
//! Levels live in code rather than data files so the compiler checks them
//! and tests can assert they validate cleanly.

use busline_core::bus::BusTemplate;
use busline_core::grid::{Direction, GridPosition};
use busline_core::level::{LevelData, PassengerSpec, PassengerTemplate, TraitConfig, TunnelSpec};
use busline_core::passenger::PassengerColor;
use busline_core::passenger::PassengerColor::{Blue, Green, Red, Yellow};
use busline_core::traits::TraitKind;

fn passenger(x: i32, y: i32, color: PassengerColor) -> PassengerSpec {
    PassengerSpec {
        position: GridPosition::new(x, y),
        color,
        traits: Vec::new(),
    }
}

fn passenger_with(x: i32, y: i32, color: PassengerColor, traits: Vec<TraitConfig>) -> PassengerSpec {
    PassengerSpec {
        position: GridPosition::new(x, y),
        color,
        traits,
    }
}

/// Two colors, two buses, everyone reachable. Teaches selection and the
/// waiting queue.
pub fn tutorial() -> LevelData {
    LevelData {
        width: 4,
        height: 4,
        passengers: vec![
            passenger(1, 3, Red),
            passenger(2, 3, Red),
            passenger(1, 2, Red),
            passenger(2, 2, Blue),
            passenger(1, 1, Blue),
            passenger(2, 1, Blue),
        ],
        walls: Vec::new(),
        tunnels: Vec::new(),
        buses: vec![BusTemplate::plain(Red), BusTemplate::plain(Blue)],
    }
}

/// Three colors behind a partial wall; order of extraction matters.
pub fn rush_hour() -> LevelData {
    LevelData {
        width: 6,
        height: 6,
        passengers: vec![
            passenger(0, 4, Red),
            passenger(1, 4, Green),
            passenger(2, 4, Red),
            passenger(0, 2, Green),
            passenger(1, 2, Yellow),
            passenger(2, 2, Red),
            passenger(4, 3, Yellow),
            passenger(5, 3, Green),
            passenger(4, 1, Yellow),
        ],
        walls: vec![
            GridPosition::new(3, 1),
            GridPosition::new(3, 2),
            GridPosition::new(3, 3),
            GridPosition::new(3, 4),
        ],
        tunnels: Vec::new(),
        buses: vec![
            BusTemplate::plain(Red),
            BusTemplate::plain(Green),
            BusTemplate::plain(Yellow),
        ],
    }
}

/// A tunnel keeps refilling the front cell of a single-file column.
pub fn tunnel_works() -> LevelData {
    LevelData {
        width: 3,
        height: 5,
        passengers: vec![
            passenger(0, 1, Red),
            passenger(1, 1, Red),
            passenger(2, 1, Red),
        ],
        walls: Vec::new(),
        tunnels: vec![TunnelSpec {
            position: GridPosition::new(1, 0),
            direction: Direction::Up,
            templates: vec![
                PassengerTemplate {
                    color: Blue,
                    traits: Vec::new(),
                },
                PassengerTemplate {
                    color: Blue,
                    traits: Vec::new(),
                },
                PassengerTemplate {
                    color: Blue,
                    traits: Vec::new(),
                },
            ],
        }],
        buses: vec![BusTemplate::plain(Red), BusTemplate::plain(Blue)],
    }
}

/// One seat on the red bus is held for the reserved passenger.
pub fn vip_service() -> LevelData {
    LevelData {
        width: 4,
        height: 4,
        passengers: vec![
            passenger(0, 3, Red),
            passenger(1, 3, Red),
            passenger_with(2, 3, Red, vec![TraitConfig::new(TraitKind::Reserved)]),
            passenger(0, 2, Blue),
            passenger(1, 2, Blue),
            passenger(2, 2, Blue),
        ],
        walls: Vec::new(),
        tunnels: Vec::new(),
        buses: vec![
            BusTemplate::with_reserved_seats(Red, 1),
            BusTemplate::plain(Blue),
        ],
    }
}

/// Every trait in one yard: a rope, a bomb, a cloak, and a block of ice.
pub fn frozen_depot() -> LevelData {
    LevelData {
        width: 5,
        height: 5,
        passengers: vec![
            passenger_with(0, 4, Red, vec![TraitConfig::with_int(TraitKind::Frozen, 2)]),
            passenger_with(2, 4, Red, vec![TraitConfig::with_int(TraitKind::Bombed, 4)]),
            passenger_with(4, 4, Red, vec![TraitConfig::with_bool(TraitKind::Cloaked, true)]),
            passenger(1, 3, Red),
            passenger(2, 3, Red),
            passenger_with(2, 2, Red, vec![TraitConfig::new(TraitKind::Roped)]),
        ],
        walls: Vec::new(),
        tunnels: Vec::new(),
        buses: vec![BusTemplate::plain(Red), BusTemplate::plain(Red)],
    }
}

/// Every authored level with its display name.
pub fn all_levels() -> Vec<(&'static str, LevelData)> {
    vec![
        ("tutorial", tutorial()),
        ("rush_hour", rush_hour()),
        ("tunnel_works", tunnel_works()),
        ("vip_service", vip_service()),
        ("frozen_depot", frozen_depot()),
    ]
}

// ===========================================================================
// Tests
// ===========================================================================
