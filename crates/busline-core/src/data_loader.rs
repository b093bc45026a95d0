//! JSON level loading, behind the `data-loader` feature.
//!
//! The raw schema uses string identifiers for colors, directions, and trait
//! kinds so level files stay hand-editable. Unknown identifiers never fail
//! the load: the offending entry (or just the offending trait) is skipped
//! with a [`LoadWarning`], and structural validation runs on whatever
//! remains. Only malformed JSON and contradictory levels are errors.

use crate::bus::BusTemplate;
use crate::grid::{Direction, GridPosition};
use crate::level::{
    LevelData, LevelError, LoadWarning, PassengerSpec, PassengerTemplate, TraitConfig, TunnelSpec,
};
use crate::passenger::PassengerColor;
use crate::traits::TraitKind;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("malformed level JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Level(#[from] LevelError),
}

// ---------------------------------------------------------------------------
// Raw schema
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawLevel {
    width: i32,
    height: i32,
    #[serde(default)]
    passengers: Vec<RawPassenger>,
    #[serde(default)]
    walls: Vec<RawCell>,
    #[serde(default)]
    tunnels: Vec<RawTunnel>,
    #[serde(default)]
    buses: Vec<RawBus>,
}

#[derive(Debug, Deserialize)]
struct RawCell {
    x: i32,
    y: i32,
}

#[derive(Debug, Deserialize)]
struct RawPassenger {
    x: i32,
    y: i32,
    color: String,
    #[serde(default)]
    traits: Vec<RawTrait>,
}

#[derive(Debug, Deserialize)]
struct RawTrait {
    kind: String,
    #[serde(default)]
    int_value: Option<u32>,
    #[serde(default)]
    bool_value: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawTunnel {
    x: i32,
    y: i32,
    direction: String,
    #[serde(default)]
    passengers: Vec<RawTemplate>,
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    color: String,
    #[serde(default)]
    traits: Vec<RawTrait>,
}

#[derive(Debug, Deserialize)]
struct RawBus {
    color: String,
    #[serde(default)]
    reserved_capacity: Option<u32>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parse a JSON level. Returns the typed level plus every warning from
/// identifier resolution and structural validation.
pub fn load_level_from_json(json: &str) -> Result<(LevelData, Vec<LoadWarning>), LoadError> {
    let raw: RawLevel = serde_json::from_str(json)?;
    let mut warnings = Vec::new();

    let mut passengers = Vec::new();
    for p in raw.passengers {
        let Some(color) = parse_color(&p.color, &mut warnings) else {
            continue;
        };
        passengers.push(PassengerSpec {
            position: GridPosition::new(p.x, p.y),
            color,
            traits: parse_traits(p.traits, &mut warnings),
        });
    }

    let walls = raw
        .walls
        .into_iter()
        .map(|c| GridPosition::new(c.x, c.y))
        .collect();

    let mut tunnels = Vec::new();
    for t in raw.tunnels {
        let Some(direction) = parse_direction(&t.direction, &mut warnings) else {
            continue;
        };
        let mut templates = Vec::new();
        for template in t.passengers {
            let Some(color) = parse_color(&template.color, &mut warnings) else {
                continue;
            };
            templates.push(PassengerTemplate {
                color,
                traits: parse_traits(template.traits, &mut warnings),
            });
        }
        tunnels.push(TunnelSpec {
            position: GridPosition::new(t.x, t.y),
            direction,
            templates,
        });
    }

    let mut buses = Vec::new();
    for b in raw.buses {
        let Some(color) = parse_color(&b.color, &mut warnings) else {
            continue;
        };
        buses.push(BusTemplate {
            color,
            reserved_capacity: b.reserved_capacity,
        });
    }

    let level = LevelData {
        width: raw.width,
        height: raw.height,
        passengers,
        walls,
        tunnels,
        buses,
    };
    warnings.extend(level.validate()?);
    Ok((level, warnings))
}

fn parse_traits(raw: Vec<RawTrait>, warnings: &mut Vec<LoadWarning>) -> Vec<TraitConfig> {
    let mut traits = Vec::new();
    for t in raw {
        let kind = match t.kind.to_ascii_lowercase().as_str() {
            "roped" => TraitKind::Roped,
            "bombed" => TraitKind::Bombed,
            "cloaked" => TraitKind::Cloaked,
            "frozen" => TraitKind::Frozen,
            "reserved" => TraitKind::Reserved,
            _ => {
                warnings.push(LoadWarning::UnknownTrait { identifier: t.kind });
                continue;
            }
        };
        traits.push(TraitConfig {
            kind,
            int_value: t.int_value,
            bool_value: t.bool_value,
        });
    }
    traits
}

fn parse_color(identifier: &str, warnings: &mut Vec<LoadWarning>) -> Option<PassengerColor> {
    match identifier.to_ascii_lowercase().as_str() {
        "red" => Some(PassengerColor::Red),
        "blue" => Some(PassengerColor::Blue),
        "green" => Some(PassengerColor::Green),
        "yellow" => Some(PassengerColor::Yellow),
        "purple" => Some(PassengerColor::Purple),
        _ => {
            warnings.push(LoadWarning::UnknownColor {
                identifier: identifier.to_owned(),
            });
            None
        }
    }
}

fn parse_direction(identifier: &str, warnings: &mut Vec<LoadWarning>) -> Option<Direction> {
    match identifier.to_ascii_lowercase().as_str() {
        "up" => Some(Direction::Up),
        "down" => Some(Direction::Down),
        "right" => Some(Direction::Right),
        "left" => Some(Direction::Left),
        _ => {
            warnings.push(LoadWarning::UnknownDirection {
                identifier: identifier.to_owned(),
            });
            None
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"{
        "width": 5,
        "height": 5,
        "passengers": [
            { "x": 1, "y": 1, "color": "Red",
              "traits": [ { "kind": "bombed", "int_value": 3 } ] },
            { "x": 2, "y": 2, "color": "blue" }
        ],
        "walls": [ { "x": 0, "y": 0 } ],
        "tunnels": [
            { "x": 4, "y": 0, "direction": "up",
              "passengers": [ { "color": "green" } ] }
        ],
        "buses": [
            { "color": "red" },
            { "color": "blue", "reserved_capacity": 1 }
        ]
    }"#;

    #[test]
    fn well_formed_json_loads_without_warnings() {
        let (level, warnings) = load_level_from_json(GOOD).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(level.passengers.len(), 2);
        assert_eq!(level.passengers[0].traits[0].kind, TraitKind::Bombed);
        assert_eq!(level.passengers[0].traits[0].int_value, Some(3));
        assert_eq!(level.tunnels[0].direction, Direction::Up);
        assert_eq!(level.buses[1].reserved_capacity, Some(1));
    }

    #[test]
    fn unknown_trait_is_skipped_not_fatal() {
        let json = r#"{
            "width": 3, "height": 3,
            "passengers": [
                { "x": 0, "y": 0, "color": "red",
                  "traits": [ { "kind": "haunted" }, { "kind": "frozen" } ] }
            ]
        }"#;
        let (level, warnings) = load_level_from_json(json).unwrap();
        assert_eq!(
            warnings,
            vec![LoadWarning::UnknownTrait {
                identifier: "haunted".into()
            }]
        );
        assert_eq!(level.passengers[0].traits.len(), 1);
        assert_eq!(level.passengers[0].traits[0].kind, TraitKind::Frozen);
    }

    #[test]
    fn unknown_color_drops_the_whole_entry() {
        let json = r#"{
            "width": 3, "height": 3,
            "passengers": [ { "x": 0, "y": 0, "color": "chartreuse" } ],
            "buses": [ { "color": "red" } ]
        }"#;
        let (level, warnings) = load_level_from_json(json).unwrap();
        assert!(level.passengers.is_empty());
        assert_eq!(level.buses.len(), 1);
        assert_eq!(
            warnings,
            vec![LoadWarning::UnknownColor {
                identifier: "chartreuse".into()
            }]
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            load_level_from_json("{ not json"),
            Err(LoadError::Json(_))
        ));
    }

    #[test]
    fn structural_validation_still_applies() {
        let json = r#"{
            "width": 3, "height": 3,
            "passengers": [ { "x": 1, "y": 1, "color": "red" } ],
            "walls": [ { "x": 1, "y": 1 } ]
        }"#;
        assert!(matches!(
            load_level_from_json(json),
            Err(LoadError::Level(LevelError::OverlappingPlacement(1, 1)))
        ));
    }

    #[test]
    fn loaded_level_runs_in_the_simulation() {
        let (level, _) = load_level_from_json(GOOD).unwrap();
        let sim = crate::sim::PuzzleSimulation::new(level).unwrap();
        assert_eq!(sim.phase(), crate::sim::GamePhase::Running);
    }
}
