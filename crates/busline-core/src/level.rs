//! Typed level data and its load-time validation.
//!
//! Validation separates two severities. Entries the simulation can do
//! without — an out-of-bounds placement, a duplicate trait — degrade to
//! [`LoadWarning`]s and are skipped during population. Contradictions the
//! simulation cannot resolve — two entries claiming one cell, a degenerate
//! grid — are [`LevelError`]s and fail the load.

use crate::bus::BusTemplate;
use crate::grid::{Direction, GridError, GridPosition};
use crate::passenger::PassengerColor;
use crate::traits::TraitKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// One trait attachment with its optional payloads (countdowns for bombed
/// and frozen, the starting state for cloaked).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitConfig {
    pub kind: TraitKind,
    pub int_value: Option<u32>,
    pub bool_value: Option<bool>,
}

impl TraitConfig {
    pub fn new(kind: TraitKind) -> Self {
        Self {
            kind,
            int_value: None,
            bool_value: None,
        }
    }

    pub fn with_int(kind: TraitKind, value: u32) -> Self {
        Self {
            kind,
            int_value: Some(value),
            bool_value: None,
        }
    }

    pub fn with_bool(kind: TraitKind, value: bool) -> Self {
        Self {
            kind,
            int_value: None,
            bool_value: Some(value),
        }
    }
}

/// A passenger a tunnel will spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassengerTemplate {
    pub color: PassengerColor,
    pub traits: Vec<TraitConfig>,
}

/// A passenger placed on the grid at load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassengerSpec {
    pub position: GridPosition,
    pub color: PassengerColor,
    pub traits: Vec<TraitConfig>,
}

/// A tunnel placement with its ordered spawn roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunnelSpec {
    pub position: GridPosition,
    pub direction: Direction,
    pub templates: Vec<PassengerTemplate>,
}

/// Everything needed to build (and rebuild) one puzzle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub width: i32,
    pub height: i32,
    pub passengers: Vec<PassengerSpec>,
    pub walls: Vec<GridPosition>,
    pub tunnels: Vec<TunnelSpec>,
    pub buses: Vec<BusTemplate>,
}

// ---------------------------------------------------------------------------
// Errors and warnings
// ---------------------------------------------------------------------------

/// Load failures. The level is unusable.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("grid dimensions {0}x{1} are degenerate")]
    DegenerateGrid(i32, i32),
    #[error("cell ({0}, {1}) is claimed by more than one placement")]
    OverlappingPlacement(i32, i32),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Recoverable load issues: the offending entry is skipped and the rest of
/// the level loads. The embedder decides whether to surface them.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LoadWarning {
    #[error("placement at ({x}, {y}) is outside the grid and was skipped")]
    OutOfBounds { x: i32, y: i32 },
    #[error("duplicate {kind:?} trait at ({x}, {y}) was skipped")]
    DuplicateTrait { kind: TraitKind, x: i32, y: i32 },
    #[error("unknown trait identifier {identifier:?} was skipped")]
    UnknownTrait { identifier: String },
    #[error("unknown color identifier {identifier:?}; entry skipped")]
    UnknownColor { identifier: String },
    #[error("unknown direction identifier {identifier:?}; entry skipped")]
    UnknownDirection { identifier: String },
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl LevelData {
    pub fn in_bounds(&self, pos: GridPosition) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    /// Check the level. `Ok` carries the warnings for every entry that will
    /// be skipped during population.
    pub fn validate(&self) -> Result<Vec<LoadWarning>, LevelError> {
        if self.width < 1 || self.height < 1 {
            return Err(LevelError::DegenerateGrid(self.width, self.height));
        }

        let mut warnings = Vec::new();
        let mut claimed: HashSet<GridPosition> = HashSet::new();
        let mut claim = |pos: GridPosition,
                         warnings: &mut Vec<LoadWarning>|
         -> Result<bool, LevelError> {
            if !self.in_bounds(pos) {
                warnings.push(LoadWarning::OutOfBounds { x: pos.x, y: pos.y });
                return Ok(false);
            }
            if !claimed.insert(pos) {
                return Err(LevelError::OverlappingPlacement(pos.x, pos.y));
            }
            Ok(true)
        };

        for spec in &self.passengers {
            if claim(spec.position, &mut warnings)? {
                duplicate_traits(&spec.traits, spec.position, &mut warnings);
            }
        }
        for &wall in &self.walls {
            claim(wall, &mut warnings)?;
        }
        for tunnel in &self.tunnels {
            if claim(tunnel.position, &mut warnings)? {
                for template in &tunnel.templates {
                    duplicate_traits(&template.traits, tunnel.position, &mut warnings);
                }
            }
        }
        Ok(warnings)
    }
}

fn duplicate_traits(traits: &[TraitConfig], at: GridPosition, warnings: &mut Vec<LoadWarning>) {
    let mut seen: HashSet<TraitKind> = HashSet::new();
    for config in traits {
        if !seen.insert(config.kind) {
            warnings.push(LoadWarning::DuplicateTrait {
                kind: config.kind,
                x: at.x,
                y: at.y,
            });
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
