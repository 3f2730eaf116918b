//! Match configuration
//!
//! Everything the engine needs is consumed once at construction and never
//! changes afterwards. Every section has defaults reproducing the standard
//! 4x4 skirmish, so a TOML file only needs to name what it changes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::battle::constants::{
    DEFAULT_ATTACKS_PER_TURN, DEFAULT_ATTACK_RANGE, DEFAULT_BASE_DAMAGE, DEFAULT_GRID_HEIGHT,
    DEFAULT_GRID_WIDTH, DEFAULT_MAX_HEALTH, DEFAULT_SEED, DEFAULT_TILE_SIZE, MAX_GRID_DIMENSION,
    MAX_GRID_TILES, MAX_SIGHT_TOLERANCE,
};
use crate::battle::coord::{AdjacencyPolicy, GridCoord};
use crate::battle::obstacles::ObstacleKind;
use crate::core::error::{Result, TacticsError};
use crate::core::types::{Team, UnitId, WorldPosition};

/// Grid dimensions and world mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: u32,
    pub height: u32,
    /// World units per tile edge
    pub tile_size: f32,
    /// World position of the outer corner of tile (0, 0)
    pub origin: WorldPosition,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_WIDTH,
            height: DEFAULT_GRID_HEIGHT,
            tile_size: DEFAULT_TILE_SIZE,
            origin: WorldPosition::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementPolicy {
    pub allow_diagonal: bool,
    /// A unit must finish its current move before it may start another
    pub prevent_overlapping_moves: bool,
}

impl MovementPolicy {
    pub fn adjacency(&self) -> AdjacencyPolicy {
        AdjacencyPolicy::from_diagonal_flag(self.allow_diagonal)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatPolicy {
    pub allow_diagonal: bool,
    pub prevent_friendly_fire: bool,
    pub require_line_of_sight: bool,
    pub attacks_per_turn: u32,
}

impl Default for CombatPolicy {
    fn default() -> Self {
        Self {
            allow_diagonal: false,
            prevent_friendly_fire: true,
            require_line_of_sight: true,
            attacks_per_turn: DEFAULT_ATTACKS_PER_TURN,
        }
    }
}

impl CombatPolicy {
    pub fn adjacency(&self) -> AdjacencyPolicy {
        AdjacencyPolicy::from_diagonal_flag(self.allow_diagonal)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SightConfig {
    /// How far (in tile units) a sight line may clip a blocking tile and still count as clear
    pub tolerance: f32,
    /// Allow sight lines between diagonally touching blockers and around cover edges
    pub allow_diagonal_gap: bool,
    /// Memoize sight queries per obstacle layout version
    pub cache: bool,
}

impl Default for SightConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.0,
            allow_diagonal_gap: false,
            cache: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageConfig {
    pub base: u32,
    /// Symmetric spread: the roll adds a uniform integer in [-variation, variation]
    pub variation: u32,
    pub crit_chance: f32,
    pub crit_multiplier: f32,
}

impl Default for DamageConfig {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_DAMAGE,
            variation: 0,
            crit_chance: 0.0,
            crit_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Reject commands for units whose team is not active
    pub enforce_turn_order: bool,
    pub first_team: Team,
}

/// Obstacle placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstacleSpec {
    pub at: GridCoord,
    pub kind: ObstacleKind,
}

/// Starting unit placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub id: UnitId,
    pub team: Team,
    pub at: GridCoord,
    #[serde(default = "default_max_health")]
    pub max_health: u32,
    #[serde(default = "default_attack_range")]
    pub attack_range: u32,
    /// Units without a weapon can move but never attack
    #[serde(default = "default_armed")]
    pub armed: bool,
}

fn default_max_health() -> u32 {
    DEFAULT_MAX_HEALTH
}

fn default_attack_range() -> u32 {
    DEFAULT_ATTACK_RANGE
}

fn default_armed() -> bool {
    true
}

impl UnitSpec {
    pub fn new(id: u32, team: Team, at: GridCoord) -> Self {
        Self {
            id: UnitId(id),
            team,
            at,
            max_health: DEFAULT_MAX_HEALTH,
            attack_range: DEFAULT_ATTACK_RANGE,
            armed: true,
        }
    }

    pub fn with_health(mut self, max_health: u32) -> Self {
        self.max_health = max_health;
        self
    }

    pub fn with_range(mut self, attack_range: u32) -> Self {
        self.attack_range = attack_range;
        self
    }

    pub fn unarmed(mut self) -> Self {
        self.armed = false;
        self
    }
}

/// Complete construction-time configuration of a match
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub grid: GridConfig,
    pub movement: MovementPolicy,
    pub combat: CombatPolicy,
    pub sight: SightConfig,
    pub damage: DamageConfig,
    pub turns: TurnConfig,
    pub seed: u64,
    pub obstacles: Vec<ObstacleSpec>,
    pub units: Vec<UnitSpec>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            movement: MovementPolicy::default(),
            combat: CombatPolicy::default(),
            sight: SightConfig::default(),
            damage: DamageConfig::default(),
            turns: TurnConfig::default(),
            seed: DEFAULT_SEED,
            obstacles: Vec::new(),
            units: Vec::new(),
        }
    }
}

impl MatchConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MatchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_unit(mut self, unit: UnitSpec) -> Self {
        self.units.push(unit);
        self
    }

    pub fn with_obstacle(mut self, at: GridCoord, kind: ObstacleKind) -> Self {
        self.obstacles.push(ObstacleSpec { at, kind });
        self
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(TacticsError::InvalidConfig(msg));

        if self.grid.width == 0 || self.grid.height == 0 {
            return invalid(format!(
                "grid must be at least 1x1, got {}x{}",
                self.grid.width, self.grid.height
            ));
        }
        if self.grid.width > MAX_GRID_DIMENSION
            || self.grid.height > MAX_GRID_DIMENSION
            || self.grid.width as u64 * self.grid.height as u64 > MAX_GRID_TILES
        {
            return invalid(format!(
                "grid {}x{} exceeds {} per side or {} tiles",
                self.grid.width, self.grid.height, MAX_GRID_DIMENSION, MAX_GRID_TILES
            ));
        }
        if !(self.grid.tile_size.is_finite() && self.grid.tile_size > 0.0) {
            return invalid(format!("tile_size must be positive, got {}", self.grid.tile_size));
        }
        if !(0.0..=MAX_SIGHT_TOLERANCE).contains(&self.sight.tolerance) {
            return invalid(format!(
                "sight tolerance must be within [0, {}], got {}",
                MAX_SIGHT_TOLERANCE, self.sight.tolerance
            ));
        }
        if !(0.0..=1.0).contains(&self.damage.crit_chance) {
            return invalid(format!(
                "crit_chance must be within [0, 1], got {}",
                self.damage.crit_chance
            ));
        }
        if !(self.damage.crit_multiplier.is_finite() && self.damage.crit_multiplier >= 1.0) {
            return invalid(format!(
                "crit_multiplier must be >= 1, got {}",
                self.damage.crit_multiplier
            ));
        }

        let in_bounds = |c: GridCoord| {
            c.col >= 0
                && c.row >= 0
                && c.col < self.grid.width as i32
                && c.row < self.grid.height as i32
        };

        let mut taken = HashSet::new();
        for obstacle in &self.obstacles {
            if !in_bounds(obstacle.at) {
                return invalid(format!("obstacle at {} is outside the grid", obstacle.at));
            }
            if !taken.insert(obstacle.at) {
                return invalid(format!("two placements share tile {}", obstacle.at));
            }
        }

        let mut ids = HashSet::new();
        for unit in &self.units {
            if !ids.insert(unit.id) {
                return Err(TacticsError::DuplicateUnit(unit.id));
            }
            if unit.max_health == 0 {
                return invalid(format!("unit {} needs max_health >= 1", unit.id));
            }
            if !in_bounds(unit.at) {
                return invalid(format!("unit {} starts outside the grid at {}", unit.id, unit.at));
            }
            if !taken.insert(unit.at) {
                return invalid(format!("two placements share tile {}", unit.at));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_standard_skirmish() {
        let config = MatchConfig::default();
        assert_eq!(config.grid.width, 4);
        assert_eq!(config.grid.height, 4);
        assert!(config.combat.prevent_friendly_fire);
        assert!(config.combat.require_line_of_sight);
        assert!(!config.sight.allow_diagonal_gap);
        assert_eq!(config.damage.base, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
            seed = 7

            [grid]
            width = 6

            [[units]]
            id = 1
            team = "TeamA"
            at = { col = 0, row = 0 }

            [[units]]
            id = 2
            team = "TeamB"
            at = { col = 5, row = 3 }
            max_health = 5
            attack_range = 2

            [[obstacles]]
            at = { col = 2, row = 2 }
            kind = "HighWall"
        "#;

        let config = MatchConfig::from_toml_str(toml_str).expect("valid config");
        assert_eq!(config.seed, 7);
        assert_eq!(config.grid.width, 6);
        assert_eq!(config.grid.height, 4);
        assert_eq!(config.units.len(), 2);
        assert_eq!(config.units[0].max_health, 3);
        assert!(config.units[0].armed);
        assert_eq!(config.units[1].attack_range, 2);
        assert_eq!(config.obstacles[0].kind, ObstacleKind::HighWall);
    }

    #[test]
    fn test_rejects_zero_sized_grid() {
        let mut config = MatchConfig::default();
        config.grid.width = 0;
        assert!(matches!(config.validate(), Err(TacticsError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_oversized_grid() {
        let mut config = MatchConfig::default();
        config.grid.width = 70_000;
        config.grid.height = 70_000;
        assert!(matches!(config.validate(), Err(TacticsError::InvalidConfig(_))));

        // Each side fits, the tile count does not
        config.grid.width = MAX_GRID_DIMENSION;
        config.grid.height = MAX_GRID_DIMENSION;
        assert!(matches!(config.validate(), Err(TacticsError::InvalidConfig(_))));

        config.grid.height = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sight_tolerance_must_stay_below_half_tile() {
        let mut config = MatchConfig::default();
        config.sight.tolerance = MAX_SIGHT_TOLERANCE;
        assert!(config.validate().is_ok());

        for tolerance in [0.5, 1.0, -0.1, f32::NAN] {
            config.sight.tolerance = tolerance;
            assert!(matches!(config.validate(), Err(TacticsError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_rejects_duplicate_unit_ids() {
        let config = MatchConfig::default()
            .with_unit(UnitSpec::new(1, Team::TeamA, GridCoord::new(0, 0)))
            .with_unit(UnitSpec::new(1, Team::TeamB, GridCoord::new(1, 0)));
        assert!(matches!(config.validate(), Err(TacticsError::DuplicateUnit(UnitId(1)))));
    }

    #[test]
    fn test_rejects_shared_tile() {
        let config = MatchConfig::default()
            .with_obstacle(GridCoord::new(1, 1), ObstacleKind::LowCover)
            .with_unit(UnitSpec::new(1, Team::TeamA, GridCoord::new(1, 1)));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_bounds_unit() {
        let config =
            MatchConfig::default().with_unit(UnitSpec::new(1, Team::TeamA, GridCoord::new(4, 0)));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_crit_chance() {
        let mut config = MatchConfig::default();
        config.damage.crit_chance = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = MatchConfig::from_toml_str("grid = 5");
        assert!(matches!(result, Err(TacticsError::ConfigParse(_))));
    }
}
