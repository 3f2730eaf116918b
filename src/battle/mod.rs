//! Battle rules: grid, obstacles, movement, sight, combat, and match flow
//!
//! Leaf-first: `coord` and `grid` model the board, `obstacles` and `sight`
//! answer geometric questions, `movement` and `combat` validate actions,
//! `match_state` owns health and the win condition, and `engine` ties it all
//! together behind a command/query surface.

pub mod combat;
pub mod constants;
pub mod coord;
pub mod engine;
pub mod events;
pub mod grid;
pub mod match_state;
pub mod movement;
pub mod obstacles;
pub mod sight;
pub mod turns;
pub mod units;

// Re-exports for convenient access
pub use combat::{
    can_attack, resolve_attack, roll_damage, AttackOutcome, AttackRejection, CombatContext,
    Combatant, DamageRoll, RandomSource, ResolveError,
};
pub use constants::*;
pub use coord::{AdjacencyPolicy, Direction, GridCoord};
pub use engine::{CommandError, CommandResult, TacticsEngine};
pub use events::{EventLog, MatchEvent, MatchEventKind};
pub use grid::{BattleGrid, Occupant, Tile};
pub use match_state::{DamageReport, MatchOutcome, MatchState};
pub use movement::{can_move, execute_move, valid_moves, MovePlan, MoveRejection};
pub use obstacles::{Obstacle, ObstacleIndex, ObstacleKind};
pub use sight::SightResolver;
pub use turns::TurnTracker;
pub use units::{AttackProfile, Unit, UnitStatus};
