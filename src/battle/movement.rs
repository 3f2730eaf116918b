//! Single-step movement legality and execution
//!
//! Validation runs in a fixed order and stops at the first failure, so the
//! reason a caller gets back is always the most fundamental one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::battle::coord::GridCoord;
use crate::battle::grid::{BattleGrid, Occupant};
use crate::battle::obstacles::ObstacleIndex;
use crate::battle::units::Unit;
use crate::core::config::MovementPolicy;
use crate::core::error::{Result, TacticsError};
use crate::core::types::UnitId;

/// Why a move was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveRejection {
    #[error("unit is dead")]
    UnitDead,
    #[error("destination is outside the grid")]
    OutOfBounds,
    #[error("unit is already there")]
    AlreadyThere,
    #[error("destination is not one step away")]
    NotAdjacent,
    #[error("destination is blocked")]
    Blocked,
    #[error("destination is occupied")]
    Occupied,
    #[error("unit is still moving")]
    MoveInProgress,
}

/// A validated move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePlan {
    pub unit: UnitId,
    pub from: GridCoord,
    pub to: GridCoord,
}

/// Check whether `unit` may step onto `destination`
pub fn can_move(
    unit: &Unit,
    destination: GridCoord,
    grid: &BattleGrid,
    obstacles: &ObstacleIndex,
    policy: &MovementPolicy,
) -> std::result::Result<MovePlan, MoveRejection> {
    if !unit.is_alive() {
        return Err(MoveRejection::UnitDead);
    }
    if !grid.is_valid_coordinate(destination) {
        return Err(MoveRejection::OutOfBounds);
    }
    if destination == unit.position {
        return Err(MoveRejection::AlreadyThere);
    }
    if !policy.adjacency().is_adjacent(unit.position, destination) {
        return Err(MoveRejection::NotAdjacent);
    }
    if obstacles.blocks_movement(destination) {
        return Err(MoveRejection::Blocked);
    }
    match grid.occupant_at(destination) {
        Some(Occupant::Obstacle(_)) => return Err(MoveRejection::Blocked),
        Some(Occupant::Unit(_)) => return Err(MoveRejection::Occupied),
        None => {}
    }
    if policy.prevent_overlapping_moves && unit.move_in_progress {
        return Err(MoveRejection::MoveInProgress);
    }

    Ok(MovePlan {
        unit: unit.id,
        from: unit.position,
        to: destination,
    })
}

/// Apply a validated plan: vacate, occupy, update the cached position
pub fn execute_move(
    unit: &mut Unit,
    plan: MovePlan,
    grid: &mut BattleGrid,
    policy: &MovementPolicy,
) -> Result<()> {
    if plan.unit != unit.id || plan.from != unit.position {
        return Err(TacticsError::TileNotOccupied(plan.from));
    }

    grid.relocate(plan.from, plan.to)?;
    unit.position = plan.to;
    if policy.prevent_overlapping_moves {
        unit.move_in_progress = true;
    }

    tracing::debug!("Unit {} moved {} -> {}", unit.id, plan.from, plan.to);
    Ok(())
}

/// Every tile the unit could step onto right now, ordered by coordinate
pub fn valid_moves(
    unit: &Unit,
    grid: &BattleGrid,
    obstacles: &ObstacleIndex,
    policy: &MovementPolicy,
) -> Vec<GridCoord> {
    let mut moves: Vec<GridCoord> = policy
        .adjacency()
        .neighbors(unit.position)
        .into_iter()
        .filter(|&dest| can_move(unit, dest, grid, obstacles, policy).is_ok())
        .collect();
    moves.sort();
    moves
}
