use thiserror::Error;

use crate::battle::coord::GridCoord;
use crate::core::types::UnitId;

#[derive(Error, Debug)]
pub enum TacticsError {
    #[error("Coordinate out of bounds: {0}")]
    OutOfBounds(GridCoord),

    #[error("Tile already occupied: {0}")]
    TileOccupied(GridCoord),

    #[error("Tile not occupied: {0}")]
    TileNotOccupied(GridCoord),

    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("Unit is dead: {0}")]
    UnitDead(UnitId),

    #[error("Duplicate unit id: {0}")]
    DuplicateUnit(UnitId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TacticsError>;
