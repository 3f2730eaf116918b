//! Battle grid: bounded tile storage, occupancy, and world mapping
//!
//! The grid is the single source of truth for who stands where. Units cache
//! their coordinate, but only `occupy`/`vacate` change occupancy.

use serde::{Deserialize, Serialize};

use crate::battle::coord::GridCoord;
use crate::battle::obstacles::ObstacleKind;
use crate::core::config::GridConfig;
use crate::core::error::{Result, TacticsError};
use crate::core::types::{UnitId, WorldPosition};

/// What holds a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occupant {
    Unit(UnitId),
    Obstacle(ObstacleKind),
}

/// A single cell of the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub coord: GridCoord,
    pub occupant: Option<Occupant>,
}

impl Tile {
    pub fn new(coord: GridCoord) -> Self {
        Self { coord, occupant: None }
    }

    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }

    pub fn unit(&self) -> Option<UnitId> {
        match self.occupant {
            Some(Occupant::Unit(id)) => Some(id),
            _ => None,
        }
    }

    pub fn blocks_movement(&self) -> bool {
        matches!(self.occupant, Some(Occupant::Obstacle(kind)) if kind.blocks_movement())
    }

    pub fn blocks_line_of_sight(&self) -> bool {
        matches!(self.occupant, Some(Occupant::Obstacle(kind)) if kind.blocks_line_of_sight())
    }
}

/// The full battle grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleGrid {
    width: u32,
    height: u32,
    tile_size: f32,
    origin: WorldPosition,
    tiles: Vec<Tile>,
}

impl BattleGrid {
    /// Create an empty grid with unit-sized tiles at the world origin
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_world_mapping(width, height, 1.0, WorldPosition::default())
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self::with_world_mapping(config.width, config.height, config.tile_size, config.origin)
    }

    fn with_world_mapping(width: u32, height: u32, tile_size: f32, origin: WorldPosition) -> Self {
        let mut tiles = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height as i32 {
            for col in 0..width as i32 {
                tiles.push(Tile::new(GridCoord::new(col, row)));
            }
        }

        Self {
            width,
            height,
            tile_size,
            origin,
            tiles,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Check if coordinate is within grid bounds
    pub fn is_valid_coordinate(&self, coord: GridCoord) -> bool {
        coord.col >= 0
            && coord.row >= 0
            && coord.col < self.width as i32
            && coord.row < self.height as i32
    }

    fn index(&self, coord: GridCoord) -> Result<usize> {
        if !self.is_valid_coordinate(coord) {
            return Err(TacticsError::OutOfBounds(coord));
        }
        Ok(coord.row as usize * self.width as usize + coord.col as usize)
    }

    pub fn tile_at(&self, coord: GridCoord) -> Result<&Tile> {
        let idx = self.index(coord)?;
        Ok(&self.tiles[idx])
    }

    pub fn occupant_at(&self, coord: GridCoord) -> Option<Occupant> {
        self.tile_at(coord).ok().and_then(|t| t.occupant)
    }

    pub fn is_occupied(&self, coord: GridCoord) -> bool {
        self.occupant_at(coord).is_some()
    }

    /// Place an occupant on an empty tile
    pub fn occupy(&mut self, coord: GridCoord, occupant: Occupant) -> Result<()> {
        let idx = self.index(coord)?;
        let tile = &mut self.tiles[idx];
        if tile.occupant.is_some() {
            return Err(TacticsError::TileOccupied(coord));
        }
        tile.occupant = Some(occupant);
        Ok(())
    }

    /// Clear a tile, returning what was on it
    pub fn vacate(&mut self, coord: GridCoord) -> Result<Occupant> {
        let idx = self.index(coord)?;
        self.tiles[idx]
            .occupant
            .take()
            .ok_or(TacticsError::TileNotOccupied(coord))
    }

    /// Move an occupant between tiles. Either both halves happen or neither.
    pub fn relocate(&mut self, from: GridCoord, to: GridCoord) -> Result<Occupant> {
        let to_idx = self.index(to)?;
        if self.tiles[to_idx].occupant.is_some() {
            return Err(TacticsError::TileOccupied(to));
        }
        let occupant = self.vacate(from)?;
        self.tiles[to_idx].occupant = Some(occupant);
        Ok(occupant)
    }

    /// World position of the tile's center
    pub fn grid_to_world(&self, coord: GridCoord) -> WorldPosition {
        WorldPosition::new(
            self.origin.x + (coord.col as f32 + 0.5) * self.tile_size,
            self.origin.y + (coord.row as f32 + 0.5) * self.tile_size,
        )
    }

    /// Tile containing a world position. May be out of bounds.
    pub fn world_to_grid(&self, position: WorldPosition) -> GridCoord {
        let local = position - self.origin;
        GridCoord::new(
            (local.x / self.tile_size).floor() as i32,
            (local.y / self.tile_size).floor() as i32,
        )
    }

    /// Every coordinate, row-major
    pub fn coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        self.tiles.iter().map(|t| t.coord)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Where a unit currently stands, according to occupancy
    pub fn find_unit(&self, id: UnitId) -> Option<GridCoord> {
        self.tiles.iter().find(|t| t.unit() == Some(id)).map(|t| t.coord)
    }
}
