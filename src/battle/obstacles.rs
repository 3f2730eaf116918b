//! Static obstacles and the index answering "is this tile blocked?"
//!
//! Obstacles are placed during setup and never move or disappear.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::battle::coord::GridCoord;
use crate::core::error::{Result, TacticsError};

/// Obstacle category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    LowCover, // Blocks movement, shoot over it
    HighWall, // Blocks movement and sight
    Terrain,  // Blocks movement, lower profile than cover
}

impl ObstacleKind {
    pub fn blocks_movement(&self) -> bool {
        true
    }

    pub fn blocks_line_of_sight(&self) -> bool {
        matches!(self, ObstacleKind::HighWall)
    }
}

/// A placed obstacle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    pub at: GridCoord,
    pub kind: ObstacleKind,
}

/// Lookup of obstacle flags by tile
#[derive(Debug, Clone, Default)]
pub struct ObstacleIndex {
    obstacles: AHashMap<GridCoord, ObstacleKind>,
    version: u64,
}

impl ObstacleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an obstacle. One obstacle per tile.
    pub fn register(&mut self, at: GridCoord, kind: ObstacleKind) -> Result<()> {
        if self.obstacles.contains_key(&at) {
            return Err(TacticsError::TileOccupied(at));
        }
        self.obstacles.insert(at, kind);
        self.version += 1;
        Ok(())
    }

    pub fn get(&self, at: GridCoord) -> Option<Obstacle> {
        self.obstacles.get(&at).map(|&kind| Obstacle { at, kind })
    }

    pub fn blocks_movement(&self, at: GridCoord) -> bool {
        self.obstacles.get(&at).is_some_and(|k| k.blocks_movement())
    }

    pub fn blocks_line_of_sight(&self, at: GridCoord) -> bool {
        self.obstacles.get(&at).is_some_and(|k| k.blocks_line_of_sight())
    }

    /// Bumped on every layout change; sight caches key on it
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// All obstacles, ordered by coordinate
    pub fn obstacles(&self) -> Vec<Obstacle> {
        let mut all: Vec<Obstacle> =
            self.obstacles.iter().map(|(&at, &kind)| Obstacle { at, kind }).collect();
        all.sort_by_key(|o| o.at);
        all
    }
}
