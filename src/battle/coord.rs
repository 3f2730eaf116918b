//! Square grid coordinates and adjacency
//!
//! Columns grow to the east, rows grow to the north. Both are 0-indexed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer (column, row) address of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct GridCoord {
    pub col: i32,
    pub row: i32,
}

impl GridCoord {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    pub fn offset(&self, dcol: i32, drow: i32) -> Self {
        Self::new(self.col + dcol, self.row + drow)
    }

    /// |dcol| + |drow|
    pub fn manhattan_distance(&self, other: &Self) -> u32 {
        self.col.abs_diff(other.col) + self.row.abs_diff(other.row)
    }

    /// max(|dcol|, |drow|)
    pub fn chebyshev_distance(&self, other: &Self) -> u32 {
        self.col.abs_diff(other.col).max(self.row.abs_diff(other.row))
    }

    pub fn is_orthogonally_adjacent(&self, other: &Self) -> bool {
        self.manhattan_distance(other) == 1
    }

    pub fn is_diagonally_adjacent(&self, other: &Self) -> bool {
        self.col.abs_diff(other.col) == 1 && self.row.abs_diff(other.row) == 1
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Compass direction on the square grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::NorthEast => (1, 1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, -1),
            Direction::South => (0, -1),
            Direction::SouthWest => (-1, -1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, 1),
        }
    }

    pub fn is_diagonal(&self) -> bool {
        let (dc, dr) = self.offset();
        dc != 0 && dr != 0
    }

    pub fn orthogonal() -> &'static [Direction] {
        const ORTHOGONAL: [Direction; 4] =
            [Direction::North, Direction::East, Direction::South, Direction::West];
        &ORTHOGONAL
    }

    pub fn all() -> &'static [Direction] {
        const ALL: [Direction; 8] = [
            Direction::North,
            Direction::NorthEast,
            Direction::East,
            Direction::SouthEast,
            Direction::South,
            Direction::SouthWest,
            Direction::West,
            Direction::NorthWest,
        ];
        &ALL
    }
}

/// Which neighbors count as one step away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AdjacencyPolicy {
    #[default]
    Orthogonal,
    OrthogonalAndDiagonal,
}

impl AdjacencyPolicy {
    pub fn from_diagonal_flag(allow_diagonal: bool) -> Self {
        if allow_diagonal {
            AdjacencyPolicy::OrthogonalAndDiagonal
        } else {
            AdjacencyPolicy::Orthogonal
        }
    }

    /// Step distance under this policy (Manhattan or Chebyshev)
    pub fn distance(&self, a: GridCoord, b: GridCoord) -> u32 {
        match self {
            AdjacencyPolicy::Orthogonal => a.manhattan_distance(&b),
            AdjacencyPolicy::OrthogonalAndDiagonal => a.chebyshev_distance(&b),
        }
    }

    pub fn is_adjacent(&self, a: GridCoord, b: GridCoord) -> bool {
        self.distance(a, b) == 1
    }

    pub fn directions(&self) -> &'static [Direction] {
        match self {
            AdjacencyPolicy::Orthogonal => Direction::orthogonal(),
            AdjacencyPolicy::OrthogonalAndDiagonal => Direction::all(),
        }
    }

    /// One-step neighbors, unbounded (callers filter by grid bounds)
    pub fn neighbors(&self, coord: GridCoord) -> Vec<GridCoord> {
        self.directions()
            .iter()
            .map(|d| {
                let (dc, dr) = d.offset();
                coord.offset(dc, dr)
            })
            .collect()
    }
}
