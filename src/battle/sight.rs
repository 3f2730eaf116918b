//! Line of sight between tiles
//!
//! Strict mode traces one ray between tile centers. It is blocked when it
//! passes through the interior of a sight-blocking tile (shrunk on every side
//! by the tolerance), or when it squeezes through a lattice point with opaque
//! tiles on both sides.
//!
//! With diagonal gaps allowed, sight also exists if any ray between the
//! sample points (center and four corners) of the two tiles is clear, and a
//! squeeze between two diagonally touching blockers no longer blocks. Two
//! blockers sharing an edge always form a solid barrier, and the area outside
//! the grid counts as opaque for squeezes.

use ahash::AHashMap;
use std::sync::RwLock;

use crate::battle::constants::{MAX_SIGHT_TOLERANCE, SIGHT_EPSILON};
use crate::battle::coord::GridCoord;
use crate::battle::obstacles::ObstacleIndex;
use crate::core::config::SightConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f64,
    y: f64,
}

impl Point {
    fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn center(coord: GridCoord) -> Self {
        Self::new(coord.col as f64 + 0.5, coord.row as f64 + 0.5)
    }

    fn samples(coord: GridCoord) -> [Point; 5] {
        let (x, y) = (coord.col as f64, coord.row as f64);
        [
            Self::center(coord),
            Self::new(x, y),
            Self::new(x + 1.0, y),
            Self::new(x, y + 1.0),
            Self::new(x + 1.0, y + 1.0),
        ]
    }
}

fn is_integral(v: f64) -> bool {
    (v - v.round()).abs() < SIGHT_EPSILON
}

/// Segment between two points in tile units
#[derive(Debug, Clone, Copy)]
struct Ray {
    a: Point,
    b: Point,
}

impl Ray {
    fn dx(&self) -> f64 {
        self.b.x - self.a.x
    }

    fn dy(&self) -> f64 {
        self.b.y - self.a.y
    }

    fn length_sq(&self) -> f64 {
        self.dx() * self.dx() + self.dy() * self.dy()
    }

    /// Does the ray pass through the open interior of the tile, inset by `inset`?
    fn crosses_interior(&self, tile: GridCoord, inset: f64) -> bool {
        let lo_x = tile.col as f64 + inset;
        let hi_x = tile.col as f64 + 1.0 - inset;
        let lo_y = tile.row as f64 + inset;
        let hi_y = tile.row as f64 + 1.0 - inset;
        if hi_x - lo_x <= SIGHT_EPSILON {
            return false;
        }

        let mut t_enter = 0.0_f64;
        let mut t_exit = 1.0_f64;
        for (start, delta, lo, hi) in [
            (self.a.x, self.dx(), lo_x, hi_x),
            (self.a.y, self.dy(), lo_y, hi_y),
        ] {
            if delta.abs() < SIGHT_EPSILON {
                if start <= lo + SIGHT_EPSILON || start >= hi - SIGHT_EPSILON {
                    return false;
                }
            } else {
                let t1 = (lo - start) / delta;
                let t2 = (hi - start) / delta;
                t_enter = t_enter.max(t1.min(t2));
                t_exit = t_exit.min(t1.max(t2));
            }
        }
        t_exit - t_enter > SIGHT_EPSILON
    }

    /// Does an axis-aligned ray run along an edge with opaque tiles on both sides?
    fn runs_along_seam(&self, opaque: &impl Fn(GridCoord) -> bool) -> bool {
        let horizontal = self.dy().abs() < SIGHT_EPSILON && is_integral(self.a.y);
        let vertical = self.dx().abs() < SIGHT_EPSILON && is_integral(self.a.x);

        if horizontal {
            let k = self.a.y.round() as i32;
            let (lo, hi) = (self.a.x.min(self.b.x), self.a.x.max(self.b.x));
            if seam_blocked(lo, hi, |i| (GridCoord::new(i, k - 1), GridCoord::new(i, k)), opaque) {
                return true;
            }
        }
        if vertical {
            let k = self.a.x.round() as i32;
            let (lo, hi) = (self.a.y.min(self.b.y), self.a.y.max(self.b.y));
            if seam_blocked(lo, hi, |i| (GridCoord::new(k - 1, i), GridCoord::new(k, i)), opaque) {
                return true;
            }
        }
        false
    }

    /// Does the ray pass a lattice point (within `reach`) between opaque tiles
    /// on opposite sides?
    fn squeezes_through(
        &self,
        reach: f64,
        allow_diagonal_gap: bool,
        opaque: &impl Fn(GridCoord) -> bool,
    ) -> bool {
        let len_sq = self.length_sq();
        if len_sq < SIGHT_EPSILON {
            return false;
        }
        let len = len_sq.sqrt();
        let (dx, dy) = (self.dx(), self.dy());

        let min_x = (self.a.x.min(self.b.x) - reach).ceil() as i32;
        let max_x = (self.a.x.max(self.b.x) + reach).floor() as i32;
        let min_y = (self.a.y.min(self.b.y) - reach).ceil() as i32;
        let max_y = (self.a.y.max(self.b.y) + reach).floor() as i32;

        for px in min_x..=max_x {
            for py in min_y..=max_y {
                let p = Point::new(px as f64, py as f64);
                let t = ((p.x - self.a.x) * dx + (p.y - self.a.y) * dy) / len_sq;
                if t <= SIGHT_EPSILON || t >= 1.0 - SIGHT_EPSILON {
                    continue;
                }
                let closest = Point::new(self.a.x + dx * t, self.a.y + dy * t);
                let dist = ((p.x - closest.x).powi(2) + (p.y - closest.y).powi(2)).sqrt();
                if dist > reach {
                    continue;
                }

                let mut left = Vec::with_capacity(4);
                let mut right = Vec::with_capacity(4);
                for tile in [
                    GridCoord::new(px - 1, py - 1),
                    GridCoord::new(px, py - 1),
                    GridCoord::new(px - 1, py),
                    GridCoord::new(px, py),
                ] {
                    if !opaque(tile) {
                        continue;
                    }
                    let c = Point::center(tile);
                    let side = (dx * (c.y - self.a.y) - dy * (c.x - self.a.x)) / len;
                    if side > SIGHT_EPSILON {
                        left.push(tile);
                    } else if side < -SIGHT_EPSILON {
                        right.push(tile);
                    }
                }

                for l in &left {
                    for r in &right {
                        if l.is_orthogonally_adjacent(r) || !allow_diagonal_gap {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }
}

/// Walk the unit edges of a seam between `lo` and `hi`
fn seam_blocked(
    lo: f64,
    hi: f64,
    sides: impl Fn(i32) -> (GridCoord, GridCoord),
    opaque: &impl Fn(GridCoord) -> bool,
) -> bool {
    let mut i = lo.floor() as i32;
    while (i as f64) < hi - SIGHT_EPSILON {
        let overlap = hi.min(i as f64 + 1.0) - lo.max(i as f64);
        if overlap > SIGHT_EPSILON {
            let (below, above) = sides(i);
            if opaque(below) && opaque(above) {
                return true;
            }
        }
        i += 1;
    }
    false
}

#[derive(Debug, Default)]
struct SightCache {
    layout_version: u64,
    entries: AHashMap<(GridCoord, GridCoord), bool>,
}

/// Answers line-of-sight queries for one match
#[derive(Debug)]
pub struct SightResolver {
    width: u32,
    height: u32,
    tolerance: f64,
    allow_diagonal_gap: bool,
    cache: Option<RwLock<SightCache>>,
}

impl SightResolver {
    pub fn new(config: &SightConfig, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tolerance: config.tolerance.max(0.0).min(MAX_SIGHT_TOLERANCE) as f64,
            allow_diagonal_gap: config.allow_diagonal_gap,
            cache: config.cache.then(|| RwLock::new(SightCache::default())),
        }
    }

    fn in_bounds(&self, coord: GridCoord) -> bool {
        coord.col >= 0
            && coord.row >= 0
            && coord.col < self.width as i32
            && coord.row < self.height as i32
    }

    /// Is the straight line between the two tiles unobstructed?
    ///
    /// Symmetric in its arguments. Out-of-bounds endpoints never see anything.
    pub fn has_line_of_sight(
        &self,
        from: GridCoord,
        to: GridCoord,
        obstacles: &ObstacleIndex,
    ) -> bool {
        if !self.in_bounds(from) || !self.in_bounds(to) {
            return false;
        }
        if from == to {
            return true;
        }

        let key = if from <= to { (from, to) } else { (to, from) };
        let version = obstacles.version();

        if let Some(cache) = &self.cache {
            if let Ok(cache) = cache.read() {
                if cache.layout_version == version {
                    if let Some(&visible) = cache.entries.get(&key) {
                        return visible;
                    }
                }
            }
        }

        let visible = self.trace(key.0, key.1, obstacles);

        if let Some(cache) = &self.cache {
            if let Ok(mut cache) = cache.write() {
                if cache.layout_version != version {
                    cache.entries.clear();
                    cache.layout_version = version;
                }
                cache.entries.insert(key, visible);
            }
        }

        visible
    }

    fn trace(&self, from: GridCoord, to: GridCoord, obstacles: &ObstacleIndex) -> bool {
        let (min_col, max_col) = (from.col.min(to.col), from.col.max(to.col));
        let (min_row, max_row) = (from.row.min(to.row), from.row.max(to.row));

        // Only tiles inside the bounding box of the two tiles can touch the ray
        let mut blockers = Vec::new();
        for col in min_col..=max_col {
            for row in min_row..=max_row {
                let c = GridCoord::new(col, row);
                if c != from && c != to && obstacles.blocks_line_of_sight(c) {
                    blockers.push(c);
                }
            }
        }

        let opaque = |c: GridCoord| {
            !self.in_bounds(c) || (c != from && c != to && obstacles.blocks_line_of_sight(c))
        };

        if self.allow_diagonal_gap {
            Point::samples(from).iter().any(|&a| {
                Point::samples(to)
                    .iter()
                    .any(|&b| self.ray_clear(Ray { a, b }, &blockers, &opaque))
            })
        } else {
            let ray = Ray {
                a: Point::center(from),
                b: Point::center(to),
            };
            self.ray_clear(ray, &blockers, &opaque)
        }
    }

    fn ray_clear(
        &self,
        ray: Ray,
        blockers: &[GridCoord],
        opaque: &impl Fn(GridCoord) -> bool,
    ) -> bool {
        if blockers.iter().any(|&b| ray.crosses_interior(b, self.tolerance)) {
            return false;
        }
        if ray.runs_along_seam(opaque) {
            return false;
        }
        !ray.squeezes_through(self.tolerance + SIGHT_EPSILON, self.allow_diagonal_gap, opaque)
    }
}
