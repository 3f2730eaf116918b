//! Battle rule constants - default values for a standard skirmish

// Grid
pub const DEFAULT_GRID_WIDTH: u32 = 4;
pub const DEFAULT_GRID_HEIGHT: u32 = 4;
pub const DEFAULT_TILE_SIZE: f32 = 1.0;
pub const MAX_GRID_DIMENSION: u32 = 4096;
pub const MAX_GRID_TILES: u64 = 1 << 20;

// Units
pub const DEFAULT_MAX_HEALTH: u32 = 3;
pub const DEFAULT_ATTACK_RANGE: u32 = 1; // adjacent only
pub const DEFAULT_ATTACKS_PER_TURN: u32 = 1;

// Damage
pub const DEFAULT_BASE_DAMAGE: u32 = 1;
pub const DEFAULT_SEED: u64 = 42;

// Sight geometry (tile units)
pub const SIGHT_EPSILON: f64 = 1e-9;
/// Must stay below half a tile, or an inset wall vanishes entirely
pub const MAX_SIGHT_TOLERANCE: f32 = 0.49;
