//! Grid Tactics - rules engine for turn-based tactical combat on a small grid

pub mod battle;
pub mod core;
pub mod scenario;
