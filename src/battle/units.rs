//! Units taking part in a match
//!
//! Fields are crate-visible so that only the resolvers and `MatchState` can
//! change them; callers read through accessors.

use serde::{Deserialize, Serialize};

use crate::battle::coord::GridCoord;
use crate::core::config::UnitSpec;
use crate::core::types::{Team, UnitId};

/// Offensive capability of an armed unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackProfile {
    /// Maximum step distance to a target
    pub range: u32,
    pub attacks_per_turn: u32,
}

/// Alive -> Dead, never back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitStatus {
    #[default]
    Alive,
    Dead,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub(crate) id: UnitId,
    pub(crate) team: Team,
    /// Cached copy of the grid's occupancy; last known tile once dead
    pub(crate) position: GridCoord,
    pub(crate) health: u32,
    pub(crate) max_health: u32,
    pub(crate) status: UnitStatus,
    pub(crate) attack: Option<AttackProfile>,
    pub(crate) attacks_remaining: u32,
    pub(crate) move_in_progress: bool,
}

impl Unit {
    pub fn new(id: UnitId, team: Team, position: GridCoord, max_health: u32) -> Self {
        Self {
            id,
            team,
            position,
            health: max_health,
            max_health,
            status: UnitStatus::Alive,
            attack: None,
            attacks_remaining: 0,
            move_in_progress: false,
        }
    }

    pub fn with_attack(mut self, profile: AttackProfile) -> Self {
        self.attack = Some(profile);
        self.attacks_remaining = profile.attacks_per_turn;
        self
    }

    pub fn from_spec(spec: &UnitSpec, attacks_per_turn: u32) -> Self {
        let unit = Self::new(spec.id, spec.team, spec.at, spec.max_health);
        if spec.armed {
            unit.with_attack(AttackProfile {
                range: spec.attack_range,
                attacks_per_turn,
            })
        } else {
            unit
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn team(&self) -> Team {
        self.team
    }

    pub fn position(&self) -> GridCoord {
        self.position
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn status(&self) -> UnitStatus {
        self.status
    }

    pub fn is_alive(&self) -> bool {
        self.status == UnitStatus::Alive
    }

    pub fn attacks_remaining(&self) -> u32 {
        self.attacks_remaining
    }

    pub fn is_moving(&self) -> bool {
        self.move_in_progress
    }

    /// Refill per-turn counters
    pub(crate) fn refresh(&mut self) {
        if let Some(profile) = self.attack {
            self.attacks_remaining = profile.attacks_per_turn;
        }
        self.move_in_progress = false;
    }
}
