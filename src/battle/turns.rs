//! Turn order: teams alternate, starting with the configured side

use serde::{Deserialize, Serialize};

use crate::core::types::{Team, TurnNumber};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnTracker {
    turn: TurnNumber,
    active: Team,
}

impl TurnTracker {
    pub fn new(first: Team) -> Self {
        Self {
            turn: 1,
            active: first,
        }
    }

    pub fn turn(&self) -> TurnNumber {
        self.turn
    }

    pub fn active_team(&self) -> Team {
        self.active
    }

    pub fn is_active(&self, team: Team) -> bool {
        self.active == team
    }

    /// Hand play to the other team; returns the team now active
    pub fn advance(&mut self) -> Team {
        self.active = self.active.opponent();
        self.turn += 1;
        self.active
    }
}

impl Default for TurnTracker {
    fn default() -> Self {
        Self::new(Team::TeamA)
    }
}
