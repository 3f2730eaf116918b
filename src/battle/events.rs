//! Notifications for the presentation layer
//!
//! The engine never waits on listeners; events are recorded and handed out.

use serde::{Deserialize, Serialize};

use crate::battle::coord::GridCoord;
use crate::battle::match_state::MatchOutcome;
use crate::core::types::{Team, TurnNumber, UnitId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub turn: TurnNumber,
    pub kind: MatchEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchEventKind {
    UnitMoved {
        unit: UnitId,
        from: GridCoord,
        to: GridCoord,
    },
    UnitDamaged {
        unit: UnitId,
        amount: u32,
        critical: bool,
        remaining: u32,
    },
    UnitDied {
        unit: UnitId,
        at: GridCoord,
    },
    MatchEnded {
        outcome: MatchOutcome,
    },
    TurnEnded {
        ended: Team,
        next: Team,
    },
}

/// Buffered events since the last drain
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<MatchEvent>,
    turn: TurnNumber,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn stamped onto subsequent events
    pub fn set_turn(&mut self, turn: TurnNumber) {
        self.turn = turn;
    }

    pub fn push(&mut self, kind: MatchEventKind) {
        self.events.push(MatchEvent {
            turn: self.turn,
            kind,
        });
    }

    pub fn events(&self) -> &[MatchEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<MatchEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_stamps_turn() {
        let mut log = EventLog::new();
        log.set_turn(3);
        log.push(MatchEventKind::UnitDied {
            unit: UnitId(1),
            at: GridCoord::new(0, 0),
        });
        assert_eq!(log.len(), 1);
        assert_eq!(log.events()[0].turn, 3);
    }

    #[test]
    fn test_drain_empties() {
        let mut log = EventLog::new();
        log.push(MatchEventKind::MatchEnded {
            outcome: MatchOutcome::Draw,
        });
        let drained = log.drain();
        assert_eq!(drained.len(), 1);
        assert!(log.is_empty());
    }
}
