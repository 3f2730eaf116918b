//! Match state: unit roster, health, death, and the win condition
//!
//! `MatchState` is the only writer of health and alive status. The outcome is
//! derived from the living rosters on demand, so it can be queried at any time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::battle::coord::GridCoord;
use crate::battle::events::{EventLog, MatchEventKind};
use crate::battle::grid::{BattleGrid, Occupant};
use crate::battle::units::{Unit, UnitStatus};
use crate::core::error::{Result, TacticsError};
use crate::core::types::{Team, UnitId};

/// Match outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MatchOutcome {
    #[default]
    Undecided,
    Victory(Team),
    Draw,
}

impl MatchOutcome {
    pub fn is_decided(&self) -> bool {
        !matches!(self, MatchOutcome::Undecided)
    }
}

/// What a single damage application did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageReport {
    pub unit: UnitId,
    pub previous_health: u32,
    pub remaining: u32,
    pub killed: bool,
    pub outcome: MatchOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct MatchState {
    units: BTreeMap<UnitId, Unit>,
    announced: bool,
}

impl MatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a living unit and claim its starting tile
    pub fn add_unit(&mut self, unit: Unit, grid: &mut BattleGrid) -> Result<()> {
        if self.units.contains_key(&unit.id) {
            return Err(TacticsError::DuplicateUnit(unit.id));
        }
        grid.occupy(unit.position, Occupant::Unit(unit.id))?;
        self.units.insert(unit.id, unit);
        Ok(())
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// All units, dead ones included, ordered by id
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Living units of a team, ordered by id
    pub fn roster(&self, team: Team) -> Vec<UnitId> {
        self.units
            .values()
            .filter(|u| u.team == team && u.is_alive())
            .map(|u| u.id)
            .collect()
    }

    /// Pure function of the rosters
    pub fn winner(&self) -> MatchOutcome {
        let a_alive = self.units.values().any(|u| u.team == Team::TeamA && u.is_alive());
        let b_alive = self.units.values().any(|u| u.team == Team::TeamB && u.is_alive());
        match (a_alive, b_alive) {
            (true, true) => MatchOutcome::Undecided,
            (true, false) => MatchOutcome::Victory(Team::TeamA),
            (false, true) => MatchOutcome::Victory(Team::TeamB),
            (false, false) => MatchOutcome::Draw,
        }
    }

    /// Reduce health, handling death and the win check
    ///
    /// Health never goes below zero. A unit reaching zero dies: it leaves the
    /// grid and its roster, and the outcome is re-evaluated.
    pub fn apply_damage(
        &mut self,
        id: UnitId,
        amount: u32,
        critical: bool,
        grid: &mut BattleGrid,
        events: &mut EventLog,
    ) -> Result<DamageReport> {
        let unit = self.units.get(&id).ok_or(TacticsError::UnitNotFound(id))?;
        if !unit.is_alive() {
            return Err(TacticsError::UnitDead(id));
        }

        let previous_health = unit.health;
        let remaining = previous_health.saturating_sub(amount);
        let at = unit.position;
        let killed = remaining == 0;

        // Nothing changes unless the whole transition can go through
        if killed {
            self.check_on_grid(id, at, grid)?;
            grid.vacate(at)?;
        }
        if let Some(unit) = self.units.get_mut(&id) {
            unit.health = remaining;
            if killed {
                unit.status = UnitStatus::Dead;
                unit.attacks_remaining = 0;
                unit.move_in_progress = false;
            }
        }

        events.push(MatchEventKind::UnitDamaged {
            unit: id,
            amount: previous_health - remaining,
            critical,
            remaining,
        });
        tracing::debug!("Unit {} took {} damage ({} -> {})", id, amount, previous_health, remaining);
        if killed {
            events.push(MatchEventKind::UnitDied { unit: id, at });
            tracing::info!("Unit {} died at {}", id, at);
        }

        let outcome = self.winner();
        if killed && outcome.is_decided() && !self.announced {
            self.announced = true;
            events.push(MatchEventKind::MatchEnded { outcome });
            tracing::info!("Match ended: {:?}", outcome);
        }

        Ok(DamageReport {
            unit: id,
            previous_health,
            remaining,
            killed,
            outcome,
        })
    }

    fn check_on_grid(&self, id: UnitId, at: GridCoord, grid: &BattleGrid) -> Result<()> {
        match grid.occupant_at(at) {
            Some(Occupant::Unit(occupant)) if occupant == id => Ok(()),
            _ => Err(TacticsError::TileNotOccupied(at)),
        }
    }

    /// Use up one attack; false if none were left
    pub(crate) fn spend_attack(&mut self, id: UnitId) -> bool {
        match self.units.get_mut(&id) {
            Some(unit) if unit.attacks_remaining > 0 => {
                unit.attacks_remaining -= 1;
                true
            }
            _ => false,
        }
    }

    /// Refill per-turn counters for every living unit of a team
    pub(crate) fn refresh_team(&mut self, team: Team) {
        for unit in self.units.values_mut().filter(|u| u.team == team && u.is_alive()) {
            unit.refresh();
        }
    }

    /// Mark a staged move as finished; false if the unit is unknown
    pub(crate) fn finish_move(&mut self, id: UnitId) -> bool {
        match self.units.get_mut(&id) {
            Some(unit) => {
                unit.move_in_progress = false;
                true
            }
            None => false,
        }
    }

    pub(crate) fn finish_all_moves(&mut self) {
        for unit in self.units.values_mut() {
            unit.move_in_progress = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duel() -> (MatchState, BattleGrid, EventLog) {
        let mut grid = BattleGrid::new(4, 4);
        let mut state = MatchState::new();
        state
            .add_unit(Unit::new(UnitId(1), Team::TeamA, GridCoord::new(0, 0), 3), &mut grid)
            .unwrap();
        state
            .add_unit(Unit::new(UnitId(2), Team::TeamB, GridCoord::new(1, 0), 3), &mut grid)
            .unwrap();
        (state, grid, EventLog::new())
    }

    #[test]
    fn test_add_unit_occupies_tile() {
        let (state, grid, _) = duel();
        assert_eq!(grid.tile_at(GridCoord::new(0, 0)).unwrap().unit(), Some(UnitId(1)));
        assert_eq!(state.roster(Team::TeamA), vec![UnitId(1)]);
        assert_eq!(state.winner(), MatchOutcome::Undecided);
    }

    #[test]
    fn test_add_unit_rejects_taken_tile_and_duplicate_id() {
        let (mut state, mut grid, _) = duel();
        let clash = Unit::new(UnitId(3), Team::TeamA, GridCoord::new(0, 0), 3);
        assert!(matches!(state.add_unit(clash, &mut grid), Err(TacticsError::TileOccupied(_))));
        let dup = Unit::new(UnitId(1), Team::TeamA, GridCoord::new(3, 3), 3);
        assert!(matches!(state.add_unit(dup, &mut grid), Err(TacticsError::DuplicateUnit(_))));
        assert!(grid.tile_at(GridCoord::new(3, 3)).unwrap().is_empty());
    }

    #[test]
    fn test_damage_reduces_health() {
        let (mut state, mut grid, mut events) = duel();
        let report = state.apply_damage(UnitId(2), 1, false, &mut grid, &mut events).unwrap();
        assert_eq!(report.previous_health, 3);
        assert_eq!(report.remaining, 2);
        assert!(!report.killed);
        assert_eq!(state.unit(UnitId(2)).unwrap().health(), 2);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_overkill_clamps_to_zero_and_kills() {
        let (mut state, mut grid, mut events) = duel();
        let report = state.apply_damage(UnitId(2), 10, false, &mut grid, &mut events).unwrap();
        assert_eq!(report.remaining, 0);
        assert!(report.killed);
        assert_eq!(report.outcome, MatchOutcome::Victory(Team::TeamA));

        let unit = state.unit(UnitId(2)).unwrap();
        assert_eq!(unit.status(), UnitStatus::Dead);
        assert!(grid.tile_at(GridCoord::new(1, 0)).unwrap().is_empty());
        assert!(state.roster(Team::TeamB).is_empty());

        let kinds: Vec<_> = events.drain().into_iter().map(|e| e.kind).collect();
        assert!(matches!(kinds[0], MatchEventKind::UnitDamaged { amount: 3, .. }));
        assert!(matches!(kinds[1], MatchEventKind::UnitDied { unit: UnitId(2), .. }));
        assert!(matches!(
            kinds[2],
            MatchEventKind::MatchEnded {
                outcome: MatchOutcome::Victory(Team::TeamA)
            }
        ));
    }

    #[test]
    fn test_dead_units_take_no_damage() {
        let (mut state, mut grid, mut events) = duel();
        state.apply_damage(UnitId(2), 3, false, &mut grid, &mut events).unwrap();
        let again = state.apply_damage(UnitId(2), 1, false, &mut grid, &mut events);
        assert!(matches!(again, Err(TacticsError::UnitDead(UnitId(2)))));
        assert_eq!(state.unit(UnitId(2)).unwrap().health(), 0);
    }

    #[test]
    fn test_failed_lethal_damage_changes_nothing() {
        let (mut state, mut grid, mut events) = duel();
        // Occupancy out of step with the roster: the kill cannot vacate the tile
        grid.vacate(GridCoord::new(1, 0)).unwrap();

        let result = state.apply_damage(UnitId(2), 5, false, &mut grid, &mut events);
        assert!(matches!(result, Err(TacticsError::TileNotOccupied(_))));

        let unit = state.unit(UnitId(2)).unwrap();
        assert_eq!(unit.health(), 3);
        assert!(unit.is_alive());
        assert!(events.is_empty());
        assert_eq!(state.winner(), MatchOutcome::Undecided);
    }

    #[test]
    fn test_unknown_unit() {
        let (mut state, mut grid, mut events) = duel();
        let result = state.apply_damage(UnitId(99), 1, false, &mut grid, &mut events);
        assert!(matches!(result, Err(TacticsError::UnitNotFound(UnitId(99)))));
    }

    #[test]
    fn test_both_rosters_empty_is_draw() {
        let (mut state, mut grid, mut events) = duel();
        state.apply_damage(UnitId(1), 3, false, &mut grid, &mut events).unwrap();
        state.apply_damage(UnitId(2), 3, false, &mut grid, &mut events).unwrap();
        assert_eq!(state.winner(), MatchOutcome::Draw);
        // Evaluation is idempotent
        assert_eq!(state.winner(), MatchOutcome::Draw);
    }

    #[test]
    fn test_match_ended_announced_once() {
        let (mut state, mut grid, mut events) = duel();
        state.apply_damage(UnitId(1), 3, false, &mut grid, &mut events).unwrap();
        state.apply_damage(UnitId(2), 3, false, &mut grid, &mut events).unwrap();
        let ended = events
            .events()
            .iter()
            .filter(|e| matches!(e.kind, MatchEventKind::MatchEnded { .. }))
            .count();
        assert_eq!(ended, 1);
    }

    #[test]
    fn test_spend_attack() {
        let mut grid = BattleGrid::new(2, 1);
        let mut state = MatchState::new();
        let unit = Unit::new(UnitId(1), Team::TeamA, GridCoord::new(0, 0), 3).with_attack(
            crate::battle::units::AttackProfile {
                range: 1,
                attacks_per_turn: 1,
            },
        );
        state.add_unit(unit, &mut grid).unwrap();
        assert!(state.spend_attack(UnitId(1)));
        assert!(!state.spend_attack(UnitId(1)));
        state.refresh_team(Team::TeamA);
        assert!(state.spend_attack(UnitId(1)));
    }
}
