//! Command and query facade over one match
//!
//! Callers issue `try_move` / `try_attack` and read back typed results. A
//! rejected command never changes state. Every state change is recorded as a
//! `MatchEvent`, handed to subscribers immediately and buffered until drained.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::battle::combat::{self, AttackOutcome, AttackRejection, CombatContext, RandomSource, ResolveError};
use crate::battle::coord::GridCoord;
use crate::battle::events::{EventLog, MatchEvent, MatchEventKind};
use crate::battle::grid::{BattleGrid, Occupant, Tile};
use crate::battle::match_state::{MatchOutcome, MatchState};
use crate::battle::movement::{self, MovePlan, MoveRejection};
use crate::battle::obstacles::ObstacleIndex;
use crate::battle::sight::SightResolver;
use crate::battle::turns::TurnTracker;
use crate::battle::units::Unit;
use crate::core::config::MatchConfig;
use crate::core::error::{Result, TacticsError};
use crate::core::types::{Team, TurnNumber, UnitId};

/// Why a command was refused
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("unknown unit {0}")]
    UnknownUnit(UnitId),

    #[error("the match is over")]
    MatchOver,

    #[error("it is {active:?}'s turn")]
    NotYourTurn { active: Team },

    #[error("move rejected: {0}")]
    Move(#[from] MoveRejection),

    #[error("attack rejected: {0}")]
    Attack(#[from] AttackRejection),

    #[error(transparent)]
    Engine(#[from] TacticsError),
}

impl From<ResolveError> for CommandError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Rejected(reason) => CommandError::Attack(reason),
            ResolveError::Engine(err) => CommandError::Engine(err),
        }
    }
}

pub type CommandResult<T> = std::result::Result<T, CommandError>;

type Listener = Box<dyn FnMut(&MatchEvent) + Send>;

pub struct TacticsEngine {
    config: MatchConfig,
    grid: BattleGrid,
    obstacles: ObstacleIndex,
    sight: SightResolver,
    state: MatchState,
    turns: TurnTracker,
    events: EventLog,
    rng: Box<dyn RandomSource + Send>,
    listeners: Vec<Listener>,
}

impl TacticsEngine {
    /// Build a match from a validated configuration
    pub fn new(config: MatchConfig) -> Result<Self> {
        config.validate()?;

        let mut grid = BattleGrid::from_config(&config.grid);
        let mut obstacles = ObstacleIndex::new();
        for spec in &config.obstacles {
            obstacles.register(spec.at, spec.kind)?;
            grid.occupy(spec.at, Occupant::Obstacle(spec.kind))?;
        }

        let mut state = MatchState::new();
        for spec in &config.units {
            let unit = Unit::from_spec(spec, config.combat.attacks_per_turn);
            state.add_unit(unit, &mut grid)?;
        }

        let sight = SightResolver::new(&config.sight, config.grid.width, config.grid.height);
        let turns = TurnTracker::new(config.turns.first_team);
        let mut events = EventLog::new();
        events.set_turn(turns.turn());

        tracing::info!(
            "Match created: {}x{} grid, {} units, {} obstacles, seed {}",
            config.grid.width,
            config.grid.height,
            config.units.len(),
            config.obstacles.len(),
            config.seed
        );

        Ok(Self {
            rng: Box::new(ChaCha8Rng::seed_from_u64(config.seed)),
            config,
            grid,
            obstacles,
            sight,
            state,
            turns,
            events,
            listeners: Vec::new(),
        })
    }

    /// Replace the seeded generator, e.g. with a scripted source in tests
    pub fn with_random_source<R>(mut self, rng: R) -> Self
    where
        R: RandomSource + Send + 'static,
    {
        self.rng = Box::new(rng);
        self
    }

    /// Register a callback that sees every event as it happens
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&MatchEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    // Commands

    /// Step a unit onto an adjacent tile
    pub fn try_move(&mut self, id: UnitId, destination: GridCoord) -> CommandResult<MovePlan> {
        let plan = self.can_move(id, destination).map_err(|err| {
            tracing::debug!("Move {} -> {} rejected: {}", id, destination, err);
            err
        })?;

        let unit = self.state.unit_mut(id).ok_or(CommandError::UnknownUnit(id))?;
        movement::execute_move(unit, plan, &mut self.grid, &self.config.movement)?;

        let mark = self.events.len();
        self.events.push(MatchEventKind::UnitMoved {
            unit: id,
            from: plan.from,
            to: plan.to,
        });
        self.notify(mark);
        Ok(plan)
    }

    /// Strike a target; damage, death and the win check all happen here
    pub fn try_attack(&mut self, attacker: UnitId, target: UnitId) -> CommandResult<AttackOutcome> {
        if let Err(err) = self.can_attack(attacker, target) {
            tracing::debug!("Attack {} -> {} rejected: {}", attacker, target, err);
            return Err(err);
        }

        let mark = self.events.len();
        let ctx = CombatContext {
            policy: &self.config.combat,
            sight: &self.sight,
            obstacles: &self.obstacles,
        };
        let outcome = combat::resolve_attack(
            attacker,
            target,
            &ctx,
            &self.config.damage,
            &mut self.state,
            &mut self.grid,
            &mut *self.rng,
            &mut self.events,
        )?;
        self.notify(mark);
        Ok(outcome)
    }

    /// Pass play to the other team and refill its attacks
    pub fn end_turn(&mut self) -> CommandResult<Team> {
        if self.winner().is_decided() {
            return Err(CommandError::MatchOver);
        }

        let ended = self.turns.active_team();
        let next = self.turns.advance();
        self.state.finish_all_moves();
        self.state.refresh_team(next);

        let mark = self.events.len();
        self.events.push(MatchEventKind::TurnEnded { ended, next });
        self.events.set_turn(self.turns.turn());
        self.notify(mark);

        tracing::info!("Turn {}: {:?} to act", self.turns.turn(), next);
        Ok(next)
    }

    /// The presentation layer finished animating this unit's move
    pub fn complete_move(&mut self, id: UnitId) -> CommandResult<()> {
        if self.state.finish_move(id) {
            Ok(())
        } else {
            Err(CommandError::UnknownUnit(id))
        }
    }

    /// Events recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<MatchEvent> {
        self.events.drain()
    }

    // Queries

    pub fn can_move(&self, id: UnitId, destination: GridCoord) -> CommandResult<MovePlan> {
        let unit = self.actor(id)?;
        Ok(movement::can_move(
            unit,
            destination,
            &self.grid,
            &self.obstacles,
            &self.config.movement,
        )?)
    }

    pub fn can_attack(&self, attacker: UnitId, target: UnitId) -> CommandResult<()> {
        let unit = self.actor(attacker)?;
        let target = self.state.unit(target).ok_or(CommandError::UnknownUnit(target))?;
        Ok(combat::can_attack(unit, target, &self.combat_context())?)
    }

    /// Tiles the unit may step onto now; empty if it cannot act
    pub fn valid_moves_for(&self, id: UnitId) -> Vec<GridCoord> {
        match self.actor(id) {
            Ok(unit) => movement::valid_moves(unit, &self.grid, &self.obstacles, &self.config.movement),
            Err(_) => Vec::new(),
        }
    }

    /// Units the unit may attack now, ordered by id
    pub fn valid_targets_for(&self, id: UnitId) -> Vec<UnitId> {
        let Ok(unit) = self.actor(id) else {
            return Vec::new();
        };
        let ctx = self.combat_context();
        self.state
            .units()
            .filter(|target| combat::can_attack(unit, target, &ctx).is_ok())
            .map(|target| target.id())
            .collect()
    }

    pub fn has_line_of_sight(&self, from: GridCoord, to: GridCoord) -> bool {
        self.sight.has_line_of_sight(from, to, &self.obstacles)
    }

    pub fn winner(&self) -> MatchOutcome {
        self.state.winner()
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.state.unit(id)
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.state.units()
    }

    pub fn roster(&self, team: Team) -> Vec<UnitId> {
        self.state.roster(team)
    }

    pub fn tile_at(&self, coord: GridCoord) -> Result<&Tile> {
        self.grid.tile_at(coord)
    }

    pub fn grid(&self) -> &BattleGrid {
        &self.grid
    }

    pub fn obstacles(&self) -> &ObstacleIndex {
        &self.obstacles
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn turn(&self) -> TurnNumber {
        self.turns.turn()
    }

    pub fn active_team(&self) -> Team {
        self.turns.active_team()
    }

    // Internals

    /// A unit allowed to issue a command right now
    fn actor(&self, id: UnitId) -> CommandResult<&Unit> {
        let unit = self.state.unit(id).ok_or(CommandError::UnknownUnit(id))?;
        if self.winner().is_decided() {
            return Err(CommandError::MatchOver);
        }
        if self.config.turns.enforce_turn_order && !self.turns.is_active(unit.team()) {
            return Err(CommandError::NotYourTurn {
                active: self.turns.active_team(),
            });
        }
        Ok(unit)
    }

    fn combat_context(&self) -> CombatContext<'_> {
        CombatContext {
            policy: &self.config.combat,
            sight: &self.sight,
            obstacles: &self.obstacles,
        }
    }

    /// Hand events recorded since `mark` to every listener
    fn notify(&mut self, mark: usize) {
        if self.listeners.is_empty() {
            return;
        }
        for event in &self.events.events()[mark..] {
            for listener in &mut self.listeners {
                listener(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::obstacles::ObstacleKind;
    use crate::core::config::UnitSpec;
    use std::sync::{Arc, Mutex};

    fn duel() -> MatchConfig {
        MatchConfig::default()
            .with_unit(UnitSpec::new(1, Team::TeamA, GridCoord::new(0, 0)))
            .with_unit(UnitSpec::new(2, Team::TeamB, GridCoord::new(1, 0)))
    }

    #[test]
    fn test_engine_places_units_and_obstacles() {
        let config = duel().with_obstacle(GridCoord::new(2, 2), ObstacleKind::LowCover);
        let engine = TacticsEngine::new(config).unwrap();
        assert_eq!(engine.tile_at(GridCoord::new(0, 0)).unwrap().unit(), Some(UnitId(1)));
        assert!(engine.tile_at(GridCoord::new(2, 2)).unwrap().blocks_movement());
        assert!(engine.obstacles().blocks_movement(GridCoord::new(2, 2)));
        assert_eq!(engine.winner(), MatchOutcome::Undecided);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = duel().with_unit(UnitSpec::new(3, Team::TeamA, GridCoord::new(0, 0)));
        assert!(TacticsEngine::new(config).is_err());
    }

    #[test]
    fn test_move_updates_grid_and_emits_event() {
        let mut engine = TacticsEngine::new(duel()).unwrap();
        let plan = engine.try_move(UnitId(1), GridCoord::new(0, 1)).unwrap();
        assert_eq!(plan.from, GridCoord::new(0, 0));
        assert!(engine.tile_at(GridCoord::new(0, 0)).unwrap().is_empty());
        assert_eq!(engine.unit(UnitId(1)).unwrap().position(), GridCoord::new(0, 1));

        let events = engine.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].kind, MatchEventKind::UnitMoved { .. }));
    }

    #[test]
    fn test_rejected_move_changes_nothing() {
        let mut engine = TacticsEngine::new(duel()).unwrap();
        let err = engine.try_move(UnitId(1), GridCoord::new(1, 0)).unwrap_err();
        assert!(matches!(err, CommandError::Move(MoveRejection::Occupied)));
        assert_eq!(engine.unit(UnitId(1)).unwrap().position(), GridCoord::new(0, 0));
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn test_unknown_units() {
        let mut engine = TacticsEngine::new(duel()).unwrap();
        assert!(matches!(
            engine.try_move(UnitId(9), GridCoord::new(0, 1)),
            Err(CommandError::UnknownUnit(UnitId(9)))
        ));
        assert!(matches!(
            engine.try_attack(UnitId(1), UnitId(9)),
            Err(CommandError::UnknownUnit(UnitId(9)))
        ));
        assert!(engine.valid_moves_for(UnitId(9)).is_empty());
    }

    #[test]
    fn test_staged_move_blocks_until_completed() {
        let mut config = duel();
        config.movement.prevent_overlapping_moves = true;
        let mut engine = TacticsEngine::new(config).unwrap();

        engine.try_move(UnitId(1), GridCoord::new(0, 1)).unwrap();
        assert!(matches!(
            engine.try_move(UnitId(1), GridCoord::new(0, 2)),
            Err(CommandError::Move(MoveRejection::MoveInProgress))
        ));
        engine.complete_move(UnitId(1)).unwrap();
        assert!(engine.try_move(UnitId(1), GridCoord::new(0, 2)).is_ok());
    }

    #[test]
    fn test_turn_order_enforced() {
        let mut config = duel();
        config.turns.enforce_turn_order = true;
        let mut engine = TacticsEngine::new(config).unwrap();

        assert!(matches!(
            engine.try_attack(UnitId(2), UnitId(1)),
            Err(CommandError::NotYourTurn { active: Team::TeamA })
        ));
        assert_eq!(engine.end_turn().unwrap(), Team::TeamB);
        assert_eq!(engine.turn(), 2);
        assert!(engine.try_attack(UnitId(2), UnitId(1)).is_ok());
    }

    #[test]
    fn test_end_turn_refills_attacks() {
        let mut engine = TacticsEngine::new(duel()).unwrap();
        engine.try_attack(UnitId(1), UnitId(2)).unwrap();
        assert!(matches!(
            engine.try_attack(UnitId(1), UnitId(2)),
            Err(CommandError::Attack(AttackRejection::NoAttacksLeft))
        ));
        engine.end_turn().unwrap();
        engine.end_turn().unwrap();
        assert_eq!(engine.unit(UnitId(1)).unwrap().attacks_remaining(), 1);
        assert!(engine.try_attack(UnitId(1), UnitId(2)).is_ok());
    }

    #[test]
    fn test_valid_targets() {
        let config = duel().with_unit(UnitSpec::new(3, Team::TeamB, GridCoord::new(3, 3)));
        let engine = TacticsEngine::new(config).unwrap();
        assert_eq!(engine.valid_targets_for(UnitId(1)), vec![UnitId(2)]);
        assert_eq!(
            engine.valid_moves_for(UnitId(1)),
            vec![GridCoord::new(0, 1)]
        );
    }

    #[test]
    fn test_commands_refused_after_match_ends() {
        let mut config = duel();
        config.damage.base = 5;
        let mut engine = TacticsEngine::new(config).unwrap();
        let outcome = engine.try_attack(UnitId(1), UnitId(2)).unwrap();
        assert!(outcome.killed);
        assert_eq!(engine.winner(), MatchOutcome::Victory(Team::TeamA));
        assert!(matches!(
            engine.try_move(UnitId(1), GridCoord::new(0, 1)),
            Err(CommandError::MatchOver)
        ));
        assert!(matches!(engine.end_turn(), Err(CommandError::MatchOver)));
    }

    #[test]
    fn test_subscribers_see_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut engine = TacticsEngine::new(duel()).unwrap();
        engine.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        engine.try_attack(UnitId(1), UnitId(2)).unwrap();
        engine.end_turn().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0].kind, MatchEventKind::UnitDamaged { remaining: 2, .. }));
        assert!(matches!(
            seen[1].kind,
            MatchEventKind::TurnEnded {
                ended: Team::TeamA,
                next: Team::TeamB
            }
        ));
        assert_eq!(seen[1].turn, 1);
    }

    #[test]
    fn test_seeded_matches_repeat() {
        let run = || {
            let mut config = duel();
            config.damage.variation = 1;
            config.damage.crit_chance = 0.5;
            config.damage.base = 1;
            config.units[1].max_health = 50;
            config.seed = 7;
            let mut engine = TacticsEngine::new(config).unwrap();
            let mut damage = Vec::new();
            for _ in 0..10 {
                damage.push(engine.try_attack(UnitId(1), UnitId(2)).unwrap().damage);
                engine.end_turn().unwrap();
                engine.end_turn().unwrap();
            }
            damage
        };
        assert_eq!(run(), run());
    }
}
