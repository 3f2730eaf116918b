//! Scripted scenarios: a match configuration plus an ordered command list
//!
//! A scenario file is a `MatchConfig` TOML document with extra `[[commands]]`
//! tables:
//!
//! ```toml
//! [[units]]
//! id = 1
//! team = "TeamA"
//! at = { col = 0, row = 0 }
//!
//! [[commands]]
//! type = "attack"
//! attacker = 1
//! target = 2
//! ```
//!
//! Rejected commands are recorded and the script carries on.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::battle::combat::AttackOutcome;
use crate::battle::coord::GridCoord;
use crate::battle::engine::{CommandResult, TacticsEngine};
use crate::battle::events::MatchEvent;
use crate::battle::match_state::MatchOutcome;
use crate::battle::movement::MovePlan;
use crate::core::config::MatchConfig;
use crate::core::error::Result;
use crate::core::types::{Team, TurnNumber, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptedCommand {
    Move { unit: UnitId, to: GridCoord },
    Attack { attacker: UnitId, target: UnitId },
    EndTurn,
    CompleteMove { unit: UnitId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(flatten)]
    pub config: MatchConfig,
    #[serde(default)]
    pub commands: Vec<ScriptedCommand>,
}

/// What one scripted command did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepResult {
    Moved(MovePlan),
    Attacked(AttackOutcome),
    TurnEnded { next: Team },
    MoveCompleted,
    Rejected { reason: String },
}

impl StepResult {
    pub fn is_rejected(&self) -> bool {
        matches!(self, StepResult::Rejected { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub command: ScriptedCommand,
    pub result: StepResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub steps: Vec<StepRecord>,
    pub winner: MatchOutcome,
    pub final_turn: TurnNumber,
    /// (unit, remaining health) for every unit still alive
    pub survivors: Vec<(UnitId, u32)>,
    pub events: Vec<MatchEvent>,
}

impl ScenarioReport {
    pub fn rejected(&self) -> usize {
        self.steps.iter().filter(|s| s.result.is_rejected()).count()
    }
}

impl Scenario {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            commands: Vec::new(),
        }
    }

    pub fn with_command(mut self, command: ScriptedCommand) -> Self {
        self.commands.push(command);
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content)?;
        scenario.config.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Play the script against a fresh engine
    pub fn run(&self) -> Result<ScenarioReport> {
        let mut engine = TacticsEngine::new(self.config.clone())?;
        let mut steps = Vec::with_capacity(self.commands.len());
        let mut events = Vec::new();

        for &command in &self.commands {
            let result = apply(&mut engine, command);
            if let StepResult::Rejected { reason } = &result {
                tracing::warn!("Scripted {:?} rejected: {}", command, reason);
            }
            events.extend(engine.drain_events());
            steps.push(StepRecord { command, result });
        }

        let survivors = engine
            .units()
            .filter(|u| u.is_alive())
            .map(|u| (u.id(), u.health()))
            .collect();

        Ok(ScenarioReport {
            steps,
            winner: engine.winner(),
            final_turn: engine.turn(),
            survivors,
            events,
        })
    }
}

fn apply(engine: &mut TacticsEngine, command: ScriptedCommand) -> StepResult {
    let result: CommandResult<StepResult> = match command {
        ScriptedCommand::Move { unit, to } => engine.try_move(unit, to).map(StepResult::Moved),
        ScriptedCommand::Attack { attacker, target } => {
            engine.try_attack(attacker, target).map(StepResult::Attacked)
        }
        ScriptedCommand::EndTurn => engine.end_turn().map(|next| StepResult::TurnEnded { next }),
        ScriptedCommand::CompleteMove { unit } => {
            engine.complete_move(unit).map(|_| StepResult::MoveCompleted)
        }
    };
    result.unwrap_or_else(|err| StepResult::Rejected {
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::UnitSpec;

    const DUEL: &str = r#"
seed = 3

[combat]
attacks_per_turn = 3

[[units]]
id = 1
team = "TeamA"
at = { col = 0, row = 0 }

[[units]]
id = 2
team = "TeamB"
at = { col = 1, row = 0 }

[[commands]]
type = "move"
unit = 1
to = { col = 1, row = 0 }

[[commands]]
type = "attack"
attacker = 1
target = 2

[[commands]]
type = "attack"
attacker = 1
target = 2

[[commands]]
type = "attack"
attacker = 1
target = 2

[[commands]]
type = "end_turn"
"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_toml_str(DUEL).unwrap();
        assert_eq!(scenario.config.seed, 3);
        assert_eq!(scenario.config.units.len(), 2);
        assert_eq!(scenario.commands.len(), 5);
        assert_eq!(
            scenario.commands[0],
            ScriptedCommand::Move {
                unit: UnitId(1),
                to: GridCoord::new(1, 0)
            }
        );
        assert_eq!(scenario.commands[4], ScriptedCommand::EndTurn);
    }

    #[test]
    fn test_run_duel_to_victory() {
        let report = Scenario::from_toml_str(DUEL).unwrap().run().unwrap();
        assert_eq!(report.steps.len(), 5);
        assert!(report.steps[0].result.is_rejected());
        assert!(matches!(
            report.steps[3].result,
            StepResult::Attacked(AttackOutcome { killed: true, .. })
        ));
        // Match is over, so ending the turn is refused
        assert!(report.steps[4].result.is_rejected());
        assert_eq!(report.rejected(), 2);
        assert_eq!(report.winner, MatchOutcome::Victory(Team::TeamA));
        assert_eq!(report.survivors, vec![(UnitId(1), 3)]);
    }

    #[test]
    fn test_invalid_scenario_config() {
        let bad = "[grid]\nwidth = 0\n";
        assert!(Scenario::from_toml_str(bad).is_err());
    }

    #[test]
    fn test_built_scenario_runs() {
        let config = MatchConfig::default()
            .with_unit(UnitSpec::new(1, Team::TeamA, GridCoord::new(0, 0)))
            .with_unit(UnitSpec::new(2, Team::TeamB, GridCoord::new(3, 3)));
        let report = Scenario::new(config)
            .with_command(ScriptedCommand::Move {
                unit: UnitId(1),
                to: GridCoord::new(0, 1),
            })
            .with_command(ScriptedCommand::EndTurn)
            .run()
            .unwrap();
        assert_eq!(report.rejected(), 0);
        assert_eq!(report.final_turn, 2);
        assert_eq!(report.events.len(), 2);
        assert_eq!(report.winner, MatchOutcome::Undecided);
    }
}
