//! Attack validation and damage resolution
//!
//! Damage formula, in order:
//! 1. base + uniform spread in [-variation, variation]
//! 2. clamp to >= 0
//! 3. on a critical roll, multiply and round down
//!
//! Both rolls always come from the injected `RandomSource`, so a fixed seed
//! gives a fixed sequence of outcomes.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::battle::events::EventLog;
use crate::battle::grid::BattleGrid;
use crate::battle::match_state::{MatchOutcome, MatchState};
use crate::battle::obstacles::ObstacleIndex;
use crate::battle::sight::SightResolver;
use crate::battle::units::{AttackProfile, Unit};
use crate::core::config::{CombatPolicy, DamageConfig};
use crate::core::error::TacticsError;
use crate::core::types::UnitId;

/// Why an attack was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackRejection {
    #[error("attacker is dead")]
    AttackerDead,
    #[error("target is dead")]
    TargetDead,
    #[error("a unit cannot attack itself")]
    SelfTarget,
    #[error("attacker has no weapon")]
    Unarmed,
    #[error("target is on the same team")]
    FriendlyFire,
    #[error("target is out of range")]
    OutOfRange,
    #[error("line of sight is blocked")]
    Blocked,
    #[error("no attacks left this turn")]
    NoAttacksLeft,
}

/// Something that may be able to attack
pub trait Combatant {
    fn attack_profile(&self) -> Option<AttackProfile>;

    fn can_attack(&self) -> bool {
        self.attack_profile().is_some()
    }
}

impl Combatant for Unit {
    fn attack_profile(&self) -> Option<AttackProfile> {
        self.attack
    }
}

/// Source of combat randomness
pub trait RandomSource {
    /// Uniform integer in [-spread, spread]
    fn roll_spread(&mut self, spread: u32) -> i64;

    /// True with the given probability
    fn roll_chance(&mut self, chance: f32) -> bool;
}

impl<R: Rng> RandomSource for R {
    fn roll_spread(&mut self, spread: u32) -> i64 {
        if spread == 0 {
            return 0;
        }
        let spread = spread as i64;
        self.gen_range(-spread..=spread)
    }

    fn roll_chance(&mut self, chance: f32) -> bool {
        if chance <= 0.0 {
            false
        } else if chance >= 1.0 {
            true
        } else {
            self.gen_bool(chance as f64)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRoll {
    pub amount: u32,
    pub critical: bool,
}

pub fn roll_damage(config: &DamageConfig, rng: &mut dyn RandomSource) -> DamageRoll {
    let varied = (config.base as i64 + rng.roll_spread(config.variation)).max(0);
    let critical = rng.roll_chance(config.crit_chance);
    let amount = if critical {
        (varied as f64 * config.crit_multiplier as f64).floor() as i64
    } else {
        varied
    };
    DamageRoll {
        amount: amount.clamp(0, u32::MAX as i64) as u32,
        critical,
    }
}

/// Read-only collaborators an attack check needs
#[derive(Debug, Clone, Copy)]
pub struct CombatContext<'a> {
    pub policy: &'a CombatPolicy,
    pub sight: &'a SightResolver,
    pub obstacles: &'a ObstacleIndex,
}

/// Check whether `attacker` may strike `target` right now
pub fn can_attack(
    attacker: &Unit,
    target: &Unit,
    ctx: &CombatContext<'_>,
) -> Result<(), AttackRejection> {
    if !attacker.is_alive() {
        return Err(AttackRejection::AttackerDead);
    }
    if !target.is_alive() {
        return Err(AttackRejection::TargetDead);
    }
    if attacker.id == target.id {
        return Err(AttackRejection::SelfTarget);
    }
    let Some(profile) = attacker.attack_profile() else {
        return Err(AttackRejection::Unarmed);
    };
    if ctx.policy.prevent_friendly_fire && attacker.team == target.team {
        return Err(AttackRejection::FriendlyFire);
    }
    if ctx.policy.adjacency().distance(attacker.position, target.position) > profile.range {
        return Err(AttackRejection::OutOfRange);
    }
    if ctx.policy.require_line_of_sight
        && !ctx
            .sight
            .has_line_of_sight(attacker.position, target.position, ctx.obstacles)
    {
        return Err(AttackRejection::Blocked);
    }
    if attacker.attacks_remaining == 0 {
        return Err(AttackRejection::NoAttacksLeft);
    }
    Ok(())
}

/// Result of a resolved attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub attacker: UnitId,
    pub target: UnitId,
    pub damage: u32,
    pub critical: bool,
    pub target_health: u32,
    pub killed: bool,
    pub outcome: MatchOutcome,
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Rejected(#[from] AttackRejection),
    #[error(transparent)]
    Engine(#[from] TacticsError),
}

/// Validate, roll damage, apply it, then spend the attack
#[allow(clippy::too_many_arguments)]
pub fn resolve_attack(
    attacker_id: UnitId,
    target_id: UnitId,
    ctx: &CombatContext<'_>,
    damage: &DamageConfig,
    state: &mut MatchState,
    grid: &mut BattleGrid,
    rng: &mut dyn RandomSource,
    events: &mut EventLog,
) -> Result<AttackOutcome, ResolveError> {
    let attacker = state
        .unit(attacker_id)
        .ok_or(TacticsError::UnitNotFound(attacker_id))?;
    let target = state
        .unit(target_id)
        .ok_or(TacticsError::UnitNotFound(target_id))?;
    can_attack(attacker, target, ctx)?;

    let roll = roll_damage(damage, rng);
    let report = state.apply_damage(target_id, roll.amount, roll.critical, grid, events)?;
    // can_attack guaranteed an attack was left; spend it only once the hit landed
    if !state.spend_attack(attacker_id) {
        tracing::warn!("Unit {} attacked without an attack to spend", attacker_id);
    }

    tracing::debug!(
        "Unit {} hit {} for {}{} ({} left)",
        attacker_id,
        target_id,
        roll.amount,
        if roll.critical { " (critical)" } else { "" },
        report.remaining
    );

    Ok(AttackOutcome {
        attacker: attacker_id,
        target: target_id,
        damage: roll.amount,
        critical: roll.critical,
        target_health: report.remaining,
        killed: report.killed,
        outcome: report.outcome,
    })
}
