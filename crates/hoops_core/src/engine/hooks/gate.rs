//! Gate evaluation.
//!
//! `evaluate_gate` is the only place a gate is interpreted: top-level effect
//! gates, `Sequence` step gates and nested combinators all go through it.
//! Missing context (no shot at `PreGame`, no ball handler) is `Ok(false)`;
//! type errors are `Err` and the caller skips the whole effect.

use rand::Rng;

use super::types::{Comparison, DifferentialSide, Gate, HookPoint, MetaScope, MetaTarget, StreakKind};
use crate::engine::state::GameState;
use crate::error::EffectError;
use crate::models::{Agent, EntityKind, MetaKey, MetaStore, MetaValue, ShotZone, TeamSide};

/// Read access to meta values. Implemented by the store itself and by the
/// staged view an effect writes through while it runs.
pub trait MetaLookup {
    fn lookup(&self, key: &MetaKey) -> Option<&MetaValue>;
}

impl MetaLookup for MetaStore {
    fn lookup(&self, key: &MetaKey) -> Option<&MetaValue> {
        self.get(key)
    }
}

/// Read-only snapshot handed to gates and actions.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub point: HookPoint,
    pub quarter: u8,
    pub possession: Option<u32>,
    pub elam: bool,
    pub home_score: u32,
    pub away_score: u32,
    pub home_team_id: &'a str,
    pub away_team_id: &'a str,
    pub offense: Option<TeamSide>,
    pub ball_handler: Option<&'a Agent>,
    pub shooter: Option<&'a Agent>,
    pub shot_zone: Option<ShotZone>,
    /// Offense's most recent field-goal result
    pub last_shot_made: Option<bool>,
    pub make_streak: u32,
    pub miss_streak: u32,
}

impl<'a> HookContext<'a> {
    /// Game-level context (no possession in progress).
    pub fn for_game(point: HookPoint, game: &GameState<'a>) -> Self {
        Self {
            point,
            quarter: game.quarter,
            possession: None,
            elam: game.elam_active,
            home_score: game.score(TeamSide::Home),
            away_score: game.score(TeamSide::Away),
            home_team_id: &game.teams[0].team.id,
            away_team_id: &game.teams[1].team.id,
            offense: None,
            ball_handler: None,
            shooter: None,
            shot_zone: None,
            last_shot_made: None,
            make_streak: 0,
            miss_streak: 0,
        }
    }

    /// Possession-level context for `offense`.
    pub fn for_possession(point: HookPoint, game: &GameState<'a>, offense: TeamSide) -> Self {
        let team = game.team(offense);
        Self {
            possession: Some(game.possession_index),
            offense: Some(offense),
            last_shot_made: team.last_shot_made,
            make_streak: team.make_streak,
            miss_streak: team.miss_streak,
            ..Self::for_game(point, game)
        }
    }

    pub fn with_ball_handler(mut self, agent: &'a Agent) -> Self {
        self.ball_handler = Some(agent);
        self
    }

    pub fn with_shot(mut self, shooter: &'a Agent, zone: ShotZone) -> Self {
        self.shooter = Some(shooter);
        self.shot_zone = Some(zone);
        self
    }

    /// Re-read scores and the offense's streaks after the game changed.
    pub fn refresh(&mut self, game: &GameState<'_>) {
        self.home_score = game.score(TeamSide::Home);
        self.away_score = game.score(TeamSide::Away);
        if let Some(offense) = self.offense {
            let team = game.team(offense);
            self.last_shot_made = team.last_shot_made;
            self.make_streak = team.make_streak;
            self.miss_streak = team.miss_streak;
        }
    }

    pub fn score(&self, side: TeamSide) -> u32 {
        match side {
            TeamSide::Home => self.home_score,
            TeamSide::Away => self.away_score,
        }
    }

    pub fn team_id(&self, side: TeamSide) -> &'a str {
        match side {
            TeamSide::Home => self.home_team_id,
            TeamSide::Away => self.away_team_id,
        }
    }

    pub fn defense(&self) -> Option<TeamSide> {
        self.offense.map(|side| side.opponent())
    }

    /// Entity id used for game-scoped meta keys.
    pub fn game_id(&self) -> String {
        format!("{}@{}", self.away_team_id, self.home_team_id)
    }

    /// Signed lead of `side`.
    fn lead(&self, side: TeamSide) -> i64 {
        self.score(side) as i64 - self.score(side.opponent()) as i64
    }
}

/// Resolve a meta target to a concrete key. `None` when the scope has no
/// referent in this context.
pub fn resolve_meta_target(target: &MetaTarget, ctx: &HookContext<'_>) -> Option<MetaKey> {
    let (kind, id) = match &target.scope {
        MetaScope::Game => (EntityKind::Game, ctx.game_id()),
        MetaScope::Offense => (EntityKind::Team, ctx.team_id(ctx.offense?).to_string()),
        MetaScope::Defense => (EntityKind::Team, ctx.team_id(ctx.defense()?).to_string()),
        MetaScope::Home => (EntityKind::Team, ctx.home_team_id.to_string()),
        MetaScope::Away => (EntityKind::Team, ctx.away_team_id.to_string()),
        MetaScope::BallHandler => (EntityKind::Agent, ctx.ball_handler?.id.clone()),
        MetaScope::Shooter => (EntityKind::Agent, ctx.shooter?.id.clone()),
        MetaScope::Team { id } => (EntityKind::Team, id.clone()),
        MetaScope::Agent { id } => (EntityKind::Agent, id.clone()),
    };
    Some(MetaKey::new(kind, id, target.field.clone()))
}

fn compare_meta(
    key: &MetaKey,
    stored: Option<&MetaValue>,
    op: Comparison,
    expected: &MetaValue,
) -> Result<bool, EffectError> {
    let mismatch = |reason: String| EffectError::MetaTypeMismatch { key: key.to_string(), reason };

    match (stored, expected) {
        (Some(MetaValue::Text(actual)), MetaValue::Text(wanted)) => {
            if !op.is_equality() {
                return Err(mismatch(format!("ordering comparison {op:?} on text")));
            }
            Ok((actual == wanted) == matches!(op, Comparison::Eq))
        }
        (None, MetaValue::Text(wanted)) => {
            if !op.is_equality() {
                return Err(mismatch(format!("ordering comparison {op:?} on text")));
            }
            Ok(wanted.is_empty() == matches!(op, Comparison::Eq))
        }
        (Some(MetaValue::Text(_)), _) => Err(mismatch("stored text compared with a number".to_string())),
        (Some(_), MetaValue::Text(_)) => Err(mismatch("stored number compared with text".to_string())),
        (stored, expected) => {
            let lhs = stored.and_then(MetaValue::as_f64).unwrap_or(0.0);
            let rhs = expected.as_f64().unwrap_or(0.0);
            Ok(op.apply(lhs, rhs))
        }
    }
}

/// Evaluate `gate` against a context.
///
/// `All`/`Any` short-circuit in order, so a `Chance` after a failing sibling
/// consumes no draw.
pub fn evaluate_gate<M, R>(gate: &Gate, ctx: &HookContext<'_>, meta: &M, rng: &mut R) -> Result<bool, EffectError>
where
    M: MetaLookup + ?Sized,
    R: Rng + ?Sized,
{
    match gate {
        Gate::Always => Ok(true),
        Gate::Chance { probability } => Ok(rng.gen::<f64>() < probability.clamp(0.0, 1.0)),
        Gate::QuarterAtLeast { quarter } => Ok(ctx.quarter >= *quarter),
        Gate::ScoreDifferential { at_least, side } => {
            let needed = *at_least as i64;
            let passes = match side {
                DifferentialSide::Either => ctx.lead(TeamSide::Home).abs() >= needed,
                DifferentialSide::HomeLeads => ctx.lead(TeamSide::Home) >= needed,
                DifferentialSide::AwayLeads => ctx.lead(TeamSide::Away) >= needed,
                DifferentialSide::OffenseLeads => ctx.offense.map_or(false, |o| ctx.lead(o) >= needed),
                DifferentialSide::OffenseTrails => ctx.offense.map_or(false, |o| -ctx.lead(o) >= needed),
            };
            Ok(passes)
        }
        Gate::LastShot { made } => Ok(ctx.last_shot_made == Some(*made)),
        Gate::Streak { kind, at_least } => {
            if ctx.offense.is_none() {
                return Ok(false);
            }
            let streak = match kind {
                StreakKind::Makes => ctx.make_streak,
                StreakKind::Misses => ctx.miss_streak,
            };
            Ok(streak >= *at_least)
        }
        Gate::MetaCompare { target, op, value } => match resolve_meta_target(target, ctx) {
            Some(key) => compare_meta(&key, meta.lookup(&key), *op, value),
            None => Ok(false),
        },
        Gate::HandlerAttribute { attribute, op, value } => {
            Ok(ctx.ball_handler.map_or(false, |a| op.apply(a.attributes.get(*attribute) as f64, *value)))
        }
        Gate::ShotZone { zone } => Ok(ctx.shot_zone == Some(*zone)),
        Gate::InElam => Ok(ctx.elam),
        Gate::All { gates } => {
            for g in gates {
                if !evaluate_gate(g, ctx, meta, rng)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Gate::Any { gates } => {
            for g in gates {
                if evaluate_gate(g, ctx, meta, rng)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Gate::Not { gate } => Ok(!evaluate_gate(gate, ctx, meta, rng)?),
    }
}
