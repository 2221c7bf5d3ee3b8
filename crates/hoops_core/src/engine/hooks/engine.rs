//! Hook engine: fires registered effects at a hook point.
//!
//! ## Application order
//! Effects at one point run in registration order. Each effect's meta writes
//! are committed and its `Mutation`s applied to the game as soon as it
//! completes, so the next effect's gate sees both. Probability deltas at one
//! point add up.
//!
//! An effect that hits a runtime error (meta type mismatch) is skipped as a
//! whole: none of its mutations or meta writes survive.

use fxhash::FxHashMap;
use rand::Rng;
use tracing::{debug, warn};

use super::gate::{evaluate_gate, resolve_meta_target, HookContext, MetaLookup};
use super::types::{EffectAction, HookPoint, MetaOp, RegisteredEffect, StaminaTarget, TeamTarget};
use crate::engine::state::{GameState, TeamState};
use crate::error::EffectError;
use crate::models::{MetaKey, MetaStore, MetaValue, NarrativeNote, RuleSet, TeamSide};

/// One state change requested by an effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Score { side: TeamSide, delta: i32 },
    Probability(f64),
    Stamina { target: StaminaTarget, delta: f64 },
    Narrative(String),
}

/// An effect whose gate passed, with what it asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredEffect {
    pub effect_id: String,
    pub mutations: Vec<Mutation>,
}

/// Meta view for one running effect: writes are buffered and committed only
/// if the effect completes.
struct StagedMeta<'s> {
    store: &'s MetaStore,
    writes: Vec<(MetaKey, MetaValue)>,
}

impl<'s> StagedMeta<'s> {
    fn new(store: &'s MetaStore) -> Self {
        Self { store, writes: Vec::new() }
    }

    fn write(&mut self, key: MetaKey, value: MetaValue) {
        self.writes.push((key, value));
    }

    fn into_writes(self) -> Vec<(MetaKey, MetaValue)> {
        self.writes
    }
}

impl MetaLookup for StagedMeta<'_> {
    fn lookup(&self, key: &MetaKey) -> Option<&MetaValue> {
        self.writes.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v).or_else(|| self.store.get(key))
    }
}

/// Per-game effect runner. Holds fire counts for `max_fires`.
#[derive(Debug)]
pub struct HookEngine<'a> {
    effects: &'a [RegisteredEffect],
    fire_counts: FxHashMap<&'a str, u32>,
}

impl<'a> HookEngine<'a> {
    pub fn new(effects: &'a [RegisteredEffect]) -> Self {
        Self { effects, fire_counts: FxHashMap::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn fire_count(&self, effect_id: &str) -> u32 {
        self.fire_counts.get(effect_id).copied().unwrap_or(0)
    }

    /// Effects attached to `point`, in registration order.
    pub fn effects_at(&self, point: HookPoint) -> impl Iterator<Item = &'a RegisteredEffect> {
        let effects: &'a [RegisteredEffect] = self.effects;
        effects.iter().filter(move |e| e.hook() == point)
    }

    /// Evaluate one effect against `ctx`. Returns what it asked for when its
    /// gate passed; meta writes are committed only in that case.
    pub fn fire_effect<R: Rng + ?Sized>(
        &mut self,
        effect: &'a RegisteredEffect,
        ctx: &HookContext<'_>,
        meta: &mut MetaStore,
        rng: &mut R,
    ) -> Option<FiredEffect> {
        let definition = effect.definition();
        if let Some(limit) = definition.max_fires {
            if self.fire_count(&definition.id) >= limit {
                return None;
            }
        }

        let mut staged = StagedMeta::new(meta);
        let outcome = evaluate_gate(&definition.gate, ctx, &staged, rng).and_then(|passed| {
            if !passed {
                return Ok(None);
            }
            let mut mutations = Vec::new();
            run_action(&definition.action, ctx, &mut staged, rng, &mut mutations)?;
            Ok(Some(mutations))
        });

        match outcome {
            Ok(Some(mutations)) => {
                for (key, value) in staged.into_writes() {
                    meta.set(key, value);
                }
                *self.fire_counts.entry(definition.id.as_str()).or_insert(0) += 1;
                debug!(effect = %definition.id, hook = ?ctx.point, mutations = mutations.len(), "effect fired");
                Some(FiredEffect { effect_id: definition.id.clone(), mutations })
            }
            Ok(None) => None,
            Err(err) => {
                warn!(effect = %definition.id, hook = ?ctx.point, error = %err, "effect skipped");
                None
            }
        }
    }
}

fn resolve_team(target: TeamTarget, ctx: &HookContext<'_>) -> Option<TeamSide> {
    let leader = match ctx.home_score.cmp(&ctx.away_score) {
        std::cmp::Ordering::Greater => Some(TeamSide::Home),
        std::cmp::Ordering::Less => Some(TeamSide::Away),
        std::cmp::Ordering::Equal => None,
    };
    match target {
        TeamTarget::Offense => ctx.offense,
        TeamTarget::Defense => ctx.defense(),
        TeamTarget::Home => Some(TeamSide::Home),
        TeamTarget::Away => Some(TeamSide::Away),
        TeamTarget::Leader => leader,
        TeamTarget::Trailer => leader.map(|side| side.opponent()),
    }
}

fn run_action<R: Rng + ?Sized>(
    action: &EffectAction,
    ctx: &HookContext<'_>,
    meta: &mut StagedMeta<'_>,
    rng: &mut R,
    out: &mut Vec<Mutation>,
) -> Result<(), EffectError> {
    match action {
        EffectAction::ModifyScore { team, delta } => {
            if let Some(side) = resolve_team(*team, ctx) {
                out.push(Mutation::Score { side, delta: *delta });
            }
        }
        EffectAction::ModifyProbability { delta } => out.push(Mutation::Probability(*delta)),
        EffectAction::ModifyStamina { target, delta } => out.push(Mutation::Stamina { target: *target, delta: *delta }),
        EffectAction::WriteMeta { target, op } => {
            let Some(key) = resolve_meta_target(target, ctx) else {
                return Ok(());
            };
            let next = match op {
                MetaOp::Set { value } => value.clone(),
                MetaOp::Increment { by } => MetaValue::incremented(meta.lookup(&key), *by).ok_or_else(|| {
                    EffectError::MetaTypeMismatch { key: key.to_string(), reason: "increment on text".to_string() }
                })?,
                MetaOp::Toggle => MetaValue::toggled(meta.lookup(&key)),
            };
            meta.write(key, next);
        }
        EffectAction::Narrate { text } => out.push(Mutation::Narrative(text.clone())),
        EffectAction::Sequence { steps } => {
            for step in steps {
                if evaluate_gate(&step.gate, ctx, &*meta, rng)? {
                    run_action(&step.action, ctx, meta, rng, out)?;
                }
            }
        }
    }
    Ok(())
}

/// What applying a batch of fired effects changed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AppliedMutations {
    /// Sum of probability deltas (consumed only at `PreShot`)
    pub probability_delta: f64,
    /// Net applied score change per side, indexed by `TeamSide::index`
    pub score_delta: [i32; 2],
}

/// Roster index that receives an effect's points on `team`: the shooter,
/// else the ball handler, else the first on-court agent.
fn credit_index(team: &TeamState<'_>, ctx: &HookContext<'_>) -> usize {
    [ctx.shooter, ctx.ball_handler]
        .into_iter()
        .flatten()
        .find_map(|agent| team.index_of(&agent.id))
        .or_else(|| team.on_court().first().copied())
        .unwrap_or(0)
}

fn stamina_indices(game: &GameState<'_>, ctx: &HookContext<'_>, target: StaminaTarget) -> Vec<(TeamSide, usize)> {
    let on_court = |side: TeamSide| -> Vec<(TeamSide, usize)> {
        game.team(side).on_court().into_iter().map(|i| (side, i)).collect()
    };
    let find = |agent: Option<&crate::models::Agent>| -> Vec<(TeamSide, usize)> {
        agent
            .and_then(|a| {
                [TeamSide::Home, TeamSide::Away]
                    .into_iter()
                    .find_map(|side| game.team(side).index_of(&a.id).map(|i| (side, i)))
            })
            .into_iter()
            .collect()
    };
    match target {
        StaminaTarget::BallHandler => find(ctx.ball_handler),
        StaminaTarget::Shooter => find(ctx.shooter),
        StaminaTarget::Offense => ctx.offense.map(on_court).unwrap_or_default(),
        StaminaTarget::Defense => ctx.defense().map(on_court).unwrap_or_default(),
        StaminaTarget::All => {
            let mut all = on_court(TeamSide::Home);
            all.extend(on_court(TeamSide::Away));
            all
        }
    }
}

/// Apply returned mutations to the game in order.
///
/// Score deltas go through `TeamState::apply_score_delta`, so box scores
/// stay in sync and nothing drops below zero. Narratives are appended with
/// the context's quarter and possession.
pub fn apply_mutations(
    game: &mut GameState<'_>,
    ctx: &HookContext<'_>,
    fired: &[FiredEffect],
    rules: &RuleSet,
    narratives: &mut Vec<NarrativeNote>,
) -> AppliedMutations {
    let mut applied = AppliedMutations::default();
    for effect in fired {
        for mutation in &effect.mutations {
            match mutation {
                Mutation::Score { side, delta } => {
                    let team = game.team_mut(*side);
                    let idx = credit_index(team, ctx);
                    applied.score_delta[side.index()] += team.apply_score_delta(idx, *delta);
                }
                Mutation::Probability(delta) => applied.probability_delta += delta,
                Mutation::Stamina { target, delta } => {
                    for (side, idx) in stamina_indices(game, ctx, *target) {
                        game.team_mut(side).agents[idx].adjust_stamina(*delta, rules.stamina_floor);
                    }
                }
                Mutation::Narrative(text) => narratives.push(NarrativeNote {
                    effect_id: effect.effect_id.clone(),
                    quarter: ctx.quarter,
                    possession: ctx.possession,
                    text: text.clone(),
                }),
            }
        }
    }
    applied
}

/// Result of one `HookRuntime::run`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookOutcome {
    pub applied: AppliedMutations,
    /// Ids of effects that fired, in order
    pub fired: Vec<String>,
}

/// Engine, borrowed meta store and collected narratives for one game.
pub struct HookRuntime<'e, 'm> {
    pub engine: HookEngine<'e>,
    pub meta: &'m mut MetaStore,
    pub narratives: Vec<NarrativeNote>,
}

impl<'e, 'm> HookRuntime<'e, 'm> {
    pub fn new(effects: &'e [RegisteredEffect], meta: &'m mut MetaStore) -> Self {
        Self { engine: HookEngine::new(effects), meta, narratives: Vec::new() }
    }

    /// Fire `ctx.point` and apply the result to `game`, one effect at a
    /// time: each effect is gated against scores and streaks that include
    /// every earlier effect's changes. With no effects registered this
    /// touches neither the game nor the RNG.
    pub fn run<R: Rng + ?Sized>(
        &mut self,
        ctx: &HookContext<'_>,
        game: &mut GameState<'_>,
        rules: &RuleSet,
        rng: &mut R,
    ) -> HookOutcome {
        let mut outcome = HookOutcome::default();
        if self.engine.is_empty() {
            return outcome;
        }

        let mut ctx = *ctx;
        let effects: Vec<&'e RegisteredEffect> = self.engine.effects_at(ctx.point).collect();
        for effect in effects {
            ctx.refresh(game);
            let Some(fired) = self.engine.fire_effect(effect, &ctx, self.meta, rng) else {
                continue;
            };
            let applied = apply_mutations(game, &ctx, std::slice::from_ref(&fired), rules, &mut self.narratives);
            outcome.applied.probability_delta += applied.probability_delta;
            for (total, delta) in outcome.applied.score_delta.iter_mut().zip(applied.score_delta) {
                *total += delta;
            }
            outcome.fired.push(fired.effect_id);
        }
        outcome
    }
}
