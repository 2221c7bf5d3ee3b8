//! One possession, end to end.
//!
//! ## Pipeline (fixed order)
//! ```text
//! PrePossession hook → scheme → matchups → ball handler
//!   → turnover? → shot-clock violation? → action (shoot / pass / drive)
//!   → shooter + zone → move trigger → PreShot hook → ONE roll → PostShot hook
//!   → foul + free throws → rebound (putback loops back to the shot)
//!   → assist → stamina → foul-outs → PostPossession hook
//! ```
//!
//! The fictional clock is owned by the orchestrator; this module never
//! reads or advances it.

use rand::Rng;
use tracing::debug;

use super::defense::{apply_possession_stamina, assign_matchups, contest_strength, select_scheme};
use super::hooks::{HookContext, HookPoint, HookRuntime};
use super::moves::{move_triggers, MoveContext};
use super::probability::{apply_modifiers, resolve_shot, roll, shot_probability, weighted_index};
use super::state::{AgentState, GameState, TeamState};
use crate::models::{
    Attribute, DramaFlags, FoulRecord, Matchup, PlayAction, PossessionLog, PossessionOutcome, ReboundRecord,
    RuleSet, SchemeKind, ShotRecord, ShotZone, TeamSide, TurnoverKind,
};

/// Points margin that counts as "clutch" near the Elam target.
pub const CLUTCH_MARGIN: u32 = 5;

fn ball_handler_weight(agent: &AgentState<'_>) -> f64 {
    0.6 * agent.attr(Attribute::Passing) + 0.4 * agent.attr(Attribute::Iq) + 1.0
}

fn action_weights(agent: &AgentState<'_>) -> [f64; 3] {
    [
        30.0 + 0.5 * agent.attr(Attribute::Ego) + 0.3 * agent.attr(Attribute::Scoring),
        20.0 + 0.6 * agent.attr(Attribute::Passing) + 0.2 * agent.attr(Attribute::Iq),
        15.0 + 0.5 * agent.attr(Attribute::Speed) + 0.1 * agent.attr(Attribute::ChaoticAlignment),
    ]
}

fn zone_weights(agent: &AgentState<'_>) -> [f64; 3] {
    [
        20.0 + 0.6 * agent.attr(Attribute::Speed),
        20.0 + 0.5 * agent.attr(Attribute::Iq),
        15.0 + 0.6 * agent.attr(Attribute::Scoring),
    ]
}

/// Rebounding strength (0..=100 scale, stamina-scaled).
fn rebound_strength(agent: &AgentState<'_>) -> f64 {
    (0.4 * agent.attr(Attribute::Speed) + 0.3 * agent.attr(Attribute::Iq) + 0.3 * agent.attr(Attribute::Defense))
        * agent.stamina
        + 1.0
}

fn team_rebounding(team: &TeamState<'_>) -> f64 {
    team.on_court().iter().map(|&i| rebound_strength(&team.agents[i])).sum()
}

/// Steal / bad-pass chance for the ball handler against their defender.
pub fn turnover_probability(
    handler: &AgentState<'_>,
    defender: Option<&AgentState<'_>>,
    scheme: SchemeKind,
    rules: &RuleSet,
) -> f64 {
    let defense = defender.map_or(40.0, |d| d.attr(Attribute::Defense));
    let p = rules.turnover_rate + scheme.profile().turnover_bonus + (defense - 40.0) / 1000.0
        - (handler.attr(Attribute::Passing) + handler.attr(Attribute::Iq) - 80.0) / 1000.0
        + (1.0 - handler.stamina) * 0.04;
    p.clamp(0.005, 0.5)
}

/// Shot-clock violation chance; shorter clocks raise it.
pub fn shot_clock_violation_probability(rules: &RuleSet) -> f64 {
    (rules.shot_clock_violation_rate * 15.0 / rules.shot_clock_seconds.max(1) as f64).clamp(0.0, 0.5)
}

/// Shooting-foul chance for `defender`; defenders in foul trouble back off.
pub fn foul_probability(defender: &AgentState<'_>, scheme: SchemeKind, rules: &RuleSet) -> f64 {
    let limit = rules.personal_foul_limit.max(1) as f64;
    let caution = 1.0 - (defender.fouls as f64 / limit).min(1.0) * 0.5;
    (rules.foul_rate * scheme.profile().foul_factor * caution).clamp(0.0, 1.0)
}

fn pick_weighted<R, F>(team: &TeamState<'_>, candidates: &[usize], weight: F, rng: &mut R) -> usize
where
    R: Rng + ?Sized,
    F: Fn(&AgentState<'_>) -> f64,
{
    let weights: Vec<f64> = candidates.iter().map(|&i| weight(&team.agents[i])).collect();
    candidates.get(weighted_index(&weights, rng)).copied().unwrap_or(0)
}

/// Defender guarding `attacker`, falling back to the first on-court defender.
fn defender_for(pairs: &[(usize, usize)], attacker: usize, defense: &TeamState<'_>) -> usize {
    pairs
        .iter()
        .find(|(_, a)| *a == attacker)
        .map(|(d, _)| *d)
        .or_else(|| defense.on_court().first().copied())
        .unwrap_or(0)
}

/// Run one possession for `offense`. `game.possession_index` must already
/// hold this possession's index.
pub fn simulate_possession<R: Rng + ?Sized>(
    game: &mut GameState<'_>,
    offense: TeamSide,
    rules: &RuleSet,
    hooks: &mut HookRuntime<'_, '_>,
    rng: &mut R,
) -> PossessionLog {
    let defense = offense.opponent();
    let elam = game.elam_active;
    let leader_before = game.leader();
    let mut effects_fired = Vec::new();

    // PrePossession
    let ctx = HookContext::for_possession(HookPoint::PrePossession, game, offense);
    effects_fired.extend(hooks.run(&ctx, game, rules, rng).fired);

    let scheme = select_scheme(game.team(defense), game.team(offense), rules, elam, rng);
    let pairs = assign_matchups(game.team(defense), game.team(offense), rules, rng);
    let matchups: Vec<Matchup> = pairs
        .iter()
        .map(|&(d, a)| Matchup {
            defender: game.team(defense).agents[d].agent.id.clone(),
            attacker: game.team(offense).agents[a].agent.id.clone(),
        })
        .collect();

    let court = game.team(offense).on_court();
    let handler = pick_weighted(game.team(offense), &court, ball_handler_weight, rng);
    let handler_agent = game.team(offense).agents[handler].agent;

    for side in [offense, defense] {
        for idx in game.team(side).on_court() {
            game.team_mut(side).agents[idx].line.possessions_played += 1;
        }
    }

    let mut log = PossessionLog {
        index: game.possession_index,
        quarter: game.quarter,
        elam,
        offense,
        scheme,
        matchups,
        ball_handler: handler_agent.id.clone(),
        action: None,
        passer: None,
        shots: Vec::new(),
        foul: None,
        rebounds: Vec::new(),
        assist: None,
        turnover: None,
        forced_by: None,
        outcome: PossessionOutcome::Missed,
        points: 0,
        home_score: 0,
        away_score: 0,
        clock_remaining: None,
        duration_seconds: 0,
        flags: DramaFlags::default(),
        effects_fired: Vec::new(),
    };

    let handler_defender = defender_for(&pairs, handler, game.team(defense));
    let p_turnover = turnover_probability(
        &game.team(offense).agents[handler],
        game.team(defense).agents.get(handler_defender),
        scheme,
        rules,
    );

    if roll(p_turnover, rng) {
        game.team_mut(offense).agents[handler].line.turnovers += 1;
        game.team_mut(defense).agents[handler_defender].line.steals += 1;
        log.turnover = Some(TurnoverKind::Steal);
        log.forced_by = Some(game.team(defense).agents[handler_defender].agent.id.clone());
        log.outcome = PossessionOutcome::Turnover;
    } else if roll(shot_clock_violation_probability(rules), rng) {
        game.team_mut(offense).agents[handler].line.turnovers += 1;
        log.turnover = Some(TurnoverKind::ShotClock);
        log.outcome = PossessionOutcome::Turnover;
    } else {
        resolve_shots(game, offense, rules, hooks, rng, scheme, &pairs, handler, &mut log, &mut effects_fired);
    }

    // Stamina and foul-outs
    {
        let (off_team, def_team) = game.sides_mut(offense);
        apply_possession_stamina(off_team, def_team, scheme, handler, &pairs, rules);
    }
    check_foul_outs(game.team_mut(defense), rules, &mut log);

    // PostPossession
    let ctx = HookContext::for_possession(HookPoint::PostPossession, game, offense).with_ball_handler(handler_agent);
    effects_fired.extend(hooks.run(&ctx, game, rules, rng).fired);

    log.home_score = game.score(TeamSide::Home);
    log.away_score = game.score(TeamSide::Away);
    let leader_after = game.leader();
    log.flags.lead_change = matches!((leader_before, leader_after), (Some(a), Some(b)) if a != b);
    log.flags.tie_game = leader_after.is_none() && leader_before.is_some();
    log.flags.clutch = game.near_elam_target(CLUTCH_MARGIN);
    log.effects_fired = effects_fired;

    debug!(
        index = log.index,
        quarter = log.quarter,
        offense = ?offense,
        scheme = scheme.name(),
        outcome = ?log.outcome,
        points = log.points,
        home = log.home_score,
        away = log.away_score,
        "possession"
    );
    log
}

#[allow(clippy::too_many_arguments)]
fn resolve_shots<R: Rng + ?Sized>(
    game: &mut GameState<'_>,
    offense: TeamSide,
    rules: &RuleSet,
    hooks: &mut HookRuntime<'_, '_>,
    rng: &mut R,
    scheme: SchemeKind,
    pairs: &[(usize, usize)],
    handler: usize,
    log: &mut PossessionLog,
    effects_fired: &mut Vec<String>,
) {
    let defense = offense.opponent();
    let elam = game.elam_active;
    let handler_agent = game.team(offense).agents[handler].agent;

    // Action
    let action = match weighted_index(&action_weights(&game.team(offense).agents[handler]), rng) {
        0 => PlayAction::Shoot,
        1 => PlayAction::Pass,
        _ => PlayAction::Drive,
    };
    let teammates: Vec<usize> = game.team(offense).on_court().into_iter().filter(|&i| i != handler).collect();
    let action = if action == PlayAction::Pass && teammates.is_empty() { PlayAction::Shoot } else { action };
    log.action = Some(action);

    let mut shooter = match action {
        PlayAction::Pass => {
            let receiver =
                pick_weighted(game.team(offense), &teammates, |a| a.attr(Attribute::Scoring) + 1.0, rng);
            log.passer = Some(handler_agent.id.clone());
            receiver
        }
        _ => handler,
    };
    let mut zone = match action {
        PlayAction::Drive => ShotZone::AtRim,
        _ => {
            let idx = weighted_index(&zone_weights(&game.team(offense).agents[shooter]), rng);
            ShotZone::FIELD_GOALS[idx]
        }
    };

    let home_bonus = if offense.is_home() {
        rules.home_court_advantage * game.team(TeamSide::Home).team.venue.home_court_modifier
    } else {
        0.0
    };

    let mut move_spent = !rules.moves_enabled;
    let mut putback = false;
    let mut offensive_rebounds = 0;
    let mut points = 0;

    loop {
        let shooter_agent = game.team(offense).agents[shooter].agent;
        let defender = defender_for(pairs, shooter, game.team(defense));
        let defender_id = game.team(defense).agents[defender].agent.id.clone();

        let contest = contest_strength(&game.team(defense).agents[defender], zone, scheme);
        let base = shot_probability(&game.team(offense).agents[shooter], zone, contest, rules, elam);
        let mut deltas = vec![home_bonus];

        let mut move_used = None;
        if !move_spent {
            let team = game.team(offense);
            let move_ctx = MoveContext {
                zone,
                elam,
                differential: game.differential(offense),
                last_shot_made: team.last_shot_made,
                near_target: game.near_elam_target(CLUTCH_MARGIN),
            };
            if let Some(mv) = move_triggers(&team.agents[shooter], &move_ctx, rules, rng) {
                deltas.push(mv.modifier);
                move_used = Some(mv.name.clone());
                move_spent = true;
                log.flags.move_activated = true;
                game.team_mut(offense).agents[shooter].line.moves_activated += 1;
            }
        }

        // PreShot
        let ctx = HookContext::for_possession(HookPoint::PreShot, game, offense)
            .with_ball_handler(handler_agent)
            .with_shot(shooter_agent, zone);
        let pre = hooks.run(&ctx, game, rules, rng);
        deltas.push(pre.applied.probability_delta);
        effects_fired.extend(pre.fired);

        let final_probability = apply_modifiers(base, &deltas);
        let made = resolve_shot(final_probability, rng);
        let shot_points = if made { rules.points_for(zone) } else { 0 };
        {
            let team = game.team_mut(offense);
            let line = &mut team.agents[shooter].line;
            line.field_goals_attempted += 1;
            if zone == ShotZone::ThreePoint {
                line.threes_attempted += 1;
            }
            if made {
                line.field_goals_made += 1;
                if zone == ShotZone::ThreePoint {
                    line.threes_made += 1;
                }
            }
            team.credit_points(shooter, shot_points);
            team.record_field_goal(made);
        }
        points += shot_points;
        log.shots.push(ShotRecord {
            shooter: shooter_agent.id.clone(),
            defender: defender_id.clone(),
            zone,
            base_probability: base,
            final_probability,
            move_used,
            made,
            points: shot_points,
            putback,
        });

        // PostShot
        let ctx = HookContext::for_possession(HookPoint::PostShot, game, offense)
            .with_ball_handler(handler_agent)
            .with_shot(shooter_agent, zone);
        effects_fired.extend(hooks.run(&ctx, game, rules, rng).fired);

        // Shooting foul (at most one per possession)
        if log.foul.is_none() && roll(foul_probability(&game.team(defense).agents[defender], scheme, rules), rng) {
            {
                let fouler = &mut game.team_mut(defense).agents[defender];
                fouler.fouls += 1;
                fouler.line.fouls += 1;
            }
            let attempts = if made { 1 } else { rules.free_throws_for(zone) };
            let mut made_fts = 0;
            for _ in 0..attempts {
                let p = apply_modifiers(
                    shot_probability(&game.team(offense).agents[shooter], ShotZone::FreeThrow, 0.0, rules, elam),
                    &[home_bonus],
                );
                if resolve_shot(p, rng) {
                    made_fts += 1;
                }
            }
            let ft_points = made_fts * rules.free_throw_value;
            {
                let team = game.team_mut(offense);
                let line = &mut team.agents[shooter].line;
                line.free_throws_attempted += attempts;
                line.free_throws_made += made_fts;
                team.credit_points(shooter, ft_points);
            }
            points += ft_points;
            log.flags.and_one = made;
            log.foul = Some(FoulRecord {
                fouler: defender_id,
                fouled: shooter_agent.id.clone(),
                free_throws_attempted: attempts,
                free_throws_made: made_fts,
                and_one: made,
                fouled_out: false,
            });
            break;
        }

        if made {
            if action == PlayAction::Pass && !putback {
                if let Some(passer) = game.team(offense).index_of(&handler_agent.id) {
                    game.team_mut(offense).agents[passer].line.assists += 1;
                    log.assist = Some(handler_agent.id.clone());
                }
            }
            break;
        }

        // Rebound
        let off_strength = team_rebounding(game.team(offense));
        let def_strength = team_rebounding(game.team(defense));
        let p_offensive =
            (rules.offensive_rebound_rate * off_strength / def_strength.max(1.0)).clamp(0.05, 0.6);
        let offensive = offensive_rebounds < rules.max_offensive_rebounds && roll(p_offensive, rng);
        let side = if offensive { offense } else { defense };
        let court = game.team(side).on_court();
        let rebounder = pick_weighted(game.team(side), &court, rebound_strength, rng);
        {
            let line = &mut game.team_mut(side).agents[rebounder].line;
            if offensive {
                line.offensive_rebounds += 1;
            } else {
                line.defensive_rebounds += 1;
            }
        }
        log.rebounds.push(ReboundRecord { agent: game.team(side).agents[rebounder].agent.id.clone(), offensive });

        if !offensive {
            break;
        }
        offensive_rebounds += 1;
        shooter = rebounder;
        zone = ShotZone::AtRim;
        putback = true;
    }

    log.points = points;
    log.outcome = if points > 0 { PossessionOutcome::Scored } else { PossessionOutcome::Missed };
}

/// Mark defenders at the foul limit and sub them out if the bench allows.
fn check_foul_outs(defense: &mut TeamState<'_>, rules: &RuleSet, log: &mut PossessionLog) {
    for idx in defense.on_court() {
        let agent = &mut defense.agents[idx];
        if agent.fouled_out || agent.fouls < rules.personal_foul_limit {
            continue;
        }
        agent.fouled_out = true;
        if let Some(foul) = log.foul.as_mut() {
            if foul.fouler == agent.agent.id {
                foul.fouled_out = true;
            }
        }
        if let Some(incoming) = defense.substitute(idx) {
            debug!(
                fouled_out = %defense.agents[idx].agent.id,
                incoming = %defense.agents[incoming].agent.id,
                "foul-out substitution"
            );
        }
    }
}
