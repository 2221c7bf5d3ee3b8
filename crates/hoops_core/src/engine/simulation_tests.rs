//! Whole-game scenarios: determinism, box-score integrity, termination and
//! balance over many seeds.

use serde_json::json;
use sha2::{Digest, Sha256};

use super::game::{simulate_game, simulate_game_with_effects};
use super::hooks::{
    EffectAction, EffectDefinition, EffectRegistry, Gate, HookPoint, MetaOp, MetaScope, MetaTarget,
    RegisteredEffect, TeamTarget,
};
use crate::error::EffectError;
use crate::models::{
    Agent, Attribute, Attributes, GameResult, MetaField, MetaKey, MetaStore, MetaValue, Move, RuleSet,
    ShotZone, Team, TeamSide,
};

fn roster(id: &str, attrs: Attributes) -> Team {
    Team::new(
        id,
        format!("{id} club"),
        (0..4).map(|i| Agent::new(format!("{id}-{i}"), format!("{id} #{i}"), attrs.clone())).collect(),
    )
}

fn median_pair() -> (Team, Team) {
    (roster("home", Attributes::default()), roster("away", Attributes::default()))
}

/// Move `amount` points from one attribute to another, keeping the budget.
fn shifted(mut attrs: Attributes, up: Attribute, down: Attribute, amount: u8) -> Attributes {
    let bump = |attrs: &mut Attributes, attribute: Attribute, f: &dyn Fn(u8) -> u8| match attribute {
        Attribute::Scoring => attrs.scoring = f(attrs.scoring),
        Attribute::Passing => attrs.passing = f(attrs.passing),
        Attribute::Defense => attrs.defense = f(attrs.defense),
        Attribute::Speed => attrs.speed = f(attrs.speed),
        Attribute::Stamina => attrs.stamina = f(attrs.stamina),
        Attribute::Iq => attrs.iq = f(attrs.iq),
        Attribute::Ego => attrs.ego = f(attrs.ego),
        Attribute::ChaoticAlignment => attrs.chaotic_alignment = f(attrs.chaotic_alignment),
        Attribute::Fate => attrs.fate = f(attrs.fate),
    };
    bump(&mut attrs, up, &|v| v + amount);
    bump(&mut attrs, down, &|v| v - amount);
    attrs
}

/// Mixed rosters with moves, so every subsystem is exercised.
fn featured_pair() -> (Team, Team) {
    let mut home = roster("home", Attributes::default());
    home.agents[0].attributes = shifted(Attributes::default(), Attribute::Scoring, Attribute::Ego, 40);
    home.agents[0] = home.agents[0]
        .clone()
        .with_move(Move::new("Heat Check", Attribute::Scoring, 70, 0.08).for_zone(ShotZone::ThreePoint).with_chance(0.5));
    home.agents[1].attributes = shifted(Attributes::default(), Attribute::Passing, Attribute::ChaoticAlignment, 35);

    let mut away = roster("away", Attributes::default());
    away.agents[0].attributes = shifted(Attributes::default(), Attribute::Defense, Attribute::Fate, 40);
    away.agents[2].attributes = shifted(Attributes::default(), Attribute::Speed, Attribute::Fate, 40);
    away.agents[3].attributes = shifted(Attributes::default(), Attribute::Stamina, Attribute::Ego, 30);
    (home, away)
}

fn digest(result: &GameResult) -> Vec<u8> {
    let bytes = serde_json::to_vec(result).unwrap();
    Sha256::digest(&bytes).to_vec()
}

fn registered(definitions: Vec<EffectDefinition>) -> Vec<RegisteredEffect> {
    let mut registry = EffectRegistry::new();
    for definition in definitions {
        registry.register(definition).unwrap();
    }
    registry.into_effects()
}

fn assert_box_matches_score(result: &GameResult) {
    assert_eq!(result.box_points(TeamSide::Home), result.home_score, "home box mismatch");
    assert_eq!(result.box_points(TeamSide::Away), result.away_score, "away box mismatch");
}

#[test]
fn test_same_seed_same_bytes() {
    let (home, away) = featured_pair();
    let rules = RuleSet::default();
    let a = simulate_game(&home, &away, &rules, 42).unwrap();
    let b = simulate_game(&home, &away, &rules, 42).unwrap();
    assert_eq!(digest(&a), digest(&b));

    let c = simulate_game(&home, &away, &rules, 43).unwrap();
    assert_ne!(digest(&a), digest(&c));
}

#[test]
fn test_determinism_with_effects_and_meta() {
    let (home, away) = featured_pair();
    let rules = RuleSet::default();
    let effects = registered(vec![
        EffectDefinition::new(
            "momentum",
            HookPoint::PostShot,
            EffectAction::WriteMeta {
                target: MetaTarget { scope: MetaScope::Offense, field: MetaField::Momentum },
                op: MetaOp::Increment { by: 1.0 },
            },
        )
        .with_gate(Gate::LastShot { made: true }),
        EffectDefinition::new("coin", HookPoint::PrePossession, EffectAction::ModifyProbability { delta: 0.02 })
            .with_gate(Gate::Chance { probability: 0.5 }),
    ]);

    let run = || {
        let mut meta = MetaStore::new();
        meta.set(MetaKey::team("home", MetaField::Morale), MetaValue::Int(3));
        let result = simulate_game_with_effects(&home, &away, &rules, 7, &effects, &mut meta).unwrap();
        (digest(&result), serde_json::to_vec(&meta).unwrap())
    };
    assert_eq!(run(), run());
}

#[test]
fn test_no_effects_matches_empty_effects() {
    let (home, away) = featured_pair();
    let rules = RuleSet::default();
    let plain = simulate_game(&home, &away, &rules, 11).unwrap();
    let mut meta = MetaStore::new();
    let empty = simulate_game_with_effects(&home, &away, &rules, 11, &[], &mut meta).unwrap();
    assert_eq!(digest(&plain), digest(&empty));
    assert!(meta.is_empty());

    // A deterministic gate that never passes draws nothing either.
    let dormant = registered(vec![EffectDefinition::new(
        "dormant",
        HookPoint::PreShot,
        EffectAction::ModifyProbability { delta: 0.5 },
    )
    .with_gate(Gate::QuarterAtLeast { quarter: 9 })]);
    let mut meta = MetaStore::new();
    let quiet = simulate_game_with_effects(&home, &away, &rules, 11, &dormant, &mut meta).unwrap();
    assert_eq!(digest(&plain), digest(&quiet));
}

#[test]
fn test_box_scores_sum_to_team_scores() {
    let (home, away) = featured_pair();
    let rules = RuleSet::default();
    let effects = registered(vec![
        EffectDefinition::new("bonus", HookPoint::PostPossession, EffectAction::ModifyScore {
            team: TeamTarget::Trailer,
            delta: 2,
        })
        .with_gate(Gate::ScoreDifferential { at_least: 8, side: Default::default() }),
        EffectDefinition::new("tax", HookPoint::QuarterEnd, EffectAction::ModifyScore {
            team: TeamTarget::Leader,
            delta: -3,
        }),
    ]);
    for seed in 0..25 {
        let mut meta = MetaStore::new();
        let result = simulate_game_with_effects(&home, &away, &rules, seed, &effects, &mut meta).unwrap();
        assert_box_matches_score(&result);
        let last = result.possession_log.last().unwrap();
        assert!(last.home_score <= result.home_score + 3);
    }
}

#[test]
fn test_possession_scores_are_running_totals() {
    let (home, away) = median_pair();
    let result = simulate_game(&home, &away, &RuleSet::default(), 3).unwrap();
    let mut previous = (0, 0);
    for log in &result.possession_log {
        let gained = match log.offense {
            TeamSide::Home => log.home_score - previous.0,
            TeamSide::Away => log.away_score - previous.1,
        };
        assert_eq!(gained, log.points);
        previous = (log.home_score, log.away_score);
    }
    assert_eq!(previous, (result.home_score, result.away_score));
}

#[test]
fn test_terminates_with_zero_margin() {
    let (home, away) = median_pair();
    let mut rules = RuleSet::default();
    rules.elam_margin = 0;
    for seed in 0..20 {
        let result = simulate_game(&home, &away, &rules, seed).unwrap();
        assert!(result.elam_activated);
        assert!(result.total_possessions <= 3 * rules.quarter_possessions + rules.safety_cap_possessions);
    }
}

#[test]
fn test_terminates_when_nobody_can_score() {
    let (home, away) = median_pair();
    let mut rules = RuleSet::default();
    rules.at_rim_midpoint = 100.0;
    rules.mid_range_midpoint = 100.0;
    rules.three_point_midpoint = 100.0;
    rules.free_throw_midpoint = 100.0;
    rules.at_rim_k = 1.0;
    rules.mid_range_k = 1.0;
    rules.three_point_k = 1.0;
    rules.free_throw_k = 1.0;
    rules.safety_cap_possessions = 50;
    rules.check().unwrap();

    let result = simulate_game(&home, &away, &rules, 1).unwrap();
    assert!(result.total_possessions <= 3 * rules.quarter_possessions + rules.safety_cap_possessions);
    if result.capped {
        assert!(!result.possession_log.iter().any(|p| p.flags.game_winner));
    }
    assert_box_matches_score(&result);
}

#[test]
fn test_safety_cap_ends_elam_with_current_leader() {
    let (home, away) = median_pair();
    let mut rules = RuleSet::default();
    rules.safety_cap_possessions = 1;
    rules.elam_margin = 50;
    rules.check().unwrap();

    let result = simulate_game(&home, &away, &rules, 4).unwrap();
    assert!(result.capped);
    assert_eq!(result.possession_log.iter().filter(|p| p.elam).count(), 1);
    assert!(!result.possession_log.iter().any(|p| p.flags.game_winner));
    let expected = match result.home_score.cmp(&result.away_score) {
        std::cmp::Ordering::Greater => Some(TeamSide::Home),
        std::cmp::Ordering::Less => Some(TeamSide::Away),
        std::cmp::Ordering::Equal => None,
    };
    assert_eq!(result.winner, expected);
    assert_eq!(result.total_possessions, 3 * rules.quarter_possessions + 1);
    assert_box_matches_score(&result);
}

#[test]
fn test_seed_42_is_plausible() {
    let (home, away) = median_pair();
    let rules = RuleSet::default();
    let result = simulate_game(&home, &away, &rules, 42).unwrap();
    assert!((30..=200).contains(&result.combined_score()), "combined {}", result.combined_score());
    assert!((45..=200).contains(&result.total_possessions), "possessions {}", result.total_possessions);
    assert!(result.elam_activated);
    assert!(result.possession_log.iter().all(|p| !p.matchups.is_empty()));
}

#[test]
fn test_home_win_rate_is_balanced() {
    let (home, away) = median_pair();
    let rules = RuleSet::default();
    let games = 1000;
    let home_wins = (0..games)
        .filter(|&seed| simulate_game(&home, &away, &rules, seed).unwrap().winner == Some(TeamSide::Home))
        .count();
    let rate = home_wins as f64 / games as f64;
    assert!((0.35..=0.65).contains(&rate), "home win rate {rate}");
}

#[test]
fn test_three_point_value_raises_scoring() {
    let shooters = shifted(Attributes::default(), Attribute::Scoring, Attribute::Ego, 35);
    let home = roster("home", shooters.clone());
    let away = roster("away", shooters);
    let base = RuleSet::default();
    let mut bombs = RuleSet::default();
    bombs.set_param("three_point_value", json!(10)).unwrap();

    let mean = |rules: &RuleSet| {
        let total: i32 = (0..40)
            .map(|seed| {
                let result = simulate_game(&home, &away, rules, seed).unwrap();
                let timed: i32 = result.quarter_scores.iter().take(3).map(|q| q.home + q.away).sum();
                timed
            })
            .sum();
        total as f64 / 40.0
    };
    assert!(mean(&bombs) > mean(&base));
}

#[test]
fn test_rim_gate_only_fires_on_rim_shots() {
    let (home, away) = featured_pair();
    let rules = RuleSet::default();
    let effects = registered(vec![EffectDefinition::new(
        "rim_only",
        HookPoint::PreShot,
        EffectAction::ModifyProbability { delta: 0.05 },
    )
    .with_gate(Gate::ShotZone { zone: ShotZone::AtRim })]);

    let mut meta = MetaStore::new();
    let result = simulate_game_with_effects(&home, &away, &rules, 21, &effects, &mut meta).unwrap();
    let mut fired_total = 0;
    for log in &result.possession_log {
        let fired = log.effects_fired.iter().filter(|id| *id == "rim_only").count();
        let rim_shots = log.shots.iter().filter(|s| s.zone == ShotZone::AtRim).count();
        assert_eq!(fired, rim_shots, "possession {}", log.index);
        fired_total += fired;
    }
    assert!(fired_total > 0);
}

#[test]
fn test_unknown_gate_rejected_before_simulation() {
    let mut registry = EffectRegistry::new();
    let raw = json!({
        "id": "eclipse",
        "hook": "pre_shot",
        "gate": { "type": "solar_eclipse" },
        "action": { "action": "modify_probability", "delta": 0.2 }
    });
    assert_eq!(
        registry.register_json(&raw),
        Err(EffectError::UnknownGate { effect_id: "eclipse".into(), kind: "solar_eclipse".into() })
    );
    assert!(registry.is_empty());
}

#[test]
fn test_meta_writes_are_marked_dirty() {
    let (home, away) = median_pair();
    let effects = registered(vec![EffectDefinition::new(
        "games_played",
        HookPoint::PostGame,
        EffectAction::WriteMeta {
            target: MetaTarget { scope: MetaScope::Home, field: MetaField::Custom("games".into()) },
            op: MetaOp::Increment { by: 1.0 },
        },
    )]);
    let mut meta = MetaStore::new();
    simulate_game_with_effects(&home, &away, &RuleSet::default(), 5, &effects, &mut meta).unwrap();
    let key = MetaKey::team("home", MetaField::Custom("games".into()));
    assert_eq!(meta.get(&key), Some(&MetaValue::Int(1)));
    assert!(meta.is_dirty(&key));
}
