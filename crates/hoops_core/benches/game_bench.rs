use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hoops_core::api::{simulate_round, Fixture};
use hoops_core::engine::hooks::{EffectAction, EffectDefinition, EffectRegistry, Gate, HookPoint};
use hoops_core::models::ShotZone;
use hoops_core::*;

fn team(id: &str) -> Team {
    Team::new(
        id,
        id,
        (0..5).map(|i| Agent::new(format!("{id}-{i}"), format!("{id} {i}"), Attributes::default())).collect(),
    )
}

fn bench_single_game(c: &mut Criterion) {
    let (home, away) = (team("home"), team("away"));
    let rules = RuleSet::default();
    c.bench_function("single_game", |b| {
        b.iter(|| simulate_game(black_box(&home), black_box(&away), &rules, black_box(42)))
    });
}

fn bench_single_game_with_effects(c: &mut Criterion) {
    let (home, away) = (team("home"), team("away"));
    let rules = RuleSet::default();
    let mut registry = EffectRegistry::new();
    registry
        .register(
            EffectDefinition::new("rim", HookPoint::PreShot, EffectAction::ModifyProbability { delta: 0.03 })
                .with_gate(Gate::ShotZone { zone: ShotZone::AtRim }),
        )
        .unwrap();
    c.bench_function("single_game_with_effects", |b| {
        b.iter(|| {
            let mut meta = MetaStore::new();
            simulate_game_with_effects(black_box(&home), black_box(&away), &rules, 42, registry.effects(), &mut meta)
        })
    });
}

fn bench_round_of_16(c: &mut Criterion) {
    let fixtures: Vec<Fixture> = (0..16)
        .map(|i| Fixture { home: team(&format!("h{i}")), away: team(&format!("a{i}")), seed: i })
        .collect();
    let rules = RuleSet::default();
    let meta = MetaStore::new();
    c.bench_function("round_of_16", |b| b.iter(|| simulate_round(black_box(&fixtures), &rules, &[], &meta)));
}

criterion_group!(benches, bench_single_game, bench_single_game_with_effects, bench_round_of_16);
criterion_main!(benches);
