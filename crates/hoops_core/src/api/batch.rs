//! Round simulation: many independent games in parallel.
//!
//! Each game gets its own RNG (from its fixture seed) and its own clone of
//! the round's meta store, so results do not depend on thread scheduling.
//! Meta writes are folded back with [`merge_round_meta`] in fixture order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::game::validate_inputs;
use crate::engine::hooks::RegisteredEffect;
use crate::engine::simulate_game_with_effects;
use crate::error::SimError;
use crate::models::{GameResult, MetaStore, RuleSet, Team};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub home: Team,
    pub away: Team,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundGame {
    pub fixture_index: usize,
    pub result: GameResult,
    /// This game's copy of the meta store; dirty keys are its own writes
    pub meta: MetaStore,
}

/// Simulate every fixture. All fixtures are validated before any game runs.
pub fn simulate_round(
    fixtures: &[Fixture],
    rules: &RuleSet,
    effects: &[RegisteredEffect],
    meta: &MetaStore,
) -> Result<Vec<RoundGame>, SimError> {
    for fixture in fixtures {
        validate_inputs(&fixture.home, &fixture.away, rules)?;
    }

    let mut base = meta.clone();
    base.clear_dirty();

    let games = fixtures
        .par_iter()
        .enumerate()
        .map(|(fixture_index, fixture)| {
            let mut game_meta = base.clone();
            let result =
                simulate_game_with_effects(&fixture.home, &fixture.away, rules, fixture.seed, effects, &mut game_meta)?;
            Ok(RoundGame { fixture_index, result, meta: game_meta })
        })
        .collect::<Result<Vec<_>, SimError>>()?;

    info!(games = games.len(), "round complete");
    Ok(games)
}

/// Fold each game's meta writes into `round`, later fixtures winning.
pub fn merge_round_meta(round: &mut MetaStore, games: &[RoundGame]) {
    for game in games {
        round.merge_dirty_from(&game.meta);
    }
}
