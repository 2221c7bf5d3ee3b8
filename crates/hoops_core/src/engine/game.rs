//! Game orchestrator.
//!
//! ```text
//! Setup → Quarter(1) → Quarter(2) → Halftime → Quarter(3)
//!       → ElamCheck → Elam → Complete
//! ```
//!
//! Offense alternates every possession for the whole game; home opens.
//! Timed quarters run a fixed number of possessions against a fictional
//! clock. The Elam period is untimed and ends when a team that scored on
//! the possession reaches the target, or at `safety_cap_possessions`.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use super::hooks::{HookContext, HookPoint, HookRuntime, RegisteredEffect};
use super::possession::simulate_possession;
use super::state::GameState;
use crate::error::{Result, SimError};
use crate::models::{GameResult, MetaStore, PossessionLog, QuarterScore, RuleSet, Team, TeamSide};

/// Timed quarters before the Elam period.
pub const TIMED_QUARTERS: u8 = 3;
/// Quarter number recorded for the Elam period.
pub const ELAM_QUARTER: u8 = 4;
/// Shortest fictional possession, in seconds.
pub const MIN_POSSESSION_SECONDS: u32 = 4;

/// Orchestrator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Setup,
    Quarter(u8),
    Halftime,
    ElamCheck,
    Elam,
    Complete,
}

/// Check every input before the first RNG draw.
pub fn validate_inputs(home: &Team, away: &Team, rules: &RuleSet) -> Result<()> {
    rules.check()?;
    home.validate()?;
    away.validate()?;
    if home.id == away.id {
        return Err(SimError::InvalidTeam(format!("team '{}' cannot play itself", home.id)));
    }
    if let Some(shared) = home.agents.iter().find(|a| away.agents.iter().any(|b| b.id == a.id)) {
        return Err(SimError::InvalidAgent(format!("agent '{}' appears on both rosters", shared.id)));
    }
    Ok(())
}

/// Simulate a full game with no effects and an empty meta store.
pub fn simulate_game(home: &Team, away: &Team, rules: &RuleSet, seed: u64) -> Result<GameResult> {
    let mut meta = MetaStore::new();
    simulate_game_with_effects(home, away, rules, seed, &[], &mut meta)
}

/// Simulate a full game with registered effects reading and writing `meta`.
///
/// Pure given identical inputs (including the initial meta contents).
pub fn simulate_game_with_effects(
    home: &Team,
    away: &Team,
    rules: &RuleSet,
    seed: u64,
    effects: &[RegisteredEffect],
    meta: &mut MetaStore,
) -> Result<GameResult> {
    validate_inputs(home, away, rules)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let orchestrator = GameOrchestrator::new(home, away, rules, effects, meta);
    Ok(orchestrator.run(seed, &mut rng))
}

/// Drives one game through its phases. Consumed by `run`.
pub struct GameOrchestrator<'a, 'e, 'm> {
    game: GameState<'a>,
    rules: &'a RuleSet,
    hooks: HookRuntime<'e, 'm>,
    possessions: Vec<PossessionLog>,
    quarter_scores: Vec<QuarterScore>,
    /// Scores when the previous period closed
    last_close: (u32, u32),
    capped: bool,
}

impl<'a, 'e, 'm> GameOrchestrator<'a, 'e, 'm> {
    pub fn new(
        home: &'a Team,
        away: &'a Team,
        rules: &'a RuleSet,
        effects: &'e [RegisteredEffect],
        meta: &'m mut MetaStore,
    ) -> Self {
        Self {
            game: GameState::new(home, away),
            rules,
            hooks: HookRuntime::new(effects, meta),
            possessions: Vec::new(),
            quarter_scores: Vec::new(),
            last_close: (0, 0),
            capped: false,
        }
    }

    pub fn run<R: Rng + ?Sized>(mut self, seed: u64, rng: &mut R) -> GameResult {
        let mut phase = GamePhase::Setup;
        while phase != GamePhase::Complete {
            phase = self.step(phase, rng);
        }
        self.finish(seed, rng)
    }

    /// Execute one phase and return the next.
    fn step<R: Rng + ?Sized>(&mut self, phase: GamePhase, rng: &mut R) -> GamePhase {
        match phase {
            GamePhase::Setup => {
                self.fire_game_hook(HookPoint::PreGame, rng);
                GamePhase::Quarter(1)
            }
            GamePhase::Quarter(q) => {
                self.play_quarter(q, rng);
                match q {
                    1 => GamePhase::Quarter(2),
                    2 => GamePhase::Halftime,
                    _ => GamePhase::ElamCheck,
                }
            }
            GamePhase::Halftime => {
                self.halftime(rng);
                GamePhase::Quarter(TIMED_QUARTERS)
            }
            GamePhase::ElamCheck => {
                let leading = self.game.score(TeamSide::Home).max(self.game.score(TeamSide::Away));
                self.game.quarter = ELAM_QUARTER;
                self.game.elam_active = true;
                self.game.elam_target = Some(leading + self.rules.elam_margin);
                info!(target = leading + self.rules.elam_margin, "elam period");
                self.fire_game_hook(HookPoint::ElamStart, rng);
                GamePhase::Elam
            }
            GamePhase::Elam => {
                self.play_elam(rng);
                GamePhase::Complete
            }
            GamePhase::Complete => GamePhase::Complete,
        }
    }

    fn fire_game_hook<R: Rng + ?Sized>(&mut self, point: HookPoint, rng: &mut R) {
        let ctx = HookContext::for_game(point, &self.game);
        self.hooks.run(&ctx, &mut self.game, self.rules, rng);
    }

    fn next_offense(&self) -> TeamSide {
        if self.game.possession_index % 2 == 0 {
            TeamSide::Home
        } else {
            TeamSide::Away
        }
    }

    fn possession<R: Rng + ?Sized>(&mut self, rng: &mut R) -> PossessionLog {
        let offense = self.next_offense();
        let log = simulate_possession(&mut self.game, offense, self.rules, &mut self.hooks, rng);
        self.game.possession_index += 1;
        log
    }

    fn play_quarter<R: Rng + ?Sized>(&mut self, quarter: u8, rng: &mut R) {
        self.game.quarter = quarter;
        self.fire_game_hook(HookPoint::PreQuarter, rng);

        let mut clock = self.rules.quarter_seconds;
        let max_seconds = self.rules.shot_clock_seconds.max(MIN_POSSESSION_SECONDS);
        for _ in 0..self.rules.quarter_possessions {
            let mut log = self.possession(rng);
            let duration = rng.gen_range(MIN_POSSESSION_SECONDS..=max_seconds);
            clock = clock.saturating_sub(duration);
            log.duration_seconds = duration;
            log.clock_remaining = Some(clock);
            self.possessions.push(log);
        }

        self.close_quarter(quarter, rng);
    }

    /// Points scored since the last close, net of effect deductions.
    fn since_last_close(&self) -> (i32, i32) {
        let net = |now: u32, then: u32| (i64::from(now) - i64::from(then)) as i32;
        (
            net(self.game.score(TeamSide::Home), self.last_close.0),
            net(self.game.score(TeamSide::Away), self.last_close.1),
        )
    }

    fn close_quarter<R: Rng + ?Sized>(&mut self, quarter: u8, rng: &mut R) {
        self.fire_game_hook(HookPoint::QuarterEnd, rng);
        let (home, away) = self.since_last_close();
        self.quarter_scores.push(QuarterScore { quarter, home, away });
        self.last_close = (self.game.score(TeamSide::Home), self.game.score(TeamSide::Away));
    }

    /// Recovery for everyone, then one substitution pass per team.
    fn halftime<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let recovery = self.rules.halftime_recovery;
        let floor = self.rules.stamina_floor;
        let threshold = self.rules.substitution_threshold;
        for team in self.game.teams.iter_mut() {
            for agent in team.agents.iter_mut() {
                agent.recover(recovery, floor);
            }
            for idx in team.on_court() {
                if team.agents[idx].stamina < threshold {
                    team.substitute(idx);
                }
            }
        }
        self.fire_game_hook(HookPoint::Halftime, rng);
    }

    fn play_elam<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let target = self.game.elam_target.unwrap_or(0);
        let mut reached = false;

        for _ in 0..self.rules.safety_cap_possessions {
            let before = [self.game.score(TeamSide::Home), self.game.score(TeamSide::Away)];
            let mut log = self.possession(rng);
            reached = [TeamSide::Home, TeamSide::Away]
                .iter()
                .any(|&side| self.game.score(side) > before[side.index()] && self.game.score(side) >= target);
            log.flags.game_winner = reached;
            self.possessions.push(log);
            if reached {
                break;
            }
        }

        if !reached {
            self.capped = true;
            warn!(
                cap = self.rules.safety_cap_possessions,
                target,
                home = self.game.score(TeamSide::Home),
                away = self.game.score(TeamSide::Away),
                "elam safety cap reached"
            );
        }
        self.close_quarter(ELAM_QUARTER, rng);
    }

    fn finish<R: Rng + ?Sized>(mut self, seed: u64, rng: &mut R) -> GameResult {
        self.fire_game_hook(HookPoint::PostGame, rng);
        let (home_late, away_late) = self.since_last_close();
        if let Some(last) = self.quarter_scores.last_mut() {
            last.home += home_late;
            last.away += away_late;
        }

        let home_score = self.game.score(TeamSide::Home);
        let away_score = self.game.score(TeamSide::Away);
        let winner = self.game.leader();
        let home_team_id = self.game.teams[0].team.id.clone();
        let away_team_id = self.game.teams[1].team.id.clone();
        let elam_target = self.game.elam_target;
        let total_possessions = self.game.possession_index;

        info!(
            seed,
            home = %home_team_id,
            away = %away_team_id,
            home_score,
            away_score,
            possessions = total_possessions,
            capped = self.capped,
            "game complete"
        );

        let [home, away] = self.game.teams;
        let mut box_scores = home.into_box_scores();
        box_scores.extend(away.into_box_scores());

        GameResult {
            seed,
            home_team_id,
            away_team_id,
            home_score,
            away_score,
            winner,
            quarter_scores: self.quarter_scores,
            elam_activated: elam_target.is_some(),
            elam_target,
            capped: self.capped,
            total_possessions,
            possession_log: self.possessions,
            box_scores,
            narratives: self.hooks.narratives,
        }
    }
}
