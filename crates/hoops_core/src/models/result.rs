//! Simulation output.
//!
//! `GameResult` is the only value a finished simulation returns. The
//! possession log is never truncated here; trimming for storage is a caller
//! decision.

use serde::{Deserialize, Serialize};

use super::agent::AgentId;
use super::team::TeamSide;
use super::zone::ShotZone;

/// Defensive scheme used on a possession (recorded by name in the log).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeKind {
    ManTight,
    ManSwitch,
    Zone,
    Press,
}

/// What the ball handler chose to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayAction {
    Shoot,
    Pass,
    Drive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnoverKind {
    Steal,
    ShotClock,
}

/// How a possession ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PossessionOutcome {
    Scored,
    Missed,
    Turnover,
}

/// One defender → attacker assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matchup {
    pub defender: AgentId,
    pub attacker: AgentId,
}

/// One field-goal attempt (a possession holds one plus any putbacks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotRecord {
    pub shooter: AgentId,
    pub defender: AgentId,
    pub zone: ShotZone,
    /// Logistic output before modifiers
    pub base_probability: f64,
    /// Probability actually rolled against
    pub final_probability: f64,
    pub move_used: Option<String>,
    pub made: bool,
    pub points: u32,
    pub putback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoulRecord {
    pub fouler: AgentId,
    pub fouled: AgentId,
    pub free_throws_attempted: u32,
    pub free_throws_made: u32,
    pub and_one: bool,
    pub fouled_out: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReboundRecord {
    pub agent: AgentId,
    pub offensive: bool,
}

/// Narration-relevant markers. This crate has no narration logic; it only
/// makes sure these are populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DramaFlags {
    pub lead_change: bool,
    pub tie_game: bool,
    pub clutch: bool,
    pub game_winner: bool,
    pub and_one: bool,
    pub move_activated: bool,
}

/// Append-only record of one possession.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PossessionLog {
    pub index: u32,
    /// 1..=3 timed quarters, 4 for the Elam period
    pub quarter: u8,
    pub elam: bool,
    pub offense: TeamSide,
    pub scheme: SchemeKind,
    pub matchups: Vec<Matchup>,
    pub ball_handler: AgentId,
    pub action: Option<PlayAction>,
    pub passer: Option<AgentId>,
    pub shots: Vec<ShotRecord>,
    pub foul: Option<FoulRecord>,
    pub rebounds: Vec<ReboundRecord>,
    pub assist: Option<AgentId>,
    pub turnover: Option<TurnoverKind>,
    pub forced_by: Option<AgentId>,
    pub outcome: PossessionOutcome,
    /// Points by the offense this possession (shots + free throws)
    pub points: u32,
    pub home_score: u32,
    pub away_score: u32,
    /// Fictional seconds left in the quarter; `None` during the Elam period
    pub clock_remaining: Option<u32>,
    pub duration_seconds: u32,
    pub flags: DramaFlags,
    pub effects_fired: Vec<String>,
}

/// Net points in one period. Includes effect changes made since the previous
/// period closed, so it can be negative; the periods sum to the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterScore {
    pub quarter: u8,
    pub home: i32,
    pub away: i32,
}

/// Per-agent box score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxScoreLine {
    pub agent_id: AgentId,
    pub name: String,
    pub side: Option<TeamSide>,
    pub points: u32,
    pub field_goals_made: u32,
    pub field_goals_attempted: u32,
    pub threes_made: u32,
    pub threes_attempted: u32,
    pub free_throws_made: u32,
    pub free_throws_attempted: u32,
    pub offensive_rebounds: u32,
    pub defensive_rebounds: u32,
    pub assists: u32,
    pub steals: u32,
    pub turnovers: u32,
    pub fouls: u32,
    pub moves_activated: u32,
    /// Net points added or removed by effects (already included in `points`)
    pub effect_points: i32,
    pub possessions_played: u32,
}

impl BoxScoreLine {
    pub fn new(agent_id: impl Into<String>, name: impl Into<String>, side: TeamSide) -> Self {
        Self { agent_id: agent_id.into(), name: name.into(), side: Some(side), ..Default::default() }
    }

    pub fn rebounds(&self) -> u32 {
        self.offensive_rebounds + self.defensive_rebounds
    }
}

/// Annotation emitted by a `Narrate` effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeNote {
    pub effect_id: String,
    pub quarter: u8,
    pub possession: Option<u32>,
    pub text: String,
}

/// Immutable record of a finished game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub seed: u64,
    pub home_team_id: String,
    pub away_team_id: String,
    pub home_score: u32,
    pub away_score: u32,
    pub winner: Option<TeamSide>,
    pub quarter_scores: Vec<QuarterScore>,
    pub elam_activated: bool,
    pub elam_target: Option<u32>,
    /// Elam period hit `safety_cap_possessions` without reaching the target
    pub capped: bool,
    pub total_possessions: u32,
    pub possession_log: Vec<PossessionLog>,
    pub box_scores: Vec<BoxScoreLine>,
    pub narratives: Vec<NarrativeNote>,
}

impl GameResult {
    pub fn score(&self, side: TeamSide) -> u32 {
        match side {
            TeamSide::Home => self.home_score,
            TeamSide::Away => self.away_score,
        }
    }

    pub fn box_scores_for(&self, side: TeamSide) -> impl Iterator<Item = &BoxScoreLine> {
        self.box_scores.iter().filter(move |line| line.side == Some(side))
    }

    /// Sum of per-agent points for `side`.
    pub fn box_points(&self, side: TeamSide) -> u32 {
        self.box_scores_for(side).map(|line| line.points).sum()
    }

    pub fn combined_score(&self) -> u32 {
        self.home_score + self.away_score
    }
}
