//! Mutable per-game wrappers around the read-only inputs.
//!
//! Owned by the orchestrator for one game and dropped afterwards. Points are
//! only ever credited through `TeamState::credit_points` /
//! `TeamState::apply_score_delta`, which update the agent's box line and the
//! team score together.

use crate::models::{Agent, Attribute, BoxScoreLine, Team, TeamSide};

/// One agent's mutable game state.
#[derive(Debug, Clone)]
pub struct AgentState<'a> {
    pub agent: &'a Agent,
    pub side: TeamSide,
    /// Current stamina in `[stamina_floor, 1.0]`
    pub stamina: f64,
    pub fouls: u32,
    pub on_court: bool,
    pub fouled_out: bool,
    pub line: BoxScoreLine,
}

impl<'a> AgentState<'a> {
    pub fn new(agent: &'a Agent, side: TeamSide, on_court: bool) -> Self {
        Self {
            agent,
            side,
            stamina: 1.0,
            fouls: 0,
            on_court,
            fouled_out: false,
            line: BoxScoreLine::new(agent.id.clone(), agent.name.clone(), side),
        }
    }

    pub fn id(&self) -> &str {
        &self.agent.id
    }

    /// Attribute as a 0..=100 float.
    #[inline]
    pub fn attr(&self, attribute: Attribute) -> f64 {
        self.agent.attributes.get(attribute) as f64
    }

    pub fn drain(&mut self, amount: f64, floor: f64) {
        self.stamina = (self.stamina - amount.max(0.0)).clamp(floor, 1.0);
    }

    pub fn recover(&mut self, amount: f64, floor: f64) {
        self.stamina = (self.stamina + amount.max(0.0)).clamp(floor, 1.0);
    }

    /// Signed stamina change from effects.
    pub fn adjust_stamina(&mut self, delta: f64, floor: f64) {
        self.stamina = (self.stamina + delta).clamp(floor, 1.0);
    }
}

/// One side's mutable game state.
#[derive(Debug, Clone)]
pub struct TeamState<'a> {
    pub side: TeamSide,
    pub team: &'a Team,
    pub agents: Vec<AgentState<'a>>,
    pub score: u32,
    /// Result of this side's most recent field-goal attempt
    pub last_shot_made: Option<bool>,
    pub make_streak: u32,
    pub miss_streak: u32,
}

impl<'a> TeamState<'a> {
    pub fn new(team: &'a Team, side: TeamSide) -> Self {
        let agents = team
            .agents
            .iter()
            .enumerate()
            .map(|(i, agent)| AgentState::new(agent, side, i < crate::models::TEAM_SIZE))
            .collect();
        Self { side, team, agents, score: 0, last_shot_made: None, make_streak: 0, miss_streak: 0 }
    }

    /// Indices of on-court agents in roster order.
    pub fn on_court(&self) -> Vec<usize> {
        self.agents.iter().enumerate().filter(|(_, a)| a.on_court).map(|(i, _)| i).collect()
    }

    pub fn bench(&self) -> Vec<usize> {
        self.agents.iter().enumerate().filter(|(_, a)| !a.on_court).map(|(i, _)| i).collect()
    }

    pub fn index_of(&self, agent_id: &str) -> Option<usize> {
        self.agents.iter().position(|a| a.agent.id == agent_id)
    }

    /// Mean of an attribute over on-court agents (0..=100).
    pub fn avg_attr(&self, attribute: Attribute) -> f64 {
        let court = self.on_court();
        if court.is_empty() {
            return 0.0;
        }
        court.iter().map(|&i| self.agents[i].attr(attribute)).sum::<f64>() / court.len() as f64
    }

    pub fn avg_stamina(&self) -> f64 {
        let court = self.on_court();
        if court.is_empty() {
            return 0.0;
        }
        court.iter().map(|&i| self.agents[i].stamina).sum::<f64>() / court.len() as f64
    }

    /// Highest foul count among on-court agents.
    pub fn max_on_court_fouls(&self) -> u32 {
        self.on_court().iter().map(|&i| self.agents[i].fouls).max().unwrap_or(0)
    }

    pub fn record_field_goal(&mut self, made: bool) {
        self.last_shot_made = Some(made);
        if made {
            self.make_streak += 1;
            self.miss_streak = 0;
        } else {
            self.miss_streak += 1;
            self.make_streak = 0;
        }
    }

    pub fn credit_points(&mut self, agent_idx: usize, points: u32) {
        self.agents[agent_idx].line.points += points;
        self.score += points;
    }

    /// Apply an effect score delta credited to `agent_idx`.
    ///
    /// Gains go to that agent. A deduction is taken from that agent's points
    /// first, then from the rest of the roster in order, and never takes the
    /// team below zero. Returns the delta actually applied.
    pub fn apply_score_delta(&mut self, agent_idx: usize, delta: i32) -> i32 {
        if delta >= 0 {
            let line = &mut self.agents[agent_idx].line;
            line.points += delta as u32;
            line.effect_points += delta;
            self.score += delta as u32;
            return delta;
        }

        let mut remaining = delta.unsigned_abs().min(self.score);
        let order = std::iter::once(agent_idx).chain((0..self.agents.len()).filter(|&i| i != agent_idx));
        let mut taken = 0u32;
        for idx in order {
            if remaining == 0 {
                break;
            }
            let line = &mut self.agents[idx].line;
            let take = remaining.min(line.points);
            line.points -= take;
            line.effect_points -= take as i32;
            remaining -= take;
            taken += take;
        }
        self.score -= taken;
        -(taken as i32)
    }

    /// Freshest available bench agent, ties broken by roster order.
    pub fn freshest_bench(&self) -> Option<usize> {
        self.agents
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.on_court && !a.fouled_out)
            .fold(None, |best: Option<(usize, f64)>, (i, a)| match best {
                Some((_, s)) if s >= a.stamina => best,
                _ => Some((i, a.stamina)),
            })
            .map(|(i, _)| i)
    }

    /// Swap `out_idx` for the freshest bench agent. Returns the incoming index.
    pub fn substitute(&mut self, out_idx: usize) -> Option<usize> {
        let in_idx = self.freshest_bench()?;
        self.agents[out_idx].on_court = false;
        self.agents[in_idx].on_court = true;
        Some(in_idx)
    }

    pub fn into_box_scores(self) -> Vec<BoxScoreLine> {
        self.agents.into_iter().map(|a| a.line).collect()
    }
}

/// Whole-game mutable state.
#[derive(Debug, Clone)]
pub struct GameState<'a> {
    pub teams: [TeamState<'a>; 2],
    /// 1..=3 timed, 4 for the Elam period
    pub quarter: u8,
    pub elam_active: bool,
    pub elam_target: Option<u32>,
    pub possession_index: u32,
}

impl<'a> GameState<'a> {
    pub fn new(home: &'a Team, away: &'a Team) -> Self {
        Self {
            teams: [TeamState::new(home, TeamSide::Home), TeamState::new(away, TeamSide::Away)],
            quarter: 0,
            elam_active: false,
            elam_target: None,
            possession_index: 0,
        }
    }

    pub fn team(&self, side: TeamSide) -> &TeamState<'a> {
        &self.teams[side.index()]
    }

    pub fn team_mut(&mut self, side: TeamSide) -> &mut TeamState<'a> {
        &mut self.teams[side.index()]
    }

    /// `(offense, defense)` borrowed mutably together.
    pub fn sides_mut(&mut self, offense: TeamSide) -> (&mut TeamState<'a>, &mut TeamState<'a>) {
        let [home, away] = &mut self.teams;
        match offense {
            TeamSide::Home => (home, away),
            TeamSide::Away => (away, home),
        }
    }

    pub fn score(&self, side: TeamSide) -> u32 {
        self.team(side).score
    }

    /// `score(side) - score(opponent)`.
    pub fn differential(&self, side: TeamSide) -> i64 {
        self.score(side) as i64 - self.score(side.opponent()) as i64
    }

    pub fn leader(&self) -> Option<TeamSide> {
        match self.differential(TeamSide::Home) {
            d if d > 0 => Some(TeamSide::Home),
            d if d < 0 => Some(TeamSide::Away),
            _ => None,
        }
    }

    /// Either team within `margin` points of the Elam target.
    pub fn near_elam_target(&self, margin: u32) -> bool {
        match self.elam_target {
            Some(target) if self.elam_active => {
                let best = self.score(TeamSide::Home).max(self.score(TeamSide::Away));
                best + margin >= target
            }
            _ => false,
        }
    }
}
