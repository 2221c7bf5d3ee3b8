use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::agent::Agent;
use crate::error::SimError;

/// Number of agents on court per side.
pub const TEAM_SIZE: usize = 3;

/// Side of the game, independent of team ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TeamSide {
    Home,
    Away,
}

impl TeamSide {
    pub fn opponent(&self) -> Self {
        match self {
            TeamSide::Home => TeamSide::Away,
            TeamSide::Away => TeamSide::Home,
        }
    }

    pub fn is_home(&self) -> bool {
        matches!(self, TeamSide::Home)
    }

    /// Index into `[home, away]` arrays.
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            TeamSide::Home => 0,
            TeamSide::Away => 1,
        }
    }
}

/// Home arena. Scales the rule-level home-court advantage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Venue {
    pub name: String,
    /// Multiplier on `RuleSet::home_court_advantage` (0.0 = neutral floor)
    #[serde(default = "default_home_court_modifier")]
    pub home_court_modifier: f64,
}

fn default_home_court_modifier() -> f64 {
    1.0
}

impl Default for Venue {
    fn default() -> Self {
        Self { name: "Neutral Court".to_string(), home_court_modifier: default_home_court_modifier() }
    }
}

/// Fixed roster: the first [`TEAM_SIZE`] agents start, the rest form the bench.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub venue: Venue,
}

impl Team {
    pub fn new(id: impl Into<String>, name: impl Into<String>, agents: Vec<Agent>) -> Self {
        Self { id: id.into(), name: name.into(), agents, venue: Venue::default() }
    }

    pub fn with_venue(mut self, venue: Venue) -> Self {
        self.venue = venue;
        self
    }

    pub fn starters(&self) -> &[Agent] {
        &self.agents[..TEAM_SIZE.min(self.agents.len())]
    }

    pub fn bench(&self) -> &[Agent] {
        self.agents.get(TEAM_SIZE..).unwrap_or(&[])
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.id.trim().is_empty() {
            return Err(SimError::InvalidTeam(format!("team '{}' has an empty id", self.name)));
        }
        if self.agents.len() < TEAM_SIZE {
            return Err(SimError::InvalidTeam(format!(
                "team '{}' needs at least {} agents, found {}",
                self.id,
                TEAM_SIZE,
                self.agents.len()
            )));
        }
        if !self.venue.home_court_modifier.is_finite() || self.venue.home_court_modifier < 0.0 {
            return Err(SimError::InvalidTeam(format!(
                "team '{}': venue modifier {} must be a non-negative number",
                self.id, self.venue.home_court_modifier
            )));
        }
        let mut seen = HashSet::new();
        for agent in &self.agents {
            agent.validate()?;
            if !seen.insert(agent.id.as_str()) {
                return Err(SimError::InvalidTeam(format!(
                    "team '{}' lists agent '{}' twice",
                    self.id, agent.id
                )));
            }
        }
        Ok(())
    }
}
