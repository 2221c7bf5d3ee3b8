//! Move trigger evaluation.

use rand::Rng;

use super::probability::roll;
use super::state::AgentState;
use crate::models::{Move, MoveSituation, RuleSet, ShotZone};

/// Situation snapshot a move gate is checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveContext {
    pub zone: ShotZone,
    pub elam: bool,
    /// Shooter's team score minus opponent's
    pub differential: i64,
    /// Shooter's team's previous field-goal result
    pub last_shot_made: Option<bool>,
    /// Elam target within 5 points of either team
    pub near_target: bool,
}

impl MoveContext {
    pub fn is_trailing(&self) -> bool {
        self.differential < 0
    }

    pub fn is_leading(&self) -> bool {
        self.differential > 0
    }

    pub fn is_clutch(&self) -> bool {
        self.elam && self.near_target
    }

    fn situation_holds(&self, situation: MoveSituation, stamina: f64) -> bool {
        match situation {
            MoveSituation::Always => true,
            MoveSituation::LastShotMissed => self.last_shot_made == Some(false),
            MoveSituation::LastShotMade => self.last_shot_made == Some(true),
            MoveSituation::ElamPeriod => self.elam,
            MoveSituation::Trailing => self.is_trailing(),
            MoveSituation::Leading => self.is_leading(),
            MoveSituation::LowStamina => stamina < 0.5,
            MoveSituation::Clutch => self.is_clutch(),
        }
    }
}

/// Deterministic half of the gate (no RNG).
pub fn gate_passes(mv: &Move, agent: &AgentState<'_>, ctx: &MoveContext) -> bool {
    agent.agent.attributes.get(mv.attribute) >= mv.threshold
        && mv.zone.map_or(true, |z| z == ctx.zone)
        && ctx.situation_holds(mv.situation, agent.stamina)
}

/// First move (in definition order) whose gate passes and whose activation
/// roll succeeds. One draw per gate-passing move until one fires.
pub fn move_triggers<'m, R: Rng + ?Sized>(
    agent: &AgentState<'m>,
    ctx: &MoveContext,
    rules: &RuleSet,
    rng: &mut R,
) -> Option<&'m Move> {
    if !rules.moves_enabled {
        return None;
    }
    let definition: &'m crate::models::Agent = agent.agent;
    definition
        .moves
        .iter()
        .filter(|mv| gate_passes(mv, agent, ctx))
        .find(|mv| roll(mv.activation_chance, rng))
}
