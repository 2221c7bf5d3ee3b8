use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::moves::Move;
use crate::error::SimError;

/// Total attribute points every agent is built from.
pub const ATTRIBUTE_BUDGET: u32 = 360;

/// Upper bound for a single attribute.
pub const ATTRIBUTE_MAX: u8 = 100;

/// Stable agent identifier (assigned at league seeding time).
pub type AgentId = String;

/// The nine agent attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Scoring,
    Passing,
    Defense,
    Speed,
    Stamina,
    Iq,
    Ego,
    ChaoticAlignment,
    Fate,
}

impl Attribute {
    pub const ALL: [Attribute; 9] = [
        Attribute::Scoring,
        Attribute::Passing,
        Attribute::Defense,
        Attribute::Speed,
        Attribute::Stamina,
        Attribute::Iq,
        Attribute::Ego,
        Attribute::ChaoticAlignment,
        Attribute::Fate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Scoring => "scoring",
            Attribute::Passing => "passing",
            Attribute::Defense => "defense",
            Attribute::Speed => "speed",
            Attribute::Stamina => "stamina",
            Attribute::Iq => "iq",
            Attribute::Ego => "ego",
            Attribute::ChaoticAlignment => "chaotic_alignment",
            Attribute::Fate => "fate",
        }
    }
}

/// Raw attribute block (each 0..=100, summing to [`ATTRIBUTE_BUDGET`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Attributes {
    pub scoring: u8,
    pub passing: u8,
    pub defense: u8,
    pub speed: u8,
    pub stamina: u8,
    pub iq: u8,
    pub ego: u8,
    pub chaotic_alignment: u8,
    pub fate: u8,
}

impl Default for Attributes {
    /// Median agent: every attribute at 40.
    fn default() -> Self {
        Self::uniform(40)
    }
}

impl Attributes {
    pub fn uniform(value: u8) -> Self {
        Self {
            scoring: value,
            passing: value,
            defense: value,
            speed: value,
            stamina: value,
            iq: value,
            ego: value,
            chaotic_alignment: value,
            fate: value,
        }
    }

    pub fn get(&self, attribute: Attribute) -> u8 {
        match attribute {
            Attribute::Scoring => self.scoring,
            Attribute::Passing => self.passing,
            Attribute::Defense => self.defense,
            Attribute::Speed => self.speed,
            Attribute::Stamina => self.stamina,
            Attribute::Iq => self.iq,
            Attribute::Ego => self.ego,
            Attribute::ChaoticAlignment => self.chaotic_alignment,
            Attribute::Fate => self.fate,
        }
    }

    pub fn total(&self) -> u32 {
        Attribute::ALL.iter().map(|a| self.get(*a) as u32).sum()
    }
}

/// Immutable agent definition. Read-only during simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub attributes: Attributes,
    #[serde(default)]
    pub moves: Vec<Move>,
}

impl Agent {
    pub fn new(id: impl Into<String>, name: impl Into<String>, attributes: Attributes) -> Self {
        Self { id: id.into(), name: name.into(), attributes, moves: Vec::new() }
    }

    pub fn with_move(mut self, mv: Move) -> Self {
        self.moves.push(mv);
        self
    }

    /// Checks id, per-attribute range and the roster budget.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.id.trim().is_empty() {
            return Err(SimError::InvalidAgent(format!("agent '{}' has an empty id", self.name)));
        }
        if let Some(attr) =
            Attribute::ALL.iter().find(|a| self.attributes.get(**a) > ATTRIBUTE_MAX)
        {
            return Err(SimError::InvalidAgent(format!(
                "agent '{}': {} = {} exceeds {}",
                self.id,
                attr.name(),
                self.attributes.get(*attr),
                ATTRIBUTE_MAX
            )));
        }
        let total = self.attributes.total();
        if total != ATTRIBUTE_BUDGET {
            return Err(SimError::InvalidAgent(format!(
                "agent '{}': attributes sum to {}, expected {}",
                self.id, total, ATTRIBUTE_BUDGET
            )));
        }
        for mv in &self.moves {
            mv.validate().map_err(|reason| {
                SimError::InvalidAgent(format!("agent '{}' move '{}': {}", self.id, mv.name, reason))
            })?;
        }
        Ok(())
    }
}
