use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::agent::Attribute;
use super::zone::ShotZone;

/// Situational half of a move gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MoveSituation {
    #[default]
    Always,
    LastShotMissed,
    LastShotMade,
    ElamPeriod,
    Trailing,
    Leading,
    /// Shooter stamina below 0.5
    LowStamina,
    /// Elam period with either team within 5 points of the target
    Clutch,
}

/// A named special ability attached to an agent.
///
/// The move fires when `attribute >= threshold`, the situation holds, the
/// shot zone matches (if restricted) and the activation roll succeeds. An
/// active move only shifts the shot probability; it never grants a roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Move {
    pub name: String,
    pub attribute: Attribute,
    pub threshold: u8,
    #[serde(default)]
    pub situation: MoveSituation,
    /// Chance to activate once the gate passes (0.0..=1.0)
    pub activation_chance: f64,
    /// Additive shot probability modifier (may be negative)
    pub modifier: f64,
    /// Only usable for this zone when set
    #[serde(default)]
    pub zone: Option<ShotZone>,
}

impl Move {
    pub fn new(name: impl Into<String>, attribute: Attribute, threshold: u8, modifier: f64) -> Self {
        Self {
            name: name.into(),
            attribute,
            threshold,
            situation: MoveSituation::Always,
            activation_chance: 1.0,
            modifier,
            zone: None,
        }
    }

    pub fn with_situation(mut self, situation: MoveSituation) -> Self {
        self.situation = situation;
        self
    }

    pub fn with_chance(mut self, chance: f64) -> Self {
        self.activation_chance = chance;
        self
    }

    pub fn for_zone(mut self, zone: ShotZone) -> Self {
        self.zone = Some(zone);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("move name is empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.activation_chance) {
            return Err(format!("activation_chance {} outside 0..=1", self.activation_chance));
        }
        if !self.modifier.is_finite() || self.modifier.abs() > 1.0 {
            return Err(format!("modifier {} outside -1..=1", self.modifier));
        }
        if self.zone == Some(ShotZone::FreeThrow) {
            return Err("moves cannot target free throws".to_string());
        }
        Ok(())
    }

    /// Canonical moves handed out at generation time.
    pub fn heat_check() -> Self {
        Move::new("Heat Check", Attribute::Ego, 60, 0.15)
            .with_situation(MoveSituation::LastShotMade)
            .with_chance(0.5)
    }

    pub fn ankle_breaker() -> Self {
        Move::new("Ankle Breaker", Attribute::Speed, 65, 0.12).for_zone(ShotZone::AtRim).with_chance(0.35)
    }

    pub fn iron_will() -> Self {
        Move::new("Iron Will", Attribute::Stamina, 60, 0.08)
            .with_situation(MoveSituation::LowStamina)
            .with_chance(0.6)
    }

    pub fn wild_card() -> Self {
        Move::new("Wild Card", Attribute::ChaoticAlignment, 70, 0.25).with_chance(0.2)
    }

    pub fn fate_kissed() -> Self {
        Move::new("Fate Kissed", Attribute::Fate, 60, 0.2)
            .with_situation(MoveSituation::Clutch)
            .with_chance(0.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_moves_are_valid() {
        for mv in [
            Move::heat_check(),
            Move::ankle_breaker(),
            Move::iron_will(),
            Move::wild_card(),
            Move::fate_kissed(),
        ] {
            assert!(mv.validate().is_ok(), "{} should validate", mv.name);
        }
    }

    #[test]
    fn test_invalid_chance_rejected() {
        let mv = Move::new("Broken", Attribute::Scoring, 10, 0.1).with_chance(1.5);
        assert!(mv.validate().is_err());
    }

    #[test]
    fn test_move_deserializes_with_defaults() {
        let json = r#"{"name":"Floater","attribute":"iq","threshold":55,
                       "activation_chance":0.3,"modifier":0.1}"#;
        let mv: Move = serde_json::from_str(json).unwrap();
        assert_eq!(mv.situation, MoveSituation::Always);
        assert_eq!(mv.zone, None);
    }
}
