//! Governable rule parameters.
//!
//! The `RuleSet` is the only channel through which governance changes
//! simulation behavior for parameter-level changes. Every field is a named,
//! typed, range-checked parameter; `set_param` updates one by name.
//!
//! ## Presets
//! ```rust
//! use hoops_core::models::RuleSet;
//!
//! let rules = RuleSet::default();
//! let shootout = RuleSet::high_scoring();
//! assert!(shootout.check().is_ok() && rules.check().is_ok());
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::zone::ShotZone;
use crate::error::RuleError;

/// Flat, range-validated rule parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(default)]
pub struct RuleSet {
    // === Game structure ===
    /// Possessions per timed quarter (both teams combined)
    #[validate(range(min = 1, max = 100))]
    pub quarter_possessions: u32,
    /// Fictional seconds per timed quarter
    #[validate(range(min = 60, max = 1200))]
    pub quarter_seconds: u32,
    #[validate(range(min = 5, max = 60))]
    pub shot_clock_seconds: u32,
    /// Elam target = leading score after Q3 + margin
    #[validate(range(min = 0, max = 50))]
    pub elam_margin: u32,
    /// Hard bound on Elam possessions
    #[validate(range(min = 1, max = 1000))]
    pub safety_cap_possessions: u32,

    // === Point values ===
    #[validate(range(min = 0, max = 20))]
    pub at_rim_value: u32,
    #[validate(range(min = 0, max = 20))]
    pub mid_range_value: u32,
    #[validate(range(min = 0, max = 20))]
    pub three_point_value: u32,
    #[validate(range(min = 0, max = 20))]
    pub free_throw_value: u32,

    // === Logistic curves (midpoint on the 0..100 composite, slope k) ===
    #[validate(range(min = 0.0, max = 100.0))]
    pub at_rim_midpoint: f64,
    #[validate(range(min = 0.001, max = 1.0))]
    pub at_rim_k: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub mid_range_midpoint: f64,
    #[validate(range(min = 0.001, max = 1.0))]
    pub mid_range_k: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub three_point_midpoint: f64,
    #[validate(range(min = 0.001, max = 1.0))]
    pub three_point_k: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub free_throw_midpoint: f64,
    #[validate(range(min = 0.001, max = 1.0))]
    pub free_throw_k: f64,
    /// Composite points removed per unit of defender contest
    #[validate(range(min = 0.0, max = 100.0))]
    pub contest_weight: f64,
    /// Probability bonus for the home side (scaled by venue)
    #[validate(range(min = 0.0, max = 0.2))]
    pub home_court_advantage: f64,

    // === Stamina ===
    #[validate(range(min = 0.0, max = 0.5))]
    pub stamina_drain_per_possession: f64,
    #[validate(range(min = 0.0, max = 0.5))]
    pub ball_handler_drain: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub stamina_floor: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub halftime_recovery: f64,
    #[validate(range(min = 0.0, max = 0.5))]
    pub bench_recovery_per_possession: f64,
    /// Starters below this stamina are subbed at halftime
    #[validate(range(min = 0.0, max = 1.0))]
    pub substitution_threshold: f64,

    // === Event rates ===
    #[validate(range(min = 0.0, max = 1.0))]
    pub turnover_rate: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub shot_clock_violation_rate: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub foul_rate: f64,
    #[validate(range(min = 1, max = 20))]
    pub personal_foul_limit: u32,
    #[validate(range(min = 0.0, max = 1.0))]
    pub offensive_rebound_rate: f64,
    #[validate(range(min = 0, max = 5))]
    pub max_offensive_rebounds: u32,

    // === Defense ===
    /// Std-dev of the matchup cost noise
    #[validate(range(min = 0.0, max = 20.0))]
    pub matchup_variance: f64,
    /// Exponent applied to scheme weights in the Elam period
    #[validate(range(min = 1.0, max = 5.0))]
    pub elam_commitment: f64,
    pub allow_man_tight: bool,
    pub allow_man_switch: bool,
    pub allow_zone: bool,
    pub allow_press: bool,

    pub moves_enabled: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            quarter_possessions: 15,
            quarter_seconds: 600,
            shot_clock_seconds: 15,
            elam_margin: 13,
            safety_cap_possessions: 200,

            at_rim_value: 2,
            mid_range_value: 2,
            three_point_value: 3,
            free_throw_value: 1,

            at_rim_midpoint: 30.0,
            at_rim_k: 0.05,
            mid_range_midpoint: 40.0,
            mid_range_k: 0.045,
            three_point_midpoint: 50.0,
            three_point_k: 0.04,
            free_throw_midpoint: 25.0,
            free_throw_k: 0.05,
            contest_weight: 25.0,
            home_court_advantage: 0.01,

            stamina_drain_per_possession: 0.008,
            ball_handler_drain: 0.004,
            stamina_floor: 0.15,
            halftime_recovery: 0.25,
            bench_recovery_per_possession: 0.01,
            substitution_threshold: 0.35,

            turnover_rate: 0.08,
            shot_clock_violation_rate: 0.02,
            foul_rate: 0.08,
            personal_foul_limit: 6,
            offensive_rebound_rate: 0.25,
            max_offensive_rebounds: 2,

            matchup_variance: 2.0,
            elam_commitment: 1.5,
            allow_man_tight: true,
            allow_man_switch: true,
            allow_zone: true,
            allow_press: true,

            moves_enabled: true,
        }
    }
}

impl RuleSet {
    /// Faster, looser games: easier shots and a wider Elam window.
    pub fn high_scoring() -> Self {
        let mut rules = Self::default();
        rules.at_rim_midpoint = 24.0;
        rules.mid_range_midpoint = 34.0;
        rules.three_point_midpoint = 44.0;
        rules.contest_weight = 18.0;
        rules.elam_margin = 21;
        rules.allow_zone = false;
        rules
    }

    /// Physical games: stronger contests, more fouls, heavier legs.
    pub fn grind() -> Self {
        let mut rules = Self::default();
        rules.contest_weight = 32.0;
        rules.foul_rate = 0.12;
        rules.stamina_drain_per_possession = 0.012;
        rules.shot_clock_seconds = 12;
        rules.elam_margin = 9;
        rules
    }

    /// Named preset lookup (`default`, `high_scoring`, `grind`).
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "default" | "" => Some(Self::default()),
            "high_scoring" | "shootout" => Some(Self::high_scoring()),
            "grind" => Some(Self::grind()),
            _ => None,
        }
    }

    /// Range checks plus cross-field invariants.
    pub fn check(&self) -> Result<(), RuleError> {
        self.validate()?;
        if !(self.allow_man_tight || self.allow_man_switch || self.allow_zone || self.allow_press) {
            return Err(RuleError::Validation("at least one defensive scheme must be legal".into()));
        }
        if self.stamina_floor >= 1.0 {
            return Err(RuleError::Validation("stamina_floor must be below 1.0".into()));
        }
        Ok(())
    }

    /// Every governable parameter name (sorted).
    pub fn param_names() -> Vec<String> {
        match serde_json::to_value(Self::default()) {
            Ok(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Current value of a parameter by name.
    pub fn get_param(&self, name: &str) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.get(name).cloned(),
            _ => None,
        }
    }

    /// Typed, validated update of one parameter by name.
    ///
    /// Leaves `self` untouched when the name is unknown, the value has the
    /// wrong type, or the result fails [`RuleSet::check`].
    pub fn set_param(&mut self, name: &str, value: Value) -> Result<(), RuleError> {
        let Value::Object(mut map) = serde_json::to_value(&*self).map_err(|e| {
            RuleError::InvalidValue { name: name.to_string(), reason: e.to_string() }
        })?
        else {
            return Err(RuleError::UnknownParam(name.to_string()));
        };
        if !map.contains_key(name) {
            return Err(RuleError::UnknownParam(name.to_string()));
        }
        map.insert(name.to_string(), value);

        let updated: RuleSet = serde_json::from_value(Value::Object(map))
            .map_err(|e| RuleError::InvalidValue { name: name.to_string(), reason: e.to_string() })?;
        updated.check()?;
        *self = updated;
        Ok(())
    }

    /// Points awarded for a made shot from `zone`.
    pub fn points_for(&self, zone: ShotZone) -> u32 {
        match zone {
            ShotZone::AtRim => self.at_rim_value,
            ShotZone::MidRange => self.mid_range_value,
            ShotZone::ThreePoint => self.three_point_value,
            ShotZone::FreeThrow => self.free_throw_value,
        }
    }

    /// `(midpoint, k)` of the logistic curve for `zone`.
    pub fn curve_for(&self, zone: ShotZone) -> (f64, f64) {
        match zone {
            ShotZone::AtRim => (self.at_rim_midpoint, self.at_rim_k),
            ShotZone::MidRange => (self.mid_range_midpoint, self.mid_range_k),
            ShotZone::ThreePoint => (self.three_point_midpoint, self.three_point_k),
            ShotZone::FreeThrow => (self.free_throw_midpoint, self.free_throw_k),
        }
    }

    /// Free throws awarded for a shooting foul on a missed attempt.
    pub fn free_throws_for(&self, zone: ShotZone) -> u32 {
        match zone {
            ShotZone::ThreePoint => 3,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_and_presets_are_valid() {
        assert!(RuleSet::default().check().is_ok());
        assert!(RuleSet::high_scoring().check().is_ok());
        assert!(RuleSet::grind().check().is_ok());
        assert!(RuleSet::preset("shootout").is_some());
        assert!(RuleSet::preset("nope").is_none());
    }

    #[test]
    fn test_set_param_by_name() {
        let mut rules = RuleSet::default();
        rules.set_param("three_point_value", json!(10)).unwrap();
        assert_eq!(rules.three_point_value, 10);
        assert_eq!(rules.points_for(ShotZone::ThreePoint), 10);
        assert_eq!(rules.get_param("three_point_value"), Some(json!(10)));
    }

    #[test]
    fn test_set_param_rejects_unknown_name() {
        let mut rules = RuleSet::default();
        let err = rules.set_param("four_point_line", json!(4)).unwrap_err();
        assert_eq!(err, RuleError::UnknownParam("four_point_line".into()));
    }

    #[test]
    fn test_set_param_rejects_out_of_range_and_keeps_state() {
        let mut rules = RuleSet::default();
        assert!(matches!(
            rules.set_param("stamina_drain_per_possession", json!(-0.1)),
            Err(RuleError::Validation(_))
        ));
        assert!(matches!(
            rules.set_param("elam_margin", json!("thirteen")),
            Err(RuleError::InvalidValue { .. })
        ));
        assert_eq!(rules, RuleSet::default());
    }

    #[test]
    fn test_all_schemes_illegal_rejected() {
        let mut rules = RuleSet::default();
        rules.allow_man_tight = false;
        rules.allow_man_switch = false;
        rules.allow_zone = false;
        rules.allow_press = false;
        assert!(rules.check().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let rules: RuleSet = serde_json::from_str(r#"{"elam_margin": 7}"#).unwrap();
        assert_eq!(rules.elam_margin, 7);
        assert_eq!(rules.quarter_possessions, RuleSet::default().quarter_possessions);
    }

    #[test]
    fn test_param_names_cover_struct() {
        let names = RuleSet::param_names();
        assert!(names.contains(&"safety_cap_possessions".to_string()));
        assert!(names.contains(&"allow_press".to_string()));
        assert_eq!(names.len(), 38);
    }

    #[test]
    fn test_default_matches_own_json_schema() {
        let schema = serde_json::to_value(schemars::schema_for!(RuleSet)).unwrap();
        let compiled = jsonschema::JSONSchema::compile(&schema).expect("schema compiles");
        let instance = serde_json::to_value(RuleSet::default()).unwrap();
        assert!(compiled.is_valid(&instance));

        let mut broken = instance.clone();
        broken["quarter_possessions"] = json!(-1);
        assert!(!compiled.is_valid(&broken));
    }
}
