//! JSON entry points.
//!
//! Requests carry effects as raw JSON so that gate tags are checked by
//! `EffectRegistry::register_json` before typed parsing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::engine::hooks::EffectRegistry;
use crate::engine::simulate_game_with_effects;
use crate::error::{EffectError, SimError};
use crate::models::{GameResult, MetaKey, MetaStore, RuleSet, Team};
use crate::SCHEMA_VERSION;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRequest {
    pub schema_version: u8,
    pub seed: u64,
    pub home: Team,
    pub away: Team,
    /// Defaults to `RuleSet::default()` when absent
    #[serde(default)]
    pub rules: Option<RuleSet>,
    #[serde(default)]
    pub effects: Vec<Value>,
    /// Meta snapshot to start from. Loaded clean.
    #[serde(default)]
    pub meta: Option<MetaStore>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResponse {
    pub schema_version: u8,
    pub result: GameResult,
    pub meta: MetaStore,
    /// Keys written during this game, for persistence
    pub dirty_keys: Vec<MetaKey>,
}

/// Register raw effect definitions in order.
pub fn build_registry(effects: &[Value]) -> Result<EffectRegistry, EffectError> {
    let mut registry = EffectRegistry::new();
    for raw in effects {
        registry.register_json(raw)?;
    }
    Ok(registry)
}

/// Run a parsed request.
pub fn simulate_request(request: GameRequest) -> Result<GameResponse, SimError> {
    if request.schema_version != SCHEMA_VERSION {
        return Err(SimError::UnsupportedSchema(request.schema_version));
    }

    let GameRequest { seed, home, away, rules, effects, meta, .. } = request;
    let rules = rules.unwrap_or_default();
    let registry = build_registry(&effects)?;
    let mut meta = meta.unwrap_or_default();
    meta.clear_dirty();

    let result = simulate_game_with_effects(&home, &away, &rules, seed, registry.effects(), &mut meta)?;
    let dirty_keys: Vec<MetaKey> = meta.dirty_keys().cloned().collect();
    debug!(seed, effects = registry.len(), dirty = dirty_keys.len(), "json request served");

    Ok(GameResponse { schema_version: SCHEMA_VERSION, result, meta, dirty_keys })
}

/// Simulate a game from a JSON request string.
///
/// # Example
/// ```json
/// {
///   "schema_version": 1,
///   "seed": 42,
///   "home": { "id": "owls", "name": "Owls", "agents": [...] },
///   "away": { "id": "foxes", "name": "Foxes", "agents": [...] },
///   "rules": { "elam_margin": 9 },
///   "effects": [
///     { "id": "rim_boost", "hook": "pre_shot",
///       "gate": { "type": "shot_zone", "zone": "at_rim" },
///       "action": { "action": "modify_probability", "delta": 0.05 } }
///   ]
/// }
/// ```
pub fn simulate_game_json(request_json: &str) -> Result<String, SimError> {
    let request: GameRequest = serde_json::from_str(request_json)?;
    let response = simulate_request(request)?;
    Ok(serde_json::to_string(&response)?)
}

/// JSON schema of `RuleSet`.
pub fn rule_set_schema_json() -> Result<String, SimError> {
    let schema = schemars::schema_for!(RuleSet);
    Ok(serde_json::to_string_pretty(&schema)?)
}
