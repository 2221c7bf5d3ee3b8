//! # hoops_core - Deterministic 3-on-3 Possession Simulator
//!
//! Simulates a basketball-like game between two small rosters one possession
//! at a time, with every random decision drawn from a single seeded RNG.
//! Governance-authored effects attach to fixed hook points and may change
//! probabilities, scores, stamina and a persistent meta store.
//!
//! ## Features
//! - Same inputs and seed produce byte-identical results
//! - Three timed quarters followed by an untimed Elam period
//! - Defensive schemes, optimal matchups, stamina and fouls
//! - Typed effect gates validated at registration
//! - JSON API and parallel round simulation

// Struct initialization pattern used intentionally
#![allow(clippy::field_reassign_with_default)]
// Possession resolution threads game, rules, hooks and RNG together
#![allow(clippy::too_many_arguments)]

pub mod api;
pub mod engine;
pub mod error;
pub mod models;

pub use api::{
    rule_set_schema_json, simulate_game_json, simulate_round, Fixture, GameRequest, GameResponse, RoundGame,
};
pub use engine::hooks::{EffectDefinition, EffectRegistry, HookPoint, RegisteredEffect};
pub use engine::{simulate_game, simulate_game_with_effects};
pub use error::{EffectError, Result, RuleError, SimError};
pub use models::{Agent, Attributes, GameResult, MetaStore, RuleSet, Team, TeamSide};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const SCHEMA_VERSION: u8 = 1;
