pub mod batch;
pub mod json_api;

pub use batch::{merge_round_meta, simulate_round, Fixture, RoundGame};
pub use json_api::{
    build_registry, rule_set_schema_json, simulate_game_json, simulate_request, GameRequest, GameResponse,
};
