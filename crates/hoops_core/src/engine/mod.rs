//! Simulation engine.
//!
//! `game` drives the phases, `possession` resolves one trip down the floor,
//! and the remaining modules are the pieces it calls in order. Every random
//! decision draws from the single game RNG threaded through these calls.

pub mod defense;
pub mod game;
pub mod hooks;
pub mod moves;
pub mod possession;
pub mod probability;
pub mod state;

#[cfg(test)]
mod simulation_tests;

pub use game::{simulate_game, simulate_game_with_effects, validate_inputs, GamePhase};
pub use possession::simulate_possession;
pub use state::{AgentState, GameState, TeamState};
