//! Governed rule hooks.
//!
//! ```text
//! governance JSON ──▶ EffectRegistry::register_json ──▶ [RegisteredEffect]
//!                                                            │
//!   orchestrator / possession ── HookContext ──▶ HookRuntime::run
//!                                                            │
//!              for each effect:  HookContext::refresh ◀── GameState
//!                                HookEngine::fire_effect ──▶ MetaStore
//!                                apply_mutations ──▶ GameState
//! ```
//!
//! Fixed evaluation order: hook points fire in game order, effects at one
//! point in registration order.

pub mod engine;
pub mod gate;
pub mod registry;
pub mod types;

pub use engine::{apply_mutations, AppliedMutations, FiredEffect, HookEngine, HookOutcome, HookRuntime, Mutation};
pub use gate::{evaluate_gate, resolve_meta_target, HookContext, MetaLookup};
pub use registry::EffectRegistry;
pub use types::{
    Comparison, DifferentialSide, EffectAction, EffectDefinition, EffectStep, Gate, HookPoint, MetaOp,
    MetaScope, MetaTarget, RegisteredEffect, StaminaTarget, StreakKind, TeamTarget,
};
