use thiserror::Error;

/// Errors raised while building or updating a [`RuleSet`](crate::models::RuleSet).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("Rule validation failed: {0}")]
    Validation(String),

    #[error("Unknown rule parameter: {0}")]
    UnknownParam(String),

    #[error("Invalid value for rule parameter '{name}': {reason}")]
    InvalidValue { name: String, reason: String },
}

impl From<validator::ValidationErrors> for RuleError {
    fn from(errors: validator::ValidationErrors) -> Self {
        RuleError::Validation(errors.to_string())
    }
}

/// Errors raised by effect registration and gate evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EffectError {
    #[error("Effect '{effect_id}' uses unknown gate type '{kind}'")]
    UnknownGate { effect_id: String, kind: String },

    #[error("Effect '{effect_id}' has a gate without a `type` tag")]
    MissingGateType { effect_id: String },

    #[error("Invalid effect definition '{effect_id}': {reason}")]
    InvalidDefinition { effect_id: String, reason: String },

    #[error("Effect id '{0}' is already registered")]
    DuplicateId(String),

    #[error("Meta value for '{key}' cannot be compared: {reason}")]
    MetaTypeMismatch { key: String, reason: String },
}

/// Top-level error for simulation entry points.
///
/// Every variant is a caller contract violation detected before the first
/// RNG draw. Once a game starts it runs to completion.
#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Rules(#[from] RuleError),

    #[error(transparent)]
    Effect(#[from] EffectError),

    #[error("Invalid team: {0}")]
    InvalidTeam(String),

    #[error("Invalid agent: {0}")]
    InvalidAgent(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported schema version: {0}")]
    UnsupportedSchema(u8),
}

pub type Result<T> = std::result::Result<T, SimError>;
