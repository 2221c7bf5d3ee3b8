//! Effect definition types.
//!
//! Everything here is plain serde data. Definitions arrive as JSON from the
//! governance layer and are validated once by `EffectRegistry`.

use serde::{Deserialize, Serialize};

use crate::models::{Attribute, MetaField, MetaValue, ShotZone};

/// Fixed extension points, in the order they can occur in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPoint {
    PreGame,
    PreQuarter,
    PrePossession,
    PreShot,
    PostShot,
    PostPossession,
    QuarterEnd,
    Halftime,
    ElamStart,
    PostGame,
}

/// Numeric comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    pub fn apply(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Eq => (lhs - rhs).abs() < f64::EPSILON,
            Comparison::Ne => (lhs - rhs).abs() >= f64::EPSILON,
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
        }
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, Comparison::Eq | Comparison::Ne)
    }
}

/// Which lead a `ScoreDifferential` gate looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferentialSide {
    /// Absolute margin, either team ahead
    #[default]
    Either,
    OffenseLeads,
    OffenseTrails,
    HomeLeads,
    AwayLeads,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakKind {
    Makes,
    Misses,
}

/// Whose meta entry a target refers to, resolved against the hook context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetaScope {
    Game,
    Offense,
    Defense,
    Home,
    Away,
    BallHandler,
    Shooter,
    Team { id: String },
    Agent { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTarget {
    pub scope: MetaScope,
    pub field: MetaField,
}

/// Effect condition. Evaluated only by `gate::evaluate_gate`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Gate {
    #[default]
    Always,
    Chance {
        probability: f64,
    },
    QuarterAtLeast {
        quarter: u8,
    },
    ScoreDifferential {
        at_least: u32,
        #[serde(default)]
        side: DifferentialSide,
    },
    /// Offense's most recent field goal (the current one at `PostShot`)
    LastShot {
        made: bool,
    },
    Streak {
        kind: StreakKind,
        at_least: u32,
    },
    MetaCompare {
        target: MetaTarget,
        op: Comparison,
        value: MetaValue,
    },
    HandlerAttribute {
        attribute: Attribute,
        op: Comparison,
        value: f64,
    },
    ShotZone {
        zone: ShotZone,
    },
    InElam,
    All {
        gates: Vec<Gate>,
    },
    Any {
        gates: Vec<Gate>,
    },
    Not {
        gate: Box<Gate>,
    },
}

impl Gate {
    /// Every accepted `type` tag.
    pub const KINDS: [&'static str; 13] = [
        "always",
        "chance",
        "quarter_at_least",
        "score_differential",
        "last_shot",
        "streak",
        "meta_compare",
        "handler_attribute",
        "shot_zone",
        "in_elam",
        "all",
        "any",
        "not",
    ];

    pub fn kind(&self) -> &'static str {
        match self {
            Gate::Always => "always",
            Gate::Chance { .. } => "chance",
            Gate::QuarterAtLeast { .. } => "quarter_at_least",
            Gate::ScoreDifferential { .. } => "score_differential",
            Gate::LastShot { .. } => "last_shot",
            Gate::Streak { .. } => "streak",
            Gate::MetaCompare { .. } => "meta_compare",
            Gate::HandlerAttribute { .. } => "handler_attribute",
            Gate::ShotZone { .. } => "shot_zone",
            Gate::InElam => "in_elam",
            Gate::All { .. } => "all",
            Gate::Any { .. } => "any",
            Gate::Not { .. } => "not",
        }
    }

    pub fn is_known_kind(kind: &str) -> bool {
        Self::KINDS.contains(&kind)
    }
}

/// Team selector for score changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamTarget {
    Offense,
    Defense,
    Home,
    Away,
    /// Team currently ahead (no-op on a tie)
    Leader,
    /// Team currently behind (no-op on a tie)
    Trailer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaminaTarget {
    BallHandler,
    Shooter,
    Offense,
    Defense,
    /// Every on-court agent
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetaOp {
    Set { value: MetaValue },
    Increment { by: f64 },
    Toggle,
}

/// Closed set of effect actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EffectAction {
    ModifyScore { team: TeamTarget, delta: i32 },
    ModifyProbability { delta: f64 },
    ModifyStamina { target: StaminaTarget, delta: f64 },
    WriteMeta { target: MetaTarget, op: MetaOp },
    Narrate { text: String },
    Sequence { steps: Vec<EffectStep> },
}

/// One gated step of a `Sequence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectStep {
    #[serde(default)]
    pub gate: Gate,
    pub action: EffectAction,
}

/// Effect as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDefinition {
    pub id: String,
    pub hook: HookPoint,
    #[serde(default)]
    pub gate: Gate,
    pub action: EffectAction,
    /// Per-game fire limit
    #[serde(default)]
    pub max_fires: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

impl EffectDefinition {
    pub fn new(id: impl Into<String>, hook: HookPoint, action: EffectAction) -> Self {
        Self { id: id.into(), hook, gate: Gate::Always, action, max_fires: None, description: None }
    }

    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_max_fires(mut self, max_fires: u32) -> Self {
        self.max_fires = Some(max_fires);
        self
    }
}

/// A definition that passed registry validation. Only `EffectRegistry`
/// creates these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisteredEffect {
    pub(crate) definition: EffectDefinition,
    pub(crate) order: usize,
}

impl RegisteredEffect {
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn hook(&self) -> HookPoint {
        self.definition.hook
    }

    pub fn definition(&self) -> &EffectDefinition {
        &self.definition
    }

    /// Registration position (evaluation order at a hook point).
    pub fn order(&self) -> usize {
        self.order
    }
}
