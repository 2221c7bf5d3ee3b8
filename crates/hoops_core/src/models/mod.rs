//! Input and output data model.
//!
//! Inputs (`Agent`, `Team`, `RuleSet`, `Move`) are read-only during a
//! simulation. `MetaStore` is the one borrowed-mutable input. Outputs live in
//! `result`.

pub mod agent;
pub mod meta;
pub mod moves;
pub mod result;
pub mod rules;
pub mod team;
pub mod zone;

pub use agent::{Agent, AgentId, Attribute, Attributes, ATTRIBUTE_BUDGET, ATTRIBUTE_MAX};
pub use meta::{EntityKind, MetaEntry, MetaField, MetaKey, MetaStore, MetaValue};
pub use moves::{Move, MoveSituation};
pub use result::{
    BoxScoreLine, DramaFlags, FoulRecord, GameResult, Matchup, NarrativeNote, PlayAction,
    PossessionLog, PossessionOutcome, QuarterScore, ReboundRecord, SchemeKind, ShotRecord,
    TurnoverKind,
};
pub use rules::RuleSet;
pub use team::{Team, TeamSide, Venue, TEAM_SIZE};
pub use zone::ShotZone;
