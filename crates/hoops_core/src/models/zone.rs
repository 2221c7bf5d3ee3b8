use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where a shot is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShotZone {
    AtRim,
    MidRange,
    ThreePoint,
    FreeThrow,
}

impl ShotZone {
    /// Field-goal zones (free throws excluded).
    pub const FIELD_GOALS: [ShotZone; 3] = [ShotZone::AtRim, ShotZone::MidRange, ShotZone::ThreePoint];

    pub fn name(&self) -> &'static str {
        match self {
            ShotZone::AtRim => "at_rim",
            ShotZone::MidRange => "mid_range",
            ShotZone::ThreePoint => "three_point",
            ShotZone::FreeThrow => "free_throw",
        }
    }

    pub fn is_field_goal(&self) -> bool {
        !matches!(self, ShotZone::FreeThrow)
    }
}
