use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive time window during which a pack accepts scores.
/// Immutable once scoring begins.
#[derive(Debug, Clone, Copy)]
pub struct PackWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PackWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// Scoring-modifier rule for one (pack, beatmap) pair.
///
/// `exact_mods` selects the policy: when true the score's mod set must match
/// `required_mods` exactly; when false any superset qualifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapRule {
    pub required_mods: Vec<String>,
    pub multiplier: f64,
    pub exact_mods: bool,
}

/// One map of a pack as submitted by the import tool. Maps without a rule
/// are still part of the pack; their scores pass through unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackMapEntry {
    pub beatmap_id: i64,
    #[serde(default)]
    pub rule: Option<MapRule>,
}
