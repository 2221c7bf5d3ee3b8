//! Typed key/value side channel shared between games.
//!
//! Keys are `(entity kind, entity id, field)`. Known fields are enum
//! variants; governance-authored fields fall back to `MetaField::Custom`.
//! Every write records its key in an explicit dirty set so the caller can
//! persist only what changed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// What kind of entity a meta key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Game,
    Team,
    Agent,
}

/// Meta fields. `Custom` carries open-ended governance-authored names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaField {
    Momentum,
    Morale,
    Swagger,
    HotHand,
    Curse,
    Custom(String),
}

impl fmt::Display for MetaField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MetaField::Momentum => write!(f, "momentum"),
            MetaField::Morale => write!(f, "morale"),
            MetaField::Swagger => write!(f, "swagger"),
            MetaField::HotHand => write!(f, "hot_hand"),
            MetaField::Curse => write!(f, "curse"),
            MetaField::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

/// Fully resolved store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetaKey {
    pub kind: EntityKind,
    pub entity_id: String,
    pub field: MetaField,
}

impl MetaKey {
    pub fn new(kind: EntityKind, entity_id: impl Into<String>, field: MetaField) -> Self {
        Self { kind, entity_id: entity_id.into(), field }
    }

    pub fn team(team_id: impl Into<String>, field: MetaField) -> Self {
        Self::new(EntityKind::Team, team_id, field)
    }

    pub fn agent(agent_id: impl Into<String>, field: MetaField) -> Self {
        Self::new(EntityKind::Agent, agent_id, field)
    }
}

impl fmt::Display for MetaKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}/{}/{}", self.kind, self.entity_id, self.field)
    }
}

/// Typed meta value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetaValue {
    /// Numeric view (bools count as 0/1). `None` for text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            MetaValue::Int(i) => Some(*i as f64),
            MetaValue::Float(x) => Some(*x),
            MetaValue::Text(_) => None,
        }
    }

    /// `current + by` with int preservation (missing counts as 0). `None`
    /// when `current` is text.
    pub fn incremented(current: Option<&MetaValue>, by: f64) -> Option<MetaValue> {
        let integral = by.fract() == 0.0;
        match current {
            None if integral => Some(MetaValue::Int(by as i64)),
            None => Some(MetaValue::Float(by)),
            Some(MetaValue::Int(i)) if integral => Some(MetaValue::Int(i + by as i64)),
            Some(MetaValue::Text(_)) => None,
            Some(other) => Some(MetaValue::Float(other.as_f64().unwrap_or(0.0) + by)),
        }
    }

    /// Boolean negation of `current`'s truthiness (missing becomes `true`).
    pub fn toggled(current: Option<&MetaValue>) -> MetaValue {
        MetaValue::Bool(!current.map_or(false, MetaValue::is_truthy))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            MetaValue::Bool(b) => *b,
            MetaValue::Int(i) => *i != 0,
            MetaValue::Float(x) => *x != 0.0,
            MetaValue::Text(s) => !s.is_empty(),
        }
    }
}

/// One stored entry (serialized form of the store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaEntry {
    pub key: MetaKey,
    pub value: MetaValue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MetaSnapshot {
    #[serde(default)]
    entries: Vec<MetaEntry>,
    #[serde(default)]
    dirty: Vec<MetaKey>,
}

/// Per-game (or per-round) meta store with dirty tracking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "MetaSnapshot", into = "MetaSnapshot")]
pub struct MetaStore {
    values: BTreeMap<MetaKey, MetaValue>,
    dirty: BTreeSet<MetaKey>,
}

impl From<MetaSnapshot> for MetaStore {
    fn from(snapshot: MetaSnapshot) -> Self {
        let values = snapshot.entries.into_iter().map(|e| (e.key, e.value)).collect();
        Self { values, dirty: snapshot.dirty.into_iter().collect() }
    }
}

impl From<MetaStore> for MetaSnapshot {
    fn from(store: MetaStore) -> Self {
        Self {
            entries: store.values.into_iter().map(|(key, value)| MetaEntry { key, value }).collect(),
            dirty: store.dirty.into_iter().collect(),
        }
    }
}

impl MetaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate with prior state. Loaded keys are not dirty.
    pub fn load<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (MetaKey, MetaValue)>,
    {
        self.values.extend(entries);
    }

    pub fn get(&self, key: &MetaKey) -> Option<&MetaValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Write a value and mark the key dirty.
    pub fn set(&mut self, key: MetaKey, value: MetaValue) {
        self.dirty.insert(key.clone());
        self.values.insert(key, value);
    }

    pub fn remove(&mut self, key: &MetaKey) -> Option<MetaValue> {
        let removed = self.values.remove(key);
        if removed.is_some() {
            self.dirty.insert(key.clone());
        }
        removed
    }

    /// Keys touched since the last `clear_dirty`, in key order.
    pub fn dirty_keys(&self) -> impl Iterator<Item = &MetaKey> {
        self.dirty.iter()
    }

    pub fn is_dirty(&self, key: &MetaKey) -> bool {
        self.dirty.contains(key)
    }

    /// Dirty keys with their current values (`None` for removed keys).
    pub fn dirty_entries(&self) -> Vec<(MetaKey, Option<MetaValue>)> {
        self.dirty.iter().map(|k| (k.clone(), self.values.get(k).cloned())).collect()
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Copy every dirty key of `other` into `self` (removals included).
    ///
    /// Used to fold per-game stores back into a round-level store after
    /// parallel simulation.
    pub fn merge_dirty_from(&mut self, other: &MetaStore) {
        for (key, value) in other.dirty_entries() {
            match value {
                Some(value) => self.set(key, value),
                None => {
                    self.values.remove(&key);
                    self.dirty.insert(key);
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MetaKey, &MetaValue)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn momentum(team: &str) -> MetaKey {
        MetaKey::team(team, MetaField::Momentum)
    }

    #[test]
    fn test_load_is_clean_and_set_is_dirty() {
        let mut store = MetaStore::new();
        store.load([(momentum("a"), MetaValue::Int(2))]);
        assert_eq!(store.dirty_keys().count(), 0);

        store.set(momentum("b"), MetaValue::Int(1));
        assert!(store.is_dirty(&momentum("b")));
        assert!(!store.is_dirty(&momentum("a")));
    }

    #[test]
    fn test_increment_keeps_ints() {
        let one = MetaValue::incremented(None, 1.0);
        assert_eq!(one, Some(MetaValue::Int(1)));
        let three = MetaValue::incremented(one.as_ref(), 2.0);
        assert_eq!(three, Some(MetaValue::Int(3)));
        assert_eq!(MetaValue::incremented(three.as_ref(), 0.5), Some(MetaValue::Float(3.5)));
        assert_eq!(MetaValue::incremented(Some(&MetaValue::Float(1.5)), 1.0), Some(MetaValue::Float(2.5)));
        assert_eq!(MetaValue::incremented(Some(&MetaValue::Text("go".into())), 1.0), None);
    }

    #[test]
    fn test_toggle() {
        let on = MetaValue::toggled(None);
        assert_eq!(on, MetaValue::Bool(true));
        assert_eq!(MetaValue::toggled(Some(&on)), MetaValue::Bool(false));
        assert_eq!(MetaValue::toggled(Some(&MetaValue::Int(0))), MetaValue::Bool(true));
        assert_eq!(MetaValue::toggled(Some(&MetaValue::Text("x".into()))), MetaValue::Bool(false));
    }

    #[test]
    fn test_merge_copies_dirty_only() {
        let mut round = MetaStore::new();
        round.load([(momentum("a"), MetaValue::Int(5)), (momentum("b"), MetaValue::Int(5))]);

        let mut game = round.clone();
        game.set(momentum("a"), MetaValue::Int(9));
        game.remove(&momentum("b"));

        let mut untouched = round.clone();
        untouched.load([(momentum("c"), MetaValue::Int(1))]);

        round.merge_dirty_from(&game);
        round.merge_dirty_from(&untouched);
        assert_eq!(round.get(&momentum("a")), Some(&MetaValue::Int(9)));
        assert_eq!(round.get(&momentum("b")), None);
        assert_eq!(round.get(&momentum("c")), None);
        assert_eq!(round.dirty_keys().count(), 2);
    }

    #[test]
    fn test_json_shape_round_trips() {
        let mut store = MetaStore::new();
        store.set(MetaKey::agent("p1", MetaField::Custom("aura".into())), MetaValue::Float(0.5));
        let json = serde_json::to_string(&store).unwrap();
        assert!(json.contains("\"entries\""));
        let back: MetaStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
    }
}
