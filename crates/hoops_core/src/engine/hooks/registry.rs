//! Effect registration.
//!
//! Definitions are validated once here; the hook engine trusts everything it
//! is handed. Registration order is evaluation order.

use serde_json::Value;
use tracing::debug;

use super::types::{
    EffectAction, EffectDefinition, Gate, HookPoint, MetaOp, MetaScope, MetaTarget, RegisteredEffect,
};
use crate::error::EffectError;
use crate::models::MetaValue;

/// Ordered collection of validated effects.
#[derive(Debug, Clone, Default)]
pub struct EffectRegistry {
    effects: Vec<RegisteredEffect>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a typed definition.
    ///
    /// Ids are stored trimmed, so `"a"` and `" a "` are the same effect.
    pub fn register(&mut self, mut definition: EffectDefinition) -> Result<&RegisteredEffect, EffectError> {
        let id = definition.id.trim();
        if id.is_empty() {
            return Err(EffectError::InvalidDefinition {
                effect_id: definition.id.clone(),
                reason: "id is empty".to_string(),
            });
        }
        definition.id = id.to_string();
        if self.effects.iter().any(|e| e.id() == definition.id) {
            return Err(EffectError::DuplicateId(definition.id));
        }

        let invalid = |reason: String| EffectError::InvalidDefinition { effect_id: definition.id.clone(), reason };
        validate_gate(&definition.gate).map_err(invalid)?;
        validate_action(&definition.action).map_err(invalid)?;
        if definition.max_fires == Some(0) {
            return Err(invalid("max_fires must be at least 1".to_string()));
        }

        debug!(effect = %definition.id, hook = ?definition.hook, "effect registered");
        let order = self.effects.len();
        self.effects.push(RegisteredEffect { definition, order });
        Ok(&self.effects[order])
    }

    /// Register from raw JSON.
    ///
    /// Every `gate` / `gates` entry is checked for a known `type` tag before
    /// typed parsing, so an unknown gate is reported as `UnknownGate` rather
    /// than a generic parse failure.
    pub fn register_json(&mut self, raw: &Value) -> Result<&RegisteredEffect, EffectError> {
        let effect_id = raw.get("id").and_then(Value::as_str).unwrap_or("<unnamed>").to_string();
        check_gate_tags(raw, &effect_id)?;
        let definition: EffectDefinition = serde_json::from_value(raw.clone())
            .map_err(|e| EffectError::InvalidDefinition { effect_id, reason: e.to_string() })?;
        self.register(definition)
    }

    pub fn effects(&self) -> &[RegisteredEffect] {
        &self.effects
    }

    pub fn into_effects(self) -> Vec<RegisteredEffect> {
        self.effects
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Effects attached to `point`, in registration order.
    pub fn for_hook(&self, point: HookPoint) -> impl Iterator<Item = &RegisteredEffect> {
        self.effects.iter().filter(move |e| e.hook() == point)
    }
}

fn check_gate_tags(value: &Value, effect_id: &str) -> Result<(), EffectError> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match key.as_str() {
                    "gate" => check_gate_object(child, effect_id)?,
                    "gates" => {
                        if let Value::Array(items) = child {
                            for item in items {
                                check_gate_object(item, effect_id)?;
                            }
                        }
                    }
                    _ => {}
                }
                check_gate_tags(child, effect_id)?;
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(|item| check_gate_tags(item, effect_id)),
        _ => Ok(()),
    }
}

fn check_gate_object(gate: &Value, effect_id: &str) -> Result<(), EffectError> {
    if !gate.is_object() {
        return Ok(());
    }
    match gate.get("type").and_then(Value::as_str) {
        None => Err(EffectError::MissingGateType { effect_id: effect_id.to_string() }),
        Some(kind) if !Gate::is_known_kind(kind) => {
            Err(EffectError::UnknownGate { effect_id: effect_id.to_string(), kind: kind.to_string() })
        }
        Some(_) => Ok(()),
    }
}

fn validate_gate(gate: &Gate) -> Result<(), String> {
    match gate {
        Gate::Chance { probability } => {
            if !(0.0..=1.0).contains(probability) {
                return Err(format!("chance probability {probability} outside 0..=1"));
            }
            Ok(())
        }
        Gate::HandlerAttribute { value, .. } if !value.is_finite() => {
            Err("handler_attribute value is not finite".to_string())
        }
        Gate::MetaCompare { value: MetaValue::Text(_), op, .. } if !op.is_equality() => {
            Err(format!("meta_compare {op:?} cannot order text"))
        }
        Gate::MetaCompare { target, .. } => validate_meta_target(target),
        Gate::All { gates } | Gate::Any { gates } => {
            if gates.is_empty() {
                return Err(format!("`{}` gate has no children", gate.kind()));
            }
            gates.iter().try_for_each(validate_gate)
        }
        Gate::Not { gate } => validate_gate(gate),
        _ => Ok(()),
    }
}

fn validate_meta_target(target: &MetaTarget) -> Result<(), String> {
    match &target.scope {
        MetaScope::Team { id } | MetaScope::Agent { id } if id.trim().is_empty() => {
            Err("meta target entity id is empty".to_string())
        }
        _ => Ok(()),
    }
}

fn validate_action(action: &EffectAction) -> Result<(), String> {
    match action {
        EffectAction::ModifyProbability { delta } | EffectAction::ModifyStamina { delta, .. } => {
            if !delta.is_finite() {
                return Err("delta is not finite".to_string());
            }
            Ok(())
        }
        EffectAction::ModifyScore { .. } => Ok(()),
        EffectAction::WriteMeta { target, op } => {
            validate_meta_target(target)?;
            match op {
                MetaOp::Increment { by } if !by.is_finite() => {
                    Err("increment is not finite".to_string())
                }
                _ => Ok(()),
            }
        }
        EffectAction::Narrate { text } => {
            if text.trim().is_empty() {
                return Err("narration text is empty".to_string());
            }
            Ok(())
        }
        EffectAction::Sequence { steps } => {
            if steps.is_empty() {
                return Err("sequence has no steps".to_string());
            }
            for step in steps {
                validate_gate(&step.gate)?;
                validate_action(&step.action)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::types::Comparison;
    use super::*;
    use crate::models::MetaField;
    use serde_json::json;

    fn narrate(id: &str) -> EffectDefinition {
        EffectDefinition::new(id, HookPoint::PostGame, EffectAction::Narrate { text: "done".into() })
    }

    #[test]
    fn test_register_keeps_order_and_rejects_duplicates() {
        let mut registry = EffectRegistry::new();
        registry.register(narrate("a")).unwrap();
        registry.register(narrate("b")).unwrap();
        assert_eq!(registry.register(narrate("a")), Err(EffectError::DuplicateId("a".into())));
        let orders: Vec<usize> = registry.effects().iter().map(|e| e.order()).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn test_rejects_bad_definitions() {
        let mut registry = EffectRegistry::new();
        assert!(registry.register(narrate("  ")).is_err());
        assert!(registry.register(narrate("c").with_gate(Gate::Chance { probability: 1.5 })).is_err());
        assert!(registry.register(narrate("d").with_gate(Gate::All { gates: vec![] })).is_err());
        assert!(registry
            .register(EffectDefinition::new("e", HookPoint::PreShot, EffectAction::Sequence { steps: vec![] }))
            .is_err());
        assert!(registry.register(narrate("f").with_max_fires(0)).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_check_ignores_padding() {
        let mut registry = EffectRegistry::new();
        registry.register(narrate(" a ")).unwrap();
        assert_eq!(registry.effects()[0].id(), "a");
        assert_eq!(registry.register(narrate("a")), Err(EffectError::DuplicateId("a".into())));
        assert_eq!(registry.register(narrate("a  ")), Err(EffectError::DuplicateId("a".into())));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_text_ordering_rejected_at_registration() {
        let mut registry = EffectRegistry::new();
        let target = MetaTarget { scope: MetaScope::Offense, field: MetaField::Morale };
        let ordered = Gate::MetaCompare { target: target.clone(), op: Comparison::Gt, value: MetaValue::Text("calm".into()) };
        assert!(matches!(
            registry.register(narrate("ordered").with_gate(ordered.clone())),
            Err(EffectError::InvalidDefinition { .. })
        ));
        let nested = Gate::Not { gate: Box::new(ordered) };
        assert!(registry.register(narrate("nested").with_gate(nested)).is_err());

        let equal = Gate::MetaCompare { target, op: Comparison::Eq, value: MetaValue::Text("calm".into()) };
        registry.register(narrate("equal").with_gate(equal)).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_gate_rejected_at_registration() {
        let mut registry = EffectRegistry::new();
        let raw = json!({
            "id": "moon",
            "hook": "pre_shot",
            "gate": { "type": "all", "gates": [
                { "type": "in_elam" },
                { "type": "full_moon" }
            ]},
            "action": { "action": "modify_probability", "delta": 0.1 }
        });
        assert_eq!(
            registry.register_json(&raw),
            Err(EffectError::UnknownGate { effect_id: "moon".into(), kind: "full_moon".into() })
        );
    }

    #[test]
    fn test_step_gate_checked_too() {
        let mut registry = EffectRegistry::new();
        let raw = json!({
            "id": "seq",
            "hook": "post_possession",
            "action": { "action": "sequence", "steps": [
                { "gate": { "probability": 0.5 }, "action": { "action": "narrate", "text": "x" } }
            ]}
        });
        assert_eq!(registry.register_json(&raw), Err(EffectError::MissingGateType { effect_id: "seq".into() }));
    }

    #[test]
    fn test_register_json_ok() {
        let mut registry = EffectRegistry::new();
        let raw = json!({
            "id": "rim",
            "hook": "pre_shot",
            "gate": { "type": "shot_zone", "zone": "at_rim" },
            "action": { "action": "modify_probability", "delta": 0.05 },
            "max_fires": 3
        });
        let effect = registry.register_json(&raw).unwrap();
        assert_eq!(effect.id(), "rim");
        assert_eq!(registry.for_hook(HookPoint::PreShot).count(), 1);
        assert_eq!(registry.for_hook(HookPoint::PostShot).count(), 0);
    }

    #[test]
    fn test_malformed_json_is_invalid_definition() {
        let mut registry = EffectRegistry::new();
        let raw = json!({ "id": "x", "hook": "nowhere", "action": { "action": "narrate", "text": "t" } });
        assert!(matches!(registry.register_json(&raw), Err(EffectError::InvalidDefinition { .. })));
    }
}
