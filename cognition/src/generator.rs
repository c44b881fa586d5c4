//! Intent generator - derives candidate intents purely from state.
//!
//! Intents come from independent state-to-intent mappings ([`IntentRule`]).
//! Mappings do not see each other, so registration order never changes the
//! output set. The emergency mapping is built in and driven by config.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use constitution::{CognitiveIntent, CognitiveState, IntentScope, Reversibility};

use crate::config::GeneratorConfig;
use crate::types::{CognitionError, Result};

/// Action name of the built-in emergency intent.
pub const EMERGENCY_ACTION: &str = "activate_emergency_protocol";

/// Rule id of the built-in emergency mapping.
pub const EMERGENCY_RULE_ID: &str = "emergency-protocol";

/// Source of intent identifiers.
pub trait IntentIdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Monotonic `intent-N` identifiers, reproducible across runs.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IntentIdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("intent-{n}")
    }
}

/// Random v4 UUID identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IntentIdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Condition over a state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateCondition {
    /// Always matches
    Always,
    /// risk > threshold
    RiskAbove(f64),
    /// load > threshold
    LoadAbove(f64),
    /// coherence < threshold
    CoherenceBelow(f64),
    /// legitimacy < threshold
    LegitimacyBelow(f64),
    /// legitimacy >= threshold
    LegitimacyAtLeast(f64),
    /// Protocol is in the active set
    ProtocolActive(String),
    /// Protocol is not in the active set
    ProtocolInactive(String),
    /// Logical AND of conditions
    And(Vec<StateCondition>),
    /// Logical OR of conditions
    Or(Vec<StateCondition>),
    /// Negation
    Not(Box<StateCondition>),
}

impl StateCondition {
    /// Evaluate the condition against a state.
    pub fn evaluate(&self, state: &CognitiveState) -> bool {
        match self {
            StateCondition::Always => true,
            StateCondition::RiskAbove(t) => state.risk() > *t,
            StateCondition::LoadAbove(t) => state.load() > *t,
            StateCondition::CoherenceBelow(t) => state.coherence() < *t,
            StateCondition::LegitimacyBelow(t) => state.legitimacy() < *t,
            StateCondition::LegitimacyAtLeast(t) => state.legitimacy() >= *t,
            StateCondition::ProtocolActive(p) => state.active_protocols().contains(p),
            StateCondition::ProtocolInactive(p) => !state.active_protocols().contains(p),
            StateCondition::And(conditions) => conditions.iter().all(|c| c.evaluate(state)),
            StateCondition::Or(conditions) => conditions.iter().any(|c| c.evaluate(state)),
            StateCondition::Not(condition) => !condition.evaluate(state),
        }
    }
}

/// Everything about an intent except its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentTemplate {
    /// Action name
    pub action: String,
    /// Blast radius
    pub scope: IntentScope,
    /// Undo difficulty
    pub reversibility: Reversibility,
    pub urgency: f64,
    pub confidence: f64,
    pub ethical_cost: f64,
    /// Static contributing sources
    #[serde(default)]
    pub derived_from: BTreeSet<String>,
}

impl IntentTemplate {
    /// Instantiate with the given id.
    pub fn to_intent(&self, id: String) -> CognitiveIntent {
        CognitiveIntent {
            id,
            action: self.action.clone(),
            scope: self.scope,
            reversibility: self.reversibility,
            urgency: self.urgency,
            confidence: self.confidence,
            ethical_cost: self.ethical_cost,
            derived_from: self.derived_from.clone(),
            human_approval: None,
        }
    }
}

/// A state-to-intent mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRule {
    /// Unique rule ID
    pub id: String,
    /// When the rule fires
    pub condition: StateCondition,
    /// What it proposes
    pub template: IntentTemplate,
}

impl IntentRule {
    /// Create a validated mapping.
    pub fn new(id: impl Into<String>, condition: StateCondition, template: IntentTemplate) -> Result<Self> {
        let rule = Self {
            id: id.into(),
            condition,
            template,
        };
        rule.validate()?;
        Ok(rule)
    }

    /// The built-in emergency mapping: fires when risk exceeds `threshold`.
    pub fn emergency(threshold: f64) -> Self {
        Self {
            id: EMERGENCY_RULE_ID.to_string(),
            condition: StateCondition::RiskAbove(threshold),
            template: IntentTemplate {
                action: EMERGENCY_ACTION.to_string(),
                scope: IntentScope::GlobalEmergency,
                reversibility: Reversibility::Hard,
                urgency: 0.95,
                confidence: 0.9,
                ethical_cost: 0.8,
                derived_from: BTreeSet::new(),
            },
        }
    }

    /// Check id, action name and numeric ranges.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CognitionError::Validation("intent rule id is empty".to_string()));
        }
        if self.template.action.trim().is_empty() {
            return Err(CognitionError::Validation(format!(
                "intent rule {}: action is empty",
                self.id
            )));
        }
        for (name, value) in [
            ("urgency", self.template.urgency),
            ("confidence", self.template.confidence),
            ("ethical_cost", self.template.ethical_cost),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CognitionError::Validation(format!(
                    "intent rule {}: {name} {value} is outside [0, 1]",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Stateless generator over a fixed set of mappings.
pub struct IntentGenerator {
    rules: Vec<IntentRule>,
    ids: Arc<dyn IntentIdGenerator>,
}

impl IntentGenerator {
    /// Create a generator with no mappings and UUID ids.
    pub fn new() -> Self {
        Self::with_ids(Arc::new(UuidIdGenerator))
    }

    /// Create a generator with no mappings and the given id source.
    pub fn with_ids(ids: Arc<dyn IntentIdGenerator>) -> Self {
        Self { rules: Vec::new(), ids }
    }

    /// Build from configuration: the emergency mapping (if enabled) plus
    /// every configured mapping.
    pub fn from_config(config: &GeneratorConfig, ids: Arc<dyn IntentIdGenerator>) -> Result<Self> {
        let mut generator = Self::with_ids(ids);
        if config.emergency_enabled {
            generator.add_rule(IntentRule::emergency(config.emergency_risk_threshold))?;
        }
        for rule in &config.rules {
            generator.add_rule(rule.clone())?;
        }
        Ok(generator)
    }

    /// Register a mapping. Duplicate ids are rejected.
    pub fn add_rule(&mut self, rule: IntentRule) -> Result<()> {
        rule.validate()?;
        if self.rules.iter().any(|r| r.id == rule.id) {
            return Err(CognitionError::Validation(format!(
                "intent rule {} is already registered",
                rule.id
            )));
        }
        self.rules.push(rule);
        self.rules.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(())
    }

    /// Get rule count.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Propose intents for a state. Only ids differ between calls.
    pub fn generate(&self, state: &CognitiveState) -> Vec<CognitiveIntent> {
        self.rules
            .iter()
            .filter(|rule| rule.condition.evaluate(state))
            .map(|rule| {
                let intent = rule.template.to_intent(self.ids.next_id());
                debug!(
                    rule_id = %rule.id,
                    intent_id = %intent.id,
                    action = %intent.action,
                    "Intent proposed"
                );
                intent
            })
            .collect()
    }
}

impl Default for IntentGenerator {
    fn default() -> Self {
        Self::new()
    }
}
