//! Constitutional rules and the reference rule set.

use std::fmt;
use std::sync::Arc;

use crate::subject::{CognitiveIntent, CognitiveState};
use crate::types::{Principle, RuleDescriptor, RuleLevel};

/// Pure predicate over a (state, intent) pair. `true` means the rule passes.
///
/// Predicates must not perform I/O or depend on anything but their inputs.
pub type RulePredicate = Arc<dyn Fn(&CognitiveState, &CognitiveIntent) -> bool + Send + Sync>;

/// A leveled rule in a constitution.
#[derive(Clone)]
pub struct ConstitutionalRule {
    /// Unique rule ID; also the evaluation order key
    pub id: String,
    /// Human-readable description used in verdict reasons
    pub description: String,
    /// What a failure does to the verdict
    pub level: RuleLevel,
    predicate: RulePredicate,
}

impl ConstitutionalRule {
    /// Create a rule from a predicate.
    pub fn new<F>(id: impl Into<String>, description: impl Into<String>, level: RuleLevel, predicate: F) -> Self
    where
        F: Fn(&CognitiveState, &CognitiveIntent) -> bool + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            description: description.into(),
            level,
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate the predicate.
    pub fn check(&self, state: &CognitiveState, intent: &CognitiveIntent) -> bool {
        (self.predicate)(state, intent)
    }

    /// Description without the predicate, for records and hashing.
    pub fn descriptor(&self) -> RuleDescriptor {
        RuleDescriptor {
            id: self.id.clone(),
            description: self.description.clone(),
            level: self.level,
        }
    }
}

impl fmt::Debug for ConstitutionalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstitutionalRule")
            .field("id", &self.id)
            .field("level", &self.level)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Rule IDs of the reference constitution.
pub mod ids {
    pub const NO_IRREVERSIBLE_WITHOUT_LEGITIMACY: &str = "no-irreversible-without-legitimacy";
    pub const NO_SINGLE_SOURCE_DOMINANCE: &str = "no-single-source-dominance";
    pub const ETHICAL_COST_LIMIT: &str = "ethical-cost-limit";
    pub const PROTOCOL_SATURATION_LIMIT: &str = "protocol-saturation-limit";
}

/// Legitimacy below which hard intents are forbidden.
pub const MIN_LEGITIMACY_FOR_HARD: f64 = 0.75;
/// Minimum distinct contributing sources per intent.
pub const MIN_DISTINCT_SOURCES: usize = 2;
/// Inclusive ethical cost ceiling.
pub const MAX_ETHICAL_COST: f64 = 0.8;
/// Maximum concurrently active protocols before dampening.
pub const MAX_ACTIVE_PROTOCOLS: usize = 2;

/// The four reference rules.
pub fn reference_rules() -> Vec<ConstitutionalRule> {
    vec![
        ConstitutionalRule::new(
            ids::NO_IRREVERSIBLE_WITHOUT_LEGITIMACY,
            "Irreversible actions require legitimacy of at least 0.75",
            RuleLevel::Absolute,
            |state, intent| !(intent.reversibility.is_hard() && state.legitimacy() < MIN_LEGITIMACY_FOR_HARD),
        ),
        ConstitutionalRule::new(
            ids::NO_SINGLE_SOURCE_DOMINANCE,
            "Intents must be derived from at least two distinct sources",
            RuleLevel::Critical,
            |_, intent| intent.distinct_source_count() >= MIN_DISTINCT_SOURCES,
        ),
        ConstitutionalRule::new(
            ids::ETHICAL_COST_LIMIT,
            "Ethical cost must not exceed 0.8",
            RuleLevel::Critical,
            |_, intent| intent.ethical_cost <= MAX_ETHICAL_COST,
        ),
        ConstitutionalRule::new(
            ids::PROTOCOL_SATURATION_LIMIT,
            "No more than two protocols may be active at once",
            RuleLevel::Protective,
            |state, _| state.active_protocols().len() <= MAX_ACTIVE_PROTOCOLS,
        ),
    ]
}

/// Guiding principles of the reference constitution.
pub fn reference_principles() -> Vec<Principle> {
    vec![
        Principle::new(
            "defensible-action",
            "Defensible Action",
            "Every action must be defensible: a rejected intent names the rule or gate that stopped it.",
        ),
        Principle::new(
            "legitimate-irreversibility",
            "Legitimate Irreversibility",
            "Actions that cannot be undone require an established mandate.",
        ),
        Principle::new(
            "plural-evidence",
            "Plural Evidence",
            "No single source may drive the system on its own.",
        ),
    ]
}
