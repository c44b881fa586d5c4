//! Constitutional Rule Engine.
//!
//! Aggregates every rule of the active constitution into one verdict:
//!
//! - **absolute** failure: denied, no in-process override
//! - **critical** failure: denied and `require_human`, unless the intent
//!   carries a human approval
//! - **protective** failure: dampened, never denied
//!
//! Rules run in ascending id order, so the reason string always names the
//! lowest-id failing rule of the deciding level.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::Constitution;
use crate::rule::ConstitutionalRule;
use crate::subject::{clamp_unit, CognitiveIntent, CognitiveState};
use crate::types::{ConstitutionalVerdict, RuleLevel};

/// Default factor applied per failing protective rule.
pub const DEFAULT_PROTECTIVE_DAMPENING: f64 = 0.5;

/// Whether evaluation continues after an absolute failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Run every rule for complete diagnostics
    #[default]
    Full,
    /// Stop at the first absolute failure
    ShortCircuit,
}

/// Evaluates (state, intent) pairs against one constitution version.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    constitution: Arc<Constitution>,
    mode: EvaluationMode,
    protective_dampening: f64,
}

impl RuleEngine {
    /// Create an engine with full evaluation and default dampening.
    pub fn new(constitution: Arc<Constitution>) -> Self {
        Self {
            constitution,
            mode: EvaluationMode::Full,
            protective_dampening: DEFAULT_PROTECTIVE_DAMPENING,
        }
    }

    /// Builder: set evaluation mode.
    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder: set the per-rule protective dampening factor.
    pub fn with_protective_dampening(mut self, factor: f64) -> Self {
        self.protective_dampening = clamp_unit(factor);
        self
    }

    pub fn constitution(&self) -> &Arc<Constitution> {
        &self.constitution
    }

    pub fn mode(&self) -> EvaluationMode {
        self.mode
    }

    /// Evaluate an intent. Same inputs and constitution version always yield
    /// the same verdict.
    pub fn evaluate(&self, state: &CognitiveState, intent: &CognitiveIntent) -> ConstitutionalVerdict {
        let mut first_absolute: Option<&ConstitutionalRule> = None;
        let mut first_critical: Option<&ConstitutionalRule> = None;
        let mut first_protective: Option<&ConstitutionalRule> = None;
        let mut failed_rules = Vec::new();
        let mut overridden_rules = Vec::new();
        let mut dampening: Option<f64> = None;

        for rule in self.constitution.rules() {
            if self.mode == EvaluationMode::ShortCircuit && first_absolute.is_some() {
                break;
            }

            if rule.check(state, intent) {
                continue;
            }

            debug!(
                rule_id = %rule.id,
                level = rule.level.as_str(),
                intent_id = %intent.id,
                "Constitutional rule failed"
            );
            failed_rules.push(rule.id.clone());

            match rule.level {
                RuleLevel::Absolute => {
                    first_absolute.get_or_insert(rule);
                }
                RuleLevel::Critical => {
                    if intent.has_human_approval() {
                        overridden_rules.push(rule.id.clone());
                    } else {
                        first_critical.get_or_insert(rule);
                    }
                }
                RuleLevel::Protective => {
                    first_protective.get_or_insert(rule);
                    dampening = Some(dampening.unwrap_or(1.0) * self.protective_dampening);
                }
            }
        }

        let allowed = first_absolute.is_none() && first_critical.is_none();
        let require_human = first_critical.is_some();

        let reason = if let Some(rule) = first_absolute {
            format!("blocked by absolute rule {}: {}", rule.id, rule.description)
        } else if let Some(rule) = first_critical {
            format!(
                "requires human authorization, critical rule {} failed: {}",
                rule.id, rule.description
            )
        } else if let Some(rule) = first_protective {
            format!(
                "dampened by protective rule {}: {}",
                rule.id, rule.description
            )
        } else if !overridden_rules.is_empty() {
            let actor = intent
                .human_approval
                .as_ref()
                .map(|a| a.actor_id.as_str())
                .unwrap_or_default();
            format!(
                "allowed by human approval from {} overriding {}",
                actor,
                overridden_rules.join(", ")
            )
        } else {
            format!(
                "all {} rules passed under {} v{}",
                self.constitution.rules().len(),
                self.constitution.id(),
                self.constitution.version()
            )
        };

        ConstitutionalVerdict {
            allowed,
            require_human,
            dampening,
            reason,
            failed_rules,
            overridden_rules,
            constitution_version: self.constitution.version(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::rule::ids;
    use crate::subject::{IntentScope, Reversibility};
    use crate::types::CreatorKind;

    fn engine() -> RuleEngine {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        RuleEngine::new(Arc::new(Constitution::reference(at).unwrap()))
    }

    fn state(legitimacy: f64) -> CognitiveState {
        CognitiveState::new(0.85, 0.0, legitimacy, Utc::now())
    }

    fn emergency(sources: &[&str]) -> CognitiveIntent {
        CognitiveIntent {
            id: "intent-1".to_string(),
            action: "activate_emergency_protocol".to_string(),
            scope: IntentScope::GlobalEmergency,
            reversibility: Reversibility::Hard,
            urgency: 0.95,
            confidence: 0.9,
            ethical_cost: 0.8,
            derived_from: sources.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            human_approval: None,
        }
    }

    #[test]
    fn test_emergency_with_legitimacy_and_two_sources_is_allowed() {
        let verdict = engine().evaluate(&state(0.9), &emergency(&["sensor", "ledger"]));
        assert!(verdict.allowed);
        assert!(!verdict.require_human);
        assert!(verdict.dampening.is_none());
        assert!(verdict.failed_rules.is_empty());
        assert!(verdict.reason.starts_with("all 4 rules passed"));
    }

    #[test]
    fn test_emergency_without_sources_requires_human() {
        let verdict = engine().evaluate(&state(0.9), &emergency(&[]));
        assert!(!verdict.allowed);
        assert!(verdict.require_human);
        assert!(verdict.reason.contains(ids::NO_SINGLE_SOURCE_DOMINANCE));
    }

    #[test]
    fn test_low_legitimacy_blocks_hard_intent() {
        let verdict = engine().evaluate(&state(0.5), &emergency(&["sensor", "ledger"]));
        assert!(!verdict.allowed);
        assert!(verdict.reason.contains(ids::NO_IRREVERSIBLE_WITHOUT_LEGITIMACY));
    }

    #[test]
    fn test_human_approval_cannot_bypass_absolute_rule() {
        let intent = emergency(&[]).with_approval("steward", "drill");
        let verdict = engine().evaluate(&state(0.5), &intent);
        assert!(!verdict.allowed);
        assert!(!verdict.require_human);
        assert!(verdict.reason.starts_with("blocked by absolute rule"));
        assert_eq!(verdict.overridden_rules, vec![ids::NO_SINGLE_SOURCE_DOMINANCE.to_string()]);
    }

    #[test]
    fn test_human_approval_bypasses_critical_rule() {
        let intent = emergency(&["only-one"]).with_approval("steward", "confirmed by phone");
        let verdict = engine().evaluate(&state(0.9), &intent);
        assert!(verdict.allowed);
        assert!(!verdict.require_human);
        assert!(verdict.reason.contains("steward"));
    }

    #[test]
    fn test_protocol_saturation_dampens_without_blocking() {
        let saturated = state(0.9).with_protocol("a").with_protocol("b").with_protocol("c");
        let verdict = engine().evaluate(&saturated, &emergency(&["sensor", "ledger"]));
        assert!(verdict.allowed);
        assert_eq!(verdict.dampening, Some(DEFAULT_PROTECTIVE_DAMPENING));
        assert!(verdict.reason.contains(ids::PROTOCOL_SATURATION_LIMIT));
    }

    #[test]
    fn test_first_failing_absolute_rule_is_lowest_id() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let rules = vec![
            ConstitutionalRule::new("zeta", "never", RuleLevel::Absolute, |_, _| false),
            ConstitutionalRule::new("alpha", "never either", RuleLevel::Absolute, |_, _| false),
        ];
        let constitution = Constitution::new("t", 1, at, CreatorKind::Human, vec![], rules, None).unwrap();
        let full = RuleEngine::new(Arc::new(constitution));

        let verdict = full.evaluate(&state(1.0), &emergency(&[]));
        assert!(verdict.reason.contains("alpha"));
        assert_eq!(verdict.failed_rules, vec!["alpha".to_string(), "zeta".to_string()]);

        let short = full.clone().with_mode(EvaluationMode::ShortCircuit);
        let verdict = short.evaluate(&state(1.0), &emergency(&[]));
        assert!(!verdict.allowed);
        assert_eq!(verdict.failed_rules, vec!["alpha".to_string()]);
    }

    #[test]
    fn test_multiple_protective_failures_multiply() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let rules = vec![
            ConstitutionalRule::new("p1", "soft", RuleLevel::Protective, |_, _| false),
            ConstitutionalRule::new("p2", "softer", RuleLevel::Protective, |_, _| false),
        ];
        let constitution = Constitution::new("t", 1, at, CreatorKind::Human, vec![], rules, None).unwrap();
        let engine = RuleEngine::new(Arc::new(constitution)).with_protective_dampening(0.8);

        let verdict = engine.evaluate(&state(1.0), &emergency(&[]));
        assert!(verdict.allowed);
        let factor = verdict.dampening.unwrap();
        assert!((factor - 0.64).abs() < 1e-12);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let engine = engine();
        let s = state(0.6).with_protocol("a").with_protocol("b").with_protocol("c");
        let i = emergency(&["x"]);
        assert_eq!(engine.evaluate(&s, &i), engine.evaluate(&s, &i));
    }
}
