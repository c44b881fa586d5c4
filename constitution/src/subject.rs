//! Evaluation subjects: the state snapshot and candidate intents that
//! constitutional rules are predicates over.
//!
//! Both types live here rather than in the pipeline crate so that rules can be
//! expressed without a dependency cycle.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Clamp a value into the unit interval. NaN collapses to zero.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Snapshot of the machine's cognitive state.
///
/// Every field is bounded to `[0, 1]` and `coherence` is always derived from
/// `load`. Snapshots are replaced, never mutated in place, so all "mutators"
/// consume `self` and return the next snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(from = "StateRecord", rename_all = "camelCase")]
pub struct CognitiveState {
    risk: f64,
    load: f64,
    coherence: f64,
    legitimacy: f64,
    active_protocols: BTreeSet<String>,
    last_update: DateTime<Utc>,
}

/// Wire shape used when deserializing; coherence is recomputed, not trusted.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateRecord {
    risk: f64,
    load: f64,
    legitimacy: f64,
    #[serde(default)]
    active_protocols: BTreeSet<String>,
    last_update: DateTime<Utc>,
}

impl From<StateRecord> for CognitiveState {
    fn from(record: StateRecord) -> Self {
        Self::new(record.risk, record.load, record.legitimacy, record.last_update)
            .with_protocols(record.active_protocols)
    }
}

impl CognitiveState {
    /// Create a snapshot, clamping every input into `[0, 1]`.
    pub fn new(risk: f64, load: f64, legitimacy: f64, last_update: DateTime<Utc>) -> Self {
        let load = clamp_unit(load);
        Self {
            risk: clamp_unit(risk),
            load,
            coherence: (1.0 - load).max(0.0),
            legitimacy: clamp_unit(legitimacy),
            active_protocols: BTreeSet::new(),
            last_update,
        }
    }

    /// Calm, fully legitimate starting state.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self::new(0.0, 0.0, 1.0, now)
    }

    pub fn risk(&self) -> f64 {
        self.risk
    }

    pub fn load(&self) -> f64 {
        self.load
    }

    /// Always `max(0, 1 - load)`.
    pub fn coherence(&self) -> f64 {
        self.coherence
    }

    pub fn legitimacy(&self) -> f64 {
        self.legitimacy
    }

    pub fn active_protocols(&self) -> &BTreeSet<String> {
        &self.active_protocols
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    /// Next snapshot with new risk/load; coherence is recomputed.
    pub fn with_risk_load(self, risk: f64, load: f64, now: DateTime<Utc>) -> Self {
        let load = clamp_unit(load);
        Self {
            risk: clamp_unit(risk),
            load,
            coherence: (1.0 - load).max(0.0),
            last_update: now,
            ..self
        }
    }

    /// Next snapshot with a new legitimacy value.
    pub fn with_legitimacy(self, legitimacy: f64) -> Self {
        Self {
            legitimacy: clamp_unit(legitimacy),
            ..self
        }
    }

    /// Next snapshot with an additional active protocol.
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.active_protocols.insert(protocol.into());
        self
    }

    /// Next snapshot with the given protocol set replacing the current one.
    pub fn with_protocols(self, protocols: BTreeSet<String>) -> Self {
        Self {
            active_protocols: protocols,
            ..self
        }
    }

    /// Next snapshot without the given protocol.
    pub fn without_protocol(mut self, protocol: &str) -> Self {
        self.active_protocols.remove(protocol);
        self
    }
}

impl Default for CognitiveState {
    fn default() -> Self {
        Self::initial(Utc::now())
    }
}

/// Blast radius of an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "kebab-case")]
pub enum IntentScope {
    Local,
    System,
    User,
    GlobalEmergency,
}

impl IntentScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::System => "system",
            Self::User => "user",
            Self::GlobalEmergency => "global-emergency",
        }
    }
}

/// How hard an intent's effect is to undo once performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Reversibility {
    /// Freely undoable
    Soft,
    /// Undoable with effort or a compensating action
    Guarded,
    /// Irreversible
    Hard,
}

impl Reversibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Guarded => "guarded",
            Self::Hard => "hard",
        }
    }

    pub fn is_hard(&self) -> bool {
        matches!(self, Self::Hard)
    }
}

/// Authorization attached by the external human/override channel.
///
/// Only critical rules honor it; absolute rules never do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct HumanApproval {
    /// Who granted the override
    pub actor_id: String,
    /// Why it was granted
    pub reason: String,
}

/// A candidate action, not yet authorized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct CognitiveIntent {
    /// Unique intent ID
    pub id: String,
    /// Action name understood by the dispatcher
    pub action: String,
    /// Blast radius
    pub scope: IntentScope,
    /// Undo difficulty
    pub reversibility: Reversibility,
    /// How pressing the action is (0.0 - 1.0)
    pub urgency: f64,
    /// Confidence the action is right (0.0 - 1.0)
    pub confidence: f64,
    /// Ethical cost of acting (0.0 - 1.0)
    pub ethical_cost: f64,
    /// Contributing signal/source identifiers
    #[serde(default)]
    pub derived_from: BTreeSet<String>,
    /// Human/override authorization, if one was granted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_approval: Option<HumanApproval>,
}

impl CognitiveIntent {
    /// Number of distinct contributing sources.
    pub fn distinct_source_count(&self) -> usize {
        self.derived_from.len()
    }

    /// Whether a human/override authorization accompanies this intent.
    pub fn has_human_approval(&self) -> bool {
        self.human_approval.is_some()
    }

    /// Attach a human approval.
    pub fn with_approval(mut self, actor_id: impl Into<String>, reason: impl Into<String>) -> Self {
        self.human_approval = Some(HumanApproval {
            actor_id: actor_id.into(),
            reason: reason.into(),
        });
        self
    }

    /// Add a contributing source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.derived_from.insert(source.into());
        self
    }

    /// Copy with urgency and confidence scaled by a dampening factor.
    pub fn dampened(&self, factor: f64) -> Self {
        let factor = clamp_unit(factor);
        Self {
            urgency: clamp_unit(self.urgency * factor),
            confidence: clamp_unit(self.confidence * factor),
            ..self.clone()
        }
    }

    /// Check required fields and numeric ranges.
    ///
    /// Returns a description of every problem found.
    pub fn check(&self) -> Result<(), String> {
        let mut problems = Vec::new();
        if self.id.trim().is_empty() {
            problems.push("id is empty".to_string());
        }
        if self.action.trim().is_empty() {
            problems.push("action is empty".to_string());
        }
        for (name, value) in [
            ("urgency", self.urgency),
            ("confidence", self.confidence),
            ("ethical_cost", self.ethical_cost),
        ] {
            if !(0.0..=1.0).contains(&value) {
                problems.push(format!("{name} {value} is outside [0, 1]"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }
}
