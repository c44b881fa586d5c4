//! Core types for constitutions, verdicts and publication records.
//!
//! With the `typescript` feature enabled, the serializable types can be exported
//! to TypeScript using ts-rs for the presentation layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Severity level of a constitutional rule.
///
/// The level decides what a failing rule does to the aggregate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum RuleLevel {
    /// Can never be bypassed
    Absolute,
    /// Blocks unless the human/override channel authorized the intent
    Critical,
    /// Only dampens, never blocks
    Protective,
}

impl RuleLevel {
    /// Get string representation for reasons and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absolute => "absolute",
            Self::Critical => "critical",
            Self::Protective => "protective",
        }
    }

    /// Check if a failure at this level can block an intent
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Absolute | Self::Critical)
    }
}

/// Who authored a constitution version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum CreatorKind {
    Machine,
    Human,
    Hybrid,
}

impl CreatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Machine => "machine",
            Self::Human => "human",
            Self::Hybrid => "hybrid",
        }
    }
}

/// A guiding principle carried by a constitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Principle {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// The principle statement
    pub statement: String,
}

impl Principle {
    pub fn new(id: impl Into<String>, name: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            statement: statement.into(),
        }
    }
}

/// Serializable description of a rule (everything but its predicate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RuleDescriptor {
    pub id: String,
    pub description: String,
    pub level: RuleLevel,
}

/// The audit-facing record of a constitution version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ConstitutionRecord {
    pub id: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub created_by: CreatorKind,
    pub principles: Vec<Principle>,
    pub rules: Vec<RuleDescriptor>,
    pub hash: String,
}

/// Outcome of evaluating an intent against a constitution.
///
/// A rejection is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ConstitutionalVerdict {
    /// Whether the intent may proceed
    pub allowed: bool,
    /// Whether a critical rule wants the human/override channel
    pub require_human: bool,
    /// Factor to scale urgency/confidence by, if a protective rule failed
    pub dampening: Option<f64>,
    /// Human-readable explanation naming the deciding rule
    pub reason: String,
    /// IDs of every rule that returned false, in evaluation order
    pub failed_rules: Vec<String>,
    /// IDs of critical rules bypassed by a human approval
    pub overridden_rules: Vec<String>,
    /// Constitution version the verdict was reached under
    pub constitution_version: u32,
}

impl ConstitutionalVerdict {
    /// Check if a protective rule asked for dampening
    pub fn is_dampened(&self) -> bool {
        self.dampening.is_some()
    }
}

/// Why a constitution version was published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum PublicationKind {
    Initial,
    Update,
    Rollback,
}

/// Payload appended to the external audit ledger when a version is published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PublicationRecord {
    pub constitution_id: String,
    pub version: u32,
    pub hash: String,
    /// Identity of the publishing engine
    pub signer: String,
    pub created_at: DateTime<Utc>,
    pub kind: PublicationKind,
    /// Who requested the change
    pub actor_id: String,
    pub reason: String,
    pub previous_version: Option<u32>,
    /// Principles plus rules
    pub article_count: usize,
    /// Marks the record for permanent anchoring by the ledger
    pub anchor_candidate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_blocking() {
        assert!(RuleLevel::Absolute.is_blocking());
        assert!(RuleLevel::Critical.is_blocking());
        assert!(!RuleLevel::Protective.is_blocking());
    }

    #[test]
    fn test_publication_record_wire_shape() {
        let record = PublicationRecord {
            constitution_id: "core".to_string(),
            version: 2,
            hash: "abc".to_string(),
            signer: "engine".to_string(),
            created_at: Utc::now(),
            kind: PublicationKind::Rollback,
            actor_id: "steward".to_string(),
            reason: "revert".to_string(),
            previous_version: Some(1),
            article_count: 7,
            anchor_candidate: true,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["constitutionId"], "core");
        assert_eq!(json["kind"], "rollback");
        assert_eq!(json["previousVersion"], 1);
        assert_eq!(json["articleCount"], 7);
    }
}
