//! The immutable, versioned constitution.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::ledger::LedgerError;
use crate::rule::{reference_principles, reference_rules, ConstitutionalRule};
use crate::types::{ConstitutionRecord, CreatorKind, Principle};
use crate::verification::hash_constitution;

/// Error types for constitution operations.
#[derive(Debug, thiserror::Error)]
pub enum ConstitutionError {
    /// Constitution content is malformed
    #[error("Invalid constitution: {0}")]
    InvalidConstitution(String),

    /// Stored hash does not match recomputed content hash
    #[error("Hash mismatch: expected {expected}, computed {actual}")]
    HashMismatch { expected: String, actual: String },

    /// Requested version is not in the history
    #[error("Version not found: {0}")]
    VersionNotFound(u32),

    /// Engine has no active version yet
    #[error("No constitution has been generated yet")]
    NotInitialized,

    /// Genesis was requested twice
    #[error("Constitution {0} already has a genesis version")]
    AlreadyInitialized(String),

    /// Canonical serialization failed
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Publication to the audit ledger failed
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Identifier of the reference constitution.
pub const REFERENCE_CONSTITUTION_ID: &str = "cognitive-core";

/// A hashed, immutable constitution version.
///
/// There are no setters: any change produces a new version through
/// [`crate::ConstitutionEngine`].
#[derive(Debug, Clone)]
pub struct Constitution {
    id: String,
    version: u32,
    created_at: DateTime<Utc>,
    created_by: CreatorKind,
    principles: Vec<Principle>,
    /// Sorted by rule id
    rules: Vec<ConstitutionalRule>,
    hash: String,
    previous_version: Option<u32>,
}

impl Constitution {
    /// Build and hash a constitution version.
    pub fn new(
        id: impl Into<String>,
        version: u32,
        created_at: DateTime<Utc>,
        created_by: CreatorKind,
        principles: Vec<Principle>,
        mut rules: Vec<ConstitutionalRule>,
        previous_version: Option<u32>,
    ) -> Result<Self, ConstitutionError> {
        let id = id.into();

        if id.trim().is_empty() {
            return Err(ConstitutionError::InvalidConstitution("id is empty".to_string()));
        }
        if version == 0 {
            return Err(ConstitutionError::InvalidConstitution(
                "versions start at 1".to_string(),
            ));
        }
        if let Some(previous) = previous_version {
            if previous >= version {
                return Err(ConstitutionError::InvalidConstitution(format!(
                    "previous version {previous} must be lower than {version}"
                )));
            }
        }

        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(ConstitutionError::InvalidConstitution(format!(
                    "duplicate rule id {}",
                    rule.id
                )));
            }
        }

        rules.sort_by(|a, b| a.id.cmp(&b.id));
        let hash = hash_constitution(&id, version, created_at, created_by, &principles, &rules)?;

        Ok(Self {
            id,
            version,
            created_at,
            created_by,
            principles,
            rules,
            hash,
            previous_version,
        })
    }

    /// The reference constitution: the four reference rules at version 1.
    pub fn reference(created_at: DateTime<Utc>) -> Result<Self, ConstitutionError> {
        Self::new(
            REFERENCE_CONSTITUTION_ID,
            1,
            created_at,
            CreatorKind::Machine,
            reference_principles(),
            reference_rules(),
            None,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn created_by(&self) -> CreatorKind {
        self.created_by
    }

    pub fn principles(&self) -> &[Principle] {
        &self.principles
    }

    /// Rules in evaluation order (ascending id).
    pub fn rules(&self) -> &[ConstitutionalRule] {
        &self.rules
    }

    /// Get a rule by id.
    pub fn rule(&self, id: &str) -> Option<&ConstitutionalRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// SHA-256 content hash (hex).
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn previous_version(&self) -> Option<u32> {
        self.previous_version
    }

    /// Principles plus rules.
    pub fn article_count(&self) -> usize {
        self.principles.len() + self.rules.len()
    }

    /// Recompute the content hash and compare with the stored one.
    pub fn verify(&self) -> Result<(), ConstitutionError> {
        let actual = hash_constitution(
            &self.id,
            self.version,
            self.created_at,
            self.created_by,
            &self.principles,
            &self.rules,
        )?;

        if actual == self.hash {
            Ok(())
        } else {
            Err(ConstitutionError::HashMismatch {
                expected: self.hash.clone(),
                actual,
            })
        }
    }

    /// Audit-facing record of this version.
    pub fn record(&self) -> ConstitutionRecord {
        ConstitutionRecord {
            id: self.id.clone(),
            version: self.version,
            created_at: self.created_at,
            created_by: self.created_by,
            principles: self.principles.clone(),
            rules: self.rules.iter().map(ConstitutionalRule::descriptor).collect(),
            hash: self.hash.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::types::RuleLevel;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn build(
        id: &str,
        version: u32,
        created_at: DateTime<Utc>,
        created_by: CreatorKind,
        principles: Vec<Principle>,
        rules: Vec<ConstitutionalRule>,
    ) -> Constitution {
        Constitution::new(id, version, created_at, created_by, principles, rules, None).unwrap()
    }

    #[test]
    fn test_identical_inputs_hash_identically() {
        let a = Constitution::reference(at()).unwrap();
        let b = Constitution::reference(at()).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert!(a.verify().is_ok());
    }

    #[test]
    fn test_each_hashed_field_changes_hash() {
        let base = Constitution::reference(at()).unwrap();
        let p = reference_principles;
        let r = reference_rules;

        let variants = vec![
            build("other", 1, at(), CreatorKind::Machine, p(), r()),
            build(REFERENCE_CONSTITUTION_ID, 2, at(), CreatorKind::Machine, p(), r()),
            build(
                REFERENCE_CONSTITUTION_ID,
                1,
                at() + chrono::Duration::seconds(1),
                CreatorKind::Machine,
                p(),
                r(),
            ),
            build(REFERENCE_CONSTITUTION_ID, 1, at(), CreatorKind::Hybrid, p(), r()),
            build(REFERENCE_CONSTITUTION_ID, 1, at(), CreatorKind::Machine, p()[..2].to_vec(), r()),
            build(REFERENCE_CONSTITUTION_ID, 1, at(), CreatorKind::Machine, p(), r()[..3].to_vec()),
            build(
                REFERENCE_CONSTITUTION_ID,
                1,
                at(),
                CreatorKind::Machine,
                p(),
                r().into_iter()
                    .map(|rule| {
                        let level = if rule.level == RuleLevel::Protective {
                            RuleLevel::Critical
                        } else {
                            rule.level
                        };
                        ConstitutionalRule::new(rule.id.clone(), rule.description.clone(), level, |_, _| true)
                    })
                    .collect(),
            ),
        ];

        for variant in variants {
            assert_ne!(variant.hash(), base.hash(), "variant {:?} kept the hash", variant.record());
        }
    }

    #[test]
    fn test_rules_are_sorted_by_id() {
        let constitution = Constitution::reference(at()).unwrap();
        let ids: Vec<&str> = constitution.rules().iter().map(|r| r.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(constitution.article_count(), 7);
    }

    #[test]
    fn test_rejects_duplicate_rule_ids() {
        let mut rules = reference_rules();
        rules.push(reference_rules().remove(0));
        let result = Constitution::new("dup", 1, at(), CreatorKind::Human, vec![], rules, None);
        assert!(matches!(result, Err(ConstitutionError::InvalidConstitution(_))));
    }

    #[test]
    fn test_rejects_zero_version_and_backward_link() {
        assert!(Constitution::new("c", 0, at(), CreatorKind::Human, vec![], vec![], None).is_err());
        assert!(Constitution::new("c", 2, at(), CreatorKind::Human, vec![], vec![], Some(2)).is_err());
    }

    #[test]
    fn test_record_lists_rule_levels() {
        let record = Constitution::reference(at()).unwrap().record();
        assert_eq!(record.rules.len(), 4);
        assert!(record
            .rules
            .iter()
            .any(|r| r.id == "no-irreversible-without-legitimacy" && r.level == RuleLevel::Absolute));
    }
}
