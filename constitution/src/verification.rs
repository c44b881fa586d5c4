//! Content hashing for constitutions.
//!
//! The hash covers the canonical serialization of id, version, creation time,
//! creator, principles and rule identifiers/levels. Predicate code is not
//! hashed; two constitutions with the same declared rules hash identically.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::rule::ConstitutionalRule;
use crate::types::{CreatorKind, Principle, RuleLevel};

/// Canonical hashed view of a constitution.
#[derive(Serialize)]
struct CanonicalContent<'a> {
    id: &'a str,
    version: u32,
    created_at: String,
    created_by: CreatorKind,
    principles: &'a [Principle],
    rules: Vec<CanonicalRule<'a>>,
}

#[derive(Serialize)]
struct CanonicalRule<'a> {
    id: &'a str,
    level: RuleLevel,
}

/// Compute SHA256 hash of content.
pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Hash the canonical serialization of a constitution's identity and articles.
///
/// Rules are ordered by id so declaration order does not affect the hash.
pub fn hash_constitution(
    id: &str,
    version: u32,
    created_at: DateTime<Utc>,
    created_by: CreatorKind,
    principles: &[Principle],
    rules: &[ConstitutionalRule],
) -> Result<String, serde_json::Error> {
    let mut canonical_rules: Vec<CanonicalRule<'_>> = rules
        .iter()
        .map(|r| CanonicalRule {
            id: &r.id,
            level: r.level,
        })
        .collect();
    canonical_rules.sort_by(|a, b| a.id.cmp(b.id));

    let content = CanonicalContent {
        id,
        version,
        created_at: created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
        created_by,
        principles,
        rules: canonical_rules,
    };

    let bytes = serde_json::to_vec(&content)?;
    Ok(compute_hash(&bytes))
}
