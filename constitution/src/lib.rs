//! Constitutional core for the cognitive decision pipeline.
//!
//! A constitution is an immutable, versioned, SHA-256 addressed set of leveled
//! rules plus guiding principles:
//!
//! - **Absolute** rules can never be bypassed
//! - **Critical** rules block unless the human/override channel authorized the intent
//! - **Protective** rules only dampen
//!
//! # Key Components
//!
//! - [`Constitution`]: A hashed constitution version
//! - [`ConstitutionEngine`]: Version history with amendment, rollback and publication
//! - [`RuleEngine`]: Evaluates (state, intent) pairs into a [`ConstitutionalVerdict`]
//! - [`AuditLedger`]: Boundary trait for the external append-only ledger
//!
//! # Example
//!
//! ```ignore
//! use constitution::{Constitution, RuleEngine};
//!
//! let constitution = Arc::new(Constitution::reference(Utc::now())?);
//! let engine = RuleEngine::new(constitution);
//! let verdict = engine.evaluate(&state, &intent);
//! if !verdict.allowed {
//!     tracing::info!(reason = %verdict.reason, "Intent rejected");
//! }
//! ```

pub mod document;
pub mod engine;
pub mod evaluation;
pub mod ledger;
pub mod rule;
pub mod subject;
pub mod types;
pub mod verification;

// Re-export main types
pub use document::{Constitution, ConstitutionError, REFERENCE_CONSTITUTION_ID};
pub use engine::ConstitutionEngine;
pub use evaluation::{EvaluationMode, RuleEngine, DEFAULT_PROTECTIVE_DAMPENING};
pub use ledger::{AuditLedger, InMemoryLedger, LedgerError, LedgerReceipt};
pub use rule::{reference_principles, reference_rules, ConstitutionalRule, RulePredicate};
pub use subject::*;
pub use types::*;
pub use verification::{compute_hash, hash_constitution};
