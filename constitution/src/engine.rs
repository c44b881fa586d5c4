//! Constitution Engine: generates, amends and rolls back constitution versions.
//!
//! History is append-only. A rollback produces a new version whose articles
//! equal an earlier one; nothing already hashed is ever rewritten.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::document::{Constitution, ConstitutionError};
use crate::ledger::{AuditLedger, LedgerError, LedgerReceipt};
use crate::rule::ConstitutionalRule;
use crate::types::{CreatorKind, Principle, PublicationKind, PublicationRecord};

/// Owns the version history of one constitution id.
pub struct ConstitutionEngine {
    /// Constitution id shared by all versions
    id: String,
    /// Identity recorded as the signer of publications
    signer: String,
    /// All versions, oldest first
    versions: Vec<Arc<Constitution>>,
    /// Optional append-only audit collaborator
    ledger: Option<Arc<dyn AuditLedger>>,
}

impl ConstitutionEngine {
    /// Create an engine with no versions yet.
    pub fn new(id: impl Into<String>, signer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            signer: signer.into(),
            versions: Vec::new(),
            ledger: None,
        }
    }

    /// Publish every new version to the given ledger.
    pub fn with_ledger(mut self, ledger: Arc<dyn AuditLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The latest version.
    pub fn active(&self) -> Result<Arc<Constitution>, ConstitutionError> {
        self.versions
            .last()
            .cloned()
            .ok_or(ConstitutionError::NotInitialized)
    }

    /// Get a specific version.
    pub fn version(&self, version: u32) -> Result<Arc<Constitution>, ConstitutionError> {
        self.versions
            .iter()
            .find(|c| c.version() == version)
            .cloned()
            .ok_or(ConstitutionError::VersionNotFound(version))
    }

    /// All versions, oldest first.
    pub fn history(&self) -> &[Arc<Constitution>] {
        &self.versions
    }

    /// Generate version 1.
    pub async fn genesis(
        &mut self,
        principles: Vec<Principle>,
        rules: Vec<ConstitutionalRule>,
        created_by: CreatorKind,
        actor_id: &str,
        reason: &str,
    ) -> Result<Arc<Constitution>, ConstitutionError> {
        if !self.versions.is_empty() {
            return Err(ConstitutionError::AlreadyInitialized(self.id.clone()));
        }

        let constitution = Constitution::new(
            self.id.clone(),
            1,
            Utc::now(),
            created_by,
            principles,
            rules,
            None,
        )?;

        self.commit(constitution, PublicationKind::Initial, actor_id, reason)
            .await
    }

    /// Produce the next version with new articles.
    pub async fn amend(
        &mut self,
        principles: Vec<Principle>,
        rules: Vec<ConstitutionalRule>,
        created_by: CreatorKind,
        actor_id: &str,
        reason: &str,
    ) -> Result<Arc<Constitution>, ConstitutionError> {
        let current = self.active()?;

        let constitution = Constitution::new(
            self.id.clone(),
            current.version() + 1,
            Utc::now(),
            created_by,
            principles,
            rules,
            Some(current.version()),
        )?;

        self.commit(constitution, PublicationKind::Update, actor_id, reason)
            .await
    }

    /// Produce a new version restoring the articles of `target_version`.
    pub async fn rollback(
        &mut self,
        target_version: u32,
        actor_id: &str,
        reason: &str,
    ) -> Result<Arc<Constitution>, ConstitutionError> {
        let current = self.active()?;
        let target = self.version(target_version)?;

        if target.version() == current.version() {
            return Err(ConstitutionError::InvalidConstitution(format!(
                "version {target_version} is already active"
            )));
        }

        let constitution = Constitution::new(
            self.id.clone(),
            current.version() + 1,
            Utc::now(),
            target.created_by(),
            target.principles().to_vec(),
            target.rules().to_vec(),
            Some(current.version()),
        )?;

        self.commit(constitution, PublicationKind::Rollback, actor_id, reason)
            .await
    }

    /// Build the ledger payload for a version.
    pub fn publication_record(
        &self,
        constitution: &Constitution,
        kind: PublicationKind,
        actor_id: &str,
        reason: &str,
    ) -> PublicationRecord {
        PublicationRecord {
            constitution_id: constitution.id().to_string(),
            version: constitution.version(),
            hash: constitution.hash().to_string(),
            signer: self.signer.clone(),
            created_at: constitution.created_at(),
            kind,
            actor_id: actor_id.to_string(),
            reason: reason.to_string(),
            previous_version: constitution.previous_version(),
            article_count: constitution.article_count(),
            anchor_candidate: true,
        }
    }

    /// Verify, publish (if a ledger is attached), then append to history.
    ///
    /// A version that fails publication is not adopted. An attached ledger
    /// that reports itself unavailable is not written to.
    async fn commit(
        &mut self,
        constitution: Constitution,
        kind: PublicationKind,
        actor_id: &str,
        reason: &str,
    ) -> Result<Arc<Constitution>, ConstitutionError> {
        constitution.verify()?;

        if let Some(ledger) = &self.ledger {
            if !ledger.is_available().await {
                warn!(
                    constitution_id = %constitution.id(),
                    version = constitution.version(),
                    "Ledger unavailable, constitution not published"
                );
                return Err(LedgerError::Unavailable(format!(
                    "cannot publish {} v{}",
                    constitution.id(),
                    constitution.version()
                ))
                .into());
            }

            let record = self.publication_record(&constitution, kind, actor_id, reason);
            let receipt: LedgerReceipt = ledger.append(record).await.map_err(|e| {
                warn!(
                    constitution_id = %constitution.id(),
                    version = constitution.version(),
                    error = %e,
                    "Constitution publication failed"
                );
                e
            })?;

            info!(
                constitution_id = %constitution.id(),
                version = constitution.version(),
                sequence = receipt.sequence,
                anchor_queued = receipt.anchor_queued,
                "Constitution published"
            );
        }

        info!(
            constitution_id = %constitution.id(),
            version = constitution.version(),
            hash = %constitution.hash(),
            kind = ?kind,
            actor = %actor_id,
            "Constitution version adopted"
        );

        let constitution = Arc::new(constitution);
        self.versions.push(Arc::clone(&constitution));
        Ok(constitution)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::ledger::InMemoryLedger;
    use crate::rule::{reference_principles, reference_rules};

    struct DownLedger;

    #[async_trait]
    impl AuditLedger for DownLedger {
        async fn append(&self, _record: PublicationRecord) -> Result<LedgerReceipt, LedgerError> {
            Err(LedgerError::Unavailable("offline".to_string()))
        }

        async fn is_available(&self) -> bool {
            false
        }
    }

    /// Accepts appends but reports itself as down.
    #[derive(Default)]
    struct DrainingLedger {
        appends: AtomicUsize,
    }

    #[async_trait]
    impl AuditLedger for DrainingLedger {
        async fn append(&self, record: PublicationRecord) -> Result<LedgerReceipt, LedgerError> {
            let sequence = self.appends.fetch_add(1, Ordering::SeqCst) as u64;
            Ok(LedgerReceipt {
                sequence,
                anchor_queued: record.anchor_candidate,
            })
        }

        async fn is_available(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_genesis_amend_rollback_publishes_each_version() {
        let ledger = Arc::new(InMemoryLedger::new());
        let mut engine = ConstitutionEngine::new("core", "engine-1").with_ledger(ledger.clone());

        let v1 = assert_ok!(
            engine
                .genesis(reference_principles(), reference_rules(), CreatorKind::Machine, "bootstrap", "genesis")
                .await
        );
        assert_eq!(v1.version(), 1);

        let mut fewer = reference_rules();
        fewer.pop();
        let v2 = engine
            .amend(reference_principles(), fewer, CreatorKind::Human, "steward", "relax saturation")
            .await
            .unwrap();
        assert_eq!(v2.version(), 2);
        assert_eq!(v2.previous_version(), Some(1));
        assert_ne!(v2.hash(), v1.hash());

        let v3 = engine.rollback(1, "steward", "restore").await.unwrap();
        assert_eq!(v3.version(), 3);
        assert_eq!(v3.previous_version(), Some(2));
        assert_eq!(v3.rules().len(), v1.rules().len());
        assert_eq!(engine.history().len(), 3);

        let records = ledger.records().await;
        let kinds: Vec<PublicationKind> = records.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![PublicationKind::Initial, PublicationKind::Update, PublicationKind::Rollback]
        );
        assert_eq!(records[2].previous_version, Some(2));
        assert_eq!(records[0].article_count, 7);
        assert_eq!(records[0].signer, "engine-1");
        assert!(records.iter().all(|r| r.anchor_candidate));
    }

    #[tokio::test]
    async fn test_amend_before_genesis_fails() {
        let mut engine = ConstitutionEngine::new("core", "engine-1");
        let result = engine
            .amend(vec![], vec![], CreatorKind::Human, "someone", "too early")
            .await;
        assert!(matches!(result, Err(ConstitutionError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_double_genesis_fails() {
        let mut engine = ConstitutionEngine::new("core", "engine-1");
        engine
            .genesis(vec![], reference_rules(), CreatorKind::Machine, "a", "b")
            .await
            .unwrap();
        let again = assert_err!(
            engine
                .genesis(vec![], reference_rules(), CreatorKind::Machine, "a", "b")
                .await
        );
        assert!(matches!(again, ConstitutionError::AlreadyInitialized(_)));
    }

    #[tokio::test]
    async fn test_rollback_to_unknown_or_active_version_fails() {
        let mut engine = ConstitutionEngine::new("core", "engine-1");
        engine
            .genesis(vec![], reference_rules(), CreatorKind::Machine, "a", "b")
            .await
            .unwrap();

        assert!(matches!(
            engine.rollback(7, "a", "b").await,
            Err(ConstitutionError::VersionNotFound(7))
        ));
        assert!(matches!(
            engine.rollback(1, "a", "b").await,
            Err(ConstitutionError::InvalidConstitution(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_publication_is_not_adopted() {
        let mut engine = ConstitutionEngine::new("core", "engine-1").with_ledger(Arc::new(DownLedger));
        let result = engine
            .genesis(vec![], reference_rules(), CreatorKind::Machine, "a", "b")
            .await;
        assert!(matches!(result, Err(ConstitutionError::Ledger(_))));
        assert!(engine.history().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_ledger_is_not_written() {
        let ledger = Arc::new(DrainingLedger::default());
        let mut engine = ConstitutionEngine::new("core", "engine-1").with_ledger(ledger.clone());

        let err = assert_err!(
            engine
                .genesis(vec![], reference_rules(), CreatorKind::Machine, "a", "b")
                .await
        );
        assert!(matches!(err, ConstitutionError::Ledger(LedgerError::Unavailable(_))));
        assert_eq!(ledger.appends.load(Ordering::SeqCst), 0);
        assert!(engine.history().is_empty());
    }
}
