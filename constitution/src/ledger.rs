//! Audit ledger boundary.
//!
//! The core does not implement the ledger. It only appends publication
//! records to whatever append-only collaborator is plugged in here.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::PublicationRecord;

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Ledger is not reachable
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// Ledger refused the record
    #[error("Record rejected: {0}")]
    Rejected(String),
}

/// Acknowledgement returned by the ledger for an appended record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    /// Position of the record in the ledger
    pub sequence: u64,
    /// Whether the ledger queued the record for permanent anchoring
    pub anchor_queued: bool,
}

/// Append-only audit ledger collaborator.
#[async_trait]
pub trait AuditLedger: Send + Sync {
    /// Append a publication record.
    async fn append(&self, record: PublicationRecord) -> Result<LedgerReceipt, LedgerError>;

    /// Check if the ledger is reachable.
    async fn is_available(&self) -> bool;
}

/// In-memory ledger for tests and offline operation.
pub struct InMemoryLedger {
    records: Arc<RwLock<Vec<PublicationRecord>>>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// All records in append order.
    pub async fn records(&self) -> Vec<PublicationRecord> {
        self.records.read().await.clone()
    }

    /// Number of appended records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditLedger for InMemoryLedger {
    async fn append(&self, record: PublicationRecord) -> Result<LedgerReceipt, LedgerError> {
        let mut records = self.records.write().await;

        if let Some(last) = records.iter().rev().find(|r| r.constitution_id == record.constitution_id) {
            if record.version <= last.version {
                return Err(LedgerError::Rejected(format!(
                    "version {} of {} does not follow {}",
                    record.version, record.constitution_id, last.version
                )));
            }
        }

        let anchor_queued = record.anchor_candidate;
        records.push(record);

        Ok(LedgerReceipt {
            sequence: records.len() as u64,
            anchor_queued,
        })
    }

    async fn is_available(&self) -> bool {
        true // In-memory ledger is always "available"
    }
}
