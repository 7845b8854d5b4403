//! Access record storage

use crate::record::{AccessRecord, PaymentStatus};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Stored record is unreadable: {0}")]
    Corrupt(String),
}

/// Persistence for access records, keyed by checkout session id
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Insert `record`, or replace the record with the same session id
    async fn upsert(&self, record: AccessRecord) -> Result<(), StoreError>;

    async fn find_by_session(&self, session_id: &str) -> Result<Option<AccessRecord>, StoreError>;

    /// Every record for a user and tool, in any status
    async fn records_for(
        &self,
        user_id: &str,
        tool_id: &str,
    ) -> Result<Vec<AccessRecord>, StoreError>;

    /// Returns the number of records changed
    async fn set_status_by_session(
        &self,
        session_id: &str,
        status: PaymentStatus,
    ) -> Result<u64, StoreError>;

    /// Returns the number of records changed
    async fn set_status_by_payment_intent(
        &self,
        payment_intent: &str,
        status: PaymentStatus,
    ) -> Result<u64, StoreError>;
}

/// Process-local store for tests and single-instance runs
#[derive(Debug, Default)]
pub struct InMemoryAccessStore {
    records: RwLock<Vec<AccessRecord>>,
}

impl InMemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl AccessStore for InMemoryAccessStore {
    async fn upsert(&self, record: AccessRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records
            .iter_mut()
            .find(|r| r.session_id == record.session_id)
        {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<AccessRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.session_id == session_id).cloned())
    }

    async fn records_for(
        &self,
        user_id: &str,
        tool_id: &str,
    ) -> Result<Vec<AccessRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.user_id == user_id && r.tool_id == tool_id)
            .cloned()
            .collect())
    }

    async fn set_status_by_session(
        &self,
        session_id: &str,
        status: PaymentStatus,
    ) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let mut changed = 0;
        for record in records.iter_mut().filter(|r| r.session_id == session_id) {
            record.status = status;
            changed += 1;
        }
        Ok(changed)
    }

    async fn set_status_by_payment_intent(
        &self,
        payment_intent: &str,
        status: PaymentStatus,
    ) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let mut changed = 0;
        for record in records
            .iter_mut()
            .filter(|r| r.payment_intent.as_deref() == Some(payment_intent))
        {
            record.status = status;
            changed += 1;
        }
        Ok(changed)
    }
}
