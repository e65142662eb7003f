//! Persistence of durable job records.
//!
//! A record is an encoded [`Checkpoint`](crate::checkpoint::Checkpoint)
//! written after every committed tick. The store only sees bytes; encoding
//! stays with the adapter.

use crate::durable::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Backend holding one record per job id.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    async fn load(&self, job_id: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the record of `job_id`.
    async fn save(&self, job_id: &str, record: Vec<u8>) -> Result<(), StoreError>;

    async fn remove(&self, job_id: &str) -> Result<(), StoreError>;
}

/// Process-local store. Clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    records: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.records.contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn load(&self, job_id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.records.get(job_id).map(|record| record.value().clone()))
    }

    async fn save(&self, job_id: &str, record: Vec<u8>) -> Result<(), StoreError> {
        self.records.insert(job_id.to_string(), record);
        Ok(())
    }

    async fn remove(&self, job_id: &str) -> Result<(), StoreError> {
        self.records.remove(job_id);
        Ok(())
    }
}
