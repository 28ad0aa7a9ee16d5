//! Process-lifetime ledger store
//!
//! Records sit in a `HashMap` behind a tokio mutex. `update` holds the lock for
//! the whole read-modify-write, so concurrent extensions of one user are
//! serialized.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sdk::errors::EngineError;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{ExpiryUpdate, LedgerStore};

#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    records: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get(&self, user_id: &str) -> Result<Option<DateTime<Utc>>, EngineError> {
        Ok(self.records.lock().await.get(user_id).copied())
    }

    async fn update(
        &self,
        user_id: &str,
        update: ExpiryUpdate<'_>,
    ) -> Result<DateTime<Utc>, EngineError> {
        let mut records = self.records.lock().await;
        let next = update(records.get(user_id).copied())?;
        records.insert(user_id.to_string(), next);
        Ok(next)
    }

    async fn record_count(&self) -> usize {
        self.records.lock().await.len()
    }
}
