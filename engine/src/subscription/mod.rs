//! Subscription Ledger
//!
//! Maps a user identifier to the timestamp their subscription expires and
//! answers two questions: "is this user active?" and "extend this user by N
//! days". Records live only as long as the process; there is no persistence.
//!
//! # Renewal base
//!
//! A first extension always starts from now. For a known user the base depends
//! on [`RenewalPolicy`]:
//!
//! - `Rebase` (default): `max(old_expiry, now) + days`. A user whose
//!   subscription lapsed long ago gets a full period from today.
//! - `Accumulate`: `old_expiry + days`, even when the old expiry is in the
//!   past. A long-lapsed user can still be expired after renewing.
//!
//! While a subscription is active both policies agree, so a run of extensions
//! on a fresh user always ends at `now + Σdays`.
//!
//! # Concurrency
//!
//! Reads and read-modify-write updates go through a [`LedgerStore`]; stores
//! must apply `update` atomically per user so concurrent extensions never lose
//! a period.

pub mod memory;

pub use memory::InMemoryLedgerStore;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};

/// Base used when extending a user who already has a record
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RenewalPolicy {
    /// Renew from the later of the old expiry and now
    #[default]
    Rebase,

    /// Always renew from the old expiry
    Accumulate,
}

impl RenewalPolicy {
    /// Compute the expiry after granting `period` on top of `current`
    pub fn next_expiry(
        &self,
        current: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        period: Duration,
    ) -> Option<DateTime<Utc>> {
        let base = match (current, self) {
            (None, _) => now,
            (Some(old), RenewalPolicy::Accumulate) => old,
            (Some(old), RenewalPolicy::Rebase) => old.max(now),
        };
        base.checked_add_signed(period)
    }
}

/// Result of a subscription check
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionStatus {
    /// True iff the expiry is strictly after the current time
    pub active: bool,

    /// Recorded expiry, `None` for users never extended
    pub expires_at: Option<DateTime<Utc>>,
}

impl SubscriptionStatus {
    pub fn unknown() -> Self {
        Self {
            active: false,
            expires_at: None,
        }
    }
}

/// Read-modify-write callback applied by [`LedgerStore::update`]
pub type ExpiryUpdate<'a> =
    &'a (dyn Fn(Option<DateTime<Utc>>) -> Result<DateTime<Utc>, EngineError> + Send + Sync);

/// Storage seam for subscription records
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Current expiry for `user_id`, if any
    async fn get(&self, user_id: &str) -> Result<Option<DateTime<Utc>>, EngineError>;

    /// Atomically replace the expiry for `user_id` with `update(current)`
    /// and return the stored value
    async fn update(
        &self,
        user_id: &str,
        update: ExpiryUpdate<'_>,
    ) -> Result<DateTime<Utc>, EngineError>;

    /// Number of records held
    async fn record_count(&self) -> usize;
}

/// Subscription ledger over an injected store and clock
pub struct SubscriptionLedger {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    policy: RenewalPolicy,
}

impl SubscriptionLedger {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, policy: RenewalPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// In-memory ledger on the system clock
    pub fn in_memory(policy: RenewalPolicy) -> Self {
        Self::new(
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(SystemClock),
            policy,
        )
    }

    pub fn policy(&self) -> RenewalPolicy {
        self.policy
    }

    /// Number of users with a record
    pub async fn record_count(&self) -> usize {
        self.store.record_count().await
    }

    /// Check whether `user_id` has an active subscription
    ///
    /// Unknown users are inactive with no expiry.
    pub async fn check(&self, user_id: &str) -> Result<SubscriptionStatus, EngineError> {
        let user_id = normalize_user_id(user_id)?;
        let now = self.clock.now();

        let status = match self.store.get(user_id).await? {
            Some(expires_at) => SubscriptionStatus {
                active: expires_at > now,
                expires_at: Some(expires_at),
            },
            None => SubscriptionStatus::unknown(),
        };

        debug!(
            "Subscription check for '{}': active={} expires_at={:?}",
            user_id, status.active, status.expires_at
        );
        Ok(status)
    }

    /// Extend `user_id` by `days` and return the new expiry
    ///
    /// # Errors
    ///
    /// `InvalidExtension` when `days` is not positive or the result would
    /// overflow the timestamp range.
    pub async fn extend(&self, user_id: &str, days: i64) -> Result<DateTime<Utc>, EngineError> {
        let user_id = normalize_user_id(user_id)?;
        if days <= 0 {
            return Err(EngineError::InvalidExtension(days));
        }
        let period = Duration::try_days(days).ok_or(EngineError::InvalidExtension(days))?;

        let clock = Arc::clone(&self.clock);
        let policy = self.policy;
        let new_expiry = self
            .store
            .update(user_id, &move |current: Option<DateTime<Utc>>| {
                policy
                    .next_expiry(current, clock.now(), period)
                    .ok_or(EngineError::InvalidExtension(days))
            })
            .await?;

        info!(
            "Extended subscription for '{}' by {} days until {}",
            user_id, days, new_expiry
        );
        Ok(new_expiry)
    }
}

fn normalize_user_id(user_id: &str) -> Result<&str, EngineError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InputRejected("user ID is empty".to_string()));
    }
    Ok(trimmed)
}
