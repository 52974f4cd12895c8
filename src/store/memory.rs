//! In-memory [`UsageStore`] implementation.
//!
//! Reference implementation of the store port: a pair of maps behind a
//! mutex, with the conditional decrement performed under the lock so it is
//! atomic with respect to concurrent requests in the same process. Used by
//! the integration tests and suitable for single-instance embedding; a
//! production deployment implements [`UsageStore`] over the hosted
//! database instead.

use super::{CreditAccount, DecrementOutcome, StoreError, UsageRecord, UsageStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Tables {
    anonymous_usage: HashMap<String, UsageRecord>,
    accounts: HashMap<String, CreditAccount>,
}

/// Map-backed usage store. Cheap to clone state out of for assertions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a credit account row (test/bootstrap helper).
    pub fn insert_account(&self, account: CreditAccount) {
        let mut t = self.tables.lock().expect("memory store poisoned");
        t.accounts.insert(account.user_id.clone(), account);
    }

    /// Snapshot of an account row, if present.
    pub fn account(&self, user_id: &str) -> Option<CreditAccount> {
        let t = self.tables.lock().expect("memory store poisoned");
        t.accounts.get(user_id).cloned()
    }

    /// Snapshot of an anonymous usage row, if present.
    pub fn usage(&self, fingerprint: &str) -> Option<UsageRecord> {
        let t = self.tables.lock().expect("memory store poisoned");
        t.anonymous_usage.get(fingerprint).cloned()
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn anonymous_usage(
        &self,
        fingerprint: &str,
    ) -> Result<Option<UsageRecord>, StoreError> {
        let t = self.tables.lock().expect("memory store poisoned");
        Ok(t.anonymous_usage.get(fingerprint).cloned())
    }

    async fn upsert_anonymous_usage(
        &self,
        fingerprint: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut t = self.tables.lock().expect("memory store poisoned");
        t.anonymous_usage.insert(
            fingerprint.to_string(),
            UsageRecord {
                fingerprint: fingerprint.to_string(),
                last_conversion_at: at,
            },
        );
        Ok(())
    }

    async fn credit_account(&self, user_id: &str) -> Result<Option<CreditAccount>, StoreError> {
        let t = self.tables.lock().expect("memory store poisoned");
        Ok(t.accounts.get(user_id).cloned())
    }

    async fn decrement_credits(&self, user_id: &str) -> Result<DecrementOutcome, StoreError> {
        let mut t = self.tables.lock().expect("memory store poisoned");
        match t.accounts.get_mut(user_id) {
            Some(account) if account.credits > 0 => {
                account.credits -= 1;
                Ok(DecrementOutcome::Decremented {
                    remaining: account.credits,
                })
            }
            _ => Ok(DecrementOutcome::NoPositiveBalance),
        }
    }

    async fn mark_window_start(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut t = self.tables.lock().expect("memory store poisoned");
        let account = t
            .accounts
            .entry(user_id.to_string())
            .or_insert_with(|| CreditAccount {
                user_id: user_id.to_string(),
                credits: 0,
                last_free_conversion_at: None,
            });
        account.last_free_conversion_at = Some(at);
        Ok(())
    }

    async fn reset_credits(
        &self,
        user_id: &str,
        credits: u32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut t = self.tables.lock().expect("memory store poisoned");
        let account = t
            .accounts
            .entry(user_id.to_string())
            .or_insert_with(|| CreditAccount {
                user_id: user_id.to_string(),
                credits: 0,
                last_free_conversion_at: None,
            });
        account.credits = credits;
        account.last_free_conversion_at = Some(at);
        Ok(())
    }
}
