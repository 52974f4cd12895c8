//! Datastore port for caller-scoped usage state.
//!
//! All quota state lives in an external relational store; request handling
//! is stateless and potentially multi-instance, so nothing in this crate
//! caches usage rows across requests. [`UsageStore`] is the narrow trait
//! the core needs from that store: two row shapes, scoped reads, an upsert,
//! and an **atomic** conditional decrement.
//!
//! ## Why the decrement is a store operation
//!
//! A select-then-update in application code lets two concurrent requests
//! from the same account both observe `credits = 1` and both write `0`,
//! over-granting a conversion. [`UsageStore::decrement_credits`] is
//! specified as the equivalent of
//! `UPDATE ... SET credits = credits - 1 WHERE credits > 0 RETURNING credits`:
//! zero rows updated means the balance was already zero, and the caller
//! reacts to that outcome instead of re-reading. This narrows (it cannot
//! fully eliminate — the entitlement pre-check is still a separate read)
//! the same-identity race documented in the crate docs.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;

/// Latest anonymous conversion for one fingerprint.
///
/// One logical row per fingerprint; latest write wins. Created on first
/// successful conversion, never deleted by this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub fingerprint: String,
    pub last_conversion_at: DateTime<Utc>,
}

/// Credit state of one registered account.
///
/// `credits` is meaningful only on the Free plan; billing mutates `plan`
/// and `credits` out-of-band after subscription changes and this core must
/// tolerate that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAccount {
    pub user_id: String,
    pub credits: u32,
    /// Set when `credits` reaches zero; marks the start of the reset window.
    pub last_free_conversion_at: Option<DateTime<Utc>>,
}

/// Outcome of an atomic conditional decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecrementOutcome {
    /// A positive balance existed; `remaining` is the post-decrement value.
    Decremented { remaining: u32 },
    /// No row with `credits > 0` matched — the balance was already zero
    /// (or the account row does not exist yet).
    NoPositiveBalance,
}

/// The read/write surface the conversion core needs from the datastore.
///
/// Implementations wrap the hosted database client. [`MemoryStore`] is the
/// in-process reference implementation used by the integration tests.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Most recent usage record for an anonymous fingerprint, if any.
    async fn anonymous_usage(&self, fingerprint: &str)
        -> Result<Option<UsageRecord>, StoreError>;

    /// Upsert-by-key: record a successful anonymous conversion at `at`.
    async fn upsert_anonymous_usage(
        &self,
        fingerprint: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Credit account row for a registered user, if one exists.
    async fn credit_account(&self, user_id: &str) -> Result<Option<CreditAccount>, StoreError>;

    /// Atomically decrement `credits` where `credits > 0`.
    async fn decrement_credits(&self, user_id: &str) -> Result<DecrementOutcome, StoreError>;

    /// Stamp the start of a reset window without touching the balance.
    async fn mark_window_start(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Overwrite the balance and window stamp in one write — used when a
    /// zero-credit account converts through a just-elapsed window and its
    /// allotment is restored minus the conversion being recorded.
    async fn reset_credits(
        &self,
        user_id: &str,
        credits: u32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Failures crossing the store boundary.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Store credentials or connection configuration are missing.
    /// Operational — surfaces as [`crate::error::ConvertError::Unconfigured`].
    #[error("usage store is not configured: {0}")]
    Unconfigured(String),

    /// The store is reachable in principle but this call failed.
    #[error("usage store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the operation (constraint violation, bad key).
    #[error("usage store rejected the operation: {0}")]
    Rejected(String),
}
