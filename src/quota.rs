//! Entitlement decisions and the remaining-quota display string.
//!
//! [`QuotaLedger`] owns every *read* of usage state and the yes/no decision
//! of whether a caller may spend a conversion right now. It never writes —
//! the write path lives exclusively in [`crate::accountant`], which is what
//! guarantees consumption is only recorded after a verified success.
//!
//! Store failures are handled asymmetrically on purpose:
//!
//! * **entitlement** fails *closed* (deny) — we will not run inference for
//!   a caller whose quota we cannot verify;
//! * **display** fails *open* to a safe default string — the status line
//!   must never block the UI on a store hiccup.
//!
//! Both methods take `now` as an argument so window arithmetic is
//! deterministic under test; callers pass `Utc::now()`.

use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::identity::CallerIdentity;
use crate::store::{StoreError, UsageStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

/// Read-side quota arbiter.
pub struct QuotaLedger {
    store: Arc<dyn UsageStore>,
    config: ConverterConfig,
}

/// Outcome of an entitlement check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entitlement {
    Entitled,
    Denied(Denial),
}

/// Why a caller was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// Anonymous fingerprint already converted inside the current window.
    AnonymousWindow { resets_at: DateTime<Utc> },
    /// Free-plan account at zero credits inside the current window.
    CreditsExhausted { resets_at: DateTime<Utc> },
    /// The store could not be read; quota cannot be verified.
    StoreUnavailable,
}

impl Denial {
    /// User-facing denial detail, embedded in
    /// [`ConvertError::QuotaExhausted`].
    pub fn detail(&self, now: DateTime<Utc>) -> String {
        match self {
            Denial::AnonymousWindow { resets_at } => format!(
                "the free daily conversion is already used (resets in {})",
                window_left(*resets_at, now)
            ),
            Denial::CreditsExhausted { resets_at } => format!(
                "all free credits are used (resets in {})",
                window_left(*resets_at, now)
            ),
            Denial::StoreUnavailable => {
                "your remaining quota could not be verified — please try again".to_string()
            }
        }
    }
}

impl QuotaLedger {
    pub fn new(store: Arc<dyn UsageStore>, config: ConverterConfig) -> Self {
        Self { store, config }
    }

    /// Decide whether `identity` may convert right now.
    ///
    /// Only missing-configuration errors propagate; any other store failure
    /// is logged and denied.
    pub async fn check_entitlement(
        &self,
        identity: &CallerIdentity,
        now: DateTime<Utc>,
    ) -> Result<Entitlement, ConvertError> {
        match identity {
            CallerIdentity::Anonymous { fingerprint } => {
                let record = match self.store.anonymous_usage(fingerprint).await {
                    Ok(record) => record,
                    Err(e) => return self.fail_closed(identity, e),
                };
                match record {
                    Some(rec) if now - rec.last_conversion_at < self.config.reset_window() => {
                        Ok(Entitlement::Denied(Denial::AnonymousWindow {
                            resets_at: rec.last_conversion_at + self.config.reset_window(),
                        }))
                    }
                    _ => Ok(Entitlement::Entitled),
                }
            }
            CallerIdentity::Registered { plan, .. } if !plan.is_locally_metered() => {
                // Paid plans are metered upstream by billing.
                Ok(Entitlement::Entitled)
            }
            CallerIdentity::Registered { user_id, .. } => {
                let account = match self.store.credit_account(user_id).await {
                    Ok(account) => account,
                    Err(e) => return self.fail_closed(identity, e),
                };
                match account {
                    Some(acc) if acc.credits > 0 => Ok(Entitlement::Entitled),
                    Some(acc) => match acc.last_free_conversion_at {
                        // Zero credits inside the window: denied until it
                        // elapses, at which point the allotment is
                        // conceptually restored.
                        Some(at) if now - at < self.config.reset_window() => {
                            Ok(Entitlement::Denied(Denial::CreditsExhausted {
                                resets_at: at + self.config.reset_window(),
                            }))
                        }
                        _ => Ok(Entitlement::Entitled),
                    },
                    // Row not provisioned yet — fresh account, full allotment.
                    None => Ok(Entitlement::Entitled),
                }
            }
        }
    }

    /// Human-readable remaining quota, for status display only.
    ///
    /// Never errors: on store failure it degrades to the plan's safe
    /// default rather than blocking the UI.
    pub async fn describe_remaining(
        &self,
        identity: &CallerIdentity,
        now: DateTime<Utc>,
    ) -> String {
        match identity {
            CallerIdentity::Anonymous { fingerprint } => {
                let record = match self.store.anonymous_usage(fingerprint).await {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(identity = %identity, error = %e, "quota display degraded to default");
                        return "1 page remaining".to_string();
                    }
                };
                match record {
                    Some(rec) if now - rec.last_conversion_at < self.config.reset_window() => {
                        zero_left_label(rec.last_conversion_at + self.config.reset_window(), now)
                    }
                    _ => "1 page remaining".to_string(),
                }
            }
            CallerIdentity::Registered { plan, .. } if !plan.is_locally_metered() => {
                // Lookup table, not branching logic.
                plan.quota_label().unwrap_or("Custom plan").to_string()
            }
            CallerIdentity::Registered { user_id, .. } => {
                let default = format!("{} pages remaining", self.config.free_plan_credits);
                let account = match self.store.credit_account(user_id).await {
                    Ok(account) => account,
                    Err(e) => {
                        warn!(identity = %identity, error = %e, "quota display degraded to default");
                        return default;
                    }
                };
                match account {
                    Some(acc) if acc.credits > 0 => format!("{} pages remaining", acc.credits),
                    Some(acc) => match acc.last_free_conversion_at {
                        Some(at) if now - at < self.config.reset_window() => {
                            zero_left_label(at + self.config.reset_window(), now)
                        }
                        // Window elapsed: the allotment is conceptually
                        // restored; the stored balance is only rewritten by
                        // the next conversion, not by a read.
                        _ => default,
                    },
                    None => default,
                }
            }
        }
    }

    fn fail_closed(
        &self,
        identity: &CallerIdentity,
        e: StoreError,
    ) -> Result<Entitlement, ConvertError> {
        match e {
            StoreError::Unconfigured(detail) => Err(ConvertError::unconfigured(
                "usage store",
                format!("Set the datastore credentials before serving conversions.\n{detail}"),
            )),
            e => {
                warn!(identity = %identity, error = %e, "entitlement check failed closed");
                Ok(Entitlement::Denied(Denial::StoreUnavailable))
            }
        }
    }
}

/// `"<H>h <M>m"` until `resets_at`: floor hours and remainder minutes.
fn window_left(resets_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let left = (resets_at - now).max(chrono::Duration::zero());
    let hours = left.num_hours();
    let minutes = left.num_minutes() - hours * 60;
    format!("{hours}h {minutes}m")
}

/// The timed zero-remaining display string.
fn zero_left_label(resets_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format!("0 pages remaining ({} left)", window_left(resets_at, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Plan;
    use crate::store::{CreditAccount, DecrementOutcome, MemoryStore, UsageRecord};
    use async_trait::async_trait;
    use chrono::Duration;

    /// Store whose every call fails, for the degraded paths.
    struct DownStore;

    #[async_trait]
    impl UsageStore for DownStore {
        async fn anonymous_usage(&self, _: &str) -> Result<Option<UsageRecord>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn upsert_anonymous_usage(
            &self,
            _: &str,
            _: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn credit_account(&self, _: &str) -> Result<Option<CreditAccount>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn decrement_credits(&self, _: &str) -> Result<DecrementOutcome, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn mark_window_start(&self, _: &str, _: DateTime<Utc>) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn reset_credits(
            &self,
            _: &str,
            _: u32,
            _: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    fn ledger_with(store: Arc<dyn UsageStore>) -> QuotaLedger {
        QuotaLedger::new(store, ConverterConfig::default())
    }

    fn seeded(store: &MemoryStore, user: &str, credits: u32, stamp: Option<DateTime<Utc>>) {
        store.insert_account(CreditAccount {
            user_id: user.to_string(),
            credits,
            last_free_conversion_at: stamp,
        });
    }

    // ── Entitlement ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn anonymous_first_conversion_is_entitled() {
        let ledger = ledger_with(Arc::new(MemoryStore::new()));
        let e = ledger
            .check_entitlement(&CallerIdentity::anonymous("fp"), Utc::now())
            .await
            .unwrap();
        assert_eq!(e, Entitlement::Entitled);
    }

    #[tokio::test]
    async fn anonymous_within_window_is_denied() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        store
            .upsert_anonymous_usage("fp", now - Duration::hours(10))
            .await
            .unwrap();
        let ledger = ledger_with(store);
        match ledger
            .check_entitlement(&CallerIdentity::anonymous("fp"), now)
            .await
            .unwrap()
        {
            Entitlement::Denied(Denial::AnonymousWindow { resets_at }) => {
                assert_eq!(resets_at, now + Duration::hours(14));
            }
            other => panic!("expected window denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn anonymous_after_window_is_entitled_again() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        store
            .upsert_anonymous_usage("fp", now - Duration::hours(25))
            .await
            .unwrap();
        let ledger = ledger_with(store);
        assert_eq!(
            ledger
                .check_entitlement(&CallerIdentity::anonymous("fp"), now)
                .await
                .unwrap(),
            Entitlement::Entitled
        );
    }

    #[tokio::test]
    async fn free_with_credits_is_entitled() {
        let store = Arc::new(MemoryStore::new());
        seeded(&store, "u1", 3, None);
        let ledger = ledger_with(store);
        assert_eq!(
            ledger
                .check_entitlement(&CallerIdentity::registered("u1", Plan::Free), Utc::now())
                .await
                .unwrap(),
            Entitlement::Entitled
        );
    }

    #[tokio::test]
    async fn free_zero_credits_within_window_is_denied() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seeded(&store, "u1", 0, Some(now - Duration::hours(10)));
        let ledger = ledger_with(store);
        match ledger
            .check_entitlement(&CallerIdentity::registered("u1", Plan::Free), now)
            .await
            .unwrap()
        {
            Entitlement::Denied(Denial::CreditsExhausted { resets_at }) => {
                assert_eq!(resets_at, now + Duration::hours(14));
            }
            other => panic!("expected credit denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn free_zero_credits_after_window_is_entitled() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seeded(&store, "u1", 0, Some(now - Duration::hours(24)));
        let ledger = ledger_with(store);
        assert_eq!(
            ledger
                .check_entitlement(&CallerIdentity::registered("u1", Plan::Free), now)
                .await
                .unwrap(),
            Entitlement::Entitled
        );
    }

    #[tokio::test]
    async fn paid_plan_is_always_entitled_without_store_reads() {
        // DownStore errors on every call; a paid check must not touch it.
        let ledger = ledger_with(Arc::new(DownStore));
        assert_eq!(
            ledger
                .check_entitlement(
                    &CallerIdentity::registered("u1", Plan::Professional),
                    Utc::now()
                )
                .await
                .unwrap(),
            Entitlement::Entitled
        );
    }

    #[tokio::test]
    async fn entitlement_fails_closed_when_store_is_down() {
        let ledger = ledger_with(Arc::new(DownStore));
        assert_eq!(
            ledger
                .check_entitlement(&CallerIdentity::anonymous("fp"), Utc::now())
                .await
                .unwrap(),
            Entitlement::Denied(Denial::StoreUnavailable)
        );
    }

    // ── Display string ───────────────────────────────────────────────────

    #[tokio::test]
    async fn anonymous_display_formats() {
        let store = Arc::new(MemoryStore::new());
        let ledger = QuotaLedger::new(store.clone(), ConverterConfig::default());
        let now = Utc::now();
        let anon = CallerIdentity::anonymous("fp");

        // No prior record.
        assert_eq!(ledger.describe_remaining(&anon, now).await, "1 page remaining");

        // 10h into the window: 14h 0m left.
        store
            .upsert_anonymous_usage("fp", now - Duration::hours(10))
            .await
            .unwrap();
        assert_eq!(
            ledger.describe_remaining(&anon, now).await,
            "0 pages remaining (14h 0m left)"
        );

        // Boundary: 23h59m used leaves 0h 1m.
        store
            .upsert_anonymous_usage("fp", now - Duration::hours(23) - Duration::minutes(59))
            .await
            .unwrap();
        assert_eq!(
            ledger.describe_remaining(&anon, now).await,
            "0 pages remaining (0h 1m left)"
        );

        // Window elapsed.
        store
            .upsert_anonymous_usage("fp", now - Duration::hours(25))
            .await
            .unwrap();
        assert_eq!(ledger.describe_remaining(&anon, now).await, "1 page remaining");
    }

    #[tokio::test]
    async fn free_display_formats() {
        let store = Arc::new(MemoryStore::new());
        let ledger = QuotaLedger::new(store.clone(), ConverterConfig::default());
        let now = Utc::now();
        let user = CallerIdentity::registered("u1", Plan::Free);

        seeded(&store, "u1", 3, None);
        assert_eq!(ledger.describe_remaining(&user, now).await, "3 pages remaining");

        seeded(&store, "u1", 0, Some(now - Duration::hours(10)));
        assert_eq!(
            ledger.describe_remaining(&user, now).await,
            "0 pages remaining (14h 0m left)"
        );

        // Elapsed window: allotment conceptually restored on read.
        seeded(&store, "u1", 0, Some(now - Duration::hours(25)));
        assert_eq!(ledger.describe_remaining(&user, now).await, "5 pages remaining");
    }

    #[tokio::test]
    async fn paid_display_is_the_plan_label() {
        let ledger = ledger_with(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        assert_eq!(
            ledger
                .describe_remaining(&CallerIdentity::registered("u", Plan::Professional), now)
                .await,
            "1000 pages/month"
        );
        assert_eq!(
            ledger
                .describe_remaining(&CallerIdentity::registered("u", Plan::Enterprise), now)
                .await,
            "Custom plan"
        );
    }

    #[tokio::test]
    async fn display_degrades_to_safe_defaults_when_store_is_down() {
        let ledger = ledger_with(Arc::new(DownStore));
        let now = Utc::now();
        assert_eq!(
            ledger
                .describe_remaining(&CallerIdentity::anonymous("fp"), now)
                .await,
            "1 page remaining"
        );
        assert_eq!(
            ledger
                .describe_remaining(&CallerIdentity::registered("u1", Plan::Free), now)
                .await,
            "5 pages remaining"
        );
    }
}
