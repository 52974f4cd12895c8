//! The single write path for quota consumption.
//!
//! [`CreditAccountant::record_consumption`] runs exactly once per verified
//! successful conversion, after the model chain has returned CSV. No other
//! component mutates usage rows; the ledger only reads. That split is a
//! design rule, not a convention — it keeps the success-then-consume
//! ordering auditable from the call graph alone.

use crate::config::ConverterConfig;
use crate::identity::CallerIdentity;
use crate::store::{DecrementOutcome, StoreError, UsageStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Write-side counterpart of [`crate::quota::QuotaLedger`].
pub struct CreditAccountant {
    store: Arc<dyn UsageStore>,
    config: ConverterConfig,
}

impl CreditAccountant {
    pub fn new(store: Arc<dyn UsageStore>, config: ConverterConfig) -> Self {
        Self { store, config }
    }

    /// Record one successful conversion for `identity`.
    ///
    /// * Anonymous — upsert the fingerprint's usage row to `now`.
    /// * Free plan — atomic conditional decrement. Hitting zero stamps the
    ///   start of the reset window; finding no positive balance means the
    ///   caller came through a just-elapsed window, so a fresh window
    ///   begins at the default allotment minus this conversion.
    /// * Paid plans — no-op; metering happens upstream.
    pub async fn record_consumption(
        &self,
        identity: &CallerIdentity,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        match identity {
            CallerIdentity::Anonymous { fingerprint } => {
                self.store.upsert_anonymous_usage(fingerprint, now).await?;
                debug!(identity = %identity, "anonymous conversion recorded");
                Ok(())
            }
            CallerIdentity::Registered { plan, .. } if !plan.is_locally_metered() => Ok(()),
            CallerIdentity::Registered { user_id, .. } => {
                match self.store.decrement_credits(user_id).await? {
                    DecrementOutcome::Decremented { remaining: 0 } => {
                        self.store.mark_window_start(user_id, now).await?;
                        debug!(identity = %identity, "credits exhausted, reset window started");
                        Ok(())
                    }
                    DecrementOutcome::Decremented { remaining } => {
                        debug!(identity = %identity, remaining, "credit consumed");
                        Ok(())
                    }
                    DecrementOutcome::NoPositiveBalance => {
                        let fresh = self.config.free_plan_credits.saturating_sub(1);
                        self.store.reset_credits(user_id, fresh, now).await?;
                        debug!(identity = %identity, credits = fresh, "fresh window granted");
                        Ok(())
                    }
                }
            }
        }
    }
}
