//! Top-level conversion orchestration.
//!
//! [`Converter`] ties the pieces into one state machine per request:
//!
//! ```text
//! Idle ─▶ CheckingQuota ─▶ Converting ─▶ Succeeded
//!              │                │
//!              ▼                ▼
//!           Denied           Failed
//! ```
//!
//! Side effects are strictly ordered. The entitlement gate runs before any
//! inference spend; consumption is recorded only after the chain returns a
//! verified success, and a consumption-write failure is logged but never
//! surfaced — the conversion already succeeded from the caller's point of
//! view. Failed conversions are free.
//!
//! Each request is an independent stateless task; all quota state lives in
//! the store, read fresh every time. Two concurrent requests from the same
//! identity can both pass the entitlement gate before either records
//! consumption — an accepted over-grant of at most N−1 conversions for N
//! concurrent requests, narrowed (not eliminated) by the store's atomic
//! decrement.

use crate::accountant::CreditAccountant;
use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::identity::CallerIdentity;
use crate::output::ConversionOutput;
use crate::pipeline::backend::ModelBackend;
use crate::pipeline::chain::ModelChain;
use crate::pipeline::input::DocumentPayload;
use crate::quota::{Entitlement, QuotaLedger};
use crate::store::UsageStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;
use tracing::{info, warn};

/// The conversion service: quota gate, model chain, consumption recording.
///
/// Construct once at startup and share across request tasks; every method
/// takes `&self`.
pub struct Converter {
    ledger: QuotaLedger,
    accountant: CreditAccountant,
    chain: ModelChain,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter").finish_non_exhaustive()
    }
}

impl Converter {
    /// Build the service from a store, an ordered backend list (primary
    /// first), and config.
    ///
    /// # Errors
    /// [`ConvertError::Unconfigured`] if `backends` is empty — a missing
    /// model chain should surface at startup, not as a per-request failure.
    pub fn new(
        store: Arc<dyn UsageStore>,
        backends: Vec<Arc<dyn ModelBackend>>,
        config: ConverterConfig,
    ) -> Result<Self, ConvertError> {
        if backends.is_empty() {
            return Err(ConvertError::unconfigured(
                "no model backends",
                "Provide at least one ModelBackend in priority order.",
            ));
        }
        let chain = ModelChain::new(backends, Duration::from_secs(config.stage_timeout_secs));
        Ok(Self {
            ledger: QuotaLedger::new(Arc::clone(&store), config.clone()),
            accountant: CreditAccountant::new(store, config),
            chain,
        })
    }

    /// Convert a PDF data URI to CSV for the given caller.
    ///
    /// This is the inbound contract of the core: the UI layer passes the
    /// upload exactly as `FileReader.readAsDataURL` produced it.
    pub async fn convert(
        &self,
        pdf_data_uri: &str,
        identity: &CallerIdentity,
    ) -> Result<ConversionOutput, ConvertError> {
        let document = DocumentPayload::from_data_uri(pdf_data_uri)?;
        self.convert_document(&document, identity).await
    }

    /// Convert an already-validated payload.
    pub async fn convert_document(
        &self,
        document: &DocumentPayload,
        identity: &CallerIdentity,
    ) -> Result<ConversionOutput, ConvertError> {
        let start = Instant::now();
        let now = Utc::now();
        info!(identity = %identity, size = document.len(), "conversion requested");

        // Gate before any inference spend.
        if let Entitlement::Denied(denial) = self.ledger.check_entitlement(identity, now).await? {
            info!(identity = %identity, ?denial, "conversion denied");
            return Err(ConvertError::QuotaExhausted {
                detail: denial.detail(now),
            });
        }

        let success = match self.chain.run(document).await {
            Ok(success) => success,
            Err(exhausted) => {
                // No consumption recorded: failed conversions are free.
                let last_failure = exhausted
                    .failures
                    .last()
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "no backends attempted".to_string());
                return Err(ConvertError::AllModelsFailed {
                    attempted: self.chain.len(),
                    last_failure,
                    failures: exhausted.failures,
                });
            }
        };

        // Best-effort: the conversion already succeeded, so a failed
        // consumption write must not fail the user-visible result.
        if let Err(e) = self
            .accountant
            .record_consumption(identity, Utc::now())
            .await
        {
            warn!(identity = %identity, error = %e, "consumption recording failed");
        }

        Ok(ConversionOutput {
            csv: success.csv,
            tokens_used: success.tokens_used,
            backend: success.backend,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Human-readable remaining quota for status display.
    ///
    /// Read-only and infallible: degrades to a safe default string when
    /// the store is unreachable.
    pub async fn remaining_quota(&self, identity: &CallerIdentity) -> String {
        self.ledger.describe_remaining(identity, Utc::now()).await
    }
}
