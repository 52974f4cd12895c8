//! Ordered model fallback.
//!
//! [`ModelChain::run`] tries each backend strictly in priority order. A
//! backend "succeeds" only if *both* stages return non-empty output; any
//! error, timeout, or empty result from either stage logs a structured
//! [`AttemptFailure`] and moves to the next backend. There is no retry of
//! the same backend here — backends are cost/rate-limit-tiered, and a
//! backend that just failed is the one least likely to succeed on an
//! immediate retry.
//!
//! ## Token accounting
//!
//! The reported total sums both stages of the **winning** backend only.
//! Tokens burned on failed attempts are an operator cost, not a caller
//! cost: the user-visible figure reflects the path that produced their
//! result.

use crate::error::{AttemptFailure, Stage};
use crate::pipeline::backend::{BackendError, ModelBackend, StageOutput};
use crate::pipeline::input::DocumentPayload;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// An ordered list of interchangeable inference backends.
pub struct ModelChain {
    backends: Vec<Arc<dyn ModelBackend>>,
    stage_timeout: Duration,
}

/// A backend completed both stages with non-empty output.
#[derive(Debug, Clone)]
pub struct ChainSuccess {
    /// Standardized CSV from the winning backend.
    pub csv: String,
    /// Token total across both stages of the winning backend only.
    pub tokens_used: u64,
    /// Name of the winning backend.
    pub backend: String,
    /// Failures from higher-priority backends that were skipped past.
    pub failures: Vec<AttemptFailure>,
}

/// Every backend in the chain failed.
#[derive(Debug, Clone)]
pub struct ChainExhausted {
    pub failures: Vec<AttemptFailure>,
}

impl ModelChain {
    pub fn new(backends: Vec<Arc<dyn ModelBackend>>, stage_timeout: Duration) -> Self {
        Self {
            backends,
            stage_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Run the two-stage transformation, falling back across backends.
    pub async fn run(&self, document: &DocumentPayload) -> Result<ChainSuccess, ChainExhausted> {
        let mut failures: Vec<AttemptFailure> = Vec::new();

        for backend in &self.backends {
            let name = backend.name().to_string();
            let start = Instant::now();

            let extracted = match self.stage(&name, Stage::Extract, backend.extract(document)).await
            {
                Ok(out) => out,
                Err(failure) => {
                    warn!("{failure}");
                    failures.push(failure);
                    continue;
                }
            };

            let standardized = match self
                .stage(&name, Stage::Standardize, backend.standardize(&extracted.content))
                .await
            {
                Ok(out) => out,
                Err(failure) => {
                    warn!("{failure}");
                    failures.push(failure);
                    continue;
                }
            };

            let tokens_used = extracted.usage.total() + standardized.usage.total();
            info!(
                backend = %name,
                tokens = tokens_used,
                elapsed_ms = start.elapsed().as_millis() as u64,
                skipped = failures.len(),
                "conversion succeeded"
            );
            return Ok(ChainSuccess {
                csv: standardized.content,
                tokens_used,
                backend: name,
                failures,
            });
        }

        Err(ChainExhausted { failures })
    }

    /// Bound one stage call with the stage timeout and normalise its
    /// failure modes (error, timeout, empty output) into an attempt record.
    async fn stage(
        &self,
        backend: &str,
        stage: Stage,
        call: impl std::future::Future<Output = Result<StageOutput, BackendError>>,
    ) -> Result<StageOutput, AttemptFailure> {
        let failure = |detail: String| AttemptFailure {
            backend: backend.to_string(),
            stage,
            detail,
        };

        let output = match timeout(self.stage_timeout, call).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(failure(e.to_string())),
            Err(_) => {
                return Err(failure(format!(
                    "timed out after {}s",
                    self.stage_timeout.as_secs()
                )))
            }
        };

        if output.content.trim().is_empty() {
            return Err(failure("returned empty output".into()));
        }

        debug!(
            backend,
            %stage,
            input_tokens = output.usage.input_tokens,
            output_tokens = output.usage.output_tokens,
            "stage complete"
        );
        Ok(output)
    }
}
