//! The inference backend port.
//!
//! Every model the service can fall back to is a value implementing
//! [`ModelBackend`]: two async methods mirroring the two pipeline stages,
//! plus a stable `name()` used in logs and attempt diagnostics. The
//! ordered backend list handed to the chain is plain configuration data —
//! primary/fallback/tertiary are interchangeable values, not a type
//! hierarchy.
//!
//! Transport-level retry/backoff belongs inside a backend implementation
//! (or its HTTP client), not here; the chain's only resilience mechanism
//! is ordered fallback across *distinct* backends.

use crate::pipeline::input::DocumentPayload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A two-stage document-to-CSV inference capability.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Stable identifier for logs and diagnostics (e.g. `"gemini-2.5-flash"`).
    fn name(&self) -> &str;

    /// Stage 1: pull the tabular content out of the PDF as raw text.
    async fn extract(&self, document: &DocumentPayload) -> Result<StageOutput, BackendError>;

    /// Stage 2: normalise extracted text into clean, escaped CSV.
    async fn standardize(&self, extracted: &str) -> Result<StageOutput, BackendError>;
}

/// Output of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutput {
    /// Stage 1: extracted text. Stage 2: standardized CSV.
    pub content: String,
    pub usage: TokenUsage,
}

impl StageOutput {
    pub fn new(content: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            content: content.into(),
            usage,
        }
    }
}

/// Token accounting for a single model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Total tokens for the call.
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Failure of a single backend call.
///
/// These never cross the chain boundary — the chain folds them into
/// [`crate::error::AttemptFailure`] diagnostics and moves on.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The inference API returned an error response.
    #[error("API error: {message}")]
    Api { message: String },

    /// The API answered but the payload could not be interpreted.
    #[error("malformed response: {detail}")]
    MalformedResponse { detail: String },

    /// Backend-side credentials are missing or rejected.
    #[error("backend not configured: {detail}")]
    Unconfigured { detail: String },
}
