//! Error types for the statement2csv core.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`] — **Fatal**: the conversion produced nothing the
//!   caller can use (malformed payload, quota denial, every backend down,
//!   missing configuration). Returned as `Err(ConvertError)` from
//!   [`crate::convert::Converter::convert`].
//!
//! * [`AttemptFailure`] — **Non-fatal**: one backend attempt failed but a
//!   lower-priority backend may still succeed. Collected inside
//!   [`crate::pipeline::chain`] and only surfaced in aggregate as
//!   [`ConvertError::AllModelsFailed`] once the chain is exhausted.
//!
//! Each fatal variant maps to a stable [`ErrorKind`] so the UI layer can
//! dispatch on a structured kind (upgrade prompt vs. retry prompt) instead
//! of substring-matching the message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All fatal errors returned by the conversion core.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The document payload is malformed. Fails fast: no quota is checked
    /// and no model is called. The message names the expected format.
    #[error(
        "Invalid document: {detail}\n\
         Expected a base64-encoded PDF data URI (data:application/pdf;base64,...)."
    )]
    InvalidInput { detail: String },

    /// Entitlement was denied before any inference spend.
    /// Recoverable by waiting out the reset window or upgrading.
    #[error("Conversion limit reached: {detail}\nUpgrade your plan to convert more pages.")]
    QuotaExhausted { detail: String },

    /// Every backend in the chain failed both stages or returned empty
    /// output. Transient/upstream: the caller should retry later.
    #[error(
        "All {attempted} model backends failed.\n\
         The conversion service may be temporarily degraded — please try again in a few minutes.\n\
         Last failure: {last_failure}"
    )]
    AllModelsFailed {
        attempted: usize,
        last_failure: String,
        /// Structured per-attempt diagnostics, for operators. Never raw
        /// upstream exceptions.
        failures: Vec<AttemptFailure>,
    },

    /// A required external dependency is missing (no backends configured,
    /// datastore credentials absent). Operational, surfaces at startup or
    /// on first use rather than being folded into a generic failure.
    #[error("Conversion core is not configured: {what}.\n{hint}")]
    Unconfigured { what: String, hint: String },
}

impl ConvertError {
    /// Stable machine-readable kind for UI dispatch.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::QuotaExhausted { .. } => ErrorKind::QuotaExhausted,
            Self::AllModelsFailed { .. } => ErrorKind::AllModelsFailed,
            Self::Unconfigured { .. } => ErrorKind::Unconfigured,
        }
    }

    pub(crate) fn invalid_input(detail: impl Into<String>) -> Self {
        Self::InvalidInput {
            detail: detail.into(),
        }
    }

    pub(crate) fn unconfigured(what: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Unconfigured {
            what: what.into(),
            hint: hint.into(),
        }
    }
}

/// Machine-readable classification of a [`ConvertError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    QuotaExhausted,
    AllModelsFailed,
    Unconfigured,
}

/// A non-fatal failure of a single backend attempt.
///
/// One backend failing is routine — the chain logs it and moves on. The
/// full list is attached to [`ConvertError::AllModelsFailed`] so operators
/// can tell "bad file" from "upstream outage" without raw exception text.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("backend '{backend}': {stage} stage failed: {detail}")]
pub struct AttemptFailure {
    /// Backend identifier, as reported by `ModelBackend::name()`.
    pub backend: String,
    /// Which of the two stages failed.
    pub stage: Stage,
    /// Sanitised failure description.
    pub detail: String,
}

/// The two stages of the conversion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Standardize,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Extract => write!(f, "extract"),
            Stage::Standardize => write!(f, "standardize"),
        }
    }
}
