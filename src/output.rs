//! Result types returned to the caller.

use serde::{Deserialize, Serialize};

/// A completed conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Standardized CSV, ready to download.
    pub csv: String,
    /// Token total across both stages of the winning backend only —
    /// tokens spent on failed fallback attempts are not charged here.
    pub tokens_used: u64,
    /// Which backend produced the result.
    pub backend: String,
    /// Wall-clock time for the whole request, including failed attempts.
    pub duration_ms: u64,
}
