//! # statement2csv
//!
//! The conversion core of a PDF-statement-to-CSV service: quota
//! arbitration across caller tiers, a two-stage AI transformation with
//! ordered model fallback, and exactly-once consumption recording.
//!
//! ## Pipeline Overview
//!
//! ```text
//! data URI
//!  │
//!  ├─ 1. Input    validate the base64 PDF payload (free to fail)
//!  ├─ 2. Quota    entitlement gate: anonymous window / free credits / paid
//!  ├─ 3. Chain    extract → standardize, falling back across backends
//!  ├─ 4. Consume  record usage — only after verified success
//!  └─ 5. Output   CSV + winning-backend token total
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use statement2csv::{CallerIdentity, Converter, ConverterConfig, MemoryStore};
//! use std::sync::Arc;
//!
//! # async fn demo(backends: Vec<Arc<dyn statement2csv::ModelBackend>>) -> Result<(), Box<dyn std::error::Error>> {
//! let converter = Converter::new(
//!     Arc::new(MemoryStore::new()),
//!     backends, // primary first, then fallbacks
//!     ConverterConfig::default(),
//! )?;
//!
//! let caller = CallerIdentity::anonymous("fp-3f9a");
//! let output = converter.convert("data:application/pdf;base64,...", &caller).await?;
//! println!("{}", output.csv);
//! eprintln!("tokens: {} via {}", output.tokens_used, output.backend);
//! # Ok(())
//! # }
//! ```
//!
//! ## Caller tiers
//!
//! | Caller | Quota | Reset |
//! |--------|-------|-------|
//! | Anonymous (fingerprint) | 1 page | 24 h after last conversion |
//! | Registered Free | 5 credits | 24 h window once exhausted |
//! | Registered paid | unlimited here | metered upstream by billing |
//!
//! The two external collaborators are traits the embedder implements:
//! [`store::UsageStore`] over the hosted database, and
//! [`pipeline::backend::ModelBackend`] per inference endpoint. The ordered
//! backend list is configuration, not logic — swapping the primary model
//! never touches orchestration code.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod accountant;
pub mod config;
pub mod convert;
pub mod error;
pub mod identity;
pub mod output;
pub mod pipeline;
pub mod quota;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use accountant::CreditAccountant;
pub use config::{ConverterConfig, ConverterConfigBuilder};
pub use convert::Converter;
pub use error::{AttemptFailure, ConvertError, ErrorKind, Stage};
pub use identity::{CallerIdentity, Plan};
pub use output::ConversionOutput;
pub use pipeline::backend::{BackendError, ModelBackend, StageOutput, TokenUsage};
pub use pipeline::chain::{ChainExhausted, ChainSuccess, ModelChain};
pub use pipeline::input::{DocumentPayload, PDF_DATA_URI_PREFIX};
pub use quota::{Denial, Entitlement, QuotaLedger};
pub use store::{CreditAccount, DecrementOutcome, MemoryStore, StoreError, UsageRecord, UsageStore};
