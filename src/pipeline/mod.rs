//! Pipeline stages for statement-to-CSV conversion.
//!
//! Each submodule implements exactly one concern. Keeping stages separate
//! makes each independently testable and lets us swap implementations
//! (e.g. a different backend transport) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──────▶ chain ─────────────────▶ output
//! (data URI)    (extract → standardize,
//!                ordered fallback)
//! ```
//!
//! 1. [`input`]   — validate and decode the base64 PDF data URI into a
//!    [`input::DocumentPayload`]; nothing downstream runs on bad input
//! 2. [`backend`] — the two-method capability port every inference backend
//!    implements, plus per-stage token accounting types
//! 3. [`chain`]   — drive the ordered backend list, stopping at the first
//!    backend that completes both stages with non-empty output; the only
//!    stage with network I/O

pub mod backend;
pub mod chain;
pub mod input;
