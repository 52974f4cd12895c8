//! Configuration for the conversion core.
//!
//! All tunable behaviour lives in [`ConverterConfig`], built via its
//! [`ConverterConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share the config across request tasks and to diff two
//! deployments to understand why their quota behaviour differs.
//!
//! Backend *order* is deliberately not in here: the ordered backend list is
//! plain data passed to [`crate::convert::Converter::new`], because swapping
//! the primary/fallback identifiers is a deployment decision, not logic.

use crate::error::ConvertError;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Tunables for quota arbitration and the model chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Credits granted to a Free-plan account per reset window. Default: 5.
    ///
    /// This is also the figure restored conceptually when a zero-credit
    /// account's window elapses, and the basis of the safe-default
    /// remaining-quota string when the store is unreachable.
    pub free_plan_credits: u32,

    /// Hours until an exhausted caller's allotment is restored. Default: 24.
    ///
    /// Applies to both the anonymous one-per-day quota and the Free-plan
    /// zero-credit window.
    pub reset_window_hours: i64,

    /// Per-stage timeout for a single backend call, in seconds. Default: 120.
    ///
    /// Bounds each `extract`/`standardize` call so a stuck backend cannot
    /// block fallback to the next backend indefinitely. Statement PDFs are
    /// dense; extraction regularly takes over a minute on slower models.
    pub stage_timeout_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            free_plan_credits: 5,
            reset_window_hours: 24,
            stage_timeout_secs: 120,
        }
    }
}

impl ConverterConfig {
    /// Create a new builder.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// The reset window as a [`chrono::Duration`].
    pub fn reset_window(&self) -> Duration {
        Duration::hours(self.reset_window_hours)
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn free_plan_credits(mut self, n: u32) -> Self {
        self.config.free_plan_credits = n;
        self
    }

    pub fn reset_window_hours(mut self, hours: i64) -> Self {
        self.config.reset_window_hours = hours;
        self
    }

    pub fn stage_timeout_secs(mut self, secs: u64) -> Self {
        self.config.stage_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConvertError> {
        let c = &self.config;
        if c.free_plan_credits == 0 {
            return Err(ConvertError::unconfigured(
                "free_plan_credits is 0",
                "The Free plan must grant at least one credit per window.",
            ));
        }
        if c.reset_window_hours <= 0 {
            return Err(ConvertError::unconfigured(
                "reset_window_hours is not positive",
                "The reset window must be a positive number of hours.",
            ));
        }
        if c.stage_timeout_secs == 0 {
            return Err(ConvertError::unconfigured(
                "stage_timeout_secs is 0",
                "Backend stage calls must be bounded by a positive timeout.",
            ));
        }
        Ok(self.config)
    }
}
