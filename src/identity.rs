//! Caller identity and subscription plans.
//!
//! Every conversion request is made by exactly one [`CallerIdentity`]:
//! either an anonymous visitor keyed by an opaque network-origin
//! fingerprint, or a registered user keyed by user id and carrying the
//! [`Plan`] their account is on. The identity is constructed once per
//! request by the auth layer and never mutated afterwards — quota scoping,
//! consumption recording, and the remaining-quota string all key off it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The party requesting a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallerIdentity {
    /// Not signed in. `fingerprint` is an opaque hash of the client's
    /// network origin, computed upstream; this crate never inspects it.
    Anonymous { fingerprint: String },
    /// Signed in. The plan comes from the account row at request time;
    /// billing updates it out-of-band.
    Registered { user_id: String, plan: Plan },
}

impl CallerIdentity {
    /// Anonymous caller from a fingerprint hash.
    pub fn anonymous(fingerprint: impl Into<String>) -> Self {
        Self::Anonymous {
            fingerprint: fingerprint.into(),
        }
    }

    /// Registered caller on the given plan.
    pub fn registered(user_id: impl Into<String>, plan: Plan) -> Self {
        Self::Registered {
            user_id: user_id.into(),
            plan,
        }
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous { fingerprint } => write!(f, "anonymous:{fingerprint}"),
            Self::Registered { user_id, plan } => write!(f, "user:{user_id} ({plan:?})"),
        }
    }
}

/// Subscription plan of a registered account.
///
/// Only [`Plan::Free`] is locally rate-limited; paid plans are metered
/// upstream by the billing provider and are quota-unlimited from this
/// crate's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Starter,
    Professional,
    Business,
    Enterprise,
}

impl Plan {
    /// Fixed remaining-quota label for paid plans, `None` for Free.
    ///
    /// A lookup table rather than logic: adding a plan means adding a row.
    pub fn quota_label(self) -> Option<&'static str> {
        match self {
            Plan::Free => None,
            Plan::Starter => Some("400 pages/month"),
            Plan::Professional => Some("1000 pages/month"),
            Plan::Business => Some("4000 pages/month"),
            Plan::Enterprise => Some("Custom plan"),
        }
    }

    /// Whether conversions on this plan consume locally tracked credits.
    pub fn is_locally_metered(self) -> bool {
        matches!(self, Plan::Free)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_plans_have_fixed_labels() {
        assert_eq!(Plan::Starter.quota_label(), Some("400 pages/month"));
        assert_eq!(Plan::Professional.quota_label(), Some("1000 pages/month"));
        assert_eq!(Plan::Business.quota_label(), Some("4000 pages/month"));
        assert_eq!(Plan::Enterprise.quota_label(), Some("Custom plan"));
    }

    #[test]
    fn free_plan_has_no_fixed_label() {
        assert_eq!(Plan::Free.quota_label(), None);
        assert!(Plan::Free.is_locally_metered());
        assert!(!Plan::Business.is_locally_metered());
    }

    #[test]
    fn identity_display_is_scoped() {
        let anon = CallerIdentity::anonymous("abc123");
        assert_eq!(anon.to_string(), "anonymous:abc123");
        let user = CallerIdentity::registered("u-1", Plan::Professional);
        assert!(user.to_string().starts_with("user:u-1"));
    }
}
