//! Entitlement snapshot model and refresh policy.
//!
//! The commerce backend is the source of truth; this module only holds the
//! most recent snapshot it handed back. The only thing the flow inspects is
//! whether the active set is non-empty (supporter subscription active).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::commerce::CommerceError;

/// The user's entitlement status as last reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementInfo {
    /// Identifiers of currently active entitlements. Opaque to this crate
    /// beyond emptiness.
    pub active_entitlements: BTreeSet<String>,
    /// When this snapshot was fetched.
    pub fetched_at: DateTime<Utc>,
}

impl EntitlementInfo {
    pub fn new(active_entitlements: BTreeSet<String>) -> Self {
        Self {
            active_entitlements,
            fetched_at: Utc::now(),
        }
    }

    /// Supporter subscription active iff any entitlement is active.
    pub fn is_active(&self) -> bool {
        !self.active_entitlements.is_empty()
    }
}

/// What to do with the held snapshot when a status fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntitlementFailurePolicy {
    /// Replace the snapshot with whatever came back, even nothing. Mirrors
    /// the upstream client, where a transient fetch failure blanks out a
    /// previously known active entitlement.
    #[default]
    Overwrite,
    /// Keep the last known snapshot when the fetch fails.
    KeepPrevious,
}

/// Fold a fetch result into the held snapshot under the given policy.
///
/// Errors never propagate out of entitlement refreshes; they degrade the
/// snapshot according to `policy` and are logged at debug level.
pub fn apply_refresh(
    previous: Option<EntitlementInfo>,
    fetched: Result<EntitlementInfo, CommerceError>,
    policy: EntitlementFailurePolicy,
) -> Option<EntitlementInfo> {
    match fetched {
        Ok(info) => Some(info),
        Err(err) => match policy {
            EntitlementFailurePolicy::Overwrite => {
                tracing::debug!("Entitlement fetch failed, clearing snapshot: {}", err);
                None
            }
            EntitlementFailurePolicy::KeepPrevious => {
                tracing::debug!("Entitlement fetch failed, keeping snapshot: {}", err);
                previous
            }
        },
    }
}
