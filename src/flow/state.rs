//! Renderer-facing state snapshot.
//!
//! The flow publishes this struct over a watch channel after every
//! transition. It serializes with camelCase keys so a view layer can consume
//! snapshots as JSON directly.

use serde::{Deserialize, Serialize};

use crate::commerce::Offering;
use crate::entitlements::EntitlementInfo;

/// How the most recent purchase attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PurchaseOutcome {
    Success,
    UserCancelled,
    Failed,
}

/// Snapshot of everything the support screen renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseFlowState {
    /// Catalog fetch in flight; the renderer shows a loading placeholder.
    pub is_loading_catalog: bool,
    /// One-time tip offerings, sorted by ascending price.
    pub tips: Vec<Offering>,
    /// The supporter subscription, if the backend returned one.
    pub subscription: Option<Offering>,
    /// Last known entitlement snapshot, if any fetch has completed.
    pub entitlement: Option<EntitlementInfo>,
    /// A purchase attempt is currently running.
    pub is_purchase_in_flight: bool,
    /// Outcome of the most recent purchase attempt, until acknowledged.
    pub last_outcome: Option<PurchaseOutcome>,
}

impl PurchaseFlowState {
    /// Supporter subscription currently active.
    pub fn is_supporter_active(&self) -> bool {
        self.entitlement
            .as_ref()
            .is_some_and(EntitlementInfo::is_active)
    }

    /// The renderer should show the thank-you notice.
    pub fn show_success_notice(&self) -> bool {
        self.last_outcome == Some(PurchaseOutcome::Success)
    }

    /// The renderer should show the purchase-failed notice. Cancellation
    /// shows nothing.
    pub fn show_error_notice(&self) -> bool {
        self.last_outcome == Some(PurchaseOutcome::Failed)
    }
}
