//! Commerce backend seam.
//!
//! The purchase flow never talks to a store SDK directly; it talks to the
//! `CommerceBackend` trait. Production wires in an adapter over the real
//! SDK, tests wire in [`StubBackend`](stub::StubBackend). Pricing,
//! entitlements, receipt validation, and renewal all live behind this
//! boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entitlements::EntitlementInfo;

pub mod stub;

/// A purchasable item as returned by the commerce backend.
///
/// Immutable once fetched. `price` is the numeric store price, used only to
/// order offerings; `localized_price` is the display string the renderer
/// shows on purchase buttons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offering {
    /// Globally unique, namespaced product identifier
    /// (`<app>.tipjar.<tier>`).
    pub identifier: String,
    /// Numeric store price, in the store's currency.
    pub price: f64,
    /// Localized, currency-formatted price string.
    pub localized_price: String,
}

/// Outcome of a purchase call that reached the backend and returned without
/// error. Cancellation by the user is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseResult {
    pub user_cancelled: bool,
}

/// Errors from the commerce backend, one variant per round-trip.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommerceError {
    #[error("Catalog fetch failed: {0}")]
    CatalogFetch(String),

    #[error("Entitlement fetch failed: {0}")]
    EntitlementFetch(String),

    #[error("Purchase failed: {0}")]
    Purchase(String),

    #[error("Restore failed: {0}")]
    Restore(String),
}

/// The four round-trips the purchase flow makes.
///
/// No timeouts are imposed here; the backend owns its own deadlines. Calls
/// run to completion or failure, never cancelled by this crate.
#[async_trait]
pub trait CommerceBackend: Send + Sync {
    /// Fetch the offerings for the given product identifiers.
    ///
    /// Returned order is backend-defined; the caller sorts. Identifiers the
    /// backend does not know are silently absent from the result.
    async fn offerings(&self, product_ids: &[String]) -> Result<Vec<Offering>, CommerceError>;

    /// Fetch the user's current entitlement status.
    async fn entitlement_status(&self) -> Result<EntitlementInfo, CommerceError>;

    /// Execute a purchase for the given offering. A single attempt; retry
    /// policy belongs to the caller (and is deliberately absent).
    async fn purchase(&self, offering: &Offering) -> Result<PurchaseResult, CommerceError>;

    /// Re-derive entitlement state from past purchases without a new
    /// payment.
    async fn restore_purchases(&self) -> Result<EntitlementInfo, CommerceError>;
}
