//! Scriptable in-memory commerce backend for deterministic tests.
//!
//! Every round-trip can be scripted to succeed, fail, or park until the test
//! releases it, which makes in-flight states observable without timing
//! tricks.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::entitlements::EntitlementInfo;

use super::{CommerceBackend, CommerceError, Offering, PurchaseResult};

/// Scripted behavior for the next purchase calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseScript {
    /// Purchase completes normally.
    Complete,
    /// User backs out of the store sheet.
    Cancelled,
    /// Backend reports an error.
    Fail(String),
}

/// Gate that can park a backend call until the test releases it.
#[derive(Default)]
struct Gate {
    held: AtomicBool,
    release: Notify,
}

impl Gate {
    fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        // notify_one stores a permit, so releasing before the call parks is
        // not a lost wakeup.
        self.release.notify_one();
    }

    async fn wait(&self) {
        if self.held.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
    }
}

/// In-memory `CommerceBackend` with scriptable responses.
pub struct StubBackend {
    offerings: Mutex<Result<Vec<Offering>, String>>,
    entitlement: Mutex<Result<BTreeSet<String>, String>>,
    restore: Mutex<Result<BTreeSet<String>, String>>,
    purchase_script: Mutex<PurchaseScript>,
    catalog_gate: Gate,
    purchase_gate: Gate,
    purchase_calls: AtomicUsize,
    requested_ids: Mutex<Vec<String>>,
}

impl StubBackend {
    /// Empty catalog, no entitlements, purchases complete normally.
    pub fn new() -> Self {
        Self {
            offerings: Mutex::new(Ok(Vec::new())),
            entitlement: Mutex::new(Ok(BTreeSet::new())),
            restore: Mutex::new(Ok(BTreeSet::new())),
            purchase_script: Mutex::new(PurchaseScript::Complete),
            catalog_gate: Gate::default(),
            purchase_gate: Gate::default(),
            purchase_calls: AtomicUsize::new(0),
            requested_ids: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor for an offering.
    pub fn offering(identifier: &str, price: f64, localized_price: &str) -> Offering {
        Offering {
            identifier: identifier.to_string(),
            price,
            localized_price: localized_price.to_string(),
        }
    }

    pub fn set_offerings(&self, offerings: Vec<Offering>) {
        *self.offerings.lock() = Ok(offerings);
    }

    pub fn fail_catalog(&self, message: &str) {
        *self.offerings.lock() = Err(message.to_string());
    }

    pub fn set_entitlements(&self, names: &[&str]) {
        *self.entitlement.lock() = Ok(names.iter().map(|n| n.to_string()).collect());
    }

    pub fn fail_entitlement(&self, message: &str) {
        *self.entitlement.lock() = Err(message.to_string());
    }

    pub fn set_restore(&self, names: &[&str]) {
        *self.restore.lock() = Ok(names.iter().map(|n| n.to_string()).collect());
    }

    pub fn fail_restore(&self, message: &str) {
        *self.restore.lock() = Err(message.to_string());
    }

    pub fn script_purchase(&self, script: PurchaseScript) {
        *self.purchase_script.lock() = script;
    }

    /// Park catalog fetches until [`release_catalog`](Self::release_catalog).
    pub fn hold_catalog(&self) {
        self.catalog_gate.hold();
    }

    pub fn release_catalog(&self) {
        self.catalog_gate.release();
    }

    /// Park purchases until [`release_purchases`](Self::release_purchases).
    pub fn hold_purchases(&self) {
        self.purchase_gate.hold();
    }

    pub fn release_purchases(&self) {
        self.purchase_gate.release();
    }

    /// Number of purchase calls that reached the backend.
    pub fn purchase_calls(&self) -> usize {
        self.purchase_calls.load(Ordering::SeqCst)
    }

    /// Product identifiers from the most recent catalog fetch.
    pub fn last_requested_ids(&self) -> Vec<String> {
        self.requested_ids.lock().clone()
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommerceBackend for StubBackend {
    async fn offerings(&self, product_ids: &[String]) -> Result<Vec<Offering>, CommerceError> {
        *self.requested_ids.lock() = product_ids.to_vec();
        self.catalog_gate.wait().await;
        self.offerings.lock().clone().map_err(CommerceError::CatalogFetch)
    }

    async fn entitlement_status(&self) -> Result<EntitlementInfo, CommerceError> {
        self.entitlement
            .lock()
            .clone()
            .map(EntitlementInfo::new)
            .map_err(CommerceError::EntitlementFetch)
    }

    async fn purchase(&self, _offering: &Offering) -> Result<PurchaseResult, CommerceError> {
        self.purchase_calls.fetch_add(1, Ordering::SeqCst);
        self.purchase_gate.wait().await;
        match self.purchase_script.lock().clone() {
            PurchaseScript::Complete => Ok(PurchaseResult {
                user_cancelled: false,
            }),
            PurchaseScript::Cancelled => Ok(PurchaseResult {
                user_cancelled: true,
            }),
            PurchaseScript::Fail(message) => Err(CommerceError::Purchase(message)),
        }
    }

    async fn restore_purchases(&self) -> Result<EntitlementInfo, CommerceError> {
        self.restore
            .lock()
            .clone()
            .map(EntitlementInfo::new)
            .map_err(CommerceError::Restore)
    }
}
