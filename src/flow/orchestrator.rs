//! Purchase flow orchestrator.
//!
//! Owns the state snapshot and drives the four backend round-trips: catalog
//! load, entitlement refresh, purchase, restore. Mutations go through
//! `watch::Sender::send_modify`, so observers always see a consistent
//! snapshot, and completions that land after every observer is gone are
//! discarded silently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::catalog::{partition_offerings, Catalog};
use crate::commerce::{CommerceBackend, Offering};
use crate::entitlements::apply_refresh;

use super::config::{ConfigError, FlowConfig};
use super::state::{PurchaseFlowState, PurchaseOutcome};

/// Drives the support screen's purchase flow against a commerce backend.
///
/// One value per screen instance; create on screen activation, drop on
/// dismissal. Cheap to share behind an `Arc` with spawned tasks.
pub struct PurchaseFlow {
    backend: Arc<dyn CommerceBackend>,
    config: FlowConfig,
    state_tx: watch::Sender<PurchaseFlowState>,
    purchase_in_flight: AtomicBool,
}

impl PurchaseFlow {
    /// Build a flow over the given backend. Fails fast if the configured
    /// namespace and the tier table diverge.
    pub fn new(backend: Arc<dyn CommerceBackend>, config: FlowConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (state_tx, _) = watch::channel(PurchaseFlowState::default());
        Ok(Self {
            backend,
            config,
            state_tx,
            purchase_in_flight: AtomicBool::new(false),
        })
    }

    /// Subscribe to state snapshots. Every transition publishes a new one.
    pub fn subscribe(&self) -> watch::Receiver<PurchaseFlowState> {
        self.state_tx.subscribe()
    }

    /// Current snapshot.
    pub fn state(&self) -> PurchaseFlowState {
        self.state_tx.borrow().clone()
    }

    /// Screen-activation entry point: load the catalog and refresh the
    /// entitlement status concurrently.
    pub async fn activate(&self) {
        tokio::join!(self.load_catalog(), self.refresh_entitlement());
    }

    /// Fetch all known offerings in one round-trip, split off the supporter
    /// subscription, and sort the tips by ascending price.
    ///
    /// A failed or empty fetch leaves an empty catalog; the screen then has
    /// nothing purchasable but no error. Either way the loading flag clears.
    pub async fn load_catalog(&self) {
        self.state_tx.send_modify(|s| s.is_loading_catalog = true);

        let catalog = match self.backend.offerings(&self.config.known_product_ids()).await {
            Ok(offerings) => {
                partition_offerings(offerings, &self.config.supporter_product_id())
            }
            Err(err) => {
                tracing::warn!("Catalog fetch failed, leaving catalog empty: {}", err);
                Catalog::default()
            }
        };

        self.state_tx.send_modify(|s| {
            s.tips = catalog.tips;
            s.subscription = catalog.subscription;
            s.is_loading_catalog = false;
        });
    }

    /// Fetch entitlement status and fold it into the snapshot under the
    /// configured failure policy.
    pub async fn refresh_entitlement(&self) {
        let fetched = self.backend.entitlement_status().await;
        self.state_tx.send_modify(|s| {
            s.entitlement = apply_refresh(
                s.entitlement.take(),
                fetched,
                self.config.entitlement_failure_policy,
            );
        });
    }

    /// Execute a purchase for the given offering.
    ///
    /// At most one purchase runs at a time: a call while another is in
    /// flight is dropped (returns `None`), not queued, and never reaches the
    /// backend. The in-flight flag resets on every exit path. After a
    /// completed attempt the entitlement status is refreshed.
    pub async fn purchase(&self, offering: &Offering) -> Option<PurchaseOutcome> {
        let guard = match InFlightGuard::acquire(self) {
            Some(guard) => guard,
            None => {
                tracing::debug!(
                    identifier = %offering.identifier,
                    "Purchase already in flight, dropping request"
                );
                return None;
            }
        };

        let outcome = match self.backend.purchase(offering).await {
            Ok(result) if result.user_cancelled => PurchaseOutcome::UserCancelled,
            Ok(_) => PurchaseOutcome::Success,
            Err(err) => {
                tracing::warn!(identifier = %offering.identifier, "Purchase failed: {}", err);
                PurchaseOutcome::Failed
            }
        };

        self.state_tx.send_modify(|s| s.last_outcome = Some(outcome));
        drop(guard);

        self.refresh_entitlement().await;
        Some(outcome)
    }

    /// Re-derive entitlement state from past purchases. Safe to call at any
    /// time, including while a purchase is in flight.
    pub async fn restore_purchases(&self) {
        let fetched = self.backend.restore_purchases().await;
        self.state_tx.send_modify(|s| {
            s.entitlement = apply_refresh(
                s.entitlement.take(),
                fetched,
                self.config.entitlement_failure_policy,
            );
        });
    }

    /// Clear the last purchase outcome, dismissing any notice.
    pub fn acknowledge_outcome(&self) {
        self.state_tx.send_modify(|s| s.last_outcome = None);
    }
}

/// Re-entrancy guard for purchases. Acquiring sets the in-flight flag;
/// dropping resets it, so the flag clears on every exit path.
struct InFlightGuard<'a> {
    flow: &'a PurchaseFlow,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flow: &'a PurchaseFlow) -> Option<Self> {
        if flow
            .purchase_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        flow.state_tx.send_modify(|s| s.is_purchase_in_flight = true);
        Some(Self { flow })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flow
            .state_tx
            .send_modify(|s| s.is_purchase_in_flight = false);
        self.flow.purchase_in_flight.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commerce::stub::{PurchaseScript, StubBackend};

    fn flow_over(stub: &Arc<StubBackend>) -> Arc<PurchaseFlow> {
        Arc::new(
            PurchaseFlow::new(stub.clone() as Arc<dyn CommerceBackend>, FlowConfig::default())
                .unwrap(),
        )
    }

    fn seed_catalog(stub: &StubBackend) {
        stub.set_offerings(vec![
            StubBackend::offering("tipflow.tipjar.one", 0.99, "$0.99"),
            StubBackend::offering("tipflow.tipjar.two", 2.99, "$2.99"),
            StubBackend::offering("tipflow.tipjar.supporter", 4.99, "$4.99/mo"),
            StubBackend::offering("tipflow.tipjar.three", 4.99, "$4.99"),
            StubBackend::offering("tipflow.tipjar.four", 9.99, "$9.99"),
        ]);
    }

    #[tokio::test]
    async fn test_load_catalog_partitions_and_sorts() {
        let stub = Arc::new(StubBackend::new());
        seed_catalog(&stub);
        let flow = flow_over(&stub);

        flow.load_catalog().await;

        let state = flow.state();
        let ids: Vec<&str> = state.tips.iter().map(|o| o.identifier.as_str()).collect();
        assert_eq!(
            ids,
            [
                "tipflow.tipjar.one",
                "tipflow.tipjar.two",
                "tipflow.tipjar.three",
                "tipflow.tipjar.four",
            ]
        );
        assert_eq!(
            state.subscription.map(|o| o.identifier),
            Some("tipflow.tipjar.supporter".to_string())
        );
        assert!(!state.is_loading_catalog);
        assert_eq!(stub.last_requested_ids().len(), 5);
    }

    #[tokio::test]
    async fn test_catalog_failure_degrades_to_empty() {
        let stub = Arc::new(StubBackend::new());
        stub.fail_catalog("store unreachable");
        let flow = flow_over(&stub);

        flow.load_catalog().await;

        let state = flow.state();
        assert!(state.tips.is_empty());
        assert!(state.subscription.is_none());
        assert!(!state.is_loading_catalog);
        assert!(state.last_outcome.is_none());
    }

    #[tokio::test]
    async fn test_loading_flag_is_observable_while_fetch_is_parked() {
        let stub = Arc::new(StubBackend::new());
        stub.hold_catalog();
        let flow = flow_over(&stub);

        let task = {
            let flow = flow.clone();
            tokio::spawn(async move { flow.load_catalog().await })
        };
        while !flow.state().is_loading_catalog {
            tokio::task::yield_now().await;
        }

        stub.release_catalog();
        task.await.unwrap();
        assert!(!flow.state().is_loading_catalog);
    }

    #[tokio::test]
    async fn test_purchase_success_sets_outcome_and_refreshes_entitlement() {
        let stub = Arc::new(StubBackend::new());
        stub.set_entitlements(&["supporter"]);
        let flow = flow_over(&stub);
        let offering = StubBackend::offering("tipflow.tipjar.two", 2.99, "$2.99");

        let outcome = flow.purchase(&offering).await;

        assert_eq!(outcome, Some(PurchaseOutcome::Success));
        let state = flow.state();
        assert!(state.show_success_notice());
        assert!(!state.is_purchase_in_flight);
        assert!(state.is_supporter_active());
    }

    #[tokio::test]
    async fn test_cancelled_purchase_shows_no_notice() {
        let stub = Arc::new(StubBackend::new());
        stub.script_purchase(PurchaseScript::Cancelled);
        let flow = flow_over(&stub);
        let offering = StubBackend::offering("tipflow.tipjar.two", 2.99, "$2.99");

        let outcome = flow.purchase(&offering).await;

        assert_eq!(outcome, Some(PurchaseOutcome::UserCancelled));
        let state = flow.state();
        assert!(!state.show_success_notice());
        assert!(!state.show_error_notice());
        assert!(!state.is_purchase_in_flight);
    }

    #[tokio::test]
    async fn test_failed_purchase_shows_error_notice() {
        let stub = Arc::new(StubBackend::new());
        stub.script_purchase(PurchaseScript::Fail("card declined".into()));
        let flow = flow_over(&stub);
        let offering = StubBackend::offering("tipflow.tipjar.two", 2.99, "$2.99");

        let outcome = flow.purchase(&offering).await;

        assert_eq!(outcome, Some(PurchaseOutcome::Failed));
        let state = flow.state();
        assert!(state.show_error_notice());
        assert!(!state.is_purchase_in_flight);
    }

    #[tokio::test]
    async fn test_in_flight_flag_resets_on_every_exit_path() {
        for script in [
            PurchaseScript::Complete,
            PurchaseScript::Cancelled,
            PurchaseScript::Fail("declined".into()),
        ] {
            let stub = Arc::new(StubBackend::new());
            stub.script_purchase(script);
            let flow = flow_over(&stub);
            let offering = StubBackend::offering("tipflow.tipjar.one", 0.99, "$0.99");

            flow.purchase(&offering).await;
            assert!(!flow.state().is_purchase_in_flight);
        }
    }

    #[tokio::test]
    async fn test_second_purchase_while_in_flight_is_dropped() {
        let stub = Arc::new(StubBackend::new());
        stub.hold_purchases();
        let flow = flow_over(&stub);
        let offering = StubBackend::offering("tipflow.tipjar.two", 2.99, "$2.99");

        let first = {
            let flow = flow.clone();
            let offering = offering.clone();
            tokio::spawn(async move { flow.purchase(&offering).await })
        };
        while stub.purchase_calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(flow.state().is_purchase_in_flight);

        // Dropped without touching the backend.
        assert_eq!(flow.purchase(&offering).await, None);
        assert_eq!(stub.purchase_calls(), 1);

        stub.release_purchases();
        assert_eq!(first.await.unwrap(), Some(PurchaseOutcome::Success));
        assert!(!flow.state().is_purchase_in_flight);
    }

    #[tokio::test]
    async fn test_acknowledge_clears_outcome() {
        let stub = Arc::new(StubBackend::new());
        let flow = flow_over(&stub);
        let offering = StubBackend::offering("tipflow.tipjar.one", 0.99, "$0.99");

        flow.purchase(&offering).await;
        assert!(flow.state().show_success_notice());

        flow.acknowledge_outcome();
        assert!(flow.state().last_outcome.is_none());
    }

    #[tokio::test]
    async fn test_restore_overwrites_entitlement() {
        let stub = Arc::new(StubBackend::new());
        stub.set_restore(&["supporter"]);
        let flow = flow_over(&stub);

        flow.restore_purchases().await;
        assert!(flow.state().is_supporter_active());
    }

    #[tokio::test]
    async fn test_restore_failure_clears_under_overwrite_policy() {
        let stub = Arc::new(StubBackend::new());
        stub.set_entitlements(&["supporter"]);
        let flow = flow_over(&stub);

        flow.refresh_entitlement().await;
        assert!(flow.state().is_supporter_active());

        stub.fail_restore("offline");
        flow.restore_purchases().await;
        assert!(flow.state().entitlement.is_none());
    }

    #[tokio::test]
    async fn test_keep_previous_policy_survives_fetch_failure() {
        let stub = Arc::new(StubBackend::new());
        stub.set_entitlements(&["supporter"]);
        let config = FlowConfig {
            entitlement_failure_policy:
                crate::entitlements::EntitlementFailurePolicy::KeepPrevious,
            ..Default::default()
        };
        let flow = PurchaseFlow::new(stub.clone() as Arc<dyn CommerceBackend>, config).unwrap();

        flow.refresh_entitlement().await;
        assert!(flow.state().is_supporter_active());

        stub.fail_entitlement("offline");
        flow.refresh_entitlement().await;
        assert!(flow.state().is_supporter_active());
    }

    #[tokio::test]
    async fn test_activate_loads_catalog_and_entitlement() {
        let stub = Arc::new(StubBackend::new());
        seed_catalog(&stub);
        stub.set_entitlements(&["supporter"]);
        let flow = flow_over(&stub);
        let mut rx = flow.subscribe();

        flow.activate().await;

        let state = rx.borrow_and_update().clone();
        assert_eq!(state.tips.len(), 4);
        assert!(state.subscription.is_some());
        assert!(state.is_supporter_active());
        assert!(!state.is_loading_catalog);
    }

    #[tokio::test]
    async fn test_bad_namespace_fails_construction() {
        let stub = Arc::new(StubBackend::new());
        let result = PurchaseFlow::new(
            stub as Arc<dyn CommerceBackend>,
            FlowConfig::with_namespace("my.app"),
        );
        assert!(result.is_err());
    }
}
