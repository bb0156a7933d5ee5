//! Tipflow - purchase flow state engine for an in-app tip jar
//!
//! Drives a commerce backend (catalog fetch, purchase, entitlement status,
//! restore) and publishes a renderer-agnostic state snapshot over a watch
//! channel. The rendering layer owns layout, localization, and alert
//! presentation; this crate owns the state transitions.
//!
//! ## Features
//!
//! - **Catalog loading**: one round-trip, supporter subscription split out,
//!   tips sorted by ascending price
//! - **Purchase orchestration**: at most one purchase in flight, outcome
//!   classification (success / user-cancelled / failed)
//! - **Entitlement tracking**: configurable overwrite-or-keep policy on
//!   fetch failure
//! - **Restore**: re-derive entitlement state from past purchases
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tipflow::{FlowConfig, PurchaseFlow, StubBackend};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let backend = Arc::new(StubBackend::new());
//! let flow = PurchaseFlow::new(backend, FlowConfig::default()).unwrap();
//!
//! let state = flow.subscribe();
//! flow.activate().await;
//! println!("{} tips available", state.borrow().tips.len());
//! # }
//! ```

pub mod catalog;
pub mod commerce;
pub mod entitlements;
pub mod flow;
pub mod tier;

// Re-exports for convenience
pub use catalog::{partition_offerings, Catalog};
pub use commerce::stub::{PurchaseScript, StubBackend};
pub use commerce::{CommerceBackend, CommerceError, Offering, PurchaseResult};
pub use entitlements::{apply_refresh, EntitlementFailurePolicy, EntitlementInfo};
pub use flow::{ConfigError, FlowConfig, PurchaseFlow, PurchaseFlowState, PurchaseOutcome};
pub use tier::{Tier, TierError, TIPJAR_SEGMENT};
