//! Purchase flow service: configuration, state snapshot, orchestrator.

pub mod config;
pub mod orchestrator;
pub mod state;

pub use config::{ConfigError, FlowConfig};
pub use orchestrator::PurchaseFlow;
pub use state::{PurchaseFlowState, PurchaseOutcome};
