//! Purchase flow configuration.

use serde::{Deserialize, Serialize};

use crate::entitlements::EntitlementFailurePolicy;
use crate::tier::{Tier, TierError, TIPJAR_SEGMENT};

/// Configuration for the purchase flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Application namespace, the first segment of every product identifier
    /// (`<namespace>.tipjar.<tier>`). Must be a single dot-free segment so
    /// the tier stays at a fixed position.
    pub product_namespace: String,

    /// What to do with the entitlement snapshot when a status fetch fails.
    #[serde(default)]
    pub entitlement_failure_policy: EntitlementFailurePolicy,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            product_namespace: "tipflow".to_string(),
            entitlement_failure_policy: EntitlementFailurePolicy::default(),
        }
    }
}

impl FlowConfig {
    /// Config with a specific product namespace.
    pub fn with_namespace(namespace: &str) -> Self {
        Self {
            product_namespace: namespace.to_string(),
            ..Default::default()
        }
    }

    /// Full product identifier for a tier.
    pub fn product_id(&self, tier: Tier) -> String {
        format!(
            "{}.{}.{}",
            self.product_namespace,
            TIPJAR_SEGMENT,
            tier.suffix()
        )
    }

    /// All five product identifiers, in catalog request order.
    pub fn known_product_ids(&self) -> Vec<String> {
        Tier::ALL.iter().map(|t| self.product_id(*t)).collect()
    }

    /// Product identifier of the supporter subscription.
    pub fn supporter_product_id(&self) -> String {
        self.product_id(Tier::Supporter)
    }

    /// Check the namespace and the tier table against each other: every
    /// generated identifier must decode back to its tier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.product_namespace.is_empty() || self.product_namespace.contains('.') {
            return Err(ConfigError::InvalidNamespace(
                self.product_namespace.clone(),
            ));
        }
        for tier in Tier::ALL {
            Tier::from_product_id(&self.product_id(tier))?;
        }
        Ok(())
    }
}

/// Configuration errors, reported at flow construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Product namespace must be a single non-empty segment, got {0:?}")]
    InvalidNamespace(String),

    #[error(transparent)]
    Tier(#[from] TierError),
}
