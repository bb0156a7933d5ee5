//! Tip tier model and product identifier parsing.
//!
//! Every offering lives in a dot-separated namespace, `<app>.tipjar.<tier>`;
//! the tier is always the third segment. The mapping below is closed: an
//! identifier whose tier segment is not in the table is a configuration
//! error, not a new tier.

use serde::{Deserialize, Serialize};

/// Fixed middle segment shared by every tip-jar product identifier.
pub const TIPJAR_SEGMENT: &str = "tipjar";

/// Position of the tier segment in a dot-separated product identifier.
const TIER_SEGMENT_INDEX: usize = 2;

/// The five purchasable tiers: four one-time tips plus the recurring
/// supporter subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier {
    One,
    Two,
    Three,
    Four,
    Supporter,
}

impl Tier {
    /// All tiers, in catalog request order.
    pub const ALL: [Tier; 5] = [
        Tier::One,
        Tier::Two,
        Tier::Three,
        Tier::Four,
        Tier::Supporter,
    ];

    /// Product-id suffix for this tier (the `<tier>` segment).
    pub fn suffix(self) -> &'static str {
        match self {
            Tier::One => "one",
            Tier::Two => "two",
            Tier::Three => "three",
            Tier::Four => "four",
            Tier::Supporter => "supporter",
        }
    }

    /// Localization key for the tier title. The rendering layer owns the
    /// actual translated strings.
    pub fn title_key(self) -> &'static str {
        match self {
            Tier::One => "support.one.title",
            Tier::Two => "support.two.title",
            Tier::Three => "support.three.title",
            Tier::Four => "support.four.title",
            Tier::Supporter => "support.supporter.title",
        }
    }

    /// Localization key for the tier subtitle.
    pub fn subtitle_key(self) -> &'static str {
        match self {
            Tier::One => "support.one.subtitle",
            Tier::Two => "support.two.subtitle",
            Tier::Three => "support.three.subtitle",
            Tier::Four => "support.four.subtitle",
            Tier::Supporter => "support.supporter.subtitle",
        }
    }

    /// Whether this tier is the recurring subscription rather than a
    /// one-time tip.
    pub fn is_subscription(self) -> bool {
        matches!(self, Tier::Supporter)
    }

    /// Decode a tier from a full product identifier.
    ///
    /// Total over the known identifier set: for every tier `t` and namespace
    /// `ns`, `Tier::from_product_id(&format!("{ns}.tipjar.{}", t.suffix()))`
    /// round-trips back to `t`.
    pub fn from_product_id(identifier: &str) -> Result<Tier, TierError> {
        let segment = identifier
            .split('.')
            .nth(TIER_SEGMENT_INDEX)
            .ok_or_else(|| TierError::Malformed {
                identifier: identifier.to_string(),
            })?;
        Tier::from_suffix(segment).ok_or_else(|| TierError::UnknownTier {
            identifier: identifier.to_string(),
            segment: segment.to_string(),
        })
    }

    fn from_suffix(suffix: &str) -> Option<Tier> {
        Tier::ALL.into_iter().find(|t| t.suffix() == suffix)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Errors from decoding a product identifier into a tier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TierError {
    #[error("Product identifier has no tier segment: {identifier:?}")]
    Malformed { identifier: String },

    #[error("Unknown tier segment {segment:?} in {identifier:?}")]
    UnknownTier {
        identifier: String,
        segment: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_is_total_over_known_set() {
        for tier in Tier::ALL {
            let id = format!("app.tipjar.{}", tier.suffix());
            assert_eq!(Tier::from_product_id(&id), Ok(tier));
        }
    }

    #[test]
    fn test_decode_ignores_namespace() {
        assert_eq!(Tier::from_product_id("socialapp.tipjar.two"), Ok(Tier::Two));
        assert_eq!(Tier::from_product_id("other.tipjar.two"), Ok(Tier::Two));
    }

    #[test]
    fn test_unknown_segment_is_an_error() {
        let err = Tier::from_product_id("app.tipjar.five").unwrap_err();
        assert_eq!(
            err,
            TierError::UnknownTier {
                identifier: "app.tipjar.five".into(),
                segment: "five".into(),
            }
        );
    }

    #[test]
    fn test_missing_segment_is_an_error() {
        let err = Tier::from_product_id("app.tipjar").unwrap_err();
        assert!(matches!(err, TierError::Malformed { .. }));
    }

    #[test]
    fn test_only_supporter_is_a_subscription() {
        assert!(Tier::Supporter.is_subscription());
        for tier in [Tier::One, Tier::Two, Tier::Three, Tier::Four] {
            assert!(!tier.is_subscription());
        }
    }

    #[test]
    fn test_label_keys_are_distinct() {
        let mut keys: Vec<&str> = Tier::ALL
            .iter()
            .flat_map(|t| [t.title_key(), t.subtitle_key()])
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 10);
    }
}
