//! Catalog partitioning: one-time tips versus the supporter subscription.

use serde::{Deserialize, Serialize};

use crate::commerce::Offering;

/// The loaded catalog: tip offerings sorted by ascending price, plus the
/// supporter subscription if the backend returned one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub tips: Vec<Offering>,
    pub subscription: Option<Offering>,
}

/// Split the supporter subscription out of a backend result and sort the
/// remaining tips by non-decreasing price.
///
/// The sort is stable: offerings with equal prices keep the backend's
/// returned order.
pub fn partition_offerings(offerings: Vec<Offering>, supporter_product_id: &str) -> Catalog {
    let (supporter, mut tips): (Vec<Offering>, Vec<Offering>) = offerings
        .into_iter()
        .partition(|o| o.identifier == supporter_product_id);
    tips.sort_by(|a, b| a.price.total_cmp(&b.price));
    Catalog {
        tips,
        subscription: supporter.into_iter().next(),
    }
}
