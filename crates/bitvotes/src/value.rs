//! Objective used to rank candidate consensus bit votes.

use {
    num::{BigUint, Zero, rational::Ratio},
    serde::Serialize,
    serde_with::{DisplayFromStr, serde_as},
};

/// Fraction of the total weight beyond which additional supporting weight no
/// longer increases the capped value.
pub const VALUE_CAP: Ratio<u64> = Ratio::new_raw(2, 3);

/// Value of a candidate solution: fee sum times supporting weight.
///
/// Values are ordered lexicographically, capped value first and uncapped value
/// as tie-break. The derived `Ord` relies on the field order.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    /// Fee sum times the supporting weight, where the weight is capped at
    /// [`weight_cap`] of the total weight.
    #[serde_as(as = "DisplayFromStr")]
    pub capped: BigUint,
    /// Fee sum times the full supporting weight.
    #[serde_as(as = "DisplayFromStr")]
    pub uncapped: BigUint,
}

impl Value {
    pub fn new(fee_sum: &BigUint, weight: u64, total_weight: u64) -> Self {
        let capped_weight = weight.min(weight_cap(total_weight));
        Self {
            capped: fee_sum * capped_weight,
            uncapped: fee_sum * weight,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.capped.is_zero() && self.uncapped.is_zero()
    }
}

/// `ceil(total_weight * VALUE_CAP)`, computed in integers.
pub fn weight_cap(total_weight: u64) -> u64 {
    let scaled = u128::from(total_weight) * u128::from(*VALUE_CAP.numer());
    scaled
        .div_ceil(u128::from(*VALUE_CAP.denom()))
        .try_into()
        .expect("cap is at most the total weight")
}
