use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::product::Product;

/// Final storefront price: `(popularity + 1) * weight * spot`, rounded to cents.
pub fn compute_price(product: &Product, spot_price_per_gram: f64) -> f64 {
    let raw = (product.popularity_score + 1.0) * product.weight * spot_price_per_gram;
    round_dp(raw, 2)
}

/// Linear remap of a `[0, 1]` popularity score onto the `[1, 5]` star scale.
///
/// Out-of-range scores are not clamped; the catalog loader rejects them before they get here.
pub fn to_five_scale(popularity_score: f64) -> f64 {
    round_dp(popularity_score * 4.0 + 1.0, 1)
}

/// Rounds the exact binary value of `value` half away from zero.
///
/// NaN and infinities have no decimal form and are returned unchanged.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|exact| exact.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|rounded| rounded.to_f64())
        .unwrap_or(value)
}
