//! Shared numeric helpers for strength analytics
//!
//! Epley one-rep-max estimation and the kg/lb conversions used at
//! presentation boundaries. Statistics code works in kilograms throughout;
//! conversion happens only when formatting output for imperial users.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Pounds per kilogram
const LBS_PER_KG: Decimal = dec!(2.20462);

/// Estimate one-rep max using the Epley formula: `weight * (1 + reps/30)`
///
/// Zero weight or zero reps short-circuits to zero rather than projecting
/// a max from no work.
pub fn estimate_one_rm(weight: Decimal, reps: Decimal) -> Decimal {
    if weight.is_zero() || reps.is_zero() {
        return Decimal::ZERO;
    }
    weight * (Decimal::ONE + reps / dec!(30))
}

/// Convert kilograms to pounds, rounded to one decimal place
///
/// Lossy by design: round-tripping through [`lbs_to_kg`] drifts by up to
/// the rounding granularity and is not exact.
pub fn kg_to_lbs(kg: Decimal) -> Decimal {
    (kg * LBS_PER_KG).round_dp(1)
}

/// Convert pounds to kilograms, rounded to two decimal places
pub fn lbs_to_kg(lbs: Decimal) -> Decimal {
    (lbs / LBS_PER_KG).round_dp(2)
}
