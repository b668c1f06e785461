//! Money conversion to integer minor units.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Convert a decimal currency amount to integer minor units.
///
/// Multiplies by 100 and rounds to the nearest integer, halves away from
/// zero (`12.345` -> `1235`, not banker's `1234`). This is the rounding the
/// payment gateway validates against.
///
/// Returns `None` if the result does not fit in an `i64`.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}
