//! Amount calculation (§6). `subunits` is per-currency configuration,
//! passed in explicitly rather than hard-wired, per the global-subunit
//! design note.

use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;

fn round_to_u64(value: BigDecimal) -> u64 {
    value
        .round(0)
        .to_u64()
        .expect("amount overflowed u64 after rounding")
}

/// `maker_amount = round(quantity * subunits)`.
pub fn maker_amount(quantity: &BigDecimal, subunits: u64) -> u64 {
    round_to_u64(quantity * BigDecimal::from(subunits))
}

/// `taker_amount = round(quantity * price * subunits)`.
pub fn taker_amount(quantity: &BigDecimal, price: &BigDecimal, subunits: u64) -> u64 {
    round_to_u64(quantity * price * BigDecimal::from(subunits))
}
