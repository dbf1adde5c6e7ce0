//! Maker-leg CLTV delta scaling (§4.4 step 7).
//!
//! Documented policy decision (§9 "CLTV scaling"): the ratio of the two
//! chains' configured final-hop deltas stands in for their relative
//! block-time ratio. `btc_cltv_delta` / `ltc_cltv_delta` here are whichever
//! currency's chain client reports `cltv_delta()` for BTC/LTC respectively
//! — the formula is specific to the one supported pair (§4.7).

/// `route_cltv_delta = route.total_timelock - height`: the observed
/// end-to-end timelock of the discovered taker-leg route, expressed in
/// taker-chain blocks.
pub fn route_cltv_delta(route_total_timelock: u64, height: u64) -> u64 { route_total_timelock.saturating_sub(height) }

/// Scales the taker-leg timelock into maker-currency block time and adds
/// the maker chain's own safety margin.
pub fn maker_cltv_delta(
    maker_currency: &str,
    btc_cltv_delta: u64,
    ltc_cltv_delta: u64,
    route_cltv_delta: u64,
) -> u64 {
    let f = ltc_cltv_delta as f64 / btc_cltv_delta as f64;
    let scaled = match maker_currency {
        "BTC" => btc_cltv_delta as f64 + route_cltv_delta as f64 / f,
        "LTC" => ltc_cltv_delta as f64 + route_cltv_delta as f64 * f,
        other => unreachable!("maker_cltv_delta called with unsupported currency {other}"),
    };
    scaled.round() as u64
}
