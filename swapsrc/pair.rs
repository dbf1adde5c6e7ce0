//! Pair support predicate (§4.7) and currency-direction resolution (§4.3 step 1).

use crate::clients::ChainClientRegistry;
use crate::errors::CoordinatorError;

/// The only pair this design recognises. Currency dispatch is a typed
/// registry (§9), so whitelisting a pair is just naming its two legs here.
pub const SUPPORTED_PAIR: &str = "LTC/BTC";

pub fn split_pair(pair_id: &str) -> Result<(&str, &str), CoordinatorError> {
    pair_id
        .split_once('/')
        .ok_or_else(|| CoordinatorError::PairNotSupported(pair_id.to_owned()))
}

/// True iff `pair_id` is the one supported pair and both legs' chain
/// clients are registered and connected.
pub async fn is_pair_supported(pair_id: &str, clients: &ChainClientRegistry) -> bool {
    if pair_id != SUPPORTED_PAIR {
        return false;
    }
    let Ok((base, quote)) = split_pair(pair_id) else { return false };
    let (Some(base_client), Some(quote_client)) = (clients.get(base), clients.get(quote)) else {
        return false;
    };
    base_client.is_connected().await && quote_client.is_connected().await
}

/// Resolves `(taker_currency, maker_currency)` from `pair_id = "BASE/QUOTE"`
/// and the taker's buy/sell direction. Buying base means the taker wants to
/// receive base and pays in quote; selling is the mirror image.
pub fn resolve_currencies(pair_id: &str, is_buy: bool) -> Result<(String, String), CoordinatorError> {
    let (base, quote) = split_pair(pair_id)?;
    if is_buy {
        Ok((base.to_owned(), quote.to_owned()))
    } else {
        Ok((quote.to_owned(), base.to_owned()))
    }
}
