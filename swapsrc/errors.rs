//! Error taxonomy for the swap coordinator core.
//!
//! Every variant here corresponds to one of the failure classes in the
//! design's error handling section. `Display` on [`CoordinatorError`] is
//! what ends up in `Deal::state_reason` and in outbound `SwapError` packets,
//! so wording changes here are wire-visible.

use thiserror::Error;

use crate::deal::RHash;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("peer {peer} has no chain pubkey for {currency}")]
    MissingPeerPubKey { peer: String, currency: String },

    #[error("chain client for {0} is not connected")]
    ClientDisconnected(String),

    #[error("unable to find route to {destination} for {amount} {currency}")]
    NoRoute {
        destination: String,
        amount: u64,
        currency: String,
    },

    #[error("chain height unavailable for {0}: {1}")]
    HeightUnavailable(String, String),

    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("pair not supported: {0}")]
    PairNotSupported(String),

    #[error("incoming htlc amount {actual} msat is below expected {expected} msat")]
    AmountTooSmall { actual: u64, expected: u64 },

    #[error("incoming htlc timelock too short: have {actual} blocks, need {required}")]
    TimelockTooShort { actual: i64, required: u64 },

    #[error("payment failed: {0}")]
    PaymentFailure(String),

    #[error("no deal found for r_hash {0}")]
    UnknownDeal(RHash),

    #[error("a deal for r_hash {0} already exists")]
    DuplicateDeal(RHash),

    #[error("maker response quantity does not match proposed quantity; partial fills are not supported")]
    PartialFillNotSupported,

    #[error("taker's chain client returned a preimage that does not match r_hash {0}")]
    PreimageMismatch(RHash),

    #[error("maker response for {0} did not include maker_cltv_delta")]
    MissingMakerCltvDelta(RHash),

    #[error("peer send failed: {0}")]
    PeerSendFailure(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl CoordinatorError {
    /// Maps an error onto the outbound `rejection_reason` enum where one
    /// applies; request-time failures that have no peer-facing code yet
    /// (e.g. `AmountTooSmall`, discovered only on the resolver path) return
    /// `None` and are reported via `SwapError.error_message` instead.
    pub fn rejection_reason(&self) -> Option<crate::packets::RejectionReason> {
        use crate::packets::RejectionReason;
        match self {
            CoordinatorError::PairNotSupported(_) => Some(RejectionReason::PairNotSupported),
            CoordinatorError::UnsupportedCurrency(_) => Some(RejectionReason::PairNotSupported),
            CoordinatorError::NoRoute { .. } => Some(RejectionReason::NoRoute),
            CoordinatorError::DuplicateDeal(_) => Some(RejectionReason::OrderUnavailable),
            _ => None,
        }
    }
}
