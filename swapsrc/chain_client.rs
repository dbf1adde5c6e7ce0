//! The chain-client interface consumed by the core.
//!
//! A chain client is a local daemon handle, one per currency, that talks to
//! a payment-channel network (in the shipped teacher's domain this would be
//! an LND-style gRPC client per UTXO chain; here it is an abstract trait so
//! the core stays chain-agnostic, with a stub implementation under
//! [`crate::stub`] for local exercising and tests).

use async_trait::async_trait;

use crate::errors::CoordinatorError;

/// A single discovered payment route. `total_timelock` is the outermost
/// (largest) CLTV value along the route, per the glossary definition.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Route {
    pub total_timelock: u64,
    /// Opaque hop description, forwarded back to `send_to_route_sync`
    /// unexamined by the core.
    pub hops: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ChainInfo {
    pub block_height: u64,
}

#[derive(Debug, Clone)]
pub struct SendPaymentInput {
    pub amount: u64,
    pub destination: String,
    pub payment_hash: String,
    pub final_cltv_delta: u64,
}

#[derive(Debug, Clone)]
pub struct SendToRouteInput {
    pub routes: serde_json::Value,
    pub payment_hash: String,
}

/// Result of a `send_payment_sync` / `send_to_route_sync` call. `payment_error`
/// and `payment_preimage` are mutually exclusive in well-behaved
/// implementations; the core treats a populated `payment_error` as
/// authoritative regardless of `payment_preimage`.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub payment_error: Option<String>,
    pub payment_preimage: Option<String>,
}

/// Parameters describing an inbound HTLC the chain client is holding
/// pending, passed to [`crate::resolver`] for validation and dispatch.
#[derive(Debug, Clone)]
pub struct PendingHtlc {
    pub hash: String,
    pub amount_msat: u64,
    pub timeout_height: i64,
    pub height_now: i64,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    fn currency(&self) -> &str;

    async fn is_connected(&self) -> bool;

    /// The chain client's configured final-hop CLTV delta; used both as the
    /// taker-leg timelock and as a relative block-time proxy in the maker's
    /// CLTV scaling formula (§4.4).
    fn cltv_delta(&self) -> u64;

    /// Per-currency smallest-unit exponent base (e.g. `1e8` for BTC/LTC
    /// satoshis), replacing the hard-wired global subunit factor.
    fn subunits(&self) -> u64;

    async fn query_routes(
        &self,
        amount: u64,
        final_cltv_delta: u64,
        num_routes: u32,
        pub_key: &str,
    ) -> Result<Vec<Route>, CoordinatorError>;

    async fn get_info(&self) -> Result<ChainInfo, CoordinatorError>;

    async fn send_payment_sync(&self, input: SendPaymentInput) -> Result<PaymentOutcome, CoordinatorError>;

    async fn send_to_route_sync(&self, input: SendToRouteInput) -> Result<PaymentOutcome, CoordinatorError>;
}
