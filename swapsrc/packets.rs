//! Peer-to-peer packet bodies exchanged between coordinator instances.
//!
//! Wire framing and transport are out of scope (§1); these types describe
//! only the payloads the core constructs and consumes. Every packet travels
//! inside an [`Envelope`] that carries a correlation id so a response can be
//! matched back to its request.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::deal::RHash;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub request_id: Uuid,
    pub body: T,
}

impl<T> Envelope<T> {
    pub fn new(body: T) -> Self {
        Envelope {
            request_id: Uuid::new_v4(),
            body,
        }
    }

    pub fn reply(&self, body: T) -> Self {
        Envelope {
            request_id: self.request_id,
            body,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    pub proposed_quantity: bigdecimal::BigDecimal,
    pub pair_id: String,
    pub taker_currency: String,
    pub maker_currency: String,
    pub order_id: String,
    pub r_hash: RHash,
    pub taker_amount: u64,
    pub maker_amount: u64,
    pub taker_cltv_delta: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    PairNotSupported,
    OrderNotFound,
    OrderUnavailable,
    NoRoute,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapResponse {
    pub r_hash: RHash,
    pub quantity: Option<bigdecimal::BigDecimal>,
    pub maker_cltv_delta: Option<u64>,
    pub rejection_reason: Option<RejectionReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapComplete {
    pub r_hash: RHash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapError {
    pub r_hash: RHash,
    pub error_message: String,
}

/// The union of packet bodies a peer can send us, as dispatched by
/// [`crate::dispatch`] and the protocol handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SwapPacket {
    Request(Envelope<SwapRequest>),
    Response(Envelope<SwapResponse>),
    Complete(Envelope<SwapComplete>),
    Error(Envelope<SwapError>),
}
