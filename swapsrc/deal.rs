//! The central `Deal` record and its lifecycle types.
//!
//! A `Deal` is created once per attempted swap and is owned exclusively by
//! the coordinator; see [`crate::registry::DealRegistry`] for how deals are
//! looked up and [`crate::state_machine`] for how they are mutated.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::history::SwapHistory;

/// Hex-encoded SHA-256 payment hash. Kept as a `String` newtype rather than
/// a raw `[u8; 32]` because every wire packet and log line carries it in
/// this form.
pub type RHash = String;

/// 32-byte preimage, hex-encoded for the same reason as [`RHash`].
pub type Preimage = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Taker,
    Maker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    SwapCreated,
    SwapRequested,
    SwapAgreed,
    AmountSent,
    AmountReceived,
    SwapCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    Active,
    Error,
    Completed,
}

/// The summary record delivered to the completion sink when a deal is paid
/// in full. Mirrors the `swap.paid` event body from the design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapResult {
    pub order_id: String,
    pub local_order_id: String,
    pub pair_id: String,
    pub quantity: BigDecimal,
    pub amount_received: u64,
    pub amount_sent: u64,
    pub r_hash: RHash,
    pub peer_pub_key: String,
    pub role: Role,
}

/// Delivered exactly once through a deal's completion channel. Replaces the
/// process-wide `swap.paid` / `swap.failed` emitter described in the design
/// note on event-emitter coupling: every caller that cares about a deal's
/// outcome awaits its own receiver instead of filtering a shared bus.
#[derive(Debug, Clone)]
pub enum SwapOutcome {
    Paid(SwapResult),
    Failed { r_hash: RHash, reason: String },
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

#[derive(Debug)]
pub struct Deal {
    pub r_hash: RHash,
    pub r_preimage: Option<Preimage>,
    pub my_role: Role,
    pub phase: Phase,
    pub state: State,
    pub state_reason: Option<String>,

    pub peer_pub_key: String,
    pub order_id: String,
    pub local_order_id: String,
    pub pair_id: String,
    pub price: BigDecimal,

    pub taker_currency: String,
    pub maker_currency: String,
    pub taker_amount: u64,
    pub maker_amount: u64,
    pub taker_cltv_delta: u64,
    pub maker_cltv_delta: Option<u64>,

    pub proposed_quantity: BigDecimal,
    pub quantity: Option<BigDecimal>,

    /// Opaque, chain-client-specific route description the maker uses to
    /// pay the taker. Not inspected by the core itself.
    pub maker_to_taker_routes: Option<serde_json::Value>,
    pub taker_pub_key: Option<String>,

    pub create_time: u64,
    pub execute_time: Option<u64>,
    pub completion_time: Option<u64>,

    /// Resolved exactly once by the state machine; `None` after the first
    /// resolution (or if nobody asked for it, e.g. a resumed-from-log
    /// record — which this design otherwise doesn't support, see Non-goals).
    pub completion: Option<oneshot::Sender<SwapOutcome>>,

    /// Set by the caller after construction (`begin_swap`/`accept_deal`),
    /// mirroring `taker_pub_key`. `None` means no audit trail is configured.
    pub history: Option<Arc<SwapHistory>>,
}

impl Deal {
    /// A fresh `Active`/`SwapCreated` deal. `completion` is returned
    /// alongside so the creator can `await` the eventual outcome.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        r_hash: RHash,
        r_preimage: Option<Preimage>,
        my_role: Role,
        peer_pub_key: String,
        order_id: String,
        local_order_id: String,
        pair_id: String,
        price: BigDecimal,
        taker_currency: String,
        maker_currency: String,
        taker_amount: u64,
        maker_amount: u64,
        taker_cltv_delta: u64,
        proposed_quantity: BigDecimal,
    ) -> (Deal, oneshot::Receiver<SwapOutcome>) {
        let (tx, rx) = oneshot::channel();
        let deal = Deal {
            r_hash,
            r_preimage,
            my_role,
            phase: Phase::SwapCreated,
            state: State::Active,
            state_reason: None,
            peer_pub_key,
            order_id,
            local_order_id,
            pair_id,
            price,
            taker_currency,
            maker_currency,
            taker_amount,
            maker_amount,
            taker_cltv_delta,
            maker_cltv_delta: None,
            proposed_quantity,
            quantity: None,
            maker_to_taker_routes: None,
            taker_pub_key: None,
            create_time: now_secs(),
            execute_time: None,
            completion_time: None,
            completion: Some(tx),
            history: None,
        };
        (deal, rx)
    }

    pub fn is_active(&self) -> bool { self.state == State::Active }

    pub fn expected_amount(&self) -> u64 {
        match self.my_role {
            Role::Maker => self.maker_amount,
            Role::Taker => self.taker_amount,
        }
    }

    pub fn required_cltv_delta(&self) -> Option<u64> {
        match self.my_role {
            Role::Maker => Some(self.maker_cltv_delta.unwrap_or(0)),
            Role::Taker => Some(self.taker_cltv_delta),
        }
    }

    pub(crate) fn mark_execute_time(&mut self) { self.execute_time = Some(now_secs()); }

    pub(crate) fn mark_completion_time(&mut self) { self.completion_time = Some(now_secs()); }

    pub fn swap_result_summary(&self) -> SwapResult {
        SwapResult {
            order_id: self.order_id.clone(),
            local_order_id: self.local_order_id.clone(),
            pair_id: self.pair_id.clone(),
            quantity: self.quantity.clone().unwrap_or_else(|| self.proposed_quantity.clone()),
            amount_received: self.maker_amount,
            amount_sent: self.taker_amount,
            r_hash: self.r_hash.clone(),
            peer_pub_key: self.peer_pub_key.clone(),
            role: self.my_role,
        }
    }
}

impl fmt::Display for Deal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Deal({}, role={:?}, phase={:?}, state={:?})",
            self.r_hash, self.my_role, self.phase, self.state
        )
    }
}
