//! In-memory stub implementations of [`ChainClient`] and [`Peer`] (§10
//! ambient stack: test tooling). These back both the `swapd` CLI demo, which
//! has no real LND/peer transport to talk to, and the crate's own tests
//! where an implementation of the trait is needed rather than a mock of one
//! call.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::chain_client::{ChainClient, ChainInfo, PaymentOutcome, Route, SendPaymentInput, SendToRouteInput};
use crate::errors::CoordinatorError;
use crate::packets::SwapPacket;
use crate::peer::Peer;

/// A chain client that always finds one route, reports a fixed height, and
/// settles every payment immediately with a fresh fake preimage. Configure
/// `fail_next` to make the next `send_payment_sync`/`send_to_route_sync`
/// call report a payment error instead.
pub struct StubChainClient {
    currency: String,
    cltv_delta: u64,
    subunits: u64,
    block_height: u64,
    connected: bool,
    no_routes: bool,
    fail_next: Mutex<bool>,
    known_preimages: Mutex<HashMap<String, String>>,
}

impl StubChainClient {
    pub fn new(currency: impl Into<String>, cltv_delta: u64, subunits: u64, block_height: u64) -> Self {
        StubChainClient {
            currency: currency.into(),
            cltv_delta,
            subunits,
            block_height,
            connected: true,
            no_routes: false,
            fail_next: Mutex::new(false),
            known_preimages: Mutex::new(HashMap::new()),
        }
    }

    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    /// Makes `query_routes` report no usable route, as if pathfinding failed.
    pub fn no_routes(mut self) -> Self {
        self.no_routes = true;
        self
    }

    pub fn fail_next_payment(&self) { *self.fail_next.lock() = true; }

    /// Registers the preimage the network will reveal when settling
    /// payments against `hash`, so a demo/test can observe a realistic
    /// settlement instead of the default fabricated one.
    pub fn set_known_preimage(&self, hash: impl Into<String>, preimage: impl Into<String>) {
        self.known_preimages.lock().insert(hash.into(), preimage.into());
    }
}

#[async_trait]
impl ChainClient for StubChainClient {
    fn currency(&self) -> &str { &self.currency }

    async fn is_connected(&self) -> bool { self.connected }

    fn cltv_delta(&self) -> u64 { self.cltv_delta }

    fn subunits(&self) -> u64 { self.subunits }

    async fn query_routes(
        &self,
        _amount: u64,
        final_cltv_delta: u64,
        _num_routes: u32,
        _pub_key: &str,
    ) -> Result<Vec<Route>, CoordinatorError> {
        if self.no_routes {
            return Ok(vec![]);
        }
        Ok(vec![Route {
            total_timelock: self.block_height + final_cltv_delta,
            hops: serde_json::json!({ "stub": true }),
        }])
    }

    async fn get_info(&self) -> Result<ChainInfo, CoordinatorError> {
        Ok(ChainInfo {
            block_height: self.block_height,
        })
    }

    async fn send_payment_sync(&self, input: SendPaymentInput) -> Result<PaymentOutcome, CoordinatorError> {
        self.settle(input.payment_hash)
    }

    async fn send_to_route_sync(&self, input: SendToRouteInput) -> Result<PaymentOutcome, CoordinatorError> {
        self.settle(input.payment_hash)
    }
}

impl StubChainClient {
    fn settle(&self, payment_hash: String) -> Result<PaymentOutcome, CoordinatorError> {
        let mut fail_next = self.fail_next.lock();
        if *fail_next {
            *fail_next = false;
            return Ok(PaymentOutcome {
                payment_error: Some("stub: forced payment failure".to_owned()),
                payment_preimage: None,
            });
        }
        let preimage = self
            .known_preimages
            .lock()
            .get(&payment_hash)
            .cloned()
            .unwrap_or_else(|| format!("preimage-for-{payment_hash}"));
        Ok(PaymentOutcome {
            payment_error: None,
            payment_preimage: Some(preimage),
        })
    }
}

/// A peer whose advertised pubkeys are fixed at construction and whose
/// outbound packets are simply recorded for inspection.
pub struct StubPeer {
    node_pub_key: String,
    pub_keys: HashMap<String, String>,
    sent: Mutex<Vec<SwapPacket>>,
}

impl StubPeer {
    pub fn new(node_pub_key: impl Into<String>) -> Self {
        StubPeer {
            node_pub_key: node_pub_key.into(),
            pub_keys: HashMap::new(),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_pub_key(mut self, currency: impl Into<String>, pub_key: impl Into<String>) -> Self {
        self.pub_keys.insert(currency.into(), pub_key.into());
        self
    }

    pub fn sent_packets(&self) -> Vec<SwapPacket> { self.sent.lock().clone() }
}

#[async_trait]
impl Peer for StubPeer {
    fn node_pub_key(&self) -> &str { &self.node_pub_key }

    fn get_lnd_pub_key(&self, currency: &str) -> Option<String> { self.pub_keys.get(currency).cloned() }

    async fn send_packet(&self, packet: SwapPacket) -> Result<(), CoordinatorError> {
        self.sent.lock().push(packet);
        Ok(())
    }
}

/// A BTC/LTC stub pair with concrete handles retained, so a caller can still
/// call [`StubChainClient::set_known_preimage`] after registering them.
pub fn stub_pair() -> (Arc<StubChainClient>, Arc<StubChainClient>) {
    (
        Arc::new(StubChainClient::new("BTC", 40, 100_000_000, 1_000)),
        Arc::new(StubChainClient::new("LTC", 576, 100_000_000, 1_000)),
    )
}

pub fn sample_registry() -> crate::clients::ChainClientRegistry {
    let (btc, ltc) = stub_pair();
    let mut registry = crate::clients::ChainClientRegistry::new();
    registry.register(btc);
    registry.register(ltc);
    registry
}
