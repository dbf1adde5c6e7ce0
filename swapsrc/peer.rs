//! The peer interface consumed by the core: sending packets to, and reading
//! advertised chain pubkeys from, the counterparty. Transport framing and
//! discovery live outside this crate (§1); this trait is the seam.

use async_trait::async_trait;

use crate::errors::CoordinatorError;
use crate::packets::SwapPacket;

#[async_trait]
pub trait Peer: Send + Sync {
    fn node_pub_key(&self) -> &str;

    /// The chain pubkey this peer advertised for `currency`, if any. Used
    /// by LND setup verification (§4.6) and by the taker to learn where to
    /// send the maker-currency HTLC.
    fn get_lnd_pub_key(&self, currency: &str) -> Option<String>;

    async fn send_packet(&self, packet: SwapPacket) -> Result<(), CoordinatorError>;
}
