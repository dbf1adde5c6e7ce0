//! Minimal order descriptors consumed from the order book (out of scope;
//! see §1). These are the fields the protocol handlers actually read —
//! matching, ranking, and the rest of the book live elsewhere.

use bigdecimal::BigDecimal;

/// A remote maker order being filled by a taker.
#[derive(Debug, Clone)]
pub struct MakerOrderRef {
    pub id: String,
    pub peer_pub_key: String,
    pub pair_id: String,
    pub price: BigDecimal,
}

/// The local taker order initiating the swap.
#[derive(Debug, Clone)]
pub struct TakerOrderRef {
    pub local_id: String,
    pub quantity: BigDecimal,
    pub is_buy: bool,
}

/// The maker's own acceptance of an inbound swap request: how much of the
/// proposed quantity it is willing to fill, at what price, under which
/// local order id.
#[derive(Debug, Clone)]
pub struct AcceptedOrder {
    pub quantity_to_accept: BigDecimal,
    pub price: BigDecimal,
    pub local_id: String,
}
