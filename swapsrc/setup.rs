//! LND setup verification (§4.6): both chain clients connected, and the
//! peer has advertised a chain pubkey for each currency in play.

use crate::clients::ChainClientRegistry;
use crate::errors::CoordinatorError;
use crate::peer::Peer;

pub async fn verify_lnd_setup(
    peer: &dyn Peer,
    clients: &ChainClientRegistry,
    taker_currency: &str,
    maker_currency: &str,
) -> Result<(), CoordinatorError> {
    for currency in [taker_currency, maker_currency] {
        if peer.get_lnd_pub_key(currency).is_none() {
            return Err(CoordinatorError::MissingPeerPubKey {
                peer: peer.node_pub_key().to_owned(),
                currency: currency.to_owned(),
            });
        }
        match clients.get(currency) {
            Some(client) if client.is_connected().await => {},
            Some(_) => return Err(CoordinatorError::ClientDisconnected(currency.to_owned())),
            None => return Err(CoordinatorError::UnsupportedCurrency(currency.to_owned())),
        }
    }
    Ok(())
}
