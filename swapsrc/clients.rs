//! Currency → chain-client dispatch.
//!
//! Replaces the source's string-matching on `"BTC"`/`"LTC"` with a typed
//! registry, per the currency-dispatch design note: the pair-support
//! predicate becomes "both legs resolve to a registered, connected client."

use std::collections::HashMap;
use std::sync::Arc;

use crate::chain_client::ChainClient;

#[derive(Default)]
pub struct ChainClientRegistry {
    clients: HashMap<String, Arc<dyn ChainClient>>,
}

impl ChainClientRegistry {
    pub fn new() -> Self { ChainClientRegistry { clients: HashMap::new() } }

    pub fn register(&mut self, client: Arc<dyn ChainClient>) {
        self.clients.insert(client.currency().to_owned(), client);
    }

    pub fn get(&self, currency: &str) -> Option<Arc<dyn ChainClient>> { self.clients.get(currency).cloned() }

    pub fn currencies(&self) -> impl Iterator<Item = &str> { self.clients.keys().map(|s| s.as_str()) }
}
