//! The swap coordinator: the registry plus the chain-client table every
//! protocol handler needs. Analogous to the teacher's `SwapsContext`, but
//! holding the chain-client registry too since currency dispatch (§9) now
//! lives on a typed table rather than ad hoc string matching scattered
//! through the protocol code.

use std::sync::Arc;

use crate::clients::ChainClientRegistry;
use crate::history::SwapHistory;
use crate::registry::DealRegistry;

pub struct Coordinator {
    pub registry: DealRegistry,
    pub clients: ChainClientRegistry,
    pub history: Option<Arc<SwapHistory>>,
}

impl Coordinator {
    pub fn new(clients: ChainClientRegistry) -> Self {
        Coordinator {
            registry: DealRegistry::new(),
            clients,
            history: None,
        }
    }

    pub fn with_history(mut self, history: Arc<SwapHistory>) -> Self {
        self.history = Some(history);
        self
    }
}
