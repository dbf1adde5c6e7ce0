//! In-memory deal registry.
//!
//! Mirrors the teacher's `SwapsContext` (a single `Mutex`-guarded map owned
//! by the coordinator, looked up by a stable id) but keyed by `r_hash`
//! instead of `uuid`, and handing out per-deal locks so that a deal's own
//! mutations never block unrelated deals.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::deal::{Deal, RHash};
use crate::errors::CoordinatorError;

pub type DealHandle = Arc<AsyncMutex<Deal>>;

#[derive(Default)]
pub struct DealRegistry {
    deals: Mutex<HashMap<RHash, DealHandle>>,
}

impl DealRegistry {
    pub fn new() -> Self { DealRegistry { deals: Mutex::new(HashMap::new()) } }

    /// Registers a new deal. Panics on a duplicate `r_hash`: the only
    /// caller of `add` is the initiator, who generated `r_hash` itself, so
    /// a collision here means the local RNG produced a repeat or the
    /// caller is misusing the registry — a programming error either way.
    pub fn add(&self, deal: Deal) -> DealHandle {
        let r_hash = deal.r_hash.clone();
        let handle = Arc::new(AsyncMutex::new(deal));
        let mut deals = self.deals.lock();
        if deals.insert(r_hash.clone(), handle.clone()).is_some() {
            panic!("ProtocolViolation: duplicate r_hash {} added to registry", r_hash);
        }
        handle
    }

    /// Fallible counterpart used by the responder: an inbound swap-request
    /// may carry an `r_hash` already known to us (replay or collision).
    /// That is a protocol failure, not a programming error, so it returns
    /// `Err` instead of panicking.
    pub fn try_add(&self, deal: Deal) -> Result<DealHandle, CoordinatorError> {
        let r_hash = deal.r_hash.clone();
        let mut deals = self.deals.lock();
        if deals.contains_key(&r_hash) {
            return Err(CoordinatorError::DuplicateDeal(r_hash));
        }
        let handle = Arc::new(AsyncMutex::new(deal));
        deals.insert(r_hash, handle.clone());
        Ok(handle)
    }

    pub fn get(&self, r_hash: &str) -> Option<DealHandle> { self.deals.lock().get(r_hash).cloned() }

    /// Idempotent: removing an absent `r_hash` is a no-op.
    pub fn remove(&self, r_hash: &str) { self.deals.lock().remove(r_hash); }

    pub fn len(&self) -> usize { self.deals.lock().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::deal::Role;

    fn sample_deal(r_hash: &str) -> Deal {
        Deal::new(
            r_hash.to_owned(),
            None,
            Role::Maker,
            "peer".into(),
            "O1".into(),
            "L1".into(),
            "LTC/BTC".into(),
            BigDecimal::from(1),
            "LTC".into(),
            "BTC".into(),
            100_000,
            1_000_000,
            144,
            BigDecimal::from(1),
        )
        .0
    }

    #[test]
    fn get_returns_matching_r_hash_and_at_most_one_entry() {
        let registry = DealRegistry::new();
        registry.add(sample_deal("hash1"));
        let handle = registry.get("hash1").expect("present");
        assert_eq!(registry.len(), 1);
        drop(handle);
    }

    #[test]
    fn try_add_rejects_duplicate_r_hash() {
        let registry = DealRegistry::new();
        registry.add(sample_deal("hash1"));
        let err = registry.try_add(sample_deal("hash1")).unwrap_err();
        assert!(matches!(err, CoordinatorError::DuplicateDeal(_)));
    }

    #[test]
    #[should_panic(expected = "duplicate r_hash")]
    fn add_panics_on_duplicate() {
        let registry = DealRegistry::new();
        registry.add(sample_deal("hash1"));
        registry.add(sample_deal("hash1"));
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = DealRegistry::new();
        registry.add(sample_deal("hash1"));
        registry.remove("hash1");
        registry.remove("hash1");
        assert!(registry.is_empty());
    }
}
