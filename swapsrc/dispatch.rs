//! Completion/error dispatch (§4.8): routes inbound `SwapComplete` and
//! `SwapError` packets to the deal they reference. An unknown `r_hash` is
//! logged and ignored rather than treated as an error — the counterparty
//! may be referencing a deal we already pruned, or one that was never ours.

use log::{info, warn};

use crate::coordinator::Coordinator;
use crate::packets::{SwapComplete, SwapError};
use crate::state_machine;

/// Advances a known deal to `SwapCompleted`. A deal not in `AmountReceived`
/// (e.g. already completed, or failed in the meantime) is left alone; the
/// state machine's own assertions would otherwise panic on a packet that
/// arrived late or twice.
pub async fn handle_swap_complete(coordinator: &Coordinator, packet: SwapComplete) {
    let Some(handle) = coordinator.registry.get(&packet.r_hash) else {
        info!("SwapComplete for unknown r_hash {}, ignoring", packet.r_hash);
        return;
    };
    let mut deal = handle.lock().await;
    if deal.phase == crate::deal::Phase::AmountReceived && deal.is_active() {
        state_machine::advance_to_completed(&mut deal);
    } else {
        info!(
            "SwapComplete for {} in phase {:?}/state {:?}, ignoring",
            packet.r_hash, deal.phase, deal.state
        );
    }
}

/// Fails a known deal with the peer-supplied error message.
pub async fn handle_swap_error(coordinator: &Coordinator, packet: SwapError) {
    let Some(handle) = coordinator.registry.get(&packet.r_hash) else {
        warn!("SwapError for unknown r_hash {}, ignoring: {}", packet.r_hash, packet.error_message);
        return;
    };
    let mut deal = handle.lock().await;
    state_machine::fail(&mut deal, packet.error_message);
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::clients::ChainClientRegistry;
    use crate::deal::{Deal, Role};

    fn deal_in_phase(phase: crate::deal::Phase) -> Deal {
        let (mut deal, _rx) = Deal::new(
            "a".repeat(64),
            Some("b".repeat(64)),
            Role::Taker,
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
        );
        deal.phase = phase;
        deal
    }

    #[tokio::test]
    async fn swap_complete_on_unknown_hash_is_a_no_op() {
        let coordinator = Coordinator::new(ChainClientRegistry::new());
        handle_swap_complete(
            &coordinator,
            SwapComplete {
                r_hash: "nope".into(),
            },
        )
        .await;
        assert!(coordinator.registry.is_empty());
    }

    #[tokio::test]
    async fn swap_complete_advances_a_deal_in_amount_received() {
        let coordinator = Coordinator::new(ChainClientRegistry::new());
        let deal = deal_in_phase(crate::deal::Phase::AmountReceived);
        let r_hash = deal.r_hash.clone();
        coordinator.registry.add(deal);
        handle_swap_complete(&coordinator, SwapComplete { r_hash: r_hash.clone() }).await;
        let handle = coordinator.registry.get(&r_hash).unwrap();
        assert_eq!(handle.lock().await.phase, crate::deal::Phase::SwapCompleted);
    }

    #[tokio::test]
    async fn swap_error_on_unknown_hash_is_a_no_op() {
        let coordinator = Coordinator::new(ChainClientRegistry::new());
        handle_swap_error(
            &coordinator,
            SwapError {
                r_hash: "nope".into(),
                error_message: "boom".into(),
            },
        )
        .await;
        assert!(coordinator.registry.is_empty());
    }

    #[tokio::test]
    async fn swap_error_fails_a_known_deal() {
        let coordinator = Coordinator::new(ChainClientRegistry::new());
        let deal = deal_in_phase(crate::deal::Phase::SwapRequested);
        let r_hash = deal.r_hash.clone();
        coordinator.registry.add(deal);
        handle_swap_error(
            &coordinator,
            SwapError {
                r_hash: r_hash.clone(),
                error_message: "counterparty timed out".into(),
            },
        )
        .await;
        let handle = coordinator.registry.get(&r_hash).unwrap();
        let deal = handle.lock().await;
        assert_eq!(deal.state, crate::deal::State::Error);
        assert_eq!(deal.state_reason.as_deref(), Some("counterparty timed out"));
    }
}
