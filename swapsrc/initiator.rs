//! Taker protocol (§4.3): constructs a deal from a matched order pair,
//! sends the swap request, and drives the first HTLC send once the maker
//! responds.

use std::sync::Arc;

use hex::ToHex;
use log::info;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tokio::sync::oneshot;

use crate::chain_client::SendPaymentInput;
use crate::coordinator::Coordinator;
use crate::deal::{Deal, RHash, Role, SwapOutcome};
use crate::errors::CoordinatorError;
use crate::orders::{MakerOrderRef, TakerOrderRef};
use crate::packets::{Envelope, SwapComplete, SwapError, SwapPacket, SwapRequest, SwapResponse};
use crate::pair::{is_pair_supported, resolve_currencies};
use crate::peer::Peer;
use crate::registry::DealHandle;
use crate::setup::verify_lnd_setup;
use crate::{amounts, state_machine};

fn generate_preimage_and_hash() -> (String, RHash) {
    let mut preimage = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut preimage);
    let hash = Sha256::digest(preimage);
    (preimage.encode_hex::<String>(), hash.encode_hex::<String>())
}

/// Begins a new swap for a matched `(maker_order, taker_order)` pair.
/// Returns the new deal's `r_hash` and a receiver that resolves exactly
/// once with the deal's final outcome (§9 event-emitter redesign).
pub async fn begin_swap(
    coordinator: &Coordinator,
    peer: Arc<dyn Peer>,
    maker_order: &MakerOrderRef,
    taker_order: &TakerOrderRef,
) -> Result<(RHash, oneshot::Receiver<SwapOutcome>), CoordinatorError> {
    if !is_pair_supported(&maker_order.pair_id, &coordinator.clients).await {
        return Err(CoordinatorError::PairNotSupported(maker_order.pair_id.clone()));
    }

    let (taker_currency, maker_currency) = resolve_currencies(&maker_order.pair_id, taker_order.is_buy)?;
    let taker_client = coordinator
        .clients
        .get(&taker_currency)
        .ok_or_else(|| CoordinatorError::UnsupportedCurrency(taker_currency.clone()))?;
    let maker_client = coordinator
        .clients
        .get(&maker_currency)
        .ok_or_else(|| CoordinatorError::UnsupportedCurrency(maker_currency.clone()))?;

    let taker_cltv_delta = taker_client.cltv_delta();
    let taker_amt = amounts::taker_amount(&taker_order.quantity, &maker_order.price, taker_client.subunits());
    let maker_amt = amounts::maker_amount(&taker_order.quantity, maker_client.subunits());

    let (preimage, r_hash) = generate_preimage_and_hash();

    let (mut deal, rx) = Deal::new(
        r_hash.clone(),
        Some(preimage),
        Role::Taker,
        peer.node_pub_key().to_owned(),
        maker_order.id.clone(),
        taker_order.local_id.clone(),
        maker_order.pair_id.clone(),
        maker_order.price.clone(),
        taker_currency.clone(),
        maker_currency.clone(),
        taker_amt,
        maker_amt,
        taker_cltv_delta,
        taker_order.quantity.clone(),
    );
    deal.history = coordinator.history.clone();
    let handle = coordinator.registry.add(deal);

    if let Err(e) = verify_lnd_setup(peer.as_ref(), &coordinator.clients, &taker_currency, &maker_currency).await {
        let mut deal = handle.lock().await;
        state_machine::fail(&mut deal, e.to_string());
        return Ok((r_hash, rx));
    }

    let request = SwapRequest {
        proposed_quantity: taker_order.quantity.clone(),
        pair_id: maker_order.pair_id.clone(),
        taker_currency,
        maker_currency,
        order_id: maker_order.id.clone(),
        r_hash: r_hash.clone(),
        taker_amount: taker_amt,
        maker_amount: maker_amt,
        taker_cltv_delta,
    };
    let envelope = Envelope::new(request);

    if let Err(e) = peer.send_packet(SwapPacket::Request(envelope)).await {
        let mut deal = handle.lock().await;
        state_machine::fail(&mut deal, e.to_string());
        return Ok((r_hash, rx));
    }

    {
        let mut deal = handle.lock().await;
        state_machine::advance_to_requested(&mut deal);
    }
    info!("sent SwapRequest for {}", r_hash);

    Ok((r_hash, rx))
}

/// Handles an inbound `SwapResponse` for a known `r_hash`: records the
/// maker's CLTV delta, enforces the no-partial-fills design decision, and
/// triggers the maker-currency HTLC send.
pub async fn handle_swap_response(
    coordinator: &Coordinator,
    peer: Arc<dyn Peer>,
    response: Envelope<SwapResponse>,
) -> Result<(), CoordinatorError> {
    let Some(handle) = coordinator.registry.get(&response.body.r_hash) else {
        info!("SwapResponse for unknown r_hash {}, ignoring", response.body.r_hash);
        return Ok(());
    };

    if let Some(reason) = response.body.rejection_reason {
        let mut deal = handle.lock().await;
        state_machine::fail(&mut deal, format!("{:?}", reason));
        return Ok(());
    }

    let (maker_currency, maker_amount, destination) = {
        let mut deal = handle.lock().await;
        if !deal.is_active() {
            return Ok(());
        }

        deal.maker_cltv_delta = response.body.maker_cltv_delta;
        if deal.maker_cltv_delta.is_none() {
            state_machine::fail(&mut deal, CoordinatorError::MissingMakerCltvDelta(deal.r_hash.clone()).to_string());
            return Ok(());
        }

        match &response.body.quantity {
            Some(q) if *q != deal.proposed_quantity => {
                state_machine::fail(&mut deal, CoordinatorError::PartialFillNotSupported.to_string());
                return Ok(());
            },
            Some(q) => deal.quantity = Some(q.clone()),
            None => deal.quantity = Some(deal.proposed_quantity.clone()),
        }

        let destination = match peer.get_lnd_pub_key(&deal.maker_currency) {
            Some(key) => key,
            None => {
                state_machine::fail(
                    &mut deal,
                    format!("peer has no chain pubkey for {}", deal.maker_currency),
                );
                return Ok(());
            },
        };

        (deal.maker_currency.clone(), deal.maker_amount, destination)
    };

    let maker_client = match coordinator.clients.get(&maker_currency) {
        Some(c) => c,
        None => {
            let mut deal = handle.lock().await;
            state_machine::fail(&mut deal, CoordinatorError::UnsupportedCurrency(maker_currency).to_string());
            return Ok(());
        },
    };

    let final_cltv_delta = {
        let mut deal = handle.lock().await;
        state_machine::advance_to_amount_sent(&mut deal);
        deal.maker_cltv_delta.expect("validated non-None before AmountSent")
    };

    let send_result = maker_client
        .send_payment_sync(SendPaymentInput {
            amount: maker_amount,
            destination: destination.clone(),
            payment_hash: response.body.r_hash.clone(),
            final_cltv_delta,
        })
        .await;

    match send_result {
        Ok(outcome) if outcome.payment_error.is_none() => {
            let mut deal = handle.lock().await;
            if let (Some(expected), Some(got)) = (&deal.r_preimage, &outcome.payment_preimage) {
                if expected != got {
                    state_machine::fail(&mut deal, CoordinatorError::PreimageMismatch(deal.r_hash.clone()).to_string());
                    drop(deal);
                    let _ = peer
                        .send_packet(SwapPacket::Error(Envelope::new(SwapError {
                            r_hash: response.body.r_hash.clone(),
                            error_message: CoordinatorError::PreimageMismatch(response.body.r_hash.clone()).to_string(),
                        })))
                        .await;
                    return Ok(());
                }
            }
            state_machine::advance_to_completed(&mut deal);
            drop(deal);
            let _ = peer
                .send_packet(SwapPacket::Complete(Envelope::new(SwapComplete {
                    r_hash: response.body.r_hash.clone(),
                })))
                .await;
        },
        Ok(outcome) => {
            let reason = outcome
                .payment_error
                .unwrap_or_else(|| "payment failed".to_owned());
            fail_and_notify(&handle, peer.as_ref(), &response.body.r_hash, reason).await;
        },
        Err(e) => {
            fail_and_notify(&handle, peer.as_ref(), &response.body.r_hash, e.to_string()).await;
        },
    }

    Ok(())
}

async fn fail_and_notify(handle: &DealHandle, peer: &dyn Peer, r_hash: &str, reason: String) {
    {
        let mut deal = handle.lock().await;
        state_machine::fail(&mut deal, reason.clone());
    }
    let _ = peer
        .send_packet(SwapPacket::Error(Envelope::new(SwapError {
            r_hash: r_hash.to_owned(),
            error_message: reason,
        })))
        .await;
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::clients::ChainClientRegistry;
    use crate::deal::{Phase, State};
    use crate::stub::{stub_pair, StubChainClient, StubPeer};

    fn maker_order() -> MakerOrderRef {
        MakerOrderRef {
            id: "order-1".into(),
            peer_pub_key: "maker-node".into(),
            pair_id: "LTC/BTC".into(),
            price: BigDecimal::from(1),
        }
    }

    fn taker_order() -> TakerOrderRef {
        TakerOrderRef {
            local_id: "local-1".into(),
            quantity: BigDecimal::from(1),
            is_buy: true,
        }
    }

    fn taker_setup() -> (Coordinator, Arc<StubPeer>, Arc<StubChainClient>, Arc<StubChainClient>) {
        let (btc, ltc) = stub_pair();
        let mut clients = ChainClientRegistry::new();
        clients.register(btc.clone());
        clients.register(ltc.clone());
        let coordinator = Coordinator::new(clients);
        let peer = Arc::new(
            StubPeer::new("taker-node")
                .with_pub_key("BTC", "maker-btc-key")
                .with_pub_key("LTC", "maker-ltc-key"),
        );
        (coordinator, peer, btc, ltc)
    }

    #[tokio::test]
    async fn begin_swap_sends_request_and_advances_to_requested() {
        let (coordinator, peer, _btc, _ltc) = taker_setup();
        let (r_hash, _rx) = begin_swap(&coordinator, peer.clone(), &maker_order(), &taker_order())
            .await
            .expect("begin_swap");

        assert!(matches!(peer.sent_packets().as_slice(), [SwapPacket::Request(_)]));
        let handle = coordinator.registry.get(&r_hash).expect("deal registered");
        let deal = handle.lock().await;
        assert_eq!(deal.phase, Phase::SwapRequested);
    }

    #[tokio::test]
    async fn handle_swap_response_happy_path_completes_deal() {
        let (coordinator, peer, btc, _ltc) = taker_setup();
        let (r_hash, rx) = begin_swap(&coordinator, peer.clone(), &maker_order(), &taker_order())
            .await
            .expect("begin_swap");

        let preimage = {
            let handle = coordinator.registry.get(&r_hash).expect("deal registered");
            let deal = handle.lock().await;
            deal.r_preimage.clone().expect("taker deal always carries a preimage")
        };
        btc.set_known_preimage(r_hash.clone(), preimage);

        let response = Envelope::new(SwapResponse {
            r_hash: r_hash.clone(),
            quantity: Some(BigDecimal::from(1)),
            maker_cltv_delta: Some(40),
            rejection_reason: None,
        });
        handle_swap_response(&coordinator, peer.clone(), response).await.expect("handle_swap_response");

        let handle = coordinator.registry.get(&r_hash).expect("deal registered");
        let deal = handle.lock().await;
        assert_eq!(deal.state, State::Completed);
        drop(deal);

        assert!(matches!(rx.await.expect("completion resolves"), SwapOutcome::Paid(_)));
        assert!(peer.sent_packets().iter().any(|p| matches!(p, SwapPacket::Complete(_))));
    }

    #[tokio::test]
    async fn handle_swap_response_rejects_partial_fill() {
        let (coordinator, peer, _btc, _ltc) = taker_setup();
        let (r_hash, rx) = begin_swap(&coordinator, peer.clone(), &maker_order(), &taker_order())
            .await
            .expect("begin_swap");

        let response = Envelope::new(SwapResponse {
            r_hash: r_hash.clone(),
            quantity: Some(BigDecimal::from(2)),
            maker_cltv_delta: Some(40),
            rejection_reason: None,
        });
        handle_swap_response(&coordinator, peer.clone(), response).await.expect("handle_swap_response");

        assert!(matches!(rx.await.expect("completion resolves"), SwapOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn handle_swap_response_fails_when_maker_cltv_delta_missing() {
        let (coordinator, peer, _btc, _ltc) = taker_setup();
        let (r_hash, rx) = begin_swap(&coordinator, peer.clone(), &maker_order(), &taker_order())
            .await
            .expect("begin_swap");

        let response = Envelope::new(SwapResponse {
            r_hash: r_hash.clone(),
            quantity: Some(BigDecimal::from(1)),
            maker_cltv_delta: None,
            rejection_reason: None,
        });
        handle_swap_response(&coordinator, peer.clone(), response).await.expect("handle_swap_response");

        match rx.await.expect("completion resolves") {
            SwapOutcome::Failed { reason, .. } => assert!(reason.contains("maker_cltv_delta")),
            other => panic!("expected Failed outcome, got {other:?}"),
        }
    }
}
