//! Maker protocol (§4.4): validates an inbound swap request, queries a
//! route and the current chain height, scales the maker-leg CLTV delta,
//! and replies with acceptance or rejection.

use std::sync::Arc;

use log::info;

use crate::cltv;
use crate::coordinator::Coordinator;
use crate::deal::{Deal, Role};
use crate::errors::CoordinatorError;
use crate::orders::AcceptedOrder;
use crate::packets::{Envelope, RejectionReason, SwapError, SwapPacket, SwapRequest, SwapResponse};
use crate::pair::is_pair_supported;
use crate::peer::Peer;
use crate::setup::verify_lnd_setup;
use crate::state_machine;

const BTC: &str = "BTC";
const LTC: &str = "LTC";

async fn notify_error(
    peer: &dyn Peer,
    request: &Envelope<SwapRequest>,
    error: CoordinatorError,
) -> CoordinatorError {
    let packet = SwapError {
        r_hash: request.body.r_hash.clone(),
        error_message: error.to_string(),
    };
    let _ = peer.send_packet(SwapPacket::Error(request.reply(packet))).await;
    error
}

/// Accepts (or rejects) an inbound swap request. On success the deal is
/// registered, a `SwapResponse` is sent, and the deal is advanced to
/// `SwapAgreed`.
pub async fn accept_deal(
    coordinator: &Coordinator,
    peer: Arc<dyn Peer>,
    request: Envelope<SwapRequest>,
    accepted: AcceptedOrder,
) -> Result<(), CoordinatorError> {
    if !is_pair_supported(&request.body.pair_id, &coordinator.clients).await {
        let response = SwapResponse {
            r_hash: request.body.r_hash.clone(),
            quantity: None,
            maker_cltv_delta: None,
            rejection_reason: Some(RejectionReason::PairNotSupported),
        };
        peer.send_packet(SwapPacket::Response(request.reply(response))).await?;
        return Err(CoordinatorError::PairNotSupported(request.body.pair_id.clone()));
    }

    let taker_pub_key = peer.get_lnd_pub_key(&request.body.taker_currency);

    let (mut deal, _rx) = Deal::new(
        request.body.r_hash.clone(),
        None,
        Role::Maker,
        peer.node_pub_key().to_owned(),
        request.body.order_id.clone(),
        accepted.local_id.clone(),
        request.body.pair_id.clone(),
        accepted.price.clone(),
        request.body.taker_currency.clone(),
        request.body.maker_currency.clone(),
        request.body.taker_amount,
        request.body.maker_amount,
        request.body.taker_cltv_delta,
        request.body.proposed_quantity.clone(),
    );
    deal.taker_pub_key = taker_pub_key.clone();
    deal.quantity = Some(accepted.quantity_to_accept.clone());
    deal.history = coordinator.history.clone();

    let handle = match coordinator.registry.try_add(deal) {
        Ok(h) => h,
        Err(e) => {
            return Err(notify_error(peer.as_ref(), &request, e).await);
        },
    };

    if let Err(e) = verify_lnd_setup(
        peer.as_ref(),
        &coordinator.clients,
        &request.body.taker_currency,
        &request.body.maker_currency,
    )
    .await
    {
        let mut deal = handle.lock().await;
        state_machine::fail(&mut deal, e.to_string());
        drop(deal);
        return Err(notify_error(peer.as_ref(), &request, e).await);
    }

    let taker_client = match coordinator.clients.get(&request.body.taker_currency) {
        Some(c) => c,
        None => {
            let e = CoordinatorError::UnsupportedCurrency(request.body.taker_currency.clone());
            let mut deal = handle.lock().await;
            state_machine::fail(&mut deal, e.to_string());
            drop(deal);
            return Err(notify_error(peer.as_ref(), &request, e).await);
        },
    };

    let taker_pub_key = match taker_pub_key {
        Some(key) => key,
        None => {
            let e = CoordinatorError::MissingPeerPubKey {
                peer: peer.node_pub_key().to_owned(),
                currency: request.body.taker_currency.clone(),
            };
            let mut deal = handle.lock().await;
            state_machine::fail(&mut deal, e.to_string());
            drop(deal);
            return Err(notify_error(peer.as_ref(), &request, e).await);
        },
    };

    let routes = match taker_client
        .query_routes(request.body.taker_amount, request.body.taker_cltv_delta, 1, &taker_pub_key)
        .await
    {
        Ok(routes) if !routes.is_empty() => routes,
        Ok(_) => {
            let e = CoordinatorError::NoRoute {
                destination: taker_pub_key.clone(),
                amount: request.body.taker_amount,
                currency: request.body.taker_currency.clone(),
            };
            let mut deal = handle.lock().await;
            state_machine::fail(&mut deal, e.to_string());
            drop(deal);
            return Err(notify_error(peer.as_ref(), &request, e).await);
        },
        Err(e) => {
            let mut deal = handle.lock().await;
            state_machine::fail(&mut deal, e.to_string());
            drop(deal);
            return Err(notify_error(peer.as_ref(), &request, e).await);
        },
    };
    let route = routes.into_iter().next().expect("checked non-empty above");

    let height = match taker_client.get_info().await {
        Ok(info) => info.block_height,
        Err(e) => {
            let mut deal = handle.lock().await;
            state_machine::fail(&mut deal, e.to_string());
            drop(deal);
            return Err(notify_error(peer.as_ref(), &request, e).await);
        },
    };

    let route_delta = cltv::route_cltv_delta(route.total_timelock, height);

    let btc_delta = coordinator
        .clients
        .get(BTC)
        .map(|c| c.cltv_delta())
        .unwrap_or(request.body.taker_cltv_delta);
    let ltc_delta = coordinator
        .clients
        .get(LTC)
        .map(|c| c.cltv_delta())
        .unwrap_or(request.body.taker_cltv_delta);

    let maker_cltv_delta = cltv::maker_cltv_delta(&request.body.maker_currency, btc_delta, ltc_delta, route_delta);

    {
        let mut deal = handle.lock().await;
        deal.maker_cltv_delta = Some(maker_cltv_delta);
        deal.maker_to_taker_routes = Some(route.hops.clone());
    }

    let response = SwapResponse {
        r_hash: request.body.r_hash.clone(),
        quantity: Some(accepted.quantity_to_accept),
        maker_cltv_delta: Some(maker_cltv_delta),
        rejection_reason: None,
    };
    peer.send_packet(SwapPacket::Response(request.reply(response))).await?;

    {
        let mut deal = handle.lock().await;
        state_machine::advance_to_agreed(&mut deal);
    }
    info!("sent SwapResponse for {}", request.body.r_hash);

    Ok(())
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::clients::ChainClientRegistry;
    use crate::deal::Phase;
    use crate::stub::{stub_pair, StubChainClient, StubPeer};

    fn sample_request(r_hash: &str) -> Envelope<SwapRequest> {
        Envelope::new(SwapRequest {
            proposed_quantity: BigDecimal::from(1),
            pair_id: "LTC/BTC".into(),
            taker_currency: "LTC".into(),
            maker_currency: "BTC".into(),
            order_id: "order-1".into(),
            r_hash: r_hash.to_owned(),
            taker_amount: 100_000_000,
            maker_amount: 1_000_000,
            taker_cltv_delta: 576,
        })
    }

    fn accepted_order() -> AcceptedOrder {
        AcceptedOrder {
            quantity_to_accept: BigDecimal::from(1),
            price: BigDecimal::from(1),
            local_id: "maker-local-1".into(),
        }
    }

    fn maker_setup() -> (Coordinator, Arc<StubPeer>) {
        let (btc, ltc) = stub_pair();
        let mut clients = ChainClientRegistry::new();
        clients.register(btc);
        clients.register(ltc);
        let coordinator = Coordinator::new(clients);
        let peer = Arc::new(
            StubPeer::new("maker-node")
                .with_pub_key("BTC", "taker-btc-key")
                .with_pub_key("LTC", "taker-ltc-key"),
        );
        (coordinator, peer)
    }

    #[tokio::test]
    async fn accept_deal_happy_path_advances_to_agreed() {
        let (coordinator, peer) = maker_setup();
        let request = sample_request(&"a".repeat(64));
        accept_deal(&coordinator, peer.clone(), request.clone(), accepted_order())
            .await
            .expect("accept_deal");

        assert!(matches!(peer.sent_packets().as_slice(), [SwapPacket::Response(_)]));
        let handle = coordinator.registry.get(&request.body.r_hash).expect("deal registered");
        let deal = handle.lock().await;
        assert_eq!(deal.phase, Phase::SwapAgreed);
        assert_eq!(deal.quantity, Some(BigDecimal::from(1)));
        assert_eq!(deal.proposed_quantity, request.body.proposed_quantity);
    }

    #[tokio::test]
    async fn accept_deal_rejects_when_no_route_found() {
        let btc = Arc::new(StubChainClient::new("BTC", 40, 100_000_000, 1_000));
        let ltc = Arc::new(StubChainClient::new("LTC", 576, 100_000_000, 1_000).no_routes());
        let mut clients = ChainClientRegistry::new();
        clients.register(btc);
        clients.register(ltc);
        let coordinator = Coordinator::new(clients);
        let peer = Arc::new(
            StubPeer::new("maker-node")
                .with_pub_key("BTC", "taker-btc-key")
                .with_pub_key("LTC", "taker-ltc-key"),
        );

        let request = sample_request(&"b".repeat(64));
        let err = accept_deal(&coordinator, peer.clone(), request, accepted_order())
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::NoRoute { .. }));
        assert!(matches!(peer.sent_packets().as_slice(), [SwapPacket::Error(_)]));
    }

    #[tokio::test]
    async fn accept_deal_rejects_duplicate_r_hash_with_swap_error() {
        let (coordinator, peer) = maker_setup();
        let r_hash = "c".repeat(64);
        let existing = Deal::new(
            r_hash.clone(),
            None,
            Role::Maker,
            "maker-node".into(),
            "order-0".into(),
            "local-0".into(),
            "LTC/BTC".into(),
            BigDecimal::from(1),
            "LTC".into(),
            "BTC".into(),
            100_000_000,
            1_000_000,
            576,
            BigDecimal::from(1),
        )
        .0;
        coordinator.registry.add(existing);

        let request = sample_request(&r_hash);
        let err = accept_deal(&coordinator, peer.clone(), request, accepted_order())
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::DuplicateDeal(_)));
        assert!(matches!(peer.sent_packets().as_slice(), [SwapPacket::Error(_)]));
    }
}
