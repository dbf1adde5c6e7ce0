//! Preimage resolver (§4.5): invoked by the local chain client when an
//! inbound HTLC addressed to a known `r_hash` is held pending. Validates
//! the HTLC, then either forwards payment on the other chain (maker) or
//! releases the already-known preimage (taker).

use crate::chain_client::{PendingHtlc, SendToRouteInput};
use crate::coordinator::Coordinator;
use crate::deal::{Deal, Role};
use crate::errors::CoordinatorError;
use crate::registry::DealHandle;
use crate::state_machine;

/// Validates an inbound HTLC's amount and timelock against the deal it
/// claims to settle. On failure the deal is transitioned to `Error` before
/// the validation error is returned.
pub fn validate_request(deal: &mut Deal, pending: &PendingHtlc) -> Result<(), CoordinatorError> {
    let expected_msat = deal.expected_amount() * 1000;
    if pending.amount_msat < expected_msat {
        let e = CoordinatorError::AmountTooSmall {
            actual: pending.amount_msat,
            expected: expected_msat,
        };
        state_machine::fail(deal, e.to_string());
        return Err(e);
    }

    let required = deal.required_cltv_delta().unwrap_or(0);
    let actual = pending.timeout_height - pending.height_now;
    if actual < required as i64 {
        let e = CoordinatorError::TimelockTooShort { actual, required };
        state_machine::fail(deal, e.to_string());
        return Err(e);
    }

    Ok(())
}

/// Looks up the deal for `pending.hash`, validates it, and dispatches by
/// role. Returns the hex preimage to release the HTLC, or an error string
/// the chain client uses to cancel it.
pub async fn resolve_htlc(coordinator: &Coordinator, pending: PendingHtlc) -> Result<String, String> {
    let handle = coordinator
        .registry
        .get(&pending.hash)
        .ok_or_else(|| CoordinatorError::UnknownDeal(pending.hash.clone()).to_string())?;

    let role = {
        let mut deal = handle.lock().await;
        validate_request(&mut deal, &pending).map_err(|e| e.to_string())?;
        deal.my_role
    };

    match role {
        Role::Maker => resolve_as_maker(coordinator, &handle, &pending).await,
        Role::Taker => resolve_as_taker(&handle).await,
    }
}

async fn resolve_as_maker(
    coordinator: &Coordinator,
    handle: &DealHandle,
    pending: &PendingHtlc,
) -> Result<String, String> {
    let (taker_currency, routes) = {
        let mut deal = handle.lock().await;
        state_machine::advance_to_amount_sent(&mut deal);
        let routes = deal
            .maker_to_taker_routes
            .clone()
            .ok_or_else(|| "no precomputed route stored for maker forwarding".to_owned())?;
        (deal.taker_currency.clone(), routes)
    };

    let taker_client = coordinator
        .clients
        .get(&taker_currency)
        .ok_or_else(|| CoordinatorError::UnsupportedCurrency(taker_currency.clone()).to_string())?;

    let result = taker_client
        .send_to_route_sync(SendToRouteInput {
            routes,
            payment_hash: pending.hash.clone(),
        })
        .await;

    match result {
        Ok(outcome) if outcome.payment_error.is_none() => {
            let preimage = outcome
                .payment_preimage
                .ok_or_else(|| "chain client reported success without a preimage".to_owned())?;
            let mut deal = handle.lock().await;
            deal.r_preimage = Some(preimage.clone());
            state_machine::advance_to_amount_received(&mut deal);
            Ok(preimage)
        },
        Ok(outcome) => {
            let reason = outcome.payment_error.unwrap_or_else(|| "payment failed".to_owned());
            let mut deal = handle.lock().await;
            state_machine::fail(&mut deal, reason.clone());
            Err(reason)
        },
        Err(e) => {
            let mut deal = handle.lock().await;
            state_machine::fail(&mut deal, e.to_string());
            Err(e.to_string())
        },
    }
}

async fn resolve_as_taker(handle: &DealHandle) -> Result<String, String> {
    let mut deal = handle.lock().await;
    state_machine::advance_to_amount_received(&mut deal);
    deal.r_preimage
        .clone()
        .ok_or_else(|| "taker deal has no stored preimage".to_owned())
}
