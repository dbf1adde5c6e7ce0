//! Legal phase/state transitions for a [`Deal`].
//!
//! Every public function here takes `&mut Deal` and either performs the
//! requested transition or panics, per the design: illegal transitions are
//! programming errors (`ProtocolViolation`), not recoverable protocol
//! failures. Protocol failures go through [`fail`] instead.

use log::{debug, info};

use crate::deal::{Deal, Phase, Role, State, SwapOutcome};

/// Fires off the history write without holding the deal's async mutex
/// across an `.await` (the per-deal lock is held by the caller synchronously
/// up to this point).
fn spawn_history_record(deal: &Deal, outcome: &SwapOutcome) {
    if let Some(history) = deal.history.clone() {
        let outcome = outcome.clone();
        tokio::spawn(async move {
            history.record(&outcome).await;
        });
    }
}

/// `SwapRequested`: taker only, out of `SwapCreated`.
pub fn advance_to_requested(deal: &mut Deal) {
    assert!(deal.is_active(), "phase advance on non-active deal");
    assert_eq!(deal.my_role, Role::Taker, "SwapRequested is taker-only");
    assert_eq!(deal.phase, Phase::SwapCreated, "SwapRequested must follow SwapCreated");
    deal.phase = Phase::SwapRequested;
    debug!("{} -> SwapRequested", deal.r_hash);
}

/// `SwapAgreed`: maker only, out of `SwapCreated`.
pub fn advance_to_agreed(deal: &mut Deal) {
    assert!(deal.is_active(), "phase advance on non-active deal");
    assert_eq!(deal.my_role, Role::Maker, "SwapAgreed is maker-only");
    assert_eq!(deal.phase, Phase::SwapCreated, "SwapAgreed must follow SwapCreated");
    deal.phase = Phase::SwapAgreed;
    debug!("{} -> SwapAgreed", deal.r_hash);
}

/// `AmountSent`: taker out of `SwapRequested`, or maker out of `SwapAgreed`.
/// Stamps `execute_time`.
pub fn advance_to_amount_sent(deal: &mut Deal) {
    assert!(deal.is_active(), "phase advance on non-active deal");
    let legal_prev = match deal.my_role {
        Role::Taker => deal.phase == Phase::SwapRequested,
        Role::Maker => deal.phase == Phase::SwapAgreed,
    };
    assert!(legal_prev, "AmountSent out of illegal previous phase {:?}", deal.phase);
    deal.phase = Phase::AmountSent;
    deal.mark_execute_time();
    debug!("{} -> AmountSent", deal.r_hash);
}

/// `AmountReceived`: out of `AmountSent` only. Resolves the completion sink
/// with `swap.paid` — this is the single point at which a deal is
/// considered economically settled, even though one more phase
/// (`SwapCompleted`) remains for bookkeeping.
pub fn advance_to_amount_received(deal: &mut Deal) {
    assert!(deal.is_active(), "phase advance on non-active deal");
    assert_eq!(deal.phase, Phase::AmountSent, "AmountReceived must follow AmountSent");
    deal.phase = Phase::AmountReceived;
    debug!("{} -> AmountReceived", deal.r_hash);

    let outcome = SwapOutcome::Paid(deal.swap_result_summary());
    spawn_history_record(deal, &outcome);
    if let Some(tx) = deal.completion.take() {
        info!("swap.paid {}", deal.r_hash);
        let _ = tx.send(outcome);
    }
}

/// `SwapCompleted`: out of `AmountReceived` only. Stamps `completion_time`
/// and transitions `state` to `Completed`.
pub fn advance_to_completed(deal: &mut Deal) {
    assert!(deal.is_active(), "phase advance on non-active deal");
    assert_eq!(deal.phase, Phase::AmountReceived, "SwapCompleted must follow AmountReceived");
    deal.phase = Phase::SwapCompleted;
    deal.mark_completion_time();
    deal.state = State::Completed;
    info!("{} completed", deal.r_hash);
}

/// `Active -> Error`. First call resolves the completion sink with
/// `swap.failed` and records `reason` in `state_reason`. A deal already in
/// `Error` instead concatenates `"; <reason>"` onto the existing reason and
/// does not resolve the sink again (it was already resolved, or never
/// existed because this is the second call).
pub fn fail(deal: &mut Deal, reason: impl Into<String>) {
    let reason = reason.into();
    match deal.state {
        State::Active => {
            deal.state = State::Error;
            deal.state_reason = Some(reason.clone());
            log::warn!("swap.failed {}: {}", deal.r_hash, reason);
            let outcome = SwapOutcome::Failed {
                r_hash: deal.r_hash.clone(),
                reason,
            };
            spawn_history_record(deal, &outcome);
            if let Some(tx) = deal.completion.take() {
                let _ = tx.send(outcome);
            }
        },
        State::Error => {
            let combined = match &deal.state_reason {
                Some(existing) => format!("{}; {}", existing, reason),
                None => reason,
            };
            debug!("{} already in error, appending reason: {}", deal.r_hash, combined);
            deal.state_reason = Some(combined);
        },
        State::Completed => {
            panic!(
                "ProtocolViolation: attempted to fail a completed deal {} with reason {}",
                deal.r_hash, reason
            );
        },
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::deal::Deal;

    fn taker_deal() -> (Deal, tokio::sync::oneshot::Receiver<SwapOutcome>) {
        Deal::new(
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
        )
    }

    #[test]
    fn happy_path_taker_emits_paid_once() {
        let (mut deal, rx) = taker_deal();
        advance_to_requested(&mut deal);
        advance_to_amount_sent(&mut deal);
        advance_to_amount_received(&mut deal);
        advance_to_completed(&mut deal);
        assert_eq!(deal.state, State::Completed);
        assert!(deal.completion_time.is_some());
        let outcome = rx.try_recv().expect("completion sink resolved");
        assert!(matches!(outcome, SwapOutcome::Paid(_)));
    }

    #[test]
    fn double_error_concatenates_reason_without_resolving_twice() {
        let (mut deal, rx) = taker_deal();
        fail(&mut deal, "A");
        fail(&mut deal, "B");
        assert_eq!(deal.state_reason.as_deref(), Some("A; B"));
        let outcome = rx.try_recv().expect("sink resolved exactly once on first failure");
        assert!(matches!(outcome, SwapOutcome::Failed { .. }));
    }

    #[test]
    #[should_panic(expected = "AmountReceived must follow AmountSent")]
    fn illegal_transition_panics() {
        let (mut deal, _rx) = taker_deal();
        advance_to_amount_received(&mut deal);
    }

    #[test]
    #[should_panic(expected = "SwapAgreed is maker-only")]
    fn wrong_role_transition_panics() {
        let (mut deal, _rx) = taker_deal();
        advance_to_agreed(&mut deal);
    }
}
