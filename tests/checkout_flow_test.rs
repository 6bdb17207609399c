mod common;

use common::*;
use giveaway_checkout::domain::audit::RequestOrigin;
use giveaway_checkout::domain::error::{CheckoutError, ErrorKind};
use giveaway_checkout::domain::gateway::GatewayPaymentStatus;
use giveaway_checkout::domain::money::{Currency, Money, MoneyAmount};
use giveaway_checkout::domain::participant::PaymentStatus;
use giveaway_checkout::domain::store::ParticipantStore;
use giveaway_checkout::infra::memory::document_store::FaultPoint;
use giveaway_checkout::services::checkout::OrderRequest;
use giveaway_checkout::services::stats;
use std::time::Duration;

fn origin() -> RequestOrigin {
    RequestOrigin {
        ip_address: Some("203.0.113.7".into()),
        user_agent: Some("test-agent/1.0".into()),
    }
}

fn order_request(email: &str, amount: f64) -> OrderRequest {
    OrderRequest {
        name: "Asha Rao".into(),
        email: email.into(),
        phone: None,
        amount,
    }
}

// ── 1. captured_payment_records_participant ────────────────────────────────

#[tokio::test]
async fn captured_payment_records_participant() {
    let h = harness();
    h.gateway.put_payment(captured("pay_ok_1", "order_ok_1", 1000));

    let before = stats::compute(&*h.store).await.unwrap();

    let verified = h
        .state
        .checkout
        .verify_payment(
            verification("pay_ok_1", "order_ok_1", "Asha@Example.com ", 10.0),
            &origin(),
        )
        .await
        .unwrap();

    assert_eq!(verified.email, "asha@example.com");
    assert_eq!(verified.payment_id.as_str(), "pay_ok_1");

    let (participant, transaction) = h
        .store
        .participant_detail(verified.id)
        .await
        .unwrap()
        .expect("participant stored");
    assert_eq!(participant.status, PaymentStatus::Completed);
    assert_eq!(participant.amount.minor(), 1000);
    assert!(participant.integrity_verified());

    let transaction = transaction.expect("transaction stored with participant");
    assert_eq!(transaction.payment_id, "pay_ok_1");
    assert_eq!(transaction.order_id, "order_ok_1");
    assert_eq!(transaction.status, "captured");
    assert_eq!(transaction.method.as_deref(), Some("upi"));

    let after = stats::compute(&*h.store).await.unwrap();
    assert_eq!(after.total_participants, before.total_participants + 1);
    assert_eq!(after.total_collected, before.total_collected + 10.0);
}

// ── 2. authorized_payment_is_not_captured ──────────────────────────────────

#[tokio::test]
async fn authorized_payment_is_not_captured() {
    let h = harness();
    h.gateway.put_payment(payment_record(
        "pay_auth",
        "order_auth",
        1000,
        GatewayPaymentStatus::Authorized,
    ));

    let err = h
        .state
        .checkout
        .verify_payment(
            verification("pay_auth", "order_auth", "auth@example.com", 10.0),
            &origin(),
        )
        .await
        .unwrap_err();

    match err {
        CheckoutError::PaymentNotCaptured { status } => assert_eq!(status, "authorized"),
        other => panic!("expected PaymentNotCaptured, got {other:?}"),
    }
    assert_eq!(h.store.participant_count().await, 0);
}

// ── 3. replayed_callback_is_rejected ───────────────────────────────────────

#[tokio::test]
async fn replayed_callback_is_rejected() {
    let h = harness();
    h.gateway.put_payment(captured("pay_replay", "order_replay", 1000));
    let req = verification("pay_replay", "order_replay", "replay@example.com", 10.0);

    h.state
        .checkout
        .verify_payment(req.clone(), &origin())
        .await
        .unwrap();
    let err = h
        .state
        .checkout
        .verify_payment(req, &origin())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::PaymentAlreadyProcessed));
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert_eq!(h.store.participant_count().await, 1);
    assert_eq!(h.store.transaction_count().await, 1);
}

// ── 4. claimed_amount_must_match_gateway ───────────────────────────────────

#[tokio::test]
async fn claimed_amount_must_match_gateway() {
    let h = harness();
    h.gateway.put_payment(captured("pay_amt", "order_amt", 1000));

    let err = h
        .state
        .checkout
        .verify_payment(
            verification("pay_amt", "order_amt", "amt@example.com", 1.0),
            &origin(),
        )
        .await
        .unwrap_err();

    match err {
        CheckoutError::AmountMismatch { claimed, actual } => {
            assert_eq!(claimed, 100);
            assert_eq!(actual, 1000);
        }
        other => panic!("expected AmountMismatch, got {other:?}"),
    }
    assert_eq!(h.store.participant_count().await, 0);
}

// ── 5. bad_signature_never_reaches_gateway ─────────────────────────────────

#[tokio::test]
async fn bad_signature_never_reaches_gateway() {
    let h = harness();
    h.gateway.put_payment(captured("pay_sig", "order_sig", 1000));

    let mut req = verification("pay_sig", "order_sig", "sig@example.com", 10.0);
    // Signature for a different order.
    req.signature = sign("order_other", "pay_sig");

    let err = h
        .state
        .checkout
        .verify_payment(req, &origin())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::InvalidSignature));
    assert_eq!(h.gateway.fetches(), 0);
    assert_eq!(h.store.participant_count().await, 0);
}

// ── 6. gateway_outage_is_a_fault ───────────────────────────────────────────

#[tokio::test]
async fn gateway_outage_is_a_fault() {
    let h = harness();
    h.gateway.put_payment(captured("pay_down", "order_down", 1000));
    h.gateway.set_down(true);

    let err = h
        .state
        .checkout
        .verify_payment(
            verification("pay_down", "order_down", "down@example.com", 10.0),
            &origin(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::GatewayUnavailable(_)));
    assert_eq!(err.kind(), ErrorKind::Faulted);
    assert_eq!(h.store.participant_count().await, 0);

    // Client retries once the gateway is back.
    h.gateway.set_down(false);
    h.state
        .checkout
        .verify_payment(
            verification("pay_down", "order_down", "down@example.com", 10.0),
            &origin(),
        )
        .await
        .unwrap();
}

// ── 7. unknown_payment_is_rejected ─────────────────────────────────────────

#[tokio::test]
async fn unknown_payment_is_rejected() {
    let h = harness();

    let err = h
        .state
        .checkout
        .verify_payment(
            verification("pay_ghost", "order_ghost", "ghost@example.com", 10.0),
            &origin(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::PaymentNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::Rejected);
}

// ── 8. create_order_fast_fails_on_known_email ──────────────────────────────

#[tokio::test]
async fn create_order_fast_fails_on_known_email() {
    let h = harness();

    let created = h
        .state
        .checkout
        .create_order(order_request("first@example.com", 10.0))
        .await
        .unwrap();
    assert_eq!(created.order.money.amount().minor(), 1000);
    assert!(created.order.receipt.starts_with("giveaway_"));
    assert_eq!(h.gateway.orders_created(), 1);

    h.gateway.put_payment(captured("pay_first", created.order.id.as_str(), 1000));
    h.state
        .checkout
        .verify_payment(
            verification("pay_first", created.order.id.as_str(), "first@example.com", 10.0),
            &origin(),
        )
        .await
        .unwrap();

    let err = h
        .state
        .checkout
        .create_order(order_request("FIRST@example.com", 25.0))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::EmailAlreadyRegistered));
    assert_eq!(h.gateway.orders_created(), 1, "no order minted for a known email");
}

// ── 9. create_order_validates_amount ───────────────────────────────────────

#[tokio::test]
async fn create_order_validates_amount() {
    let h = harness();

    for amount in [0.5, -3.0, 10.555, f64::NAN] {
        let err = h
            .state
            .checkout
            .create_order(order_request("amount@example.com", amount))
            .await
            .unwrap_err();
        assert!(
            matches!(err, CheckoutError::Validation(_)),
            "amount {amount} should fail validation"
        );
    }
    assert_eq!(h.gateway.orders_created(), 0);
}

// ── 10. email_taken_by_another_payment_is_rejected_at_insert ───────────────

#[tokio::test]
async fn email_taken_by_another_payment_is_rejected_at_insert() {
    let h = harness();
    h.gateway.put_payment(captured("pay_e1", "order_e1", 1000));
    h.gateway.put_payment(captured("pay_e2", "order_e2", 1000));

    h.state
        .checkout
        .verify_payment(verification("pay_e1", "order_e1", "same@example.com", 10.0), &origin())
        .await
        .unwrap();

    let err = h
        .state
        .checkout
        .verify_payment(verification("pay_e2", "order_e2", "same@example.com", 10.0), &origin())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::EmailAlreadyRegistered));
    assert_eq!(h.store.participant_count().await, 1);
    assert_eq!(h.store.transaction_count().await, 1, "orphan transaction removed");
}

// ── 11. transaction_write_fault_leaves_nothing ─────────────────────────────

#[tokio::test]
async fn transaction_write_fault_leaves_nothing() {
    let h = harness();
    h.gateway.put_payment(captured("pay_ft", "order_ft", 1000));
    h.store.inject_fault(FaultPoint::TransactionWrite);

    let err = h
        .state
        .checkout
        .verify_payment(verification("pay_ft", "order_ft", "ft@example.com", 10.0), &origin())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Faulted);
    assert_eq!(h.store.participant_count().await, 0);
    assert_eq!(h.store.transaction_count().await, 0);
}

// ── 12. participant_write_fault_rolls_back_transaction ─────────────────────

#[tokio::test]
async fn participant_write_fault_rolls_back_transaction() {
    let h = harness();
    h.gateway.put_payment(captured("pay_fp", "order_fp", 1000));
    h.store.inject_fault(FaultPoint::ParticipantWrite);

    let req = verification("pay_fp", "order_fp", "fp@example.com", 10.0);
    let err = h
        .state
        .checkout
        .verify_payment(req.clone(), &origin())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Storage(_)));
    assert_eq!(h.store.participant_count().await, 0);
    assert_eq!(h.store.transaction_count().await, 0);

    // Nothing half-written blocks the retry.
    h.state.checkout.verify_payment(req, &origin()).await.unwrap();
    assert_eq!(h.store.participant_count().await, 1);
    assert_eq!(h.store.transaction_count().await, 1);
}

// ── 13. audit_trail_keeps_rejections_and_success ───────────────────────────

#[tokio::test]
async fn audit_trail_keeps_rejections_and_success() {
    let h = harness();
    h.gateway.put_payment(captured("pay_audit", "order_audit", 1000));

    let _ = h
        .state
        .checkout
        .verify_payment(
            verification("pay_audit", "order_audit", "audit@example.com", 20.0),
            &origin(),
        )
        .await
        .unwrap_err();

    let verified = h
        .state
        .checkout
        .verify_payment(
            verification("pay_audit", "order_audit", "audit@example.com", 10.0),
            &origin(),
        )
        .await
        .unwrap();

    let trail = h.store.audit_trail(verified.id).await.unwrap();
    let actions: Vec<&str> = trail.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(trail.len(), 2, "got {actions:?}");
    assert!(actions.contains(&"payment_verified"));
    assert!(actions.contains(&"verification_rejected"));

    let rejected = trail
        .iter()
        .find(|e| e.action == "verification_rejected")
        .unwrap();
    assert_eq!(rejected.detail["reason"], "amount_mismatch");
    assert_eq!(rejected.detail["stage"], "payment_fetched");
    assert_eq!(rejected.ip_address.as_deref(), Some("203.0.113.7"));
}

// ── 14. stats_count_only_completed_entries ─────────────────────────────────

#[tokio::test]
async fn stats_count_only_completed_entries() {
    let h = harness();
    for (i, minor) in [1000, 2550, 500].into_iter().enumerate() {
        let pay = format!("pay_stats_{i}");
        let order = format!("order_stats_{i}");
        h.gateway.put_payment(captured(&pay, &order, minor));
        h.state
            .checkout
            .verify_payment(
                verification(&pay, &order, &format!("stats{i}@example.com"), minor as f64 / 100.0),
                &origin(),
            )
            .await
            .unwrap();
    }

    let s = stats::compute(&*h.store).await.unwrap();
    assert_eq!(s.total_participants, 3);
    assert_eq!(s.total_collected, 40.5);
    assert_eq!(s.average_amount, 13.5);

    let listed = h.store.scan_by_status(PaymentStatus::Completed).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}

// ── 15. foreign_currency_capture_is_rejected ───────────────────────────────
// Same minor amount, different currency: not the entry that was paid for.

#[tokio::test]
async fn foreign_currency_capture_is_rejected() {
    let h = harness();
    let mut record = captured("pay_usd", "order_usd", 1000);
    record.money = Money::new(MoneyAmount::new(1000).unwrap(), Currency::Usd);
    h.gateway.put_payment(record);

    let err = h
        .state
        .checkout
        .verify_payment(
            verification("pay_usd", "order_usd", "usd@example.com", 10.0),
            &origin(),
        )
        .await
        .unwrap_err();

    assert!(
        matches!(err, CheckoutError::CurrencyMismatch { .. }),
        "got {err:?}"
    );
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert_eq!(err.code(), "amount_mismatch");
    assert_eq!(h.store.participant_count().await, 0);
    assert_eq!(h.store.transaction_count().await, 0);
}

// ── 16. dropped_caller_still_records_once ──────────────────────────────────
// The caller gives up right after the callback is accepted. The record still
// lands whole, and a retry sees it as processed.

#[tokio::test]
async fn dropped_caller_still_records_once() {
    let h = harness();
    h.gateway.put_payment(captured("pay_drop", "order_drop", 1000));

    let abandoned = tokio::time::timeout(
        Duration::ZERO,
        h.state.checkout.verify_payment(
            verification("pay_drop", "order_drop", "drop@example.com", 10.0),
            &origin(),
        ),
    )
    .await;
    assert!(abandoned.is_err());

    for _ in 0..100 {
        if h.store.participant_count().await == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(h.store.participant_count().await, 1);
    assert_eq!(h.store.transaction_count().await, 1);

    let err = h
        .state
        .checkout
        .verify_payment(
            verification("pay_drop", "order_drop", "drop@example.com", 10.0),
            &origin(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::PaymentAlreadyProcessed));
}
