use {
    crate::domain::{
        audit::{NewAuditEntry, RequestOrigin},
        error::CheckoutError,
        gateway::PaymentRecord,
        participant::NewParticipant,
        store::ParticipantStore,
        transaction::NewTransaction,
    },
    uuid::Uuid,
};

/// Audit entry stored in the same unit of work as the participant.
pub fn verified_audit(
    participant: &NewParticipant,
    transaction: &NewTransaction,
    origin: &RequestOrigin,
) -> NewAuditEntry {
    let mut audit = NewAuditEntry::new(
        "payment_verified",
        serde_json::json!({
            "order_id": participant.order_id().as_str(),
            "amount": transaction.amount().minor(),
            "currency": transaction.currency().as_str(),
            "method": transaction.record().method,
        }),
    );
    audit.participant_id = Some(participant.id());
    audit.payment_id = Some(participant.payment_id().as_str().to_string());
    audit.ip_address = origin.ip_address.clone();
    audit.user_agent = origin.user_agent.clone();
    audit
}

/// Writes the participant and its transaction as one unit. A unique
/// violation surfaces as the matching rejection, anything else as a fault.
pub async fn record(
    store: &dyn ParticipantStore,
    participant: &NewParticipant,
    record: PaymentRecord,
    origin: &RequestOrigin,
) -> Result<Uuid, CheckoutError> {
    let transaction =
        NewTransaction::from_record(participant.id(), participant.order_id().as_str(), record);
    let audit = verified_audit(participant, &transaction, origin);

    let id = store
        .insert_atomic(participant, &transaction, &audit)
        .await?;

    tracing::info!(
        participant_id = %id,
        payment_id = %participant.payment_id(),
        amount = %transaction.amount(),
        "participant recorded"
    );
    Ok(id)
}
