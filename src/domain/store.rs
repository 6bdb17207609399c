use {
    super::BoxFuture,
    super::audit::{AuditEntry, NewAuditEntry},
    super::error::{StoreError, UniqueField},
    super::participant::{NewParticipant, Participant, PaymentStatus},
    super::transaction::{NewTransaction, Transaction},
    uuid::Uuid,
};

/// Persistence port for participants and their transactions.
///
/// `insert_atomic` is the only mutation of participant data: both rows
/// become visible or neither does. Implementations must enforce uniqueness
/// of email and payment id themselves; a prior `find_by_unique_field` is
/// only a fast-fail.
pub trait ParticipantStore: Send + Sync {
    fn find_by_unique_field<'a>(
        &'a self,
        field: UniqueField,
        value: &'a str,
    ) -> BoxFuture<'a, Result<Option<Uuid>, StoreError>>;

    fn insert_atomic<'a>(
        &'a self,
        participant: &'a NewParticipant,
        transaction: &'a NewTransaction,
        audit: &'a NewAuditEntry,
    ) -> BoxFuture<'a, Result<Uuid, StoreError>>;

    /// Newest first.
    fn scan_by_status(
        &self,
        status: PaymentStatus,
    ) -> BoxFuture<'_, Result<Vec<Participant>, StoreError>>;

    fn participant_detail(
        &self,
        id: Uuid,
    ) -> BoxFuture<'_, Result<Option<(Participant, Option<Transaction>)>, StoreError>>;

    fn append_audit<'a>(&'a self, entry: &'a NewAuditEntry)
    -> BoxFuture<'a, Result<(), StoreError>>;

    /// Entries linked to the participant directly or through its payment id,
    /// newest first.
    fn audit_trail(&self, participant_id: Uuid)
    -> BoxFuture<'_, Result<Vec<AuditEntry>, StoreError>>;

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>>;

    fn close(&self) -> BoxFuture<'_, ()>;
}
