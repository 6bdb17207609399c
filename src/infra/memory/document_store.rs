//! In-process document store.
//!
//! Models a document database without multi-document transactions:
//! participants and transactions live in separate collections, each
//! guarded by its own lock and carrying its own unique indexes. Atomicity
//! of the pair comes from a compensating write. The transaction document
//! goes in first (unique on payment id); if the participant write then
//! fails, or the write is abandoned mid-way, the transaction is deleted
//! again.
//!
//! The participant collection sits behind an async lock, so a write can be
//! suspended there. The transaction and audit collections use plain locks
//! that are never held across an await, which lets the compensation run
//! from `Drop`.

use {
    crate::domain::{
        BoxFuture,
        audit::{AuditEntry, NewAuditEntry},
        error::{StoreError, UniqueField},
        participant::{NewParticipant, Participant, PaymentStatus},
        store::ParticipantStore,
        transaction::{NewTransaction, Transaction},
    },
    chrono::Utc,
    std::{
        collections::HashMap,
        sync::{
            MutexGuard, PoisonError,
            atomic::{AtomicBool, Ordering},
        },
    },
    uuid::Uuid,
};

/// Where an injected fault fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    TransactionWrite,
    ParticipantWrite,
}

#[derive(Default)]
struct ParticipantCollection {
    docs: HashMap<Uuid, Participant>,
    by_email: HashMap<String, Uuid>,
    by_payment_id: HashMap<String, Uuid>,
}

#[derive(Default)]
struct TransactionCollection {
    docs: HashMap<Uuid, Transaction>,
    by_payment_id: HashMap<String, Uuid>,
}

/// A poisoned lock only means another writer panicked; the maps are still
/// consistent because every mutation is a single insert or remove pair.
fn lock<T>(m: &std::sync::Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transaction document written but not yet paired with its participant.
/// Deleted on drop unless `keep` was called.
struct PendingTransaction<'a> {
    store: &'a MemoryDocumentStore,
    transaction: &'a NewTransaction,
    kept: bool,
}

impl PendingTransaction<'_> {
    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for PendingTransaction<'_> {
    fn drop(&mut self) {
        if !self.kept {
            self.store.delete_transaction(self.transaction);
            tracing::warn!(
                payment_id = %self.transaction.payment_id(),
                "unpaired transaction document removed"
            );
        }
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    participants: tokio::sync::Mutex<ParticipantCollection>,
    transactions: std::sync::Mutex<TransactionCollection>,
    audit: std::sync::Mutex<Vec<AuditEntry>>,
    fail_transaction_write: AtomicBool,
    fail_participant_write: AtomicBool,
    closed: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next write at `point` fail with `StoreError::Unavailable`.
    pub fn inject_fault(&self, point: FaultPoint) {
        match point {
            FaultPoint::TransactionWrite => self.fail_transaction_write.store(true, Ordering::SeqCst),
            FaultPoint::ParticipantWrite => self.fail_participant_write.store(true, Ordering::SeqCst),
        }
    }

    pub async fn transaction_count(&self) -> usize {
        lock(&self.transactions).docs.len()
    }

    pub async fn participant_count(&self) -> usize {
        self.participants.lock().await.docs.len()
    }

    fn check_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is closed".into()));
        }
        Ok(())
    }

    fn write_transaction<'a>(
        &'a self,
        tx: &'a NewTransaction,
    ) -> Result<PendingTransaction<'a>, StoreError> {
        if self.fail_transaction_write.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected transaction write fault".into()));
        }
        let mut col = lock(&self.transactions);
        if col.by_payment_id.contains_key(tx.payment_id()) {
            return Err(StoreError::UniqueViolation {
                field: UniqueField::PaymentId,
            });
        }
        col.by_payment_id.insert(tx.payment_id().to_string(), tx.id());
        col.docs.insert(tx.id(), tx.to_transaction(Utc::now()));
        Ok(PendingTransaction {
            store: self,
            transaction: tx,
            kept: false,
        })
    }

    fn delete_transaction(&self, tx: &NewTransaction) {
        let mut col = lock(&self.transactions);
        col.docs.remove(&tx.id());
        col.by_payment_id.remove(tx.payment_id());
    }

    async fn write_participant(&self, participant: &NewParticipant) -> Result<(), StoreError> {
        if self.fail_participant_write.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected participant write fault".into()));
        }
        let mut col = self.participants.lock().await;
        if col.by_email.contains_key(participant.email()) {
            return Err(StoreError::UniqueViolation {
                field: UniqueField::Email,
            });
        }
        if col.by_payment_id.contains_key(participant.payment_id().as_str()) {
            return Err(StoreError::UniqueViolation {
                field: UniqueField::PaymentId,
            });
        }
        col.by_email
            .insert(participant.email().to_string(), participant.id());
        col.by_payment_id
            .insert(participant.payment_id().as_str().to_string(), participant.id());
        col.docs.insert(participant.id(), participant.to_participant());
        Ok(())
    }
}

impl ParticipantStore for MemoryDocumentStore {
    fn find_by_unique_field<'a>(
        &'a self,
        field: UniqueField,
        value: &'a str,
    ) -> BoxFuture<'a, Result<Option<Uuid>, StoreError>> {
        Box::pin(async move {
            self.check_open()?;
            let col = self.participants.lock().await;
            let index = match field {
                UniqueField::Email => &col.by_email,
                UniqueField::PaymentId => &col.by_payment_id,
            };
            Ok(index.get(value).copied())
        })
    }

    fn insert_atomic<'a>(
        &'a self,
        participant: &'a NewParticipant,
        transaction: &'a NewTransaction,
        audit: &'a NewAuditEntry,
    ) -> BoxFuture<'a, Result<Uuid, StoreError>> {
        Box::pin(async move {
            self.check_open()?;

            let pending = self.write_transaction(transaction)?;

            if let Err(e) = self.write_participant(participant).await {
                tracing::warn!(
                    payment_id = %participant.payment_id(),
                    error = %e,
                    "participant write failed"
                );
                return Err(e);
            }
            pending.keep();

            lock(&self.audit).push(audit.to_entry(Utc::now()));
            Ok(participant.id())
        })
    }

    fn scan_by_status(
        &self,
        status: PaymentStatus,
    ) -> BoxFuture<'_, Result<Vec<Participant>, StoreError>> {
        Box::pin(async move {
            self.check_open()?;
            let col = self.participants.lock().await;
            let mut rows: Vec<Participant> = col
                .docs
                .values()
                .filter(|p| p.status == status)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(rows)
        })
    }

    fn participant_detail(
        &self,
        id: Uuid,
    ) -> BoxFuture<'_, Result<Option<(Participant, Option<Transaction>)>, StoreError>> {
        Box::pin(async move {
            self.check_open()?;
            let Some(participant) = self.participants.lock().await.docs.get(&id).cloned() else {
                return Ok(None);
            };
            let transaction = lock(&self.transactions)
                .docs
                .values()
                .find(|t| t.participant_id == id)
                .cloned();
            Ok(Some((participant, transaction)))
        })
    }

    fn append_audit<'a>(
        &'a self,
        entry: &'a NewAuditEntry,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.check_open()?;
            lock(&self.audit).push(entry.to_entry(Utc::now()));
            Ok(())
        })
    }

    fn audit_trail(
        &self,
        participant_id: Uuid,
    ) -> BoxFuture<'_, Result<Vec<AuditEntry>, StoreError>> {
        Box::pin(async move {
            self.check_open()?;
            let payment_id = self
                .participants
                .lock()
                .await
                .docs
                .get(&participant_id)
                .map(|p| p.payment_id.clone());

            let mut entries: Vec<AuditEntry> = lock(&self.audit)
                .iter()
                .filter(|e| {
                    e.participant_id == Some(participant_id)
                        || (payment_id.is_some() && e.payment_id == payment_id)
                })
                .cloned()
                .collect();
            entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(entries)
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move { self.check_open() })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.closed.store(true, Ordering::SeqCst);
        })
    }
}
