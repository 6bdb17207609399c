use {
    super::{audit_repo, participant_repo},
    crate::domain::{
        BoxFuture,
        audit::{AuditEntry, NewAuditEntry},
        error::{StoreError, UniqueField},
        participant::{NewParticipant, Participant, PaymentStatus},
        store::ParticipantStore,
        transaction::{NewTransaction, Transaction},
    },
    sqlx::{PgPool, postgres::PgPoolOptions},
    std::time::Duration,
    uuid::Uuid,
};

/// Relational backend. Every participant write is one database transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and brings the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))?;

        Ok(Self { pool })
    }

    async fn insert_atomic_inner(
        &self,
        participant: &NewParticipant,
        transaction: &NewTransaction,
        audit: &NewAuditEntry,
    ) -> Result<Uuid, StoreError> {
        // Dropping `tx` without commit rolls everything back.
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET LOCAL lock_timeout = '5s'")
            .execute(&mut *tx)
            .await?;

        // Serialize concurrent writers for the same payment id.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(participant.payment_id().as_str())
            .execute(&mut *tx)
            .await?;

        if participant_repo::find_by_unique_field(
            &mut tx,
            UniqueField::PaymentId,
            participant.payment_id().as_str(),
        )
        .await?
        .is_some()
        {
            return Err(StoreError::UniqueViolation {
                field: UniqueField::PaymentId,
            });
        }

        participant_repo::insert_participant(&mut tx, participant).await?;
        participant_repo::insert_transaction(&mut tx, transaction).await?;
        audit_repo::insert_audit_entry(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(participant.id())
    }
}

impl ParticipantStore for PgStore {
    fn find_by_unique_field<'a>(
        &'a self,
        field: UniqueField,
        value: &'a str,
    ) -> BoxFuture<'a, Result<Option<Uuid>, StoreError>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await?;
            participant_repo::find_by_unique_field(&mut conn, field, value).await
        })
    }

    fn insert_atomic<'a>(
        &'a self,
        participant: &'a NewParticipant,
        transaction: &'a NewTransaction,
        audit: &'a NewAuditEntry,
    ) -> BoxFuture<'a, Result<Uuid, StoreError>> {
        Box::pin(self.insert_atomic_inner(participant, transaction, audit))
    }

    fn scan_by_status(
        &self,
        status: PaymentStatus,
    ) -> BoxFuture<'_, Result<Vec<Participant>, StoreError>> {
        Box::pin(participant_repo::scan_by_status(&self.pool, status))
    }

    fn participant_detail(
        &self,
        id: Uuid,
    ) -> BoxFuture<'_, Result<Option<(Participant, Option<Transaction>)>, StoreError>> {
        Box::pin(async move {
            let Some(participant) = participant_repo::get_participant(&self.pool, id).await? else {
                return Ok(None);
            };
            let transaction = participant_repo::transaction_for_participant(&self.pool, id).await?;
            Ok(Some((participant, transaction)))
        })
    }

    fn append_audit<'a>(
        &'a self,
        entry: &'a NewAuditEntry,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await?;
            audit_repo::insert_audit_entry(&mut conn, entry).await
        })
    }

    fn audit_trail(
        &self,
        participant_id: Uuid,
    ) -> BoxFuture<'_, Result<Vec<AuditEntry>, StoreError>> {
        Box::pin(audit_repo::audit_trail(&self.pool, participant_id))
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.pool.close().await;
            tracing::info!("database pool closed");
        })
    }
}
