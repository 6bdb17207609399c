use {
    crate::domain::{
        error::{StoreError, UniqueField},
        money::{Currency, MoneyAmount},
        participant::{NewParticipant, Participant, PaymentStatus},
        transaction::{NewTransaction, Transaction},
    },
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

/// Maps a Postgres unique violation to the key it guards.
pub fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let field = match db.constraint() {
                Some("participants_email_unique") => Some(UniqueField::Email),
                Some("participants_payment_id_unique")
                | Some("transactions_payment_id_unique") => Some(UniqueField::PaymentId),
                _ => None,
            };
            if let Some(field) = field {
                return StoreError::UniqueViolation { field };
            }
        }
    }
    StoreError::Database(err)
}

pub async fn find_by_unique_field(
    conn: &mut sqlx::PgConnection,
    field: UniqueField,
    value: &str,
) -> Result<Option<Uuid>, StoreError> {
    let sql = match field {
        UniqueField::Email => "SELECT id FROM participants WHERE email = $1",
        UniqueField::PaymentId => "SELECT id FROM participants WHERE payment_id = $1",
    };
    let id = sqlx::query_scalar::<_, Uuid>(sql)
        .bind(value)
        .fetch_optional(conn)
        .await?;
    Ok(id)
}

pub async fn insert_participant(
    conn: &mut sqlx::PgConnection,
    p: &NewParticipant,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO participants
            (id, name, email, phone, amount, status, payment_id, order_id,
             signature, data_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
        "#,
    )
    .bind(p.id())
    .bind(p.name())
    .bind(p.email())
    .bind(p.phone())
    .bind(p.amount().minor())
    .bind(p.status().as_str())
    .bind(p.payment_id().as_str())
    .bind(p.order_id().as_str())
    .bind(p.signature())
    .bind(p.data_hash())
    .bind(p.created_at())
    .execute(conn)
    .await
    .map_err(map_unique_violation)?;
    Ok(())
}

pub async fn insert_transaction(
    conn: &mut sqlx::PgConnection,
    t: &NewTransaction,
) -> Result<(), StoreError> {
    let record = t.record();
    sqlx::query(
        r#"
        INSERT INTO transactions
            (id, participant_id, payment_id, order_id, amount, currency, status,
             method, bank_reference, wallet, vpa, email, contact, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(t.id())
    .bind(t.participant_id())
    .bind(t.payment_id())
    .bind(t.order_id())
    .bind(t.amount().minor())
    .bind(t.currency().as_str())
    .bind(t.status())
    .bind(record.method.as_deref())
    .bind(record.bank_reference.as_deref())
    .bind(record.wallet.as_deref())
    .bind(record.vpa.as_deref())
    .bind(record.email.as_deref())
    .bind(record.contact.as_deref())
    .bind(&record.notes)
    .execute(conn)
    .await
    .map_err(map_unique_violation)?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct ParticipantRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    amount: i64,
    status: String,
    payment_id: String,
    order_id: String,
    signature: String,
    data_hash: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = StoreError;

    fn try_from(r: ParticipantRow) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::domain::error::CheckoutError| {
            StoreError::CorruptRow(format!("participant {}: {e}", r.id))
        };
        Ok(Participant {
            id: r.id,
            amount: MoneyAmount::new(r.amount).map_err(corrupt)?,
            status: PaymentStatus::try_from(r.status.as_str()).map_err(corrupt)?,
            name: r.name,
            email: r.email,
            phone: r.phone,
            payment_id: r.payment_id,
            order_id: r.order_id,
            signature: r.signature,
            data_hash: r.data_hash,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

const PARTICIPANT_COLUMNS: &str = "id, name, email, phone, amount, status, payment_id, order_id, \
     signature, data_hash, created_at, updated_at";

pub async fn scan_by_status(
    pool: &sqlx::PgPool,
    status: PaymentStatus,
) -> Result<Vec<Participant>, StoreError> {
    let sql = format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE status = $1 \
         ORDER BY created_at DESC, id DESC"
    );
    sqlx::query_as::<_, ParticipantRow>(&sql)
        .bind(status.as_str())
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Participant::try_from)
        .collect()
}

pub async fn get_participant(
    pool: &sqlx::PgPool,
    id: Uuid,
) -> Result<Option<Participant>, StoreError> {
    let sql = format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1");
    sqlx::query_as::<_, ParticipantRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Participant::try_from)
        .transpose()
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    participant_id: Uuid,
    payment_id: String,
    order_id: String,
    amount: i64,
    currency: String,
    status: String,
    method: Option<String>,
    bank_reference: Option<String>,
    wallet: Option<String>,
    vpa: Option<String>,
    email: Option<String>,
    contact: Option<String>,
    notes: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(r: TransactionRow) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::domain::error::CheckoutError| {
            StoreError::CorruptRow(format!("transaction {}: {e}", r.id))
        };
        Ok(Transaction {
            id: r.id,
            amount: MoneyAmount::new(r.amount).map_err(corrupt)?,
            currency: Currency::try_from(r.currency.as_str()).map_err(corrupt)?,
            participant_id: r.participant_id,
            payment_id: r.payment_id,
            order_id: r.order_id,
            status: r.status,
            method: r.method,
            bank_reference: r.bank_reference,
            wallet: r.wallet,
            vpa: r.vpa,
            email: r.email,
            contact: r.contact,
            notes: r.notes,
            created_at: r.created_at,
        })
    }
}

pub async fn transaction_for_participant(
    pool: &sqlx::PgPool,
    participant_id: Uuid,
) -> Result<Option<Transaction>, StoreError> {
    sqlx::query_as::<_, TransactionRow>(
        r#"
        SELECT id, participant_id, payment_id, order_id, amount, currency, status,
               method, bank_reference, wallet, vpa, email, contact, notes, created_at
        FROM transactions WHERE participant_id = $1
        "#,
    )
    .bind(participant_id)
    .fetch_optional(pool)
    .await?
    .map(Transaction::try_from)
    .transpose()
}
