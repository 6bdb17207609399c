use {
    crate::domain::{
        audit::{AuditEntry, NewAuditEntry},
        error::StoreError,
    },
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

pub async fn insert_audit_entry(
    conn: &mut sqlx::PgConnection,
    entry: &NewAuditEntry,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (id, participant_id, payment_id, action, detail, ip_address, user_agent)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(entry.id)
    .bind(entry.participant_id)
    .bind(entry.payment_id.as_deref())
    .bind(&entry.action)
    .bind(&entry.detail)
    .bind(entry.ip_address.as_deref())
    .bind(entry.user_agent.as_deref())
    .execute(conn)
    .await?;

    Ok(())
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    participant_id: Option<Uuid>,
    payment_id: Option<String>,
    action: String,
    detail: serde_json::Value,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

/// Entries tied to the participant row or to its payment id.
pub async fn audit_trail(
    pool: &sqlx::PgPool,
    participant_id: Uuid,
) -> Result<Vec<AuditEntry>, StoreError> {
    let rows = sqlx::query_as::<_, AuditRow>(
        r#"
        SELECT a.id, a.participant_id, a.payment_id, a.action, a.detail,
               a.ip_address, a.user_agent, a.created_at
        FROM audit_log a
        WHERE a.participant_id = $1
           OR a.payment_id = (SELECT payment_id FROM participants WHERE id = $1)
        ORDER BY a.created_at DESC, a.id DESC
        "#,
    )
    .bind(participant_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| AuditEntry {
            id: r.id,
            participant_id: r.participant_id,
            payment_id: r.payment_id,
            action: r.action,
            detail: r.detail,
            ip_address: r.ip_address,
            user_agent: r.user_agent,
            created_at: r.created_at,
        })
        .collect())
}
