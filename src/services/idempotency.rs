use crate::domain::{
    error::{StoreError, UniqueField},
    store::ParticipantStore,
};

/// Point lookup on a unique key. Advisory only: the store's unique
/// constraints decide when two requests race past this check.
pub async fn exists(
    store: &dyn ParticipantStore,
    field: UniqueField,
    value: &str,
) -> Result<bool, StoreError> {
    let found = store.find_by_unique_field(field, value).await?;
    if let Some(id) = found {
        tracing::debug!(%field, participant_id = %id, "idempotency key already used");
    }
    Ok(found.is_some())
}
