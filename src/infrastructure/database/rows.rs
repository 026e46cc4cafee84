use crate::domain::entities::SyncQueueEntry;
use crate::domain::value_objects::EntityId;
use crate::shared::error::AppError;
use serde_json::Value;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct SyncQueueRow {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: String,
    pub operation: String,
    pub data: String,
    pub retry_count: i64,
    pub created_at: i64,
}

impl TryFrom<SyncQueueRow> for SyncQueueEntry {
    type Error = AppError;

    fn try_from(row: SyncQueueRow) -> Result<Self, Self::Error> {
        let data = if row.data.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&row.data)
                .map_err(|err| AppError::DeserializationError(err.to_string()))?
        };
        Ok(SyncQueueEntry {
            id: row.id,
            entity_type: row.entity_type.parse().map_err(AppError::DeserializationError)?,
            entity_id: EntityId::new(row.entity_id).map_err(AppError::DeserializationError)?,
            operation: row.operation.parse().map_err(AppError::DeserializationError)?,
            data,
            retry_count: u32::try_from(row.retry_count).unwrap_or(0),
            created_at: row.created_at,
        })
    }
}
