use crate::domain::value_objects::{EntityId, EntityKind, SyncOperation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 同期キューの 1 エントリ。`(entity_type, entity_id)` ごとに高々 1 件。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncQueueEntry {
    pub id: i64,
    pub entity_type: EntityKind,
    pub entity_id: EntityId,
    pub operation: SyncOperation,
    pub data: Value,
    pub retry_count: u32,
    pub created_at: i64,
}

/// まだ採番されていないキューエントリ
#[derive(Debug, Clone, PartialEq)]
pub struct SyncQueueDraft {
    pub entity_type: EntityKind,
    pub entity_id: EntityId,
    pub operation: SyncOperation,
    pub data: Value,
}

impl SyncQueueDraft {
    pub fn new(
        entity_type: EntityKind,
        entity_id: EntityId,
        operation: SyncOperation,
        data: Value,
    ) -> Self {
        Self {
            entity_type,
            entity_id,
            operation,
            data,
        }
    }
}
