use crate::domain::value_objects::EntityKind;
use serde::{Deserialize, Serialize};

pub const SYNC_IN_PROGRESS_MESSAGE: &str = "Sync already in progress";

/// 1 回の同期パスの結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub entity_type: EntityKind,
    pub synced: u32,
    pub failed: u32,
    pub dropped: u32,
    pub pending: u32,
    pub skipped: bool,
    pub message: String,
}

impl SyncReport {
    pub fn new(entity_type: EntityKind, synced: u32, failed: u32, dropped: u32, pending: u32) -> Self {
        let message = if failed == 0 && dropped == 0 {
            format!("Synced {synced} {}", entity_type.label())
        } else {
            format!(
                "Synced {synced} {}, {failed} failed, {dropped} dropped",
                entity_type.label()
            )
        };
        Self {
            entity_type,
            synced,
            failed,
            dropped,
            pending,
            skipped: false,
            message,
        }
    }

    pub fn already_running(entity_type: EntityKind) -> Self {
        Self::skipped(entity_type, SYNC_IN_PROGRESS_MESSAGE)
    }

    pub fn skipped(entity_type: EntityKind, message: impl Into<String>) -> Self {
        Self {
            entity_type,
            synced: 0,
            failed: 0,
            dropped: 0,
            pending: 0,
            skipped: true,
            message: message.into(),
        }
    }
}
