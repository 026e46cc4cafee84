use super::record::{payload_base, record_to_row, row_to_record, ColumnMap};
use super::EntityMapper;
use crate::domain::entities::EntityRow;
use crate::domain::value_objects::EntityKind;
use crate::shared::error::AppError;
use serde_json::Value;

const APPROVAL_COLUMNS: [ColumnMap; 6] = [
    ColumnMap::canonical("title", "scopeOfWork"),
    ColumnMap::same("date"),
    ColumnMap::same("location"),
    ColumnMap::same("status"),
    ColumnMap::same("supervisor"),
    ColumnMap::renamed("submitted_by", "submittedBy"),
];

/// 承認待ちタスク。サーバーからはタスクハザードと同じ形で届く。
#[derive(Debug, Default, Clone, Copy)]
pub struct ApprovalMapper;

impl EntityMapper for ApprovalMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::Approval
    }

    fn to_local_row(&self, record: &Value, now: i64) -> Result<EntityRow, AppError> {
        record_to_row(record, &APPROVAL_COLUMNS, now)
    }

    fn from_local_row(&self, row: &EntityRow) -> Value {
        row_to_record(row, &APPROVAL_COLUMNS)
    }

    fn to_api_payload(&self, row: &EntityRow) -> Value {
        Value::Object(payload_base(row, &APPROVAL_COLUMNS))
    }
}
