use super::record::{payload_base, record_to_row, row_to_record, ColumnMap};
use super::EntityMapper;
use crate::domain::entities::EntityRow;
use crate::domain::value_objects::EntityKind;
use crate::shared::error::AppError;
use serde_json::Value;

const USER_COLUMNS: [ColumnMap; 4] = [
    ColumnMap::same("email"),
    ColumnMap::same("name"),
    ColumnMap::same("role"),
    ColumnMap::same("status"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct UserMapper;

impl EntityMapper for UserMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::User
    }

    fn to_local_row(&self, record: &Value, now: i64) -> Result<EntityRow, AppError> {
        let mut row = record_to_row(record, &USER_COLUMNS, now)?;
        // ローカル検索は小文字で一致させる
        if let Some(Value::String(email)) = row.columns.get_mut("email") {
            *email = email.trim().to_lowercase();
        }
        Ok(row)
    }

    fn from_local_row(&self, row: &EntityRow) -> Value {
        row_to_record(row, &USER_COLUMNS)
    }

    fn to_api_payload(&self, row: &EntityRow) -> Value {
        let mut payload = payload_base(row, &USER_COLUMNS);
        payload.remove("password");
        Value::Object(payload)
    }
}
