use crate::domain::entities::EntityRow;
use crate::domain::value_objects::EntityId;
use crate::shared::error::AppError;
use serde_json::{Map, Value};

/// ローカル列とサーバー側フィールドの対応
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub column: &'static str,
    pub field: &'static str,
    /// true の場合、復元時に列の値を metadata より優先する
    pub canonical: bool,
}

impl ColumnMap {
    pub const fn same(name: &'static str) -> Self {
        Self {
            column: name,
            field: name,
            canonical: false,
        }
    }

    pub const fn renamed(column: &'static str, field: &'static str) -> Self {
        Self {
            column,
            field,
            canonical: false,
        }
    }

    pub const fn canonical(column: &'static str, field: &'static str) -> Self {
        Self {
            column,
            field,
            canonical: true,
        }
    }
}

/// 表示用に付与するローカル専用フラグ。サーバーへは送らない。
pub const PENDING_SYNC_FIELD: &str = "_pendingSync";
pub const OFFLINE_FIELD: &str = "_offline";

pub fn record_id(record: &Value) -> Result<EntityId, AppError> {
    match record.get("id") {
        Some(Value::String(id)) => EntityId::new(id.as_str()).map_err(AppError::ValidationError),
        Some(Value::Number(n)) => EntityId::new(n.to_string()).map_err(AppError::ValidationError),
        _ => Err(AppError::ValidationError(
            "Server record has no id".to_string(),
        )),
    }
}

/// サーバーレコードを行に変換する。`id` 以外の全フィールドは metadata にも残す。
pub fn record_to_row(
    record: &Value,
    columns: &[ColumnMap],
    now: i64,
) -> Result<EntityRow, AppError> {
    let object = record.as_object().ok_or_else(|| {
        AppError::ValidationError("Server record must be a JSON object".to_string())
    })?;
    let id = record_id(record)?;

    let mut values = Map::new();
    for map in columns {
        match object.get(map.field) {
            Some(value @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
                values.insert(map.column.to_string(), value.clone());
            }
            Some(Value::Null) => {
                values.insert(map.column.to_string(), Value::Null);
            }
            _ => {}
        }
    }

    let metadata = object
        .iter()
        .filter(|(key, _)| key.as_str() != "id" && !key.starts_with('_'))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(EntityRow::new(id, values, metadata, true, now))
}

/// 行をサーバー形状に戻す。metadata を土台に列の値を重ねる。
pub fn row_to_record(row: &EntityRow, columns: &[ColumnMap]) -> Value {
    let mut record = row.metadata.clone();
    for map in columns {
        let Some(value) = row.columns.get(map.column) else {
            continue;
        };
        if map.canonical || !record.contains_key(map.field) {
            record.insert(map.field.to_string(), value.clone());
        }
    }
    record.insert("id".to_string(), Value::String(row.id.to_string()));
    if !row.synced {
        record.insert(PENDING_SYNC_FIELD.to_string(), Value::Bool(true));
    }
    Value::Object(record)
}

/// 送信用に `id` とローカル専用フラグを取り除いたオブジェクト
pub fn payload_base(row: &EntityRow, columns: &[ColumnMap]) -> Map<String, Value> {
    match row_to_record(row, columns) {
        Value::Object(mut map) => {
            map.remove("id");
            map.retain(|key, _| !key.starts_with('_'));
            map
        }
        _ => Map::new(),
    }
}

/// 人の一覧を `a@x, b@y` 形式の 1 文字列に揃える。
///
/// 配列要素がオブジェクトなら `email`、`name`、`value` の順で最初に見つかった値を使う。
pub fn join_people(value: &Value) -> Value {
    match value {
        Value::Array(items) => {
            let names: Vec<String> = items.iter().filter_map(person_label).collect();
            Value::String(names.join(", "))
        }
        Value::Null => Value::String(String::new()),
        other => other.clone(),
    }
}

fn person_label(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Object(map) => ["email", "name", "value"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn normalize_people_field(payload: &mut Map<String, Value>, field: &str) {
    if let Some(value) = payload.get(field) {
        let joined = join_people(value);
        payload.insert(field.to_string(), joined);
    }
}
