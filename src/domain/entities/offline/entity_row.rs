use crate::domain::value_objects::EntityId;
use crate::shared::error::AppError;
use serde_json::{Map, Value};
use tracing::warn;

/// ローカルストアの 1 行。列名 → 値。
pub type StoreRow = Map<String, Value>;

/// サーバー確認待ちの削除を表す予約ステータス
pub const TOMBSTONE_STATUS: &str = "deleted";

/// サーバーのコピーを持たないまま部分更新だけが書かれた行の印（metadata のキー）
pub const PARTIAL_MARKER: &str = "_partial";

/// 各ドメインテーブル共通の行形状。
///
/// `columns` はテーブルが第一級の列として持つスカラー値、`metadata` はそれ以外の
/// サーバー側フィールドをすべて保持する。ローカルスキーマがサーバーに追いついて
/// いなくてもフィールドを落とさないためのもの。
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRow {
    pub id: EntityId,
    pub columns: Map<String, Value>,
    pub metadata: Map<String, Value>,
    pub synced: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl EntityRow {
    pub fn new(
        id: EntityId,
        columns: Map<String, Value>,
        metadata: Map<String, Value>,
        synced: bool,
        now: i64,
    ) -> Self {
        Self {
            id,
            columns,
            metadata,
            synced,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.columns.get("status").and_then(Value::as_str)
    }

    pub fn is_tombstone(&self) -> bool {
        self.status() == Some(TOMBSTONE_STATUS)
    }

    pub fn mark_tombstone(&mut self, now: i64) {
        self.columns.insert(
            "status".to_string(),
            Value::String(TOMBSTONE_STATUS.to_string()),
        );
        self.synced = false;
        self.updated_at = now;
    }

    pub fn is_partial(&self) -> bool {
        self.metadata
            .get(PARTIAL_MARKER)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn mark_partial(&mut self) {
        self.metadata
            .insert(PARTIAL_MARKER.to_string(), Value::Bool(true));
    }

    pub fn to_store_row(&self) -> Result<StoreRow, AppError> {
        let mut row = self.columns.clone();
        row.insert("id".to_string(), Value::String(self.id.to_string()));
        row.insert(
            "metadata".to_string(),
            Value::String(serde_json::to_string(&self.metadata)?),
        );
        row.insert("synced".to_string(), Value::from(i64::from(self.synced)));
        row.insert("created_at".to_string(), Value::from(self.created_at));
        row.insert("updated_at".to_string(), Value::from(self.updated_at));
        Ok(row)
    }

    /// ストアの行から復元する。壊れた `metadata` は空オブジェクトに置き換えて警告のみ出す。
    pub fn from_store_row(mut row: StoreRow) -> Result<Self, AppError> {
        let id = match row.remove("id") {
            Some(Value::String(id)) => EntityId::new(id).map_err(AppError::DeserializationError)?,
            Some(Value::Number(n)) => {
                EntityId::new(n.to_string()).map_err(AppError::DeserializationError)?
            }
            _ => {
                return Err(AppError::DeserializationError(
                    "Local row has no id".to_string(),
                ))
            }
        };
        let metadata = parse_metadata(id.as_str(), row.remove("metadata"));
        let synced = match row.remove("synced") {
            Some(Value::Bool(flag)) => flag,
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
            _ => false,
        };
        let created_at = row.remove("created_at").and_then(|v| v.as_i64()).unwrap_or(0);
        let updated_at = row
            .remove("updated_at")
            .and_then(|v| v.as_i64())
            .unwrap_or(created_at);

        Ok(Self {
            id,
            columns: row,
            metadata,
            synced,
            created_at,
            updated_at,
        })
    }
}

fn parse_metadata(id: &str, raw: Option<Value>) -> Map<String, Value> {
    match raw {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(Value::String(text)) if text.trim().is_empty() => Map::new(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!(
                    target: "offline::store",
                    id,
                    "metadata blob is not a JSON object, substituting empty object"
                );
                Map::new()
            }
            Err(err) => {
                warn!(
                    target: "offline::store",
                    id,
                    error = %err,
                    "failed to parse metadata blob, substituting empty object"
                );
                Map::new()
            }
        },
        Some(other) => {
            warn!(
                target: "offline::store",
                id,
                kind = ?other,
                "unexpected metadata value, substituting empty object"
            );
            Map::new()
        }
    }
}
