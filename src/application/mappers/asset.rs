use super::record::{payload_base, record_to_row, row_to_record, ColumnMap};
use super::EntityMapper;
use crate::domain::entities::EntityRow;
use crate::domain::value_objects::EntityKind;
use crate::shared::error::AppError;
use serde_json::Value;

const ASSET_COLUMNS: [ColumnMap; 5] = [
    ColumnMap::same("name"),
    ColumnMap::same("code"),
    ColumnMap::renamed("parent_id", "parentId"),
    ColumnMap::same("level"),
    ColumnMap::same("status"),
];

const CHILDREN_FIELD: &str = "children";

#[derive(Debug, Default, Clone, Copy)]
pub struct AssetMapper;

impl AssetMapper {
    /// 入れ子の `children` を親 ID 付きのフラットな一覧に展開する（親が先）
    pub fn flatten_tree(records: &[Value]) -> Vec<Value> {
        let mut flat = Vec::with_capacity(records.len());
        for record in records {
            push_with_children(record.clone(), None, &mut flat);
        }
        flat
    }
}

fn push_with_children(mut record: Value, parent_id: Option<Value>, out: &mut Vec<Value>) {
    let children = match record.as_object_mut() {
        Some(map) => {
            if let Some(parent) = parent_id {
                let missing = map.get("parentId").map_or(true, Value::is_null);
                if missing {
                    map.insert("parentId".to_string(), parent);
                }
            }
            match map.remove(CHILDREN_FIELD) {
                Some(Value::Array(children)) => children,
                _ => Vec::new(),
            }
        }
        None => return,
    };
    let own_id = record.get("id").cloned();
    out.push(record);
    for child in children {
        push_with_children(child, own_id.clone(), out);
    }
}

impl EntityMapper for AssetMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::Asset
    }

    fn to_local_row(&self, record: &Value, now: i64) -> Result<EntityRow, AppError> {
        let mut row = record_to_row(record, &ASSET_COLUMNS, now)?;
        row.metadata.remove(CHILDREN_FIELD);
        // 親参照は id 列と同じ文字列で保持する
        if let Some(Value::Number(n)) = row.columns.get("parent_id") {
            let text = n.to_string();
            row.columns.insert("parent_id".to_string(), Value::String(text));
        }
        Ok(row)
    }

    fn from_local_row(&self, row: &EntityRow) -> Value {
        row_to_record(row, &ASSET_COLUMNS)
    }

    fn to_api_payload(&self, row: &EntityRow) -> Value {
        Value::Object(payload_base(row, &ASSET_COLUMNS))
    }
}
