use serde_json::Value;

/// 変更系操作の戻り値。
///
/// オフラインでキューに積んだ場合も成功と同じ形で返し、呼び出し側は
/// `offline` / `pending_sync` を見て「オフラインで保存しました」と案内する。
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub record: Value,
    pub offline: bool,
    pub pending_sync: bool,
}

impl MutationOutcome {
    pub fn synced(record: Value) -> Self {
        Self {
            record,
            offline: false,
            pending_sync: false,
        }
    }

    pub fn queued(mut record: Value) -> Self {
        if let Value::Object(map) = &mut record {
            map.insert("_offline".to_string(), Value::Bool(true));
            map.insert("_pendingSync".to_string(), Value::Bool(true));
        }
        Self {
            record,
            offline: true,
            pending_sync: true,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.record.get("id").and_then(Value::as_str)
    }

    pub fn into_record(self) -> Value {
        self.record
    }
}
