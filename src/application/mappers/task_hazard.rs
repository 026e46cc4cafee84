use super::record::{normalize_people_field, payload_base, record_to_row, row_to_record, ColumnMap};
use super::EntityMapper;
use crate::domain::entities::EntityRow;
use crate::domain::value_objects::EntityKind;
use crate::shared::error::AppError;
use serde_json::{json, Map, Value};

pub(crate) const TASK_COLUMNS: [ColumnMap; 6] = [
    ColumnMap::canonical("title", "scopeOfWork"),
    ColumnMap::same("date"),
    ColumnMap::same("time"),
    ColumnMap::same("location"),
    ColumnMap::same("status"),
    ColumnMap::same("supervisor"),
];

pub const PLACEHOLDER_RISK_DESCRIPTION: &str = "No hazards specified";
pub const UNASSIGNED_PERSON: &str = "Not assigned";
const MIN_RATING: i64 = 1;
const RATING_FIELDS: [&str; 4] = [
    "asIsLikelihood",
    "asIsConsequence",
    "mitigatedLikelihood",
    "mitigatedConsequence",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct TaskHazardMapper;

impl EntityMapper for TaskHazardMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::TaskHazard
    }

    fn to_local_row(&self, record: &Value, now: i64) -> Result<EntityRow, AppError> {
        record_to_row(record, &TASK_COLUMNS, now)
    }

    fn from_local_row(&self, row: &EntityRow) -> Value {
        row_to_record(row, &TASK_COLUMNS)
    }

    fn to_api_payload(&self, row: &EntityRow) -> Value {
        let mut payload = payload_base(row, &TASK_COLUMNS);
        let responsible = responsible_person(row);
        guard_risks(&mut payload, &responsible);
        normalize_people_field(&mut payload, "individual");
        Value::Object(payload)
    }
}

/// supervisor 列 → metadata の supervisor → "Not assigned"
pub(crate) fn responsible_person(row: &EntityRow) -> String {
    [
        row.columns.get("supervisor"),
        row.metadata.get("supervisor"),
    ]
    .into_iter()
    .flatten()
    .filter_map(Value::as_str)
    .map(str::trim)
    .find(|s| !s.is_empty())
    .unwrap_or(UNASSIGNED_PERSON)
    .to_string()
}

/// risks が空ならプレースホルダーを 1 件入れる。
/// 既存の各リスクは評価値を 1 以上にし、担当者が空なら埋める。
pub(crate) fn guard_risks(payload: &mut Map<String, Value>, responsible: &str) {
    let mut risks = match payload.remove("risks") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    risks.retain(Value::is_object);

    if risks.is_empty() {
        risks.push(placeholder_risk(responsible));
    } else {
        for risk in risks.iter_mut() {
            if let Value::Object(map) = risk {
                for field in RATING_FIELDS {
                    let rating = map.get(field).and_then(rating_value).unwrap_or(MIN_RATING);
                    map.insert(field.to_string(), json!(rating.max(MIN_RATING)));
                }
                let missing_person = map
                    .get("responsiblePerson")
                    .and_then(Value::as_str)
                    .map_or(true, |s| s.trim().is_empty());
                if missing_person {
                    map.insert("responsiblePerson".to_string(), json!(responsible));
                }
            }
        }
    }
    payload.insert("risks".to_string(), Value::Array(risks));
}

fn rating_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn placeholder_risk(responsible: &str) -> Value {
    json!({
        "riskDescription": PLACEHOLDER_RISK_DESCRIPTION,
        "riskType": "Other",
        "asIsLikelihood": MIN_RATING,
        "asIsConsequence": MIN_RATING,
        "mitigatingAction": "",
        "mitigatedLikelihood": MIN_RATING,
        "mitigatedConsequence": MIN_RATING,
        "responsiblePerson": responsible,
        "requiresSupervisorSignature": false,
    })
}
