use super::record::{normalize_people_field, payload_base, record_to_row, row_to_record, ColumnMap};
use super::task_hazard::{guard_risks, responsible_person};
use super::EntityMapper;
use crate::domain::entities::EntityRow;
use crate::domain::value_objects::EntityKind;
use crate::shared::error::AppError;
use serde_json::Value;

const RISK_ASSESSMENT_COLUMNS: [ColumnMap; 6] = [
    ColumnMap::canonical("title", "scopeOfWork"),
    ColumnMap::same("date"),
    ColumnMap::same("time"),
    ColumnMap::same("location"),
    ColumnMap::same("status"),
    ColumnMap::same("supervisor"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct RiskAssessmentMapper;

impl EntityMapper for RiskAssessmentMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::RiskAssessment
    }

    fn to_local_row(&self, record: &Value, now: i64) -> Result<EntityRow, AppError> {
        record_to_row(record, &RISK_ASSESSMENT_COLUMNS, now)
    }

    fn from_local_row(&self, row: &EntityRow) -> Value {
        row_to_record(row, &RISK_ASSESSMENT_COLUMNS)
    }

    fn to_api_payload(&self, row: &EntityRow) -> Value {
        let mut payload = payload_base(row, &RISK_ASSESSMENT_COLUMNS);
        // risks を持つ評価だけ補正する
        if payload.contains_key("risks") {
            guard_risks(&mut payload, &responsible_person(row));
        }
        normalize_people_field(&mut payload, "assessmentTeam");
        normalize_people_field(&mut payload, "individuals");
        Value::Object(payload)
    }
}
