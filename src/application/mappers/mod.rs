pub mod approval;
pub mod asset;
pub mod record;
pub mod risk_assessment;
pub mod task_hazard;
pub mod user;

use crate::domain::entities::EntityRow;
use crate::domain::value_objects::EntityKind;
use crate::shared::error::AppError;
use serde_json::Value;

pub use approval::ApprovalMapper;
pub use asset::AssetMapper;
pub use record::ColumnMap;
pub use risk_assessment::RiskAssessmentMapper;
pub use task_hazard::TaskHazardMapper;
pub use user::UserMapper;

/// サーバー形状とローカル行の相互変換
pub trait EntityMapper: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// サーバー上に存在が確認されたレコードを `synced = 1` の行にする
    fn to_local_row(&self, record: &Value, now: i64) -> Result<EntityRow, AppError>;

    /// 表示・呼び出し元向けの形に戻す。壊れた metadata でも失敗しない。
    fn from_local_row(&self, row: &EntityRow) -> Value;

    /// キューの再送時にサーバーへ送るペイロード
    fn to_api_payload(&self, row: &EntityRow) -> Value;
}
