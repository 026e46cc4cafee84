use crate::domain::value_objects::ApprovalDecision;
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// 一覧取得のクエリパラメータ。空なら「トップレベルの全件取得」。
pub type ListParams = BTreeMap<String, String>;

/// ドメインごとの REST エンドポイント。
///
/// エラーは境界で `AppError::AuthExpired` / `AppError::Network` / `AppError::Api` に
/// 分類済みで返ること。
#[async_trait]
pub trait EntityGateway: Send + Sync {
    async fn create(&self, payload: &Value) -> Result<Value, AppError>;
    async fn get_all(&self, params: &ListParams) -> Result<Vec<Value>, AppError>;
    async fn get_one(&self, id: &str) -> Result<Value, AppError>;
    async fn update(&self, id: &str, payload: &Value) -> Result<Value, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait ApprovalGateway: Send + Sync {
    /// 承認待ち一覧（レスポンスの `data.taskHazards`）
    async fn get_approvals(&self, params: &ListParams) -> Result<Vec<Value>, AppError>;

    async fn process_approval(
        &self,
        id: &str,
        decision: &ApprovalDecision,
    ) -> Result<Value, AppError>;
}
