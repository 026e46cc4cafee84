use super::entity_sync_service::{EntitySyncService, SyncContext};
use crate::application::mappers::UserMapper;
use crate::application::ports::{EntityGateway, ListParams, StoreFilter};
use crate::shared::error::AppError;
use serde_json::Value;
use std::sync::Arc;

/// ユーザー一覧。サーバー側でのみ変更されるため読み取り専用でキューを持たない。
#[derive(Clone)]
pub struct UserService {
    engine: Arc<EntitySyncService>,
}

impl UserService {
    pub fn new(ctx: SyncContext, gateway: Arc<dyn EntityGateway>) -> Self {
        Self {
            engine: Arc::new(EntitySyncService::new(ctx, gateway, Arc::new(UserMapper))),
        }
    }

    pub async fn get_all(&self, params: &ListParams) -> Result<Vec<Value>, AppError> {
        self.engine.get_all(params).await
    }

    pub async fn get_one(&self, id: &str) -> Result<Value, AppError> {
        self.engine.get_one(id).await
    }

    /// キャッシュからメールアドレスで引く（大文字小文字は区別しない）
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Value>, AppError> {
        let normalized = email.trim().to_lowercase();
        if normalized.is_empty() {
            return Ok(None);
        }
        let mut matches = self
            .engine
            .cached_records(Some(StoreFilter::eq("email", normalized)))
            .await?;
        Ok(if matches.is_empty() {
            None
        } else {
            Some(matches.swap_remove(0))
        })
    }
}
