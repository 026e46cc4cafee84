use super::entity_sync_service::{EntitySyncService, SyncContext};
use super::sync_service::SyncParticipant;
use crate::application::mappers::AssetMapper;
use crate::application::ports::{EntityGateway, ListParams, StoreFilter};
use crate::domain::entities::{MutationOutcome, SyncReport};
use crate::shared::error::AppError;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// 設備階層（サイト → エリア → 機器）
#[derive(Clone)]
pub struct AssetService {
    engine: Arc<EntitySyncService>,
}

impl AssetService {
    pub fn new(ctx: SyncContext, gateway: Arc<dyn EntityGateway>) -> Self {
        Self {
            engine: Arc::new(EntitySyncService::new(ctx, gateway, Arc::new(AssetMapper))),
        }
    }

    /// 一覧はツリーで返ることがあるため、展開してからキャッシュする
    pub async fn get_all(&self, params: &ListParams) -> Result<Vec<Value>, AppError> {
        let fetched = self
            .engine
            .fetch_all(params)
            .await
            .map(|records| AssetMapper::flatten_tree(&records));
        self.engine.resolve_listing(fetched, params).await
    }

    /// ツリー全体を一括でキャッシュする。親が欠けた行は親参照を外して残す。
    pub async fn cache_hierarchy(
        &self,
        tree: &[Value],
        clear_existing: bool,
    ) -> Result<usize, AppError> {
        let flat = AssetMapper::flatten_tree(tree);
        let cached = self.engine.cache_records(&flat, clear_existing).await?;
        debug!(target: "offline::store", cached, "cached asset hierarchy");
        Ok(cached)
    }

    /// キャッシュから直下の子を返す。`None` ならトップレベル。
    pub async fn get_children(&self, parent_id: Option<&str>) -> Result<Vec<Value>, AppError> {
        let filter = match parent_id {
            Some(parent) => StoreFilter::eq("parent_id", parent),
            None => StoreFilter::new("parent_id IS NULL", Vec::new()),
        };
        self.engine.cached_records(Some(filter)).await
    }

    pub async fn get_one(&self, id: &str) -> Result<Value, AppError> {
        self.engine.get_one(id).await
    }

    pub async fn create(&self, payload: &Value) -> Result<MutationOutcome, AppError> {
        self.engine.create(payload).await
    }

    pub async fn update(&self, id: &str, payload: &Value) -> Result<MutationOutcome, AppError> {
        self.engine.update(id, payload).await
    }

    pub async fn delete(&self, id: &str) -> Result<MutationOutcome, AppError> {
        self.engine.delete(id).await
    }

    pub async fn sync_pending(&self) -> Result<SyncReport, AppError> {
        self.engine.sync_pending().await
    }

    pub async fn check_and_sync(&self) -> Result<Option<SyncReport>, AppError> {
        self.engine.check_and_sync().await
    }

    pub async fn pending_count(&self) -> Result<u32, AppError> {
        self.engine.pending_count().await
    }

    pub fn participant(&self) -> Arc<dyn SyncParticipant> {
        self.engine.clone()
    }
}
