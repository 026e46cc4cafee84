use super::entity_sync_service::{EntitySyncService, SyncContext};
use super::sync_service::SyncParticipant;
use crate::application::mappers::TaskHazardMapper;
use crate::application::ports::{EntityGateway, ListParams};
use crate::domain::entities::{MutationOutcome, SyncReport};
use crate::shared::error::AppError;
use serde_json::Value;
use std::sync::Arc;

/// タスクハザード（作業前の危険予知）のオーケストレーター
#[derive(Clone)]
pub struct TaskHazardService {
    engine: Arc<EntitySyncService>,
}

impl TaskHazardService {
    pub fn new(ctx: SyncContext, gateway: Arc<dyn EntityGateway>) -> Self {
        Self {
            engine: Arc::new(EntitySyncService::new(
                ctx,
                gateway,
                Arc::new(TaskHazardMapper),
            )),
        }
    }

    pub async fn get_all(&self, params: &ListParams) -> Result<Vec<Value>, AppError> {
        self.engine.get_all(params).await
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

    pub async fn cache_records(
        &self,
        records: &[Value],
        clear_existing: bool,
    ) -> Result<usize, AppError> {
        self.engine.cache_records(records, clear_existing).await
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
