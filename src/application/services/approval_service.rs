use super::entity_sync_service::{EntitySyncService, SyncContext};
use super::sync_service::SyncParticipant;
use crate::application::mappers::ApprovalMapper;
use crate::application::ports::{ApprovalGateway, EntityGateway, ListParams};
use crate::domain::entities::{MutationOutcome, SyncReport};
use crate::domain::value_objects::{ApprovalDecision, ApprovalStatus, EntityId, SyncOperation};
use crate::shared::error::AppError;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

/// 承認フロー。承認待ちの取得と承認・却下の送信を扱う。
#[derive(Clone)]
pub struct ApprovalService {
    engine: Arc<EntitySyncService>,
    approvals: Arc<dyn ApprovalGateway>,
}

fn is_decided(record: &Value) -> bool {
    record
        .get("status")
        .and_then(Value::as_str)
        .map_or(false, |status| ApprovalStatus::parse(status).is_ok())
}

impl ApprovalService {
    pub fn new(
        ctx: SyncContext,
        gateway: Arc<dyn EntityGateway>,
        approvals: Arc<dyn ApprovalGateway>,
    ) -> Self {
        let engine = EntitySyncService::new(ctx, gateway, Arc::new(ApprovalMapper))
            .with_approval_gateway(Arc::clone(&approvals));
        Self {
            engine: Arc::new(engine),
            approvals,
        }
    }

    /// 承認待ち一覧。ローカルで判断済み（送信待ち）のものは含めない。
    ///
    /// サーバーのコピーはまだ Pending なので、キューに残っている ID も除く。
    pub async fn get_pending_approvals(
        &self,
        params: &ListParams,
    ) -> Result<Vec<Value>, AppError> {
        let fetched = if self.engine.is_online() {
            self.approvals.get_approvals(params).await
        } else {
            Err(AppError::Network("Device is offline".to_string()))
        };
        let records = self.engine.resolve_listing(fetched, params).await?;
        let queued = self.engine.queued_ids().await?;
        Ok(records
            .into_iter()
            .filter(|record| !is_decided(record))
            .filter(|record| {
                record
                    .get("id")
                    .and_then(Value::as_str)
                    .map_or(true, |id| !queued.contains(id))
            })
            .collect())
    }

    pub async fn get_one(&self, id: &str) -> Result<Value, AppError> {
        self.engine.get_one(id).await
    }

    pub async fn process_approval(
        &self,
        id: &str,
        decision: ApprovalDecision,
    ) -> Result<MutationOutcome, AppError> {
        self.engine.ensure_session("process").await?;
        let entity_id = EntityId::new(id).map_err(AppError::ValidationError)?;

        if self.engine.is_online() {
            match self.approvals.process_approval(id, &decision).await {
                Ok(record) => {
                    self.engine.remove_locally(&entity_id).await?;
                    return Ok(MutationOutcome::synced(record));
                }
                Err(err) if err.is_network() => {
                    info!(
                        target: "offline::sync",
                        entity = "approval",
                        id,
                        error = %err,
                        "approval failed on network, saving offline"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        if let Some(existing) = self.engine.load_row(&entity_id).await? {
            let mut record: Map<String, Value> = match self.engine.mapper().from_local_row(&existing) {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            record.retain(|key, _| !key.starts_with('_'));
            record.insert("status".to_string(), json!(decision.status.as_str()));
            record.insert("comments".to_string(), json!(decision.comments));

            let mut row = self
                .engine
                .mapper()
                .to_local_row(&Value::Object(record), chrono::Utc::now().timestamp())?;
            row.synced = false;
            row.created_at = existing.created_at;
            self.engine.write_row(&row).await?;
        }
        self.engine
            .enqueue(&entity_id, SyncOperation::Process, decision.to_payload())
            .await?;

        Ok(MutationOutcome::queued(json!({
            "id": entity_id.as_str(),
            "status": decision.status.as_str(),
            "comments": decision.comments,
        })))
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
