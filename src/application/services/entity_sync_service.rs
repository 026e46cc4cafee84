use super::sync_lock::SyncLock;
use super::sync_service::SyncParticipant;
use crate::application::mappers::EntityMapper;
use crate::application::ports::{
    ApprovalGateway, ConnectivityMonitor, EntityGateway, ListParams, LocalStore, SessionProvider,
    StoreFilter, SyncQueueStore, Table,
};
use crate::domain::entities::{
    EntityRow, MutationOutcome, StoreRow, SyncQueueDraft, SyncQueueEntry, SyncReport,
};
use crate::domain::value_objects::{ApprovalDecision, EntityId, EntityKind, SyncOperation};
use crate::shared::config::SyncConfig;
use crate::shared::error::{AppError, ErrorKind};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// 非ネットワーク系の失敗がこの回数に達したエントリは破棄する
    pub max_retries: u32,
    /// スケジューラー起点の同期の最小間隔
    pub debounce: Duration,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            debounce: Duration::from_secs(5),
        }
    }
}

impl From<&SyncConfig> for SyncPolicy {
    fn from(config: &SyncConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            debounce: Duration::from_secs(config.debounce_secs),
        }
    }
}

/// すべてのオーケストレーターが共有する協調者
#[derive(Clone)]
pub struct SyncContext {
    pub store: Arc<dyn LocalStore>,
    pub queue: Arc<dyn SyncQueueStore>,
    pub connectivity: Arc<dyn ConnectivityMonitor>,
    pub session: Arc<dyn SessionProvider>,
    pub policy: SyncPolicy,
}

/// 1 ドメイン分のキャッシュと同期キューを扱う汎用オーケストレーター。
///
/// 読み取りはリモート優先でローカルにフォールバックし、変更はオンラインなら
/// write-through、オフラインならローカル保存とキュー追加を行う。
pub struct EntitySyncService {
    kind: EntityKind,
    table: Table,
    ctx: SyncContext,
    gateway: Arc<dyn EntityGateway>,
    approvals: Option<Arc<dyn ApprovalGateway>>,
    mapper: Arc<dyn EntityMapper>,
    lock: SyncLock,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn strip_local_fields(record: &Value) -> Map<String, Value> {
    match record {
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| !key.starts_with('_'))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        _ => Map::new(),
    }
}

fn require_object(payload: &Value) -> Result<Map<String, Value>, AppError> {
    match payload {
        Value::Object(map) => Ok(map.clone()),
        _ => Err(AppError::ValidationError(
            "Payload must be a JSON object".to_string(),
        )),
    }
}

/// パラメータのうちレコードが持つフィールドだけで一致判定する（ページングなどは無視）
fn matches_params(record: &Value, params: &ListParams) -> bool {
    params.iter().all(|(key, expected)| match record.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s == expected,
        Some(other) => other.to_string() == *expected,
    })
}

enum Attempt {
    Record(Value),
    Gone,
}

impl EntitySyncService {
    pub fn new(
        ctx: SyncContext,
        gateway: Arc<dyn EntityGateway>,
        mapper: Arc<dyn EntityMapper>,
    ) -> Self {
        let kind = mapper.kind();
        Self {
            kind,
            table: Table::for_kind(kind),
            ctx,
            gateway,
            approvals: None,
            mapper,
            lock: SyncLock::new(),
        }
    }

    /// `process` 操作の再送先
    pub fn with_approval_gateway(mut self, approvals: Arc<dyn ApprovalGateway>) -> Self {
        self.approvals = Some(approvals);
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn lock(&self) -> &SyncLock {
        &self.lock
    }

    pub(crate) fn mapper(&self) -> &dyn EntityMapper {
        self.mapper.as_ref()
    }

    pub(crate) fn is_online(&self) -> bool {
        self.ctx.connectivity.is_online()
    }

    pub(crate) async fn ensure_session(&self, action: &str) -> Result<(), AppError> {
        if self.ctx.session.is_authenticated().await {
            Ok(())
        } else {
            Err(AppError::Unauthorized(format!(
                "You must be logged in to {action} {}",
                self.kind.label()
            )))
        }
    }

    fn connection_required(&self) -> AppError {
        AppError::ConnectionRequired(format!(
            "No cached {} available. Please connect to the internet and try again.",
            self.kind.label()
        ))
    }

    // ---- reads ----

    pub async fn get_all(&self, params: &ListParams) -> Result<Vec<Value>, AppError> {
        let fetched = self.fetch_all(params).await;
        self.resolve_listing(fetched, params).await
    }

    /// オフライン時はリモートに触れず `AppError::Network` を返す
    pub(crate) async fn fetch_all(&self, params: &ListParams) -> Result<Vec<Value>, AppError> {
        if self.is_online() {
            self.gateway.get_all(params).await
        } else {
            Err(AppError::Network("Device is offline".to_string()))
        }
    }

    /// リモート取得の結果をキャッシュへ反映し、失敗時はキャッシュから返す。
    ///
    /// パラメータ無しの取得はトップレベル一覧とみなし、同期済み行を入れ替える。
    pub(crate) async fn resolve_listing(
        &self,
        fetched: Result<Vec<Value>, AppError>,
        params: &ListParams,
    ) -> Result<Vec<Value>, AppError> {
        match fetched {
            Ok(records) => {
                if let Err(err) = self.cache_records(&records, params.is_empty()).await {
                    warn!(
                        target: "offline::store",
                        entity = %self.kind,
                        error = %err,
                        "failed to cache remote listing"
                    );
                }
                Ok(records)
            }
            Err(err) if err.is_auth_expired() => Err(err),
            Err(err) => {
                debug!(
                    target: "offline::sync",
                    entity = %self.kind,
                    error = %err,
                    "remote listing unavailable, reading cache"
                );
                let cached: Vec<Value> = self
                    .cached_records(None)
                    .await?
                    .into_iter()
                    .filter(|record| matches_params(record, params))
                    .collect();
                if cached.is_empty() {
                    Err(self.connection_required())
                } else {
                    Ok(cached)
                }
            }
        }
    }

    pub async fn get_one(&self, id: &str) -> Result<Value, AppError> {
        let entity_id = EntityId::new(id).map_err(AppError::ValidationError)?;
        if entity_id.is_temp() || !self.is_online() {
            return self.cached_one(&entity_id).await;
        }

        match self.gateway.get_one(entity_id.as_str()).await {
            Ok(record) => {
                if let Err(err) = self.cache_records(std::slice::from_ref(&record), false).await {
                    warn!(
                        target: "offline::store",
                        entity = %self.kind,
                        id,
                        error = %err,
                        "failed to cache remote record"
                    );
                }
                Ok(record)
            }
            Err(err) if err.is_auth_expired() => Err(err),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.drop_synced_copy(&entity_id).await?;
                Err(err)
            }
            Err(err) => {
                debug!(
                    target: "offline::sync",
                    entity = %self.kind,
                    id,
                    error = %err,
                    "remote record unavailable, reading cache"
                );
                self.cached_one(&entity_id).await
            }
        }
    }

    async fn cached_one(&self, id: &EntityId) -> Result<Value, AppError> {
        match self.load_row(id).await? {
            Some(row) if !row.is_tombstone() => Ok(self.mapper.from_local_row(&row)),
            Some(_) => Err(AppError::NotFound(format!(
                "{} {id} is pending deletion",
                self.kind
            ))),
            None if id.is_temp() => Err(AppError::NotFound(format!("{} {id}", self.kind))),
            None => Err(self.connection_required()),
        }
    }

    /// キャッシュ済みレコード（削除待ちを除く）
    pub async fn cached_records(&self, filter: Option<StoreFilter>) -> Result<Vec<Value>, AppError> {
        let rows = self.ctx.store.get_all(self.table, filter).await?;
        let mut records = Vec::with_capacity(rows.len());
        for raw in rows {
            let row = EntityRow::from_store_row(raw)?;
            if !row.is_tombstone() {
                records.push(self.mapper.from_local_row(&row));
            }
        }
        Ok(records)
    }

    /// サーバー確認済みのレコードをキャッシュする。
    ///
    /// 未同期（`synced = 0`）の行はローカル変更を優先して上書きしない。
    /// `clear_existing` の場合は同期済みの行を一度消してから入れ直す。
    pub async fn cache_records(
        &self,
        records: &[Value],
        clear_existing: bool,
    ) -> Result<usize, AppError> {
        let pending: HashSet<String> = self
            .ctx
            .store
            .get_all(self.table, Some(StoreFilter::unsynced()))
            .await?
            .into_iter()
            .filter_map(|row| row.get("id").and_then(Value::as_str).map(str::to_string))
            .collect();

        let timestamp = now();
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            match self.mapper.to_local_row(record, timestamp) {
                Ok(row) if pending.contains(row.id.as_str()) => {
                    debug!(
                        target: "offline::store",
                        entity = %self.kind,
                        id = %row.id,
                        "keeping unsynced local row over remote copy"
                    );
                }
                Ok(row) => rows.push(row.to_store_row()?),
                Err(err) => warn!(
                    target: "offline::store",
                    entity = %self.kind,
                    error = %err,
                    "skipping remote record that cannot be cached"
                ),
            }
        }

        if clear_existing {
            let sql = format!("DELETE FROM {} WHERE synced = 1", self.table.name());
            let removed = self.ctx.store.execute_query(&sql, Vec::new()).await?;
            debug!(
                target: "offline::store",
                entity = %self.kind,
                removed,
                "cleared synced rows before refresh"
            );
        }

        self.ctx.store.bulk_upsert(self.table, rows).await
    }

    async fn drop_synced_copy(&self, id: &EntityId) -> Result<(), AppError> {
        if let Some(row) = self.load_row(id).await? {
            if row.synced {
                self.ctx.store.delete(self.table, id.as_str()).await?;
            }
        }
        Ok(())
    }

    // ---- mutations ----

    pub async fn create(&self, payload: &Value) -> Result<MutationOutcome, AppError> {
        self.ensure_session("create").await?;
        let body = require_object(payload)?;

        if self.is_online() {
            match self.gateway.create(payload).await {
                Ok(record) => {
                    self.cache_confirmed(&record).await?;
                    return Ok(MutationOutcome::synced(record));
                }
                Err(err) if err.is_network() => {
                    info!(
                        target: "offline::sync",
                        entity = %self.kind,
                        error = %err,
                        "create failed on network, saving offline"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        let id = EntityId::temp();
        let mut record = body.clone();
        record.insert("id".to_string(), Value::String(id.to_string()));
        let mut row = self.mapper.to_local_row(&Value::Object(record), now())?;
        row.synced = false;
        self.ctx.store.insert(self.table, row.to_store_row()?).await?;
        self.enqueue(&id, SyncOperation::Create, Value::Object(body))
            .await?;

        info!(
            target: "offline::sync",
            entity = %self.kind,
            id = %id,
            "created record offline"
        );
        Ok(MutationOutcome::queued(self.mapper.from_local_row(&row)))
    }

    pub async fn update(&self, id: &str, payload: &Value) -> Result<MutationOutcome, AppError> {
        self.ensure_session("update").await?;
        let entity_id = EntityId::new(id).map_err(AppError::ValidationError)?;
        require_object(payload)?;

        let existing = self.load_row(&entity_id).await?;
        if existing.as_ref().map_or(false, EntityRow::is_tombstone) {
            return Err(AppError::NotFound(format!(
                "{} {id} is pending deletion",
                self.kind
            )));
        }

        if !entity_id.is_temp() && self.is_online() {
            match self.gateway.update(entity_id.as_str(), payload).await {
                Ok(record) => {
                    self.cache_confirmed(&record).await?;
                    return Ok(MutationOutcome::synced(record));
                }
                Err(err) if err.is_network() => {
                    info!(
                        target: "offline::sync",
                        entity = %self.kind,
                        id,
                        error = %err,
                        "update failed on network, saving offline"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        let mut merged = match &existing {
            Some(row) => strip_local_fields(&self.mapper.from_local_row(row)),
            None => Map::new(),
        };
        for (key, value) in require_object(payload)? {
            merged.insert(key, value);
        }
        merged.insert("id".to_string(), Value::String(entity_id.to_string()));

        let mut row = self.mapper.to_local_row(&Value::Object(merged.clone()), now())?;
        row.synced = false;
        match &existing {
            Some(previous) => {
                row.created_at = previous.created_at;
                if previous.is_partial() {
                    row.mark_partial();
                }
            }
            // 未キャッシュの実 ID は手元の値だけをそのまま送る
            None if !entity_id.is_temp() => row.mark_partial(),
            None => {}
        }
        self.write_row(&row).await?;

        merged.remove("id");
        self.enqueue(&entity_id, SyncOperation::Update, Value::Object(merged))
            .await?;

        Ok(MutationOutcome::queued(self.mapper.from_local_row(&row)))
    }

    pub async fn delete(&self, id: &str) -> Result<MutationOutcome, AppError> {
        self.ensure_session("delete").await?;
        let entity_id = EntityId::new(id).map_err(AppError::ValidationError)?;
        let receipt = json!({ "id": entity_id.as_str() });

        if entity_id.is_temp() {
            self.remove_locally(&entity_id).await?;
            debug!(
                target: "offline::sync",
                entity = %self.kind,
                id,
                "removed never-synced record locally"
            );
            return Ok(MutationOutcome::synced(receipt));
        }

        if self.is_online() {
            match self.gateway.delete(entity_id.as_str()).await {
                Ok(()) => {
                    self.remove_locally(&entity_id).await?;
                    return Ok(MutationOutcome::synced(receipt));
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    self.remove_locally(&entity_id).await?;
                    return Ok(MutationOutcome::synced(receipt));
                }
                Err(err) if err.is_network() => {
                    info!(
                        target: "offline::sync",
                        entity = %self.kind,
                        id,
                        error = %err,
                        "delete failed on network, tombstoning"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        let timestamp = now();
        let mut row = match self.load_row(&entity_id).await? {
            Some(row) => row,
            None => EntityRow::new(entity_id.clone(), Map::new(), Map::new(), false, timestamp),
        };
        row.mark_tombstone(timestamp);
        self.write_row(&row).await?;
        self.enqueue(&entity_id, SyncOperation::Delete, json!({}))
            .await?;

        Ok(MutationOutcome::queued(receipt))
    }

    pub(crate) async fn remove_locally(&self, id: &EntityId) -> Result<(), AppError> {
        self.ctx.store.delete(self.table, id.as_str()).await?;
        self.ctx.queue.remove_entries_for(self.kind, id).await?;
        Ok(())
    }

    /// キューに保留エントリがある ID
    pub(crate) async fn queued_ids(&self) -> Result<HashSet<String>, AppError> {
        Ok(self
            .ctx
            .queue
            .list_entries(self.kind)
            .await?
            .into_iter()
            .map(|entry| entry.entity_id.to_string())
            .collect())
    }

    pub(crate) async fn load_row(&self, id: &EntityId) -> Result<Option<EntityRow>, AppError> {
        self.ctx
            .store
            .get_by_id(self.table, id.as_str())
            .await?
            .map(EntityRow::from_store_row)
            .transpose()
    }

    /// insert し、既にあれば update に切り替える
    pub(crate) async fn write_row(&self, row: &EntityRow) -> Result<(), AppError> {
        let stored = row.to_store_row()?;
        match self.ctx.store.insert(self.table, stored.clone()).await {
            Err(AppError::Constraint(_)) => {
                self.ctx
                    .store
                    .update(self.table, row.id.as_str(), stored)
                    .await
            }
            other => other,
        }
    }

    async fn cache_confirmed(&self, record: &Value) -> Result<EntityRow, AppError> {
        let row = self.mapper.to_local_row(record, now())?;
        self.write_row(&row).await?;
        Ok(row)
    }

    async fn set_synced_flag(&self, id: &EntityId, synced: bool) -> Result<(), AppError> {
        let mut patch = StoreRow::new();
        patch.insert("synced".to_string(), Value::from(i64::from(synced)));
        patch.insert("updated_at".to_string(), Value::from(now()));
        match self.ctx.store.update(self.table, id.as_str(), patch).await {
            Err(AppError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    /// `(entity_type, entity_id)` ごとに 1 件を保つ。
    ///
    /// 未送信の create に対する update は create のまま中身だけ差し替える。
    pub(crate) async fn enqueue(
        &self,
        id: &EntityId,
        operation: SyncOperation,
        data: Value,
    ) -> Result<(), AppError> {
        match self.ctx.queue.find_entry(self.kind, id).await? {
            Some(entry) => {
                let operation = match (entry.operation, operation) {
                    (SyncOperation::Create, SyncOperation::Update) => SyncOperation::Create,
                    (_, requested) => requested,
                };
                self.ctx
                    .queue
                    .update_entry(entry.id, operation, &data)
                    .await?;
                debug!(
                    target: "offline::sync",
                    entity = %self.kind,
                    id = %id,
                    queue_id = entry.id,
                    operation = %operation,
                    "updated pending queue entry"
                );
            }
            None => {
                let queue_id = self
                    .ctx
                    .queue
                    .insert_entry(SyncQueueDraft::new(self.kind, id.clone(), operation, data))
                    .await?;
                debug!(
                    target: "offline::sync",
                    entity = %self.kind,
                    id = %id,
                    queue_id,
                    operation = %operation,
                    "queued mutation"
                );
            }
        }
        Ok(())
    }

    // ---- queue replay ----

    pub async fn pending_count(&self) -> Result<u32, AppError> {
        self.ctx.queue.count_entries(self.kind).await
    }

    /// キューを古い順に 1 件ずつ再送する。
    ///
    /// ネットワーク系の失敗は数えずに保留のまま残し、認証切れはパスを中断して返す。
    pub async fn sync_pending(&self) -> Result<SyncReport, AppError> {
        let Some(_guard) = self.lock.try_acquire() else {
            debug!(
                target: "offline::sync",
                entity = %self.kind,
                "sync already in progress"
            );
            return Ok(SyncReport::already_running(self.kind));
        };

        let entries = self.ctx.queue.list_entries(self.kind).await?;
        let (mut synced, mut failed, mut dropped) = (0u32, 0u32, 0u32);

        for entry in entries {
            match self.replay(&entry).await {
                Ok(()) => synced += 1,
                Err(err) if err.is_auth_expired() => {
                    warn!(
                        target: "offline::sync",
                        entity = %self.kind,
                        "session expired during sync, aborting pass"
                    );
                    return Err(err);
                }
                Err(err) if err.is_network() => {
                    debug!(
                        target: "offline::sync",
                        entity = %self.kind,
                        id = %entry.entity_id,
                        "network unavailable, entry stays pending"
                    );
                }
                Err(err) => {
                    failed += 1;
                    let attempts = match self.ctx.queue.increment_retry(entry.id).await {
                        Ok(attempts) => attempts,
                        Err(AppError::NotFound(_)) => {
                            // エントリは消えているので、次回の一覧更新で置き換えられるようにする
                            self.set_synced_flag(&entry.entity_id, true).await?;
                            warn!(
                                target: "offline::sync",
                                entity = %self.kind,
                                id = %entry.entity_id,
                                error = %err,
                                "queue entry already settled, not retrying"
                            );
                            continue;
                        }
                        Err(other) => return Err(other),
                    };
                    if attempts >= self.ctx.policy.max_retries {
                        self.give_up(&entry).await?;
                        dropped += 1;
                        warn!(
                            target: "offline::sync",
                            entity = %self.kind,
                            id = %entry.entity_id,
                            operation = %entry.operation,
                            attempts,
                            error = %err,
                            "dropping queue entry after repeated failures"
                        );
                    } else {
                        warn!(
                            target: "offline::sync",
                            entity = %self.kind,
                            id = %entry.entity_id,
                            operation = %entry.operation,
                            attempts,
                            error = %err,
                            "queue entry failed, will retry"
                        );
                    }
                }
            }
        }

        let pending = self.pending_count().await?;
        let report = SyncReport::new(self.kind, synced, failed, dropped, pending);
        info!(
            target: "offline::sync",
            entity = %self.kind,
            synced,
            failed,
            dropped,
            pending,
            "sync pass finished"
        );
        Ok(report)
    }

    /// オンラインで、保留があり、直近のパスから debounce 以上経っているときだけ同期する
    pub async fn check_and_sync(&self) -> Result<Option<SyncReport>, AppError> {
        if !self.is_online() || self.lock.is_running() {
            return Ok(None);
        }
        if self.lock.ran_within(self.ctx.policy.debounce) {
            debug!(
                target: "offline::sync",
                entity = %self.kind,
                "skipping sync inside debounce window"
            );
            return Ok(None);
        }
        if self.pending_count().await? == 0 {
            return Ok(None);
        }
        self.sync_pending().await.map(Some)
    }

    /// mark-in-flight → attempt → commit / revert
    async fn replay(&self, entry: &SyncQueueEntry) -> Result<(), AppError> {
        let row = self.mark_in_flight(&entry.entity_id).await?;
        let attempt = match self.attempt(entry, row.as_ref()).await {
            Ok(attempt) => attempt,
            Err(err) => {
                self.revert(&entry.entity_id).await;
                return Err(err);
            }
        };
        if let Err(err) = self.commit(entry, attempt).await {
            self.revert(&entry.entity_id).await;
            return Err(err);
        }
        Ok(())
    }

    /// 再送前に `synced = 1` を立て、並行するパスが同じ行を拾わないようにする
    async fn mark_in_flight(&self, id: &EntityId) -> Result<Option<EntityRow>, AppError> {
        let row = self.load_row(id).await?;
        if row.is_some() {
            self.set_synced_flag(id, true).await?;
        }
        Ok(row)
    }

    async fn attempt(
        &self,
        entry: &SyncQueueEntry,
        row: Option<&EntityRow>,
    ) -> Result<Attempt, AppError> {
        let payload = || match row {
            Some(row) if row.is_partial() => entry.data.clone(),
            Some(row) if !row.is_tombstone() => self.mapper.to_api_payload(row),
            _ => entry.data.clone(),
        };
        let id = entry.entity_id.as_str();

        match entry.operation {
            SyncOperation::Create => self.gateway.create(&payload()).await.map(Attempt::Record),
            SyncOperation::Update => self
                .gateway
                .update(id, &payload())
                .await
                .map(Attempt::Record),
            SyncOperation::Delete => match self.gateway.delete(id).await {
                Ok(()) => Ok(Attempt::Gone),
                Err(err) if err.is_gone_on_remote() => {
                    debug!(
                        target: "offline::sync",
                        entity = %self.kind,
                        id,
                        "record already gone on server"
                    );
                    Ok(Attempt::Gone)
                }
                Err(err) => Err(err),
            },
            SyncOperation::Process => {
                let approvals = self.approvals.as_ref().ok_or_else(|| {
                    AppError::Internal(format!("{} does not support process", self.kind))
                })?;
                let decision =
                    ApprovalDecision::from_payload(&entry.data).map_err(AppError::ValidationError)?;
                approvals
                    .process_approval(id, &decision)
                    .await
                    .map(Attempt::Record)
            }
        }
    }

    async fn commit(&self, entry: &SyncQueueEntry, attempt: Attempt) -> Result<(), AppError> {
        match (entry.operation, attempt) {
            (SyncOperation::Create, Attempt::Record(record)) => {
                // サーバーで作成済みなので、ここから先の失敗でエントリを再送してはならない
                self.ctx.queue.remove_entry(entry.id).await?;
                self.ctx
                    .store
                    .delete(self.table, entry.entity_id.as_str())
                    .await?;
                let cached = match self.mapper.to_local_row(&record, now()) {
                    Ok(confirmed) => self.write_row(&confirmed).await.map(|()| confirmed.id),
                    Err(err) => Err(err),
                };
                match cached {
                    Ok(id) => info!(
                        target: "offline::sync",
                        entity = %self.kind,
                        temp_id = %entry.entity_id,
                        id = %id,
                        "offline record created on server"
                    ),
                    Err(err) => warn!(
                        target: "offline::sync",
                        entity = %self.kind,
                        temp_id = %entry.entity_id,
                        error = %err,
                        "record created on server but response could not be cached"
                    ),
                }
            }
            (SyncOperation::Update, Attempt::Record(record)) => {
                self.cache_confirmed(&record).await?;
                self.ctx.queue.remove_entry(entry.id).await?;
            }
            (SyncOperation::Process, Attempt::Record(_)) => {
                // 処理済みの承認は承認待ち一覧から外れる
                self.ctx
                    .store
                    .delete(self.table, entry.entity_id.as_str())
                    .await?;
                self.ctx.queue.remove_entry(entry.id).await?;
            }
            (_, _) => {
                self.ctx
                    .store
                    .delete(self.table, entry.entity_id.as_str())
                    .await?;
                self.ctx.queue.remove_entry(entry.id).await?;
            }
        }
        Ok(())
    }

    async fn revert(&self, id: &EntityId) {
        if let Err(err) = self.set_synced_flag(id, false).await {
            warn!(
                target: "offline::store",
                entity = %self.kind,
                id = %id,
                error = %err,
                "failed to revert in-flight flag"
            );
        }
    }

    /// 再試行上限に達したエントリを捨て、行を次回の一覧更新で置き換えられる状態に戻す
    async fn give_up(&self, entry: &SyncQueueEntry) -> Result<(), AppError> {
        self.ctx.queue.remove_entry(entry.id).await?;
        self.set_synced_flag(&entry.entity_id, true).await
    }
}

#[async_trait]
impl SyncParticipant for EntitySyncService {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    async fn sync_pending(&self) -> Result<SyncReport, AppError> {
        EntitySyncService::sync_pending(self).await
    }

    async fn check_and_sync(&self) -> Result<Option<SyncReport>, AppError> {
        EntitySyncService::check_and_sync(self).await
    }

    async fn pending_count(&self) -> Result<u32, AppError> {
        EntitySyncService::pending_count(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_only_filter_on_fields_the_record_has() {
        let record = json!({"id": "1", "status": "Pending", "level": 2});
        let mut params = ListParams::new();
        params.insert("status".into(), "Pending".into());
        params.insert("page".into(), "2".into());
        assert!(matches_params(&record, &params));

        params.insert("level".into(), "3".into());
        assert!(!matches_params(&record, &params));
    }

    #[test]
    fn local_fields_are_stripped_before_merging() {
        let record = json!({"id": "1", "_pendingSync": true, "_offline": true, "title": "x"});
        let stripped = strip_local_fields(&record);
        assert_eq!(stripped.len(), 2);
        assert!(stripped.contains_key("title"));
    }

    #[test]
    fn default_policy_uses_five_retries_and_five_second_debounce() {
        let policy = SyncPolicy::default();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.debounce, Duration::from_secs(5));
    }
}
