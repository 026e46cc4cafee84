mod common;

use async_trait::async_trait;
use common::{hazard, new_hazard, setup, setup_with_policy, short_debounce, synced_flag, Mode};
use fieldsafe_lib::application::mappers::TaskHazardMapper;
use fieldsafe_lib::application::ports::{ListParams, SessionProvider, SyncQueueStore, Table};
use fieldsafe_lib::application::services::{EntitySyncService, TaskHazardService};
use fieldsafe_lib::domain::entities::{SyncQueueDraft, SyncQueueEntry, SYNC_IN_PROGRESS_MESSAGE};
use fieldsafe_lib::domain::value_objects::{is_temp_id, EntityId, EntityKind, SyncOperation};
use fieldsafe_lib::infrastructure::SqliteLocalStore;
use fieldsafe_lib::{AppError, ErrorKind};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn service(h: &common::Harness) -> TaskHazardService {
    TaskHazardService::new(h.ctx.clone(), h.gateway.clone())
}

async fn seed(h: &common::Harness, records: Vec<Value>) {
    h.gateway.set_records(records).await;
    service(h)
        .get_all(&ListParams::new())
        .await
        .expect("initial listing");
}

#[tokio::test]
async fn offline_create_is_queued_and_replaced_by_server_row_on_sync() {
    let h = setup(false).await;
    let hazards = service(&h);

    let outcome = hazards.create(&new_hazard("Replace pump seal")).await.unwrap();
    assert!(outcome.offline);
    assert!(outcome.pending_sync);
    let temp_id = outcome.id().unwrap().to_string();
    assert!(is_temp_id(&temp_id), "{temp_id}");
    assert_eq!(outcome.record["scopeOfWork"], "Replace pump seal");

    let unsynced = h.unsynced(Table::TaskHazards).await;
    assert_eq!(unsynced.len(), 1);
    let queue = h.queue(EntityKind::TaskHazard).await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].operation, SyncOperation::Create);
    assert_eq!(queue[0].entity_id.as_str(), temp_id);
    assert_eq!(h.gateway.call_count().await, 0);

    h.network.set_online(true);
    let report = hazards.sync_pending().await.unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.pending, 0);

    // 一時 ID の行は消え、サーバー採番の行だけが残る
    assert!(h.row(Table::TaskHazards, &temp_id).await.is_none());
    let server_row = h.row(Table::TaskHazards, "srv-1").await.expect("server row");
    assert_eq!(synced_flag(&server_row), 1);
    assert_eq!(server_row["title"], "Replace pump seal");
    assert!(h.queue(EntityKind::TaskHazard).await.is_empty());

    let sent = h.gateway.calls_of("create").await;
    assert_eq!(sent.len(), 1);
    let payload = sent[0].payload.as_ref().unwrap();
    assert!(payload.get("id").is_none());
    assert!(payload.get("_pendingSync").is_none());
    assert_eq!(payload["scopeOfWork"], "Replace pump seal");
}

#[tokio::test]
async fn create_falls_back_to_queue_when_the_network_drops() {
    let h = setup(true).await;
    h.gateway.set_mode(Mode::Network).await;

    let outcome = service(&h).create(&new_hazard("Scaffold check")).await.unwrap();
    assert!(outcome.offline);
    assert_eq!(h.queue(EntityKind::TaskHazard).await.len(), 1);
    assert_eq!(h.gateway.calls_of("create").await.len(), 1);
}

#[tokio::test]
async fn online_create_writes_through_to_the_cache() {
    let h = setup(true).await;

    let outcome = service(&h).create(&new_hazard("Hot work permit")).await.unwrap();
    assert!(!outcome.offline);
    assert_eq!(outcome.id(), Some("srv-1"));

    let row = h.row(Table::TaskHazards, "srv-1").await.expect("cached row");
    assert_eq!(synced_flag(&row), 1);
    assert!(h.queue(EntityKind::TaskHazard).await.is_empty());
}

#[tokio::test]
async fn server_errors_on_create_are_not_queued() {
    let h = setup(true).await;
    h.gateway.set_mode(Mode::Api(422)).await;

    let err = service(&h).create(&new_hazard("Bad")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);
    assert!(h.rows(Table::TaskHazards).await.is_empty());
    assert!(h.queue(EntityKind::TaskHazard).await.is_empty());
}

#[tokio::test]
async fn updating_an_unsent_record_keeps_a_single_create_entry() {
    let h = setup(false).await;
    let hazards = service(&h);

    let created = hazards.create(&new_hazard("Draft")).await.unwrap();
    let temp_id = created.id().unwrap().to_string();
    hazards
        .update(&temp_id, &json!({ "scopeOfWork": "Final wording" }))
        .await
        .unwrap();

    let queue = h.queue(EntityKind::TaskHazard).await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].operation, SyncOperation::Create);
    assert_eq!(queue[0].data["scopeOfWork"], "Final wording");

    let record = hazards.get_one(&temp_id).await.unwrap();
    assert_eq!(record["scopeOfWork"], "Final wording");
    assert_eq!(record["_pendingSync"], true);

    h.network.set_online(true);
    hazards.sync_pending().await.unwrap();
    let sent = h.gateway.calls_of("create").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload.as_ref().unwrap()["scopeOfWork"], "Final wording");
    assert!(h.gateway.calls_of("update").await.is_empty());
}

#[tokio::test]
async fn refresh_does_not_overwrite_unsynced_local_edits() {
    let h = setup(true).await;
    seed(&h, vec![hazard("h1", "Original")]).await;
    let hazards = service(&h);

    h.network.set_online(false);
    hazards
        .update("h1", &json!({ "scopeOfWork": "Local edit" }))
        .await
        .unwrap();
    let queue = h.queue(EntityKind::TaskHazard).await;
    assert_eq!(queue[0].operation, SyncOperation::Update);
    assert!(queue[0].data.get("id").is_none());

    h.network.set_online(true);
    h.gateway
        .set_records(vec![hazard("h1", "Server copy"), hazard("h2", "Other")])
        .await;
    hazards.get_all(&ListParams::new()).await.unwrap();

    let local = h.row(Table::TaskHazards, "h1").await.expect("h1 kept");
    assert_eq!(local["title"], "Local edit");
    assert_eq!(synced_flag(&local), 0);
    assert!(h.row(Table::TaskHazards, "h2").await.is_some());

    let report = hazards.sync_pending().await.unwrap();
    assert_eq!(report.synced, 1);
    let updates = h.gateway.calls_of("update").await;
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].id.as_deref(), Some("h1"));
    assert_eq!(updates[0].payload.as_ref().unwrap()["scopeOfWork"], "Local edit");
    let row = h.row(Table::TaskHazards, "h1").await.unwrap();
    assert_eq!(synced_flag(&row), 1);
}

#[tokio::test]
async fn full_refresh_drops_synced_rows_missing_on_the_server() {
    let h = setup(true).await;
    seed(&h, vec![hazard("h1", "One"), hazard("h2", "Two")]).await;

    h.gateway.set_records(vec![hazard("h2", "Two")]).await;
    service(&h).get_all(&ListParams::new()).await.unwrap();

    assert!(h.row(Table::TaskHazards, "h1").await.is_none());
    assert!(h.row(Table::TaskHazards, "h2").await.is_some());
}

#[tokio::test]
async fn reads_fall_back_to_cache_when_remote_is_unreachable() {
    let h = setup(true).await;
    let mut h1 = hazard("h1", "One");
    h1["status"] = json!("Approved");
    seed(&h, vec![h1, hazard("h2", "Two")]).await;

    h.gateway.set_mode(Mode::Network).await;
    let hazards = service(&h);
    assert_eq!(hazards.get_all(&ListParams::new()).await.unwrap().len(), 2);

    let mut params = ListParams::new();
    params.insert("status".into(), "Pending".into());
    params.insert("page".into(), "1".into());
    let filtered = hazards.get_all(&params).await.unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["id"], "h2");

    let one = hazards.get_one("h1").await.unwrap();
    assert_eq!(one["scopeOfWork"], "One");
}

#[tokio::test]
async fn offline_reads_never_touch_the_remote() {
    let h = setup(true).await;
    seed(&h, vec![hazard("h1", "One")]).await;
    let before = h.gateway.call_count().await;

    h.network.set_online(false);
    let hazards = service(&h);
    assert_eq!(hazards.get_all(&ListParams::new()).await.unwrap().len(), 1);
    assert!(hazards.get_one("h1").await.is_ok());
    assert_eq!(h.gateway.call_count().await, before);
}

#[tokio::test]
async fn empty_cache_while_offline_requires_a_connection() {
    let h = setup(false).await;
    let hazards = service(&h);

    let err = hazards.get_all(&ListParams::new()).await.unwrap_err();
    match err {
        AppError::ConnectionRequired(message) => {
            assert_eq!(
                message,
                "No cached task hazards available. Please connect to the internet and try again."
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(matches!(
        hazards.get_one("h404").await,
        Err(AppError::ConnectionRequired(_))
    ));
}

#[tokio::test]
async fn expired_session_is_not_masked_by_the_cache() {
    let h = setup(true).await;
    seed(&h, vec![hazard("h1", "One")]).await;

    h.gateway.set_mode(Mode::AuthExpired).await;
    let err = service(&h).get_all(&ListParams::new()).await.unwrap_err();
    assert!(err.is_auth_expired());
}

#[tokio::test]
async fn remote_not_found_evicts_the_cached_copy() {
    let h = setup(true).await;
    seed(&h, vec![hazard("h1", "One")]).await;

    h.gateway.set_records(Vec::new()).await;
    let err = service(&h).get_one("h1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(h.row(Table::TaskHazards, "h1").await.is_none());
}

#[tokio::test]
async fn deleting_an_unsent_record_only_touches_local_state() {
    let h = setup(true).await;
    h.gateway.set_mode(Mode::Network).await;
    let hazards = service(&h);

    let created = hazards.create(&new_hazard("Mistake")).await.unwrap();
    let temp_id = created.id().unwrap().to_string();
    h.gateway.set_mode(Mode::Ok).await;

    let outcome = hazards.delete(&temp_id).await.unwrap();
    assert!(!outcome.offline);
    assert!(h.rows(Table::TaskHazards).await.is_empty());
    assert!(h.queue(EntityKind::TaskHazard).await.is_empty());
    assert!(h.gateway.calls_of("delete").await.is_empty());
}

#[tokio::test]
async fn offline_delete_tombstones_until_replayed() {
    let h = setup(true).await;
    seed(&h, vec![hazard("h1", "One"), hazard("h2", "Two")]).await;
    let hazards = service(&h);

    h.network.set_online(false);
    let outcome = hazards.delete("h1").await.unwrap();
    assert!(outcome.offline);

    // 削除待ちの行は読み取りから見えない
    let listed = hazards.get_all(&ListParams::new()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], "h2");
    assert!(hazards.get_one("h1").await.is_err());
    let tombstone = h.row(Table::TaskHazards, "h1").await.expect("tombstone row");
    assert_eq!(tombstone["status"], "deleted");

    let queue = h.queue(EntityKind::TaskHazard).await;
    assert_eq!(queue[0].operation, SyncOperation::Delete);

    // サーバー側で既に消えていても成功扱い
    h.network.set_online(true);
    h.gateway.set_mode(Mode::Api(404)).await;
    let report = hazards.sync_pending().await.unwrap();
    assert_eq!(report.synced, 1);
    assert!(h.row(Table::TaskHazards, "h1").await.is_none());
    assert!(h.queue(EntityKind::TaskHazard).await.is_empty());
}

#[tokio::test]
async fn online_delete_surfaces_bad_request() {
    let h = setup(true).await;
    seed(&h, vec![hazard("h1", "One")]).await;

    h.gateway.set_mode(Mode::Api(400)).await;
    let err = service(&h).delete("h1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);
    let row = h.row(Table::TaskHazards, "h1").await.expect("row kept");
    assert_eq!(row["status"], "Pending");
    assert!(h.queue(EntityKind::TaskHazard).await.is_empty());

    h.gateway.set_mode(Mode::Api(404)).await;
    let outcome = service(&h).delete("h1").await.unwrap();
    assert!(!outcome.offline);
    assert!(h.row(Table::TaskHazards, "h1").await.is_none());
}

#[tokio::test]
async fn updating_a_record_pending_deletion_is_rejected() {
    let h = setup(true).await;
    seed(&h, vec![hazard("h1", "One")]).await;
    let hazards = service(&h);

    h.network.set_online(false);
    hazards.delete("h1").await.unwrap();
    let err = hazards
        .update("h1", &json!({ "location": "South" }))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let queue = h.queue(EntityKind::TaskHazard).await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].operation, SyncOperation::Delete);
    let row = h.row(Table::TaskHazards, "h1").await.expect("tombstone row");
    assert_eq!(row["status"], "deleted");
    assert_eq!(synced_flag(&row), 0);

    h.network.set_online(true);
    hazards.sync_pending().await.unwrap();
    assert_eq!(h.gateway.calls_of("delete").await.len(), 1);
    assert!(h.gateway.calls_of("update").await.is_empty());
    assert!(h.row(Table::TaskHazards, "h1").await.is_none());
}

#[tokio::test]
async fn accepted_create_is_never_resent_even_if_the_reply_is_unreadable() {
    let h = setup(false).await;
    let hazards = service(&h);
    let created = hazards.create(&new_hazard("Odd reply")).await.unwrap();
    let temp_id = created.id().unwrap().to_string();

    h.network.set_online(true);
    h.gateway
        .set_create_reply(json!({ "taskHazard": { "id": "srv-9" } }))
        .await;
    let report = hazards.sync_pending().await.unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.pending, 0);

    for _ in 0..2 {
        hazards.sync_pending().await.unwrap();
    }
    assert_eq!(h.gateway.calls_of("create").await.len(), 1);
    assert!(h.row(Table::TaskHazards, &temp_id).await.is_none());
    assert!(h.queue(EntityKind::TaskHazard).await.is_empty());
}

#[tokio::test]
async fn online_update_with_expired_session_leaves_no_local_trace() {
    let h = setup(true).await;
    seed(&h, vec![hazard("h1", "One")]).await;

    h.gateway.set_mode(Mode::AuthExpired).await;
    let err = service(&h)
        .update("h1", &json!({ "scopeOfWork": "Edited" }))
        .await
        .unwrap_err();
    assert!(err.is_auth_expired());

    assert!(h.unsynced(Table::TaskHazards).await.is_empty());
    assert!(h.queue(EntityKind::TaskHazard).await.is_empty());
    let row = h.row(Table::TaskHazards, "h1").await.unwrap();
    assert_eq!(row["title"], "One");
}

#[tokio::test]
async fn repeated_offline_updates_collapse_into_one_entry() {
    let h = setup(true).await;
    seed(&h, vec![hazard("h1", "One")]).await;
    let hazards = service(&h);

    h.network.set_online(false);
    for location in ["Gate 1", "Gate 2", "Gate 3", "Gate 4"] {
        hazards
            .update("h1", &json!({ "location": location }))
            .await
            .unwrap();
    }

    let queue = h.queue(EntityKind::TaskHazard).await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].operation, SyncOperation::Update);
    assert_eq!(queue[0].data["location"], "Gate 4");
    assert_eq!(queue[0].data["scopeOfWork"], "One");
}

#[tokio::test]
async fn refreshing_the_same_listing_twice_is_stable() {
    let h = setup(true).await;
    let listing = vec![hazard("h1", "One"), hazard("h2", "Two"), hazard("h3", "Three")];
    let hazards = service(&h);

    hazards.cache_records(&listing, true).await.unwrap();
    let first = h.rows(Table::TaskHazards).await;
    hazards.cache_records(&listing, true).await.unwrap();
    let second = h.rows(Table::TaskHazards).await;

    let content = |rows: &[fieldsafe_lib::domain::entities::StoreRow]| {
        let mut seen: Vec<(Value, Value, Value)> = rows
            .iter()
            .map(|row| (row["id"].clone(), row["title"].clone(), row["metadata"].clone()))
            .collect();
        seen.sort_by_key(|(id, _, _)| id.to_string());
        seen
    };
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    assert_eq!(content(&first), content(&second));
}

#[tokio::test]
async fn partial_update_of_an_uncached_record_is_sent_as_is() {
    let h = setup(false).await;
    let hazards = service(&h);

    hazards
        .update("h7", &json!({ "location": "Pier 2" }))
        .await
        .unwrap();
    hazards
        .update("h7", &json!({ "time": "09:15" }))
        .await
        .unwrap();

    h.network.set_online(true);
    let report = hazards.sync_pending().await.unwrap();
    assert_eq!(report.synced, 1);

    let updates = h.gateway.calls_of("update").await;
    assert_eq!(updates.len(), 1);
    let body = updates[0].payload.as_ref().unwrap();
    assert_eq!(body, &json!({ "location": "Pier 2", "time": "09:15" }));
    assert!(body.get("risks").is_none());
}

#[tokio::test]
async fn entries_are_dropped_after_five_failed_attempts() {
    let h = setup(false).await;
    let hazards = service(&h);
    let created = hazards.create(&new_hazard("Doomed")).await.unwrap();
    let temp_id = created.id().unwrap().to_string();

    h.network.set_online(true);
    h.gateway.set_mode(Mode::Api(500)).await;
    for attempt in 1..=4u32 {
        let report = hazards.sync_pending().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.dropped, 0);
        let queue = h.queue(EntityKind::TaskHazard).await;
        assert_eq!(queue[0].retry_count, attempt);
        let row = h.row(Table::TaskHazards, &temp_id).await.unwrap();
        assert_eq!(synced_flag(&row), 0);
    }

    let report = hazards.sync_pending().await.unwrap();
    assert_eq!(report.dropped, 1);
    assert_eq!(report.pending, 0);
    assert!(h.queue(EntityKind::TaskHazard).await.is_empty());
    assert_eq!(h.gateway.calls_of("create").await.len(), 5);
}

#[tokio::test]
async fn network_failures_during_sync_do_not_count_as_retries() {
    let h = setup(false).await;
    let hazards = service(&h);
    let created = hazards.create(&new_hazard("Waiting")).await.unwrap();
    let temp_id = created.id().unwrap().to_string();

    h.network.set_online(true);
    h.gateway.set_mode(Mode::Network).await;
    for _ in 0..3 {
        let report = hazards.sync_pending().await.unwrap();
        assert_eq!(report.synced, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(report.pending, 1);
    }

    let queue = h.queue(EntityKind::TaskHazard).await;
    assert_eq!(queue[0].retry_count, 0);
    let row = h.row(Table::TaskHazards, &temp_id).await.unwrap();
    assert_eq!(synced_flag(&row), 0);
}

#[tokio::test]
async fn expired_session_aborts_the_sync_pass() {
    let h = setup(false).await;
    let hazards = service(&h);
    hazards.create(&new_hazard("First")).await.unwrap();
    hazards.create(&new_hazard("Second")).await.unwrap();

    h.network.set_online(true);
    h.gateway.set_mode(Mode::AuthExpired).await;
    let err = hazards.sync_pending().await.unwrap_err();
    assert!(err.is_auth_expired());

    assert_eq!(h.queue(EntityKind::TaskHazard).await.len(), 2);
    assert_eq!(h.unsynced(Table::TaskHazards).await.len(), 2);
    assert_eq!(h.gateway.calls_of("create").await.len(), 1);
}

#[tokio::test]
async fn second_sync_pass_reports_already_running() {
    let h = setup(true).await;
    let engine = EntitySyncService::new(h.ctx.clone(), h.gateway.clone(), Arc::new(TaskHazardMapper));

    let guard = engine.lock().try_acquire().expect("lock is free");
    let report = engine.sync_pending().await.unwrap();
    assert!(report.skipped);
    assert_eq!(report.message, SYNC_IN_PROGRESS_MESSAGE);
    guard.release();

    let report = engine.sync_pending().await.unwrap();
    assert!(!report.skipped);
}

#[tokio::test]
async fn mutations_require_a_session() {
    let h = setup(true).await;
    h.session.clear().await.unwrap();
    let hazards = service(&h);

    let err = hazards.create(&new_hazard("Nope")).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    assert!(matches!(
        hazards.delete("h1").await,
        Err(AppError::Unauthorized(_))
    ));
    assert_eq!(h.gateway.call_count().await, 0);
}

#[tokio::test]
async fn check_and_sync_respects_connectivity_and_debounce() {
    let h = setup_with_policy(false, short_debounce()).await;
    let hazards = service(&h);
    hazards.create(&new_hazard("Queued")).await.unwrap();

    assert!(hazards.check_and_sync().await.unwrap().is_none());

    h.network.set_online(true);
    let report = hazards.check_and_sync().await.unwrap().expect("ran");
    assert_eq!(report.synced, 1);

    // 保留なし
    assert!(hazards.check_and_sync().await.unwrap().is_none());

    h.gateway.set_mode(Mode::Network).await;
    hazards.create(&new_hazard("Queued again")).await.unwrap();
    h.gateway.set_mode(Mode::Ok).await;
    assert!(hazards.check_and_sync().await.unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(250)).await;
    let report = hazards.check_and_sync().await.unwrap().expect("ran after debounce");
    assert_eq!(report.synced, 1);
    assert_eq!(hazards.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn synced_payload_carries_guarded_risks() {
    let h = setup(false).await;
    let hazards = service(&h);
    let mut payload = new_hazard("No risks yet");
    payload["risks"] = json!([]);
    payload["individual"] = json!([{ "email": "a@example.com" }, { "name": "Bo" }]);
    hazards.create(&payload).await.unwrap();

    h.network.set_online(true);
    hazards.sync_pending().await.unwrap();

    let sent = h.gateway.calls_of("create").await;
    let body = sent[0].payload.as_ref().unwrap();
    let risks = body["risks"].as_array().unwrap();
    assert_eq!(risks.len(), 1);
    assert_eq!(risks[0]["riskDescription"], "No hazards specified");
    assert_eq!(risks[0]["responsiblePerson"], "sam@example.com");
    assert_eq!(body["individual"], "a@example.com, Bo");
}

/// 最初の remove_entry だけ、削除した後にエラーを返すキュー
struct FailAfterRemove {
    inner: Arc<SqliteLocalStore>,
    armed: AtomicBool,
}

#[async_trait]
impl SyncQueueStore for FailAfterRemove {
    async fn find_entry(
        &self,
        kind: EntityKind,
        entity_id: &EntityId,
    ) -> Result<Option<SyncQueueEntry>, AppError> {
        self.inner.find_entry(kind, entity_id).await
    }

    async fn insert_entry(&self, draft: SyncQueueDraft) -> Result<i64, AppError> {
        self.inner.insert_entry(draft).await
    }

    async fn update_entry(
        &self,
        id: i64,
        operation: SyncOperation,
        data: &Value,
    ) -> Result<(), AppError> {
        self.inner.update_entry(id, operation, data).await
    }

    async fn remove_entry(&self, id: i64) -> Result<(), AppError> {
        self.inner.remove_entry(id).await?;
        if self.armed.swap(false, Ordering::SeqCst) {
            return Err(AppError::Internal("disk hiccup".into()));
        }
        Ok(())
    }

    async fn remove_entries_for(
        &self,
        kind: EntityKind,
        entity_id: &EntityId,
    ) -> Result<u64, AppError> {
        self.inner.remove_entries_for(kind, entity_id).await
    }

    async fn list_entries(&self, kind: EntityKind) -> Result<Vec<SyncQueueEntry>, AppError> {
        self.inner.list_entries(kind).await
    }

    async fn count_entries(&self, kind: EntityKind) -> Result<u32, AppError> {
        self.inner.count_entries(kind).await
    }

    async fn increment_retry(&self, id: i64) -> Result<u32, AppError> {
        self.inner.increment_retry(id).await
    }
}

#[tokio::test]
async fn entry_settled_during_a_failed_commit_does_not_abort_the_pass() {
    let mut h = setup(true).await;
    seed(&h, vec![hazard("h1", "One"), hazard("h2", "Two")]).await;
    h.ctx.queue = Arc::new(FailAfterRemove {
        inner: h.store.clone(),
        armed: AtomicBool::new(true),
    });
    let hazards = service(&h);

    h.network.set_online(false);
    hazards.update("h1", &json!({ "location": "Bay 1" })).await.unwrap();
    hazards.update("h2", &json!({ "location": "Bay 2" })).await.unwrap();

    h.network.set_online(true);
    let report = hazards.sync_pending().await.unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.pending, 0);
    assert!(h.unsynced(Table::TaskHazards).await.is_empty());
    assert_eq!(h.gateway.calls_of("update").await.len(), 2);
}
