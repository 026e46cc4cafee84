#![allow(dead_code)]

use async_trait::async_trait;
use fieldsafe_lib::application::ports::{
    ApprovalGateway, EntityGateway, ListParams, LocalStore, StoreFilter, SyncQueueStore, Table,
};
use fieldsafe_lib::application::services::{SyncContext, SyncPolicy};
use fieldsafe_lib::domain::entities::{StoreRow, SyncQueueEntry};
use fieldsafe_lib::domain::value_objects::{ApprovalDecision, EntityKind};
use fieldsafe_lib::infrastructure::{
    ConnectionPool, InMemorySession, NetworkStatus, SqliteLocalStore,
};
use fieldsafe_lib::AppError;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// モックの応答モード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Ok,
    Network,
    AuthExpired,
    Api(u16),
}

impl Mode {
    fn error(self) -> Option<AppError> {
        match self {
            Mode::Ok => None,
            Mode::Network => Some(AppError::Network("connection refused".into())),
            Mode::AuthExpired => Some(AppError::AuthExpired("Token expired".into())),
            Mode::Api(status) => Some(AppError::api(status, None, format!("server said {status}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub op: &'static str,
    pub id: Option<String>,
    pub payload: Option<Value>,
}

/// 呼び出しを記録する EntityGateway。create は `srv-<連番>` を採番して返す。
pub struct MockGateway {
    mode: Mutex<Mode>,
    calls: Mutex<Vec<Call>>,
    records: Mutex<Vec<Value>>,
    create_reply: Mutex<Option<Value>>,
    next_id: AtomicU64,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(Mode::Ok),
            calls: Mutex::new(Vec::new()),
            records: Mutex::new(Vec::new()),
            create_reply: Mutex::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    pub async fn set_mode(&self, mode: Mode) {
        *self.mode.lock().await = mode;
    }

    pub async fn set_records(&self, records: Vec<Value>) {
        *self.records.lock().await = records;
    }

    /// create の応答をそのまま差し替える
    pub async fn set_create_reply(&self, reply: Value) {
        *self.create_reply.lock().await = Some(reply);
    }

    pub async fn calls_of(&self, op: &str) -> Vec<Call> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.op == op)
            .cloned()
            .collect()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    async fn record(
        &self,
        op: &'static str,
        id: Option<&str>,
        payload: Option<&Value>,
    ) -> Result<(), AppError> {
        self.calls.lock().await.push(Call {
            op,
            id: id.map(str::to_string),
            payload: payload.cloned(),
        });
        match self.mode.lock().await.error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn with_id(payload: &Value, id: &str) -> Value {
    let mut map = payload.as_object().cloned().unwrap_or_default();
    map.insert("id".into(), Value::String(id.to_string()));
    Value::Object(map)
}

#[async_trait]
impl EntityGateway for MockGateway {
    async fn create(&self, payload: &Value) -> Result<Value, AppError> {
        self.record("create", None, Some(payload)).await?;
        if let Some(reply) = self.create_reply.lock().await.clone() {
            return Ok(reply);
        }
        let id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        Ok(with_id(payload, &id))
    }

    async fn get_all(&self, params: &ListParams) -> Result<Vec<Value>, AppError> {
        let query = json!(params);
        self.record("get_all", None, Some(&query)).await?;
        Ok(self.records.lock().await.clone())
    }

    async fn get_one(&self, id: &str) -> Result<Value, AppError> {
        self.record("get_one", Some(id), None).await?;
        self.records
            .lock()
            .await
            .iter()
            .find(|record| record["id"] == id)
            .cloned()
            .ok_or_else(|| AppError::api(404, Some("NOT_FOUND".into()), "Not found"))
    }

    async fn update(&self, id: &str, payload: &Value) -> Result<Value, AppError> {
        self.record("update", Some(id), Some(payload)).await?;
        Ok(with_id(payload, id))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.record("delete", Some(id), None).await
    }
}

/// 承認エンドポイントのモック
pub struct MockApprovals {
    mode: Mutex<Mode>,
    pending: Mutex<Vec<Value>>,
    processed: Mutex<Vec<(String, ApprovalDecision)>>,
}

impl MockApprovals {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(Mode::Ok),
            pending: Mutex::new(Vec::new()),
            processed: Mutex::new(Vec::new()),
        })
    }

    pub async fn set_mode(&self, mode: Mode) {
        *self.mode.lock().await = mode;
    }

    pub async fn set_pending(&self, pending: Vec<Value>) {
        *self.pending.lock().await = pending;
    }

    pub async fn processed(&self) -> Vec<(String, ApprovalDecision)> {
        self.processed.lock().await.clone()
    }
}

#[async_trait]
impl ApprovalGateway for MockApprovals {
    async fn get_approvals(&self, _params: &ListParams) -> Result<Vec<Value>, AppError> {
        if let Some(err) = self.mode.lock().await.error() {
            return Err(err);
        }
        Ok(self.pending.lock().await.clone())
    }

    async fn process_approval(
        &self,
        id: &str,
        decision: &ApprovalDecision,
    ) -> Result<Value, AppError> {
        if let Some(err) = self.mode.lock().await.error() {
            return Err(err);
        }
        self.processed
            .lock()
            .await
            .push((id.to_string(), decision.clone()));
        Ok(json!({ "id": id, "status": decision.status.as_str() }))
    }
}

pub struct Harness {
    pub store: Arc<SqliteLocalStore>,
    pub network: Arc<NetworkStatus>,
    pub session: Arc<InMemorySession>,
    pub gateway: Arc<MockGateway>,
    pub ctx: SyncContext,
}

pub async fn setup(online: bool) -> Harness {
    setup_with_policy(online, SyncPolicy::default()).await
}

pub async fn setup_with_policy(online: bool, policy: SyncPolicy) -> Harness {
    let pool = ConnectionPool::from_memory()
        .await
        .expect("in-memory sqlite");
    let store = Arc::new(SqliteLocalStore::new(pool));
    store.initialize().await.expect("schema");
    let network = Arc::new(NetworkStatus::new(online));
    let session = Arc::new(InMemorySession::with_token("token-1"));
    let ctx = SyncContext {
        store: store.clone(),
        queue: store.clone(),
        connectivity: network.clone(),
        session: session.clone(),
        policy,
    };
    Harness {
        store,
        network,
        session,
        gateway: MockGateway::new(),
        ctx,
    }
}

pub fn short_debounce() -> SyncPolicy {
    SyncPolicy {
        max_retries: 5,
        debounce: Duration::from_millis(200),
    }
}

impl Harness {
    pub async fn rows(&self, table: Table) -> Vec<StoreRow> {
        self.store.get_all(table, None).await.expect("rows")
    }

    pub async fn row(&self, table: Table, id: &str) -> Option<StoreRow> {
        self.store.get_by_id(table, id).await.expect("row")
    }

    pub async fn unsynced(&self, table: Table) -> Vec<StoreRow> {
        self.store
            .get_all(table, Some(StoreFilter::unsynced()))
            .await
            .expect("unsynced rows")
    }

    pub async fn queue(&self, kind: EntityKind) -> Vec<SyncQueueEntry> {
        self.store.list_entries(kind).await.expect("queue")
    }
}

pub fn synced_flag(row: &StoreRow) -> i64 {
    row.get("synced").and_then(Value::as_i64).unwrap_or(-1)
}

pub fn hazard(id: &str, scope: &str) -> Value {
    json!({
        "id": id,
        "scopeOfWork": scope,
        "date": "2026-03-01",
        "time": "07:00",
        "location": "North yard",
        "status": "Pending",
        "supervisor": "sam@example.com",
        "risks": [{
            "riskDescription": "Slip on wet deck",
            "asIsLikelihood": 2,
            "asIsConsequence": 3,
            "mitigatedLikelihood": 1,
            "mitigatedConsequence": 2,
            "responsiblePerson": "sam@example.com"
        }]
    })
}

pub fn new_hazard(scope: &str) -> Value {
    let mut record = hazard("ignored", scope);
    if let Some(map) = record.as_object_mut() {
        map.remove("id");
    }
    record
}
