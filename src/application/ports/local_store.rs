use crate::domain::entities::{StoreRow, SyncQueueDraft, SyncQueueEntry};
use crate::domain::value_objects::{EntityId, EntityKind, SyncOperation};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

const ENTITY_BASE_COLUMNS: [&str; 5] = ["id", "metadata", "synced", "created_at", "updated_at"];

/// ローカルストアが持つ固定のテーブル集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    TaskHazards,
    RiskAssessments,
    Approvals,
    Assets,
    Users,
    SyncQueue,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::TaskHazards,
        Table::RiskAssessments,
        Table::Approvals,
        Table::Assets,
        Table::Users,
        Table::SyncQueue,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::TaskHazards => "task_hazards",
            Table::RiskAssessments => "risk_assessments",
            Table::Approvals => "approvals",
            Table::Assets => "assets",
            Table::Users => "users",
            Table::SyncQueue => "sync_queue",
        }
    }

    pub fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::TaskHazard => Table::TaskHazards,
            EntityKind::RiskAssessment => Table::RiskAssessments,
            EntityKind::Approval => Table::Approvals,
            EntityKind::Asset => Table::Assets,
            EntityKind::User => Table::Users,
        }
    }

    /// ドメイン固有のスカラー列（共通列を除く）
    pub fn domain_columns(&self) -> &'static [&'static str] {
        match self {
            Table::TaskHazards | Table::RiskAssessments => {
                &["title", "date", "time", "location", "status", "supervisor"]
            }
            Table::Approvals => &["title", "date", "location", "status", "supervisor", "submitted_by"],
            Table::Assets => &["name", "code", "parent_id", "level", "status"],
            Table::Users => &["email", "name", "role", "status"],
            Table::SyncQueue => &[
                "entity_type",
                "entity_id",
                "operation",
                "data",
                "retry_count",
                "created_at",
            ],
        }
    }

    pub fn allows_column(&self, column: &str) -> bool {
        let is_base = match self {
            Table::SyncQueue => column == "id",
            _ => ENTITY_BASE_COLUMNS.contains(&column),
        };
        is_base || self.domain_columns().contains(&column)
    }

    /// 親子関係を持つテーブルの親参照列
    pub fn parent_column(&self) -> Option<&'static str> {
        match self {
            Table::Assets => Some("parent_id"),
            _ => None,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `get_all` に渡す WHERE 句とバインド値
#[derive(Debug, Clone, PartialEq)]
pub struct StoreFilter {
    pub clause: String,
    pub args: Vec<Value>,
}

impl StoreFilter {
    pub fn new(clause: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            clause: clause.into(),
            args,
        }
    }

    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::new(format!("{column} = ?"), vec![value.into()])
    }

    pub fn unsynced() -> Self {
        Self::new("synced = 0", Vec::new())
    }
}

/// 端末内の永続テーブルストア。
///
/// `initialize` は何度呼んでもよく、他の操作はすべて初期化完了を待ってから実行される。
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn initialize(&self) -> Result<(), AppError>;

    /// 同じ主キーの行が既にあれば `AppError::Constraint`
    async fn insert(&self, table: Table, row: StoreRow) -> Result<(), AppError>;

    /// 行が無ければ `AppError::NotFound`
    async fn update(&self, table: Table, id: &str, patch: StoreRow) -> Result<(), AppError>;

    /// 存在しない ID の削除はエラーにしない
    async fn delete(&self, table: Table, id: &str) -> Result<(), AppError>;

    async fn get_by_id(&self, table: Table, id: &str) -> Result<Option<StoreRow>, AppError>;

    async fn get_all(
        &self,
        table: Table,
        filter: Option<StoreFilter>,
    ) -> Result<Vec<StoreRow>, AppError>;

    /// 件数集計や一括削除のための生 SQL。影響行数を返す。
    async fn execute_query(&self, sql: &str, args: Vec<Value>) -> Result<u64, AppError>;

    async fn select_query(&self, sql: &str, args: Vec<Value>) -> Result<Vec<StoreRow>, AppError>;

    /// 複数行をまとめて insert-or-update する。
    ///
    /// 親参照列を持つテーブルでは読み込み中だけ外部キー制約を外し、
    /// 読み込み後に親が見つからない行は親参照を NULL にする。
    async fn bulk_upsert(&self, table: Table, rows: Vec<StoreRow>) -> Result<usize, AppError>;
}

#[async_trait]
pub trait SyncQueueStore: Send + Sync {
    async fn find_entry(
        &self,
        kind: EntityKind,
        entity_id: &EntityId,
    ) -> Result<Option<SyncQueueEntry>, AppError>;

    async fn insert_entry(&self, draft: SyncQueueDraft) -> Result<i64, AppError>;

    async fn update_entry(
        &self,
        id: i64,
        operation: SyncOperation,
        data: &Value,
    ) -> Result<(), AppError>;

    async fn remove_entry(&self, id: i64) -> Result<(), AppError>;

    async fn remove_entries_for(
        &self,
        kind: EntityKind,
        entity_id: &EntityId,
    ) -> Result<u64, AppError>;

    /// 作成順（古いものから）に返す
    async fn list_entries(&self, kind: EntityKind) -> Result<Vec<SyncQueueEntry>, AppError>;

    async fn count_entries(&self, kind: EntityKind) -> Result<u32, AppError>;

    /// 失敗回数を 1 増やし、増やした後の値を返す
    async fn increment_retry(&self, id: i64) -> Result<u32, AppError>;
}
