use super::connection_pool::ConnectionPool;
use super::rows::SyncQueueRow;
use crate::application::ports::{LocalStore, StoreFilter, SyncQueueStore, Table};
use crate::domain::entities::{StoreRow, SyncQueueDraft, SyncQueueEntry};
use crate::domain::value_objects::{EntityId, EntityKind, SyncOperation};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row, Sqlite, TypeInfo, ValueRef};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(flag) => query.bind(i64::from(*flag)),
        Value::Number(n) => {
            if let Some(int) = n.as_i64() {
                query.bind(int)
            } else if let Some(float) = n.as_f64() {
                query.bind(float)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::String(text) => query.bind(text.clone()),
        nested => query.bind(nested.to_string()),
    }
}

fn bind_all<'q>(mut query: SqliteQuery<'q>, values: &[Value]) -> SqliteQuery<'q> {
    for value in values {
        query = bind_value(query, value);
    }
    query
}

/// 動的な列集合の行を JSON マップに読み出す
fn row_to_map(row: &SqliteRow) -> Result<StoreRow, AppError> {
    let mut map = Map::new();
    for column in row.columns() {
        let index = column.ordinal();
        let (is_null, type_name) = {
            let raw = row.try_get_raw(index)?;
            (raw.is_null(), raw.type_info().name().to_string())
        };
        let value = if is_null {
            Value::Null
        } else {
            match type_name.as_str() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(index)?),
                "REAL" => Number::from_f64(row.try_get::<f64, _>(index)?)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "BLOB" => {
                    let bytes: Vec<u8> = row.try_get(index)?;
                    Value::String(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => Value::String(row.try_get::<String, _>(index)?),
            }
        };
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

fn checked_columns(table: Table, row: &StoreRow) -> Result<Vec<(String, Value)>, AppError> {
    row.iter()
        .map(|(column, value)| {
            if table.allows_column(column) {
                Ok((column.clone(), value.clone()))
            } else {
                Err(AppError::ValidationError(format!(
                    "Unknown column {column} for table {table}"
                )))
            }
        })
        .collect()
}

/// SQLite 上のオフラインキャッシュと同期キュー。
///
/// スキーマ作成は最初の利用時に 1 度だけ走り、並行する呼び出しはその完了を待つ。
pub struct SqliteLocalStore {
    pool: ConnectionPool,
    ready: OnceCell<()>,
}

impl SqliteLocalStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            ready: OnceCell::new(),
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    async fn ready(&self) -> Result<(), AppError> {
        self.ready
            .get_or_try_init(|| async {
                self.pool
                    .migrate()
                    .await
                    .map_err(|err| AppError::Database(format!("Schema setup failed: {err}")))?;
                info!(target: "offline::store", "local store ready");
                Ok::<(), AppError>(())
            })
            .await
            .map(|_| ())
    }

    /// 親が見つからない親参照を NULL にする（値は metadata 側に残っている）
    async fn tolerate_parent(&self, table: Table, row: &mut StoreRow) -> Result<(), AppError> {
        let Some(parent_column) = table.parent_column() else {
            return Ok(());
        };
        let parent_id = match row.get(parent_column) {
            Some(Value::String(parent)) => parent.clone(),
            _ => return Ok(()),
        };
        let sql = format!("SELECT 1 FROM {} WHERE id = ?", table.name());
        let exists = sqlx::query(&sql)
            .bind(&parent_id)
            .fetch_optional(self.pool.get_pool())
            .await?
            .is_some();
        if !exists {
            debug!(
                target: "offline::store",
                table = %table,
                parent_id = %parent_id,
                "parent not cached, clearing parent link"
            );
            row.insert(parent_column.to_string(), Value::Null);
        }
        Ok(())
    }

    async fn upsert_rows(
        conn: &mut SqliteConnection,
        table: Table,
        rows: &[StoreRow],
    ) -> Result<usize, AppError> {
        let mut tx = conn.begin().await?;
        for row in rows {
            let columns = checked_columns(table, row)?;
            let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
            let placeholders = vec!["?"; names.len()].join(", ");
            let updates: Vec<String> = names
                .iter()
                .filter(|name| **name != "id")
                .map(|name| format!("{name} = excluded.{name}"))
                .collect();
            let conflict = if updates.is_empty() {
                "DO NOTHING".to_string()
            } else {
                format!("DO UPDATE SET {}", updates.join(", "))
            };
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) {}",
                table.name(),
                names.join(", "),
                placeholders,
                conflict
            );
            let values: Vec<Value> = columns.into_iter().map(|(_, value)| value).collect();
            bind_all(sqlx::query(&sql), &values)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(parent) = table.parent_column() {
            let sql = format!(
                "UPDATE {t} SET {p} = NULL WHERE {p} IS NOT NULL AND {p} NOT IN (SELECT id FROM {t})",
                t = table.name(),
                p = parent
            );
            let orphans = sqlx::query(&sql).execute(&mut *tx).await?.rows_affected();
            if orphans > 0 {
                warn!(
                    target: "offline::store",
                    table = %table,
                    orphans,
                    "cleared parent links with no cached parent"
                );
            }
        }

        tx.commit().await?;
        Ok(rows.len())
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn initialize(&self) -> Result<(), AppError> {
        self.ready().await
    }

    async fn insert(&self, table: Table, mut row: StoreRow) -> Result<(), AppError> {
        self.ready().await?;
        self.tolerate_parent(table, &mut row).await?;
        let columns = checked_columns(table, &row)?;
        if columns.is_empty() {
            return Err(AppError::ValidationError(format!(
                "Cannot insert an empty row into {table}"
            )));
        }
        let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name(),
            names.join(", "),
            vec!["?"; names.len()].join(", ")
        );
        let values: Vec<Value> = columns.iter().map(|(_, value)| value.clone()).collect();
        bind_all(sqlx::query(&sql), &values)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn update(&self, table: Table, id: &str, mut patch: StoreRow) -> Result<(), AppError> {
        self.ready().await?;
        patch.remove("id");
        self.tolerate_parent(table, &mut patch).await?;
        let columns = checked_columns(table, &patch)?;

        if columns.is_empty() {
            return match self.get_by_id(table, id).await? {
                Some(_) => Ok(()),
                None => Err(AppError::NotFound(format!("{table} row {id}"))),
            };
        }

        let assignments: Vec<String> = columns
            .iter()
            .map(|(name, _)| format!("{name} = ?"))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?",
            table.name(),
            assignments.join(", ")
        );
        let mut values: Vec<Value> = columns.into_iter().map(|(_, value)| value).collect();
        values.push(Value::String(id.to_string()));

        let affected = bind_all(sqlx::query(&sql), &values)
            .execute(self.pool.get_pool())
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(AppError::NotFound(format!("{table} row {id}")));
        }
        Ok(())
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), AppError> {
        self.ready().await?;
        let sql = format!("DELETE FROM {} WHERE id = ?", table.name());
        sqlx::query(&sql)
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn get_by_id(&self, table: Table, id: &str) -> Result<Option<StoreRow>, AppError> {
        self.ready().await?;
        let sql = format!("SELECT * FROM {} WHERE id = ?", table.name());
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.get_pool())
            .await?;
        row.as_ref().map(row_to_map).transpose()
    }

    async fn get_all(
        &self,
        table: Table,
        filter: Option<StoreFilter>,
    ) -> Result<Vec<StoreRow>, AppError> {
        self.ready().await?;
        let (sql, args) = match filter {
            Some(filter) => (
                format!("SELECT * FROM {} WHERE {}", table.name(), filter.clause),
                filter.args,
            ),
            None => (format!("SELECT * FROM {}", table.name()), Vec::new()),
        };
        let rows = bind_all(sqlx::query(&sql), &args)
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.iter().map(row_to_map).collect()
    }

    async fn execute_query(&self, sql: &str, args: Vec<Value>) -> Result<u64, AppError> {
        self.ready().await?;
        let result = bind_all(sqlx::query(sql), &args)
            .execute(self.pool.get_pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn select_query(&self, sql: &str, args: Vec<Value>) -> Result<Vec<StoreRow>, AppError> {
        self.ready().await?;
        let rows = bind_all(sqlx::query(sql), &args)
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.iter().map(row_to_map).collect()
    }

    async fn bulk_upsert(&self, table: Table, rows: Vec<StoreRow>) -> Result<usize, AppError> {
        self.ready().await?;
        if rows.is_empty() {
            return Ok(0);
        }

        let mut conn = self.pool.get_pool().acquire().await?;
        let hierarchical = table.parent_column().is_some();
        if hierarchical {
            // PRAGMA はトランザクション外でのみ効く
            sqlx::query("PRAGMA foreign_keys = OFF")
                .execute(&mut *conn)
                .await?;
        }

        let result = Self::upsert_rows(&mut *conn, table, &rows).await;

        if hierarchical {
            if let Err(err) = sqlx::query("PRAGMA foreign_keys = ON")
                .execute(&mut *conn)
                .await
            {
                warn!(
                    target: "offline::store",
                    error = %err,
                    "failed to re-enable foreign keys, discarding connection"
                );
                conn.detach();
            }
        }

        let written = result?;
        debug!(target: "offline::store", table = %table, written, "bulk upsert finished");
        Ok(written)
    }
}

#[async_trait]
impl SyncQueueStore for SqliteLocalStore {
    async fn find_entry(
        &self,
        kind: EntityKind,
        entity_id: &EntityId,
    ) -> Result<Option<SyncQueueEntry>, AppError> {
        self.ready().await?;
        let row = sqlx::query_as::<_, SyncQueueRow>(
            r#"
            SELECT id, entity_type, entity_id, operation, data, retry_count, created_at
            FROM sync_queue
            WHERE entity_type = ? AND entity_id = ?
            "#,
        )
        .bind(kind.as_str())
        .bind(entity_id.as_str())
        .fetch_optional(self.pool.get_pool())
        .await?;
        row.map(SyncQueueEntry::try_from).transpose()
    }

    async fn insert_entry(&self, draft: SyncQueueDraft) -> Result<i64, AppError> {
        self.ready().await?;
        let data = serde_json::to_string(&draft.data)?;
        let result = sqlx::query(
            r#"
            INSERT INTO sync_queue (entity_type, entity_id, operation, data, retry_count, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(draft.entity_type.as_str())
        .bind(draft.entity_id.as_str())
        .bind(draft.operation.as_str())
        .bind(&data)
        .bind(chrono::Utc::now().timestamp())
        .execute(self.pool.get_pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update_entry(
        &self,
        id: i64,
        operation: SyncOperation,
        data: &Value,
    ) -> Result<(), AppError> {
        self.ready().await?;
        let data = serde_json::to_string(data)?;
        let affected = sqlx::query("UPDATE sync_queue SET operation = ?, data = ? WHERE id = ?")
            .bind(operation.as_str())
            .bind(&data)
            .bind(id)
            .execute(self.pool.get_pool())
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(AppError::NotFound(format!("sync_queue entry {id}")));
        }
        Ok(())
    }

    async fn remove_entry(&self, id: i64) -> Result<(), AppError> {
        self.ready().await?;
        sqlx::query("DELETE FROM sync_queue WHERE id = ?")
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn remove_entries_for(
        &self,
        kind: EntityKind,
        entity_id: &EntityId,
    ) -> Result<u64, AppError> {
        self.ready().await?;
        let result = sqlx::query("DELETE FROM sync_queue WHERE entity_type = ? AND entity_id = ?")
            .bind(kind.as_str())
            .bind(entity_id.as_str())
            .execute(self.pool.get_pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_entries(&self, kind: EntityKind) -> Result<Vec<SyncQueueEntry>, AppError> {
        self.ready().await?;
        let rows = sqlx::query_as::<_, SyncQueueRow>(
            r#"
            SELECT id, entity_type, entity_id, operation, data, retry_count, created_at
            FROM sync_queue
            WHERE entity_type = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(kind.as_str())
        .fetch_all(self.pool.get_pool())
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let queue_id = row.id;
            match SyncQueueEntry::try_from(row) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(
                    target: "offline::store",
                    queue_id,
                    error = %err,
                    "skipping unreadable queue entry"
                ),
            }
        }
        Ok(entries)
    }

    async fn count_entries(&self, kind: EntityKind) -> Result<u32, AppError> {
        self.ready().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_queue WHERE entity_type = ?")
            .bind(kind.as_str())
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn increment_retry(&self, id: i64) -> Result<u32, AppError> {
        self.ready().await?;
        let retries: Option<i64> = sqlx::query_scalar(
            "UPDATE sync_queue SET retry_count = retry_count + 1 WHERE id = ? RETURNING retry_count",
        )
        .bind(id)
        .fetch_optional(self.pool.get_pool())
        .await?;
        match retries {
            Some(count) => Ok(u32::try_from(count).unwrap_or(u32::MAX)),
            None => Err(AppError::NotFound(format!("sync_queue entry {id}"))),
        }
    }
}
