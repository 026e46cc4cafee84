use crate::application::ports::ConnectivityMonitor;
use crate::domain::entities::SyncReport;
use crate::domain::value_objects::EntityKind;
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[async_trait]
pub trait SyncParticipant: Send + Sync {
    fn kind(&self) -> EntityKind;

    async fn sync_pending(&self) -> Result<SyncReport, AppError>;

    /// オンライン・保留あり・debounce 経過のときだけ `sync_pending` を呼ぶ
    async fn check_and_sync(&self) -> Result<Option<SyncReport>, AppError>;

    async fn pending_count(&self) -> Result<u32, AppError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    pub is_syncing: bool,
    pub pending: BTreeMap<String, u32>,
    pub last_sync: Option<i64>,
    pub sync_errors: u32,
}

impl SyncStatus {
    pub fn total_pending(&self) -> u32 {
        self.pending.values().sum()
    }
}

/// 全ドメインの同期をまとめて扱う窓口
#[derive(Clone)]
pub struct SyncService {
    connectivity: Arc<dyn ConnectivityMonitor>,
    participants: Vec<Arc<dyn SyncParticipant>>,
    status: Arc<RwLock<SyncStatus>>,
}

impl SyncService {
    pub fn new(
        connectivity: Arc<dyn ConnectivityMonitor>,
        participants: Vec<Arc<dyn SyncParticipant>>,
    ) -> Self {
        Self {
            connectivity,
            participants,
            status: Arc::new(RwLock::new(SyncStatus::default())),
        }
    }

    pub fn participants(&self) -> &[Arc<dyn SyncParticipant>] {
        &self.participants
    }

    /// 各ドメインを順番に同期する。認証切れだけは即座に返す。
    pub async fn sync_all(&self) -> Result<Vec<SyncReport>, AppError> {
        if !self.connectivity.is_online() {
            return Ok(self
                .participants
                .iter()
                .map(|p| SyncReport::skipped(p.kind(), "Device is offline"))
                .collect());
        }

        {
            let mut status = self.status.write().await;
            if status.is_syncing {
                return Ok(self
                    .participants
                    .iter()
                    .map(|p| SyncReport::already_running(p.kind()))
                    .collect());
            }
            status.is_syncing = true;
        }

        let mut reports = Vec::with_capacity(self.participants.len());
        let mut errors = 0u32;
        let mut outcome = Ok(());
        for participant in &self.participants {
            match participant.sync_pending().await {
                Ok(report) => {
                    errors += report.failed;
                    reports.push(report);
                }
                Err(err) if err.is_auth_expired() => {
                    outcome = Err(err);
                    break;
                }
                Err(err) => {
                    error!(
                        target: "offline::sync",
                        entity = %participant.kind(),
                        error = %err,
                        "sync pass failed"
                    );
                    errors += 1;
                }
            }
        }

        {
            let mut status = self.status.write().await;
            status.is_syncing = false;
            status.sync_errors += errors;
            if outcome.is_ok() {
                status.last_sync = Some(chrono::Utc::now().timestamp());
            }
        }
        self.refresh_pending().await;

        outcome.map(|()| reports)
    }

    pub async fn get_status(&self) -> SyncStatus {
        self.refresh_pending().await;
        self.status.read().await.clone()
    }

    pub async fn reset_errors(&self) {
        self.status.write().await.sync_errors = 0;
    }

    async fn refresh_pending(&self) {
        let mut counts = BTreeMap::new();
        for participant in &self.participants {
            match participant.pending_count().await {
                Ok(count) => {
                    counts.insert(participant.kind().to_string(), count);
                }
                Err(err) => warn!(
                    target: "offline::sync",
                    entity = %participant.kind(),
                    error = %err,
                    "failed to count pending entries"
                ),
            }
        }
        self.status.write().await.pending = counts;
    }

    /// ドメインごとにスケジューラーを起動する
    pub fn start_auto_sync(&self, interval: Duration) -> Vec<AutoSyncHandle> {
        self.participants
            .iter()
            .map(|participant| {
                AutoSyncScheduler::start(
                    Arc::clone(participant),
                    Arc::clone(&self.connectivity),
                    interval,
                )
            })
            .collect()
    }
}

/// 定期タイマーと接続復帰イベントで `check_and_sync` を呼ぶ。
pub struct AutoSyncScheduler;

impl AutoSyncScheduler {
    pub fn start(
        participant: Arc<dyn SyncParticipant>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        period: Duration,
    ) -> AutoSyncHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let kind = participant.kind();
        let mut status_rx = connectivity.subscribe();
        let mut was_online = *status_rx.borrow_and_update();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                target: "offline::scheduler",
                entity = %kind,
                period_secs = period.as_secs(),
                "auto sync started"
            );

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        run_check(participant.as_ref(), "timer").await;
                    }
                    changed = status_rx.changed() => {
                        if changed.is_err() {
                            debug!(target: "offline::scheduler", entity = %kind, "connectivity source closed");
                            break;
                        }
                        let online = *status_rx.borrow_and_update();
                        if online && !was_online {
                            run_check(participant.as_ref(), "reconnect").await;
                        }
                        was_online = online;
                    }
                }
            }

            info!(target: "offline::scheduler", entity = %kind, "auto sync stopped");
        });

        AutoSyncHandle {
            kind,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

async fn run_check(participant: &dyn SyncParticipant, trigger: &'static str) {
    match participant.check_and_sync().await {
        Ok(Some(report)) => debug!(
            target: "offline::scheduler",
            entity = %participant.kind(),
            trigger,
            synced = report.synced,
            failed = report.failed,
            skipped = report.skipped,
            "auto sync ran"
        ),
        Ok(None) => {}
        Err(err) if err.is_auth_expired() => warn!(
            target: "offline::scheduler",
            entity = %participant.kind(),
            trigger,
            "session expired, auto sync waiting for login"
        ),
        Err(err) => error!(
            target: "offline::scheduler",
            entity = %participant.kind(),
            trigger,
            error = %err,
            "auto sync failed"
        ),
    }
}

/// スケジューラーの停止ハンドル。drop でもタスクは止まる。
pub struct AutoSyncHandle {
    kind: EntityKind,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl AutoSyncHandle {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// タイマーと接続監視を解除し、実行中のパスが終わるのを待つ
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    error!(target: "offline::scheduler", entity = %self.kind, error = %err, "auto sync task panicked");
                }
            }
        }
    }
}

impl Drop for AutoSyncHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
