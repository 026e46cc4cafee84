use crate::application::ports::{ConnectivityMonitor, SessionProvider};
use crate::application::services::{
    ApprovalService, AssetService, RiskAssessmentService, SyncContext, SyncPolicy, SyncService,
    TaskHazardService, UserService,
};
use crate::infrastructure::{
    ApiClient, ConnectionPool, HttpApprovalGateway, HttpEntityGateway, KeyringSession,
    NetworkStatus, SqliteLocalStore,
};
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::path::Path;
use std::sync::Arc;

/// アプリケーション全体の状態を管理する構造体
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<SqliteLocalStore>,
    pub network: Arc<NetworkStatus>,
    pub session: Arc<dyn SessionProvider>,
    pub task_hazards: TaskHazardService,
    pub risk_assessments: RiskAssessmentService,
    pub approvals: ApprovalService,
    pub assets: AssetService,
    pub users: UserService,
    pub sync: SyncService,
}

impl AppState {
    /// 設定どおりの SQLite とキーチェーンのセッションで組み立てる
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        ensure_database_dir(&config.database.url)?;
        let pool = ConnectionPool::from_config(&config.database).await?;
        let session: Arc<dyn SessionProvider> = Arc::new(KeyringSession::new(&config.session));
        let network = Arc::new(NetworkStatus::new(false));
        Ok(Self::with_parts(config, pool, session, network)?)
    }

    pub fn with_parts(
        config: AppConfig,
        pool: ConnectionPool,
        session: Arc<dyn SessionProvider>,
        network: Arc<NetworkStatus>,
    ) -> Result<Self, AppError> {
        let store = Arc::new(SqliteLocalStore::new(pool));
        let client = ApiClient::new(&config.api, Arc::clone(&session))?;
        let connectivity: Arc<dyn ConnectivityMonitor> = network.clone();

        let ctx = SyncContext {
            store: store.clone(),
            queue: store.clone(),
            connectivity: Arc::clone(&connectivity),
            session: Arc::clone(&session),
            policy: SyncPolicy::from(&config.sync),
        };

        let task_hazards = TaskHazardService::new(
            ctx.clone(),
            Arc::new(HttpEntityGateway::new(client.clone(), "task-hazards")),
        );
        let risk_assessments = RiskAssessmentService::new(
            ctx.clone(),
            Arc::new(HttpEntityGateway::new(client.clone(), "risk-assessments")),
        );
        let approvals = ApprovalService::new(
            ctx.clone(),
            Arc::new(HttpEntityGateway::new(client.clone(), "approvals")),
            Arc::new(HttpApprovalGateway::new(client.clone())),
        );
        let assets = AssetService::new(
            ctx.clone(),
            Arc::new(HttpEntityGateway::new(client.clone(), "assets")),
        );
        let users = UserService::new(ctx, Arc::new(HttpEntityGateway::new(client, "users")));

        let sync = SyncService::new(
            connectivity,
            vec![
                task_hazards.participant(),
                risk_assessments.participant(),
                approvals.participant(),
                assets.participant(),
            ],
        );

        Ok(Self {
            config,
            store,
            network,
            session,
            task_hazards,
            risk_assessments,
            approvals,
            assets,
            users,
            sync,
        })
    }
}

/// `sqlite:data/x.db?mode=rwc` のようなファイル DB の親ディレクトリを作る
fn ensure_database_dir(url: &str) -> std::io::Result<()> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return Ok(());
    }
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
