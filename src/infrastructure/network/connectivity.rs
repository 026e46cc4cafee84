use crate::application::ports::ConnectivityMonitor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// 端末のオンライン状態を保持し、変化したときだけ購読者へ通知する
#[derive(Debug)]
pub struct NetworkStatus {
    tx: watch::Sender<bool>,
}

impl NetworkStatus {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx }
    }

    /// プラットフォームのネットワーク API から呼ぶ。状態が変わったら true。
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(target: "connectivity", online, "network state changed");
        }
        changed
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ConnectivityMonitor for NetworkStatus {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// プラットフォームの通知が無い環境向けに、API のヘルスエンドポイントを定期的に叩く
#[derive(Clone)]
pub struct ReachabilityProbe {
    http: reqwest::Client,
    url: String,
}

impl ReachabilityProbe {
    pub fn new(base_url: &str, health_path: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            url: format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                health_path.trim_start_matches('/')
            ),
        }
    }

    /// 応答が返れば（5xx を除き）到達可能とみなす
    pub async fn check(&self) -> bool {
        match self.http.get(&self.url).send().await {
            Ok(response) => !response.status().is_server_error(),
            Err(err) => {
                debug!(target: "connectivity", url = %self.url, error = %err, "reachability probe failed");
                false
            }
        }
    }

    pub fn spawn(self, status: Arc<NetworkStatus>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let online = self.check().await;
                status.set_online(online);
            }
        })
    }
}
