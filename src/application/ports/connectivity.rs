use tokio::sync::watch;

/// 端末のネットワーク状態
pub trait ConnectivityMonitor: Send + Sync {
    /// 現時点のスナップショット
    fn is_online(&self) -> bool;

    /// 状態が変化したときだけ通知される受信側
    fn subscribe(&self) -> watch::Receiver<bool>;
}
