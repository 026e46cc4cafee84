use crate::shared::error::AppError;
use async_trait::async_trait;

/// 認証状態の提供元
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn is_authenticated(&self) -> bool;
    async fn token(&self) -> Option<String>;
    /// 保存済みの資格情報を破棄する（`AUTH_EXPIRED` 受信時）
    async fn clear(&self) -> Result<(), AppError>;
}
