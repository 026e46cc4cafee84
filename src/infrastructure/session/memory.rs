use crate::application::ports::SessionProvider;
use crate::shared::error::AppError;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// プロセス内だけで保持するセッション
#[derive(Debug, Default)]
pub struct InMemorySession {
    token: RwLock<Option<String>>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }
}

#[async_trait]
impl SessionProvider for InMemorySession {
    async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    async fn clear(&self) -> Result<(), AppError> {
        *self.token.write().await = None;
        Ok(())
    }
}
