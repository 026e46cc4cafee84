use crate::application::ports::SessionProvider;
use crate::shared::config::SessionConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use keyring::Entry;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// OS のキーチェーンにトークンを保存するセッション。読み出し結果はメモリにも持つ。
pub struct KeyringSession {
    service: String,
    account: String,
    cached: RwLock<Option<String>>,
}

impl KeyringSession {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            service: config.keyring_service.clone(),
            account: config.keyring_account.clone(),
            cached: RwLock::new(None),
        }
    }

    fn entry(&self) -> Result<Entry, AppError> {
        Ok(Entry::new(&self.service, &self.account)?)
    }

    pub async fn store_token(&self, token: &str) -> Result<(), AppError> {
        self.entry()?.set_password(token)?;
        *self.cached.write().await = Some(token.to_string());
        debug!(target: "session", service = %self.service, "session token saved");
        Ok(())
    }

    /// キーチェーンから読み直す。エントリが無ければ None。
    pub async fn load(&self) -> Result<Option<String>, AppError> {
        let token = match self.entry()?.get_password() {
            Ok(token) => Some(token),
            Err(keyring::Error::NoEntry) => None,
            Err(err) => return Err(err.into()),
        };
        *self.cached.write().await = token.clone();
        Ok(token)
    }
}

#[async_trait]
impl SessionProvider for KeyringSession {
    async fn is_authenticated(&self) -> bool {
        self.token().await.is_some()
    }

    async fn token(&self) -> Option<String> {
        if let Some(token) = self.cached.read().await.clone() {
            return Some(token);
        }
        match self.load().await {
            Ok(token) => token,
            Err(err) => {
                error!(target: "session", error = %err, "failed to read session token");
                None
            }
        }
    }

    async fn clear(&self) -> Result<(), AppError> {
        *self.cached.write().await = None;
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
