use serde::Serialize;
use thiserror::Error;

/// オーケストレーターが分岐に使うエラーの判別子。
///
/// メッセージ文字列ではなくこの値で「ネットワーク系か」「認証切れか」を判定する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// セッション失効（`AUTH_EXPIRED`）。キャッシュでの回避も再試行もしない。
    Auth,
    /// 到達不能・タイムアウトなどの一時的な通信失敗。
    Network,
    /// リモートまたはローカルで対象が存在しない。
    NotFound,
    /// 上記以外のサーバー応答（4xx/5xx）。
    Server,
    /// ローカルストアや入力検証などクライアント側の失敗。
    Local,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Session expired: {0}")]
    AuthExpired(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("{0}")]
    ConnectionRequired(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn api(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        AppError::Api {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::AuthExpired(_) => ErrorKind::Auth,
            AppError::Network(_) => ErrorKind::Network,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Api { status, code, .. } => {
                if *status == 404 || code.as_deref() == Some("NOT_FOUND") {
                    ErrorKind::NotFound
                } else {
                    ErrorKind::Server
                }
            }
            _ => ErrorKind::Local,
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }

    pub fn is_network(&self) -> bool {
        self.kind() == ErrorKind::Network
    }

    /// 削除の再送で「既に消えている」とみなせる応答か。
    ///
    /// サーバーは存在しない ID の削除に 404 だけでなく 400 を返すことがある。
    pub fn is_gone_on_remote(&self) -> bool {
        match self {
            AppError::Api { status, .. } if *status == 400 => true,
            other => other.kind() == ErrorKind::NotFound,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound(err.to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Constraint(db_err.message().to_string())
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            AppError::Network(err.to_string())
        } else if err.is_decode() {
            AppError::DeserializationError(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<keyring::Error> for AppError {
    fn from(err: keyring::Error) -> Self {
        AppError::Internal(format!("Keyring error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
