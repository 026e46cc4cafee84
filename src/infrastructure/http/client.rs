use crate::application::ports::{ListParams, SessionProvider};
use crate::shared::config::ApiConfig;
use crate::shared::error::AppError;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

const AUTH_EXPIRED_CODES: [&str; 2] = ["INVALID_TOKEN", "TOKEN_EXPIRED"];

/// REST API への共通クライアント。
///
/// 失敗は境界で `AuthExpired` / `Network` / `Api` に分類し、認証切れの場合は
/// 保存済みセッションを消してから返す。
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    session: Arc<dyn SessionProvider>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: Arc<dyn SessionProvider>) -> Result<Self, AppError> {
        let trimmed = config.base_url.trim();
        if trimmed.is_empty() {
            return Err(AppError::ConfigurationError(
                "API base URL is empty".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;
        Ok(Self {
            base_url: trimmed.trim_end_matches('/').to_string(),
            http,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.session.token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// レスポンス本文全体（JSON）を返す
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&ListParams>,
        body: Option<&Value>,
    ) -> Result<Value, AppError> {
        let mut builder = self.request(method.clone(), path).await;
        if let Some(params) = query.filter(|params| !params.is_empty()) {
            builder = builder.query(params);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        debug!(target: "remote::http", method = %method, path, "sending request");
        let response = builder.send().await.map_err(|err| {
            debug!(target: "remote::http", method = %method, path, error = %err, "request failed");
            AppError::from(err)
        })?;
        self.read_response(response).await
    }

    /// `{ data: ... }` の `data` を取り出す。包まれていなければ本文そのもの。
    pub async fn data(
        &self,
        method: Method,
        path: &str,
        query: Option<&ListParams>,
        body: Option<&Value>,
    ) -> Result<Value, AppError> {
        let body = self.send(method, path, query, body).await?;
        Ok(unwrap_data(body))
    }

    async fn read_response(&self, response: reqwest::Response) -> Result<Value, AppError> {
        let status = response.status();
        let text = response.text().await.map_err(AppError::from)?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text)
                .map_err(|err| AppError::DeserializationError(err.to_string()));
        }

        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        let code = body.get("code").and_then(Value::as_str).map(str::to_string);
        let message = body
            .get("message")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| default_message(status));

        if code
            .as_deref()
            .is_some_and(|code| AUTH_EXPIRED_CODES.contains(&code))
        {
            warn!(target: "remote::http", status = status.as_u16(), "session expired, clearing credentials");
            if let Err(err) = self.session.clear().await {
                error!(target: "remote::http", error = %err, "failed to clear session");
            }
            return Err(AppError::AuthExpired(message));
        }

        debug!(
            target: "remote::http",
            status = status.as_u16(),
            code = code.as_deref().unwrap_or(""),
            "api error"
        );
        Err(AppError::api(status.as_u16(), code, message))
    }
}

fn default_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()))
}

pub(crate) fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}
