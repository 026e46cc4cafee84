use super::client::ApiClient;
use crate::application::ports::{ApprovalGateway, EntityGateway, ListParams};
use crate::domain::value_objects::ApprovalDecision;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

fn into_list(value: Value, what: &str) -> Result<Vec<Value>, AppError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(AppError::DeserializationError(format!(
            "Expected a list of {what}, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `/{resource}` 以下の CRUD エンドポイント
#[derive(Clone)]
pub struct HttpEntityGateway {
    client: ApiClient,
    resource: String,
}

impl HttpEntityGateway {
    pub fn new(client: ApiClient, resource: impl Into<String>) -> Self {
        Self {
            client,
            resource: resource.into().trim_matches('/').to_string(),
        }
    }

    fn item_path(&self, id: &str) -> String {
        format!("/{}/{}", self.resource, id)
    }

    fn collection_path(&self) -> String {
        format!("/{}", self.resource)
    }
}

#[async_trait]
impl EntityGateway for HttpEntityGateway {
    async fn create(&self, payload: &Value) -> Result<Value, AppError> {
        self.client
            .data(Method::POST, &self.collection_path(), None, Some(payload))
            .await
    }

    async fn get_all(&self, params: &ListParams) -> Result<Vec<Value>, AppError> {
        let data = self
            .client
            .data(Method::GET, &self.collection_path(), Some(params), None)
            .await?;
        into_list(data, &self.resource)
    }

    async fn get_one(&self, id: &str) -> Result<Value, AppError> {
        self.client
            .data(Method::GET, &self.item_path(id), None, None)
            .await
    }

    async fn update(&self, id: &str, payload: &Value) -> Result<Value, AppError> {
        self.client
            .data(Method::PUT, &self.item_path(id), None, Some(payload))
            .await
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.client
            .send(Method::DELETE, &self.item_path(id), None, None)
            .await
            .map(|_| ())
    }
}

#[derive(Clone)]
pub struct HttpApprovalGateway {
    client: ApiClient,
}

impl HttpApprovalGateway {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ApprovalGateway for HttpApprovalGateway {
    async fn get_approvals(&self, params: &ListParams) -> Result<Vec<Value>, AppError> {
        let data = self
            .client
            .data(Method::GET, "/approvals", Some(params), None)
            .await?;
        let hazards = match data {
            Value::Object(mut map) => map.remove("taskHazards").unwrap_or(Value::Null),
            other => other,
        };
        into_list(hazards, "approvals")
    }

    /// PUT が拒否されたら同じエンドポイントへ POST し直す
    async fn process_approval(
        &self,
        id: &str,
        decision: &ApprovalDecision,
    ) -> Result<Value, AppError> {
        let path = format!("/approvals/{id}");
        let payload = decision.to_payload();
        match self
            .client
            .data(Method::PUT, &path, None, Some(&payload))
            .await
        {
            Err(AppError::Api { status, .. }) => {
                debug!(target: "remote::http", id, status, "approval PUT rejected, retrying with POST");
                self.client
                    .data(Method::POST, &path, None, Some(&payload))
                    .await
            }
            other => other,
        }
    }
}
