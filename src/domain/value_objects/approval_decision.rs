use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "Approved" => Ok(ApprovalStatus::Approved),
            "Rejected" => Ok(ApprovalStatus::Rejected),
            other => Err(format!(
                "Approval status must be Approved or Rejected, got {other}"
            )),
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 承認者の判断。`processApproval` の送信内容そのもの。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub status: ApprovalStatus,
    pub comments: String,
}

impl ApprovalDecision {
    pub fn new(status: ApprovalStatus, comments: impl Into<String>) -> Self {
        Self {
            status,
            comments: comments.into(),
        }
    }

    pub fn to_payload(&self) -> Value {
        json!({
            "status": self.status.as_str(),
            "comments": self.comments,
        })
    }

    pub fn from_payload(payload: &Value) -> Result<Self, String> {
        let status = payload
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| "Approval payload is missing status".to_string())?;
        let comments = payload
            .get("comments")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(Self::new(ApprovalStatus::parse(status)?, comments))
    }
}
