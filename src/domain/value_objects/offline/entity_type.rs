use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// キャッシュ対象となるドメインの種別。同期キューの `entity_type` 列にも使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    TaskHazard,
    RiskAssessment,
    Approval,
    Asset,
    User,
}

impl EntityKind {
    pub const QUEUED: [EntityKind; 4] = [
        EntityKind::TaskHazard,
        EntityKind::RiskAssessment,
        EntityKind::Approval,
        EntityKind::Asset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::TaskHazard => "task_hazard",
            EntityKind::RiskAssessment => "risk_assessment",
            EntityKind::Approval => "approval",
            EntityKind::Asset => "asset",
            EntityKind::User => "user",
        }
    }

    /// ユーザー向けメッセージで使う表示名
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::TaskHazard => "task hazards",
            EntityKind::RiskAssessment => "risk assessments",
            EntityKind::Approval => "approvals",
            EntityKind::Asset => "assets",
            EntityKind::User => "users",
        }
    }

    /// ユーザーはサーバー側でのみ変更されるため同期キューを持たない
    pub fn is_queued(&self) -> bool {
        !matches!(self, EntityKind::User)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task_hazard" => Ok(EntityKind::TaskHazard),
            "risk_assessment" => Ok(EntityKind::RiskAssessment),
            "approval" => Ok(EntityKind::Approval),
            "asset" => Ok(EntityKind::Asset),
            "user" => Ok(EntityKind::User),
            other => Err(format!("Unknown entity type: {other}")),
        }
    }
}
