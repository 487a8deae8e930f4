// src/models/beta.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BetaStatus {
    Pending,
    Approved,
    Rejected,
}

impl BetaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetaStatus::Pending => "pending",
            BetaStatus::Approved => "approved",
            BetaStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for BetaStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(BetaStatus::Pending),
            "approved" | "approve" => Ok(BetaStatus::Approved),
            "rejected" | "reject" => Ok(BetaStatus::Rejected),
            other => anyhow::bail!("Unknown beta request status: {}", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BetaRequest {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub reason: Option<String>,
    pub status: BetaStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
