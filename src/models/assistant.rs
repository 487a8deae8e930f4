// src/models/assistant.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserAssistant {
    pub id: i64,
    pub user_id: String,
    pub assistant_id: String,
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub temperature: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the user asks the hosted assistant to be
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantSpec {
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_store_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserVectorStore {
    pub id: i64,
    pub user_id: String,
    pub vector_store_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserDocument {
    pub id: i64,
    pub user_id: String,
    pub vector_store_id: String,
    pub file_id: String,
    pub file_name: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}
