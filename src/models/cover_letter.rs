// src/models/cover_letter.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CoverLetter {
    pub id: i64,
    pub user_id: String,
    pub job_id: i64,
    pub content: String,
    pub document_id: Option<String>,
    pub document_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
