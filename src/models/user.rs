// src/models/user.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub resume_text: Option<String>,
    pub desired_roles: Option<String>,
    pub desired_locations: Option<String>,
    pub min_salary: Option<i64>,
    pub additional_context: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_resume(&self) -> bool {
        self.resume_text
            .as_deref()
            .map_or(false, |r| !r.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub resume_text: Option<String>,
    pub desired_roles: Option<String>,
    pub desired_locations: Option<String>,
    pub min_salary: Option<i64>,
    pub additional_context: Option<String>,
}
