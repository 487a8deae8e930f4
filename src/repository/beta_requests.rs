// src/repository/beta_requests.rs
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::models::{BetaRequest, BetaStatus};

const BETA_COLUMNS: &str = "id, email, name, reason, status, created_at, updated_at";

pub struct BetaRequestRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BetaRequestRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<BetaRequest>> {
        let request = sqlx::query_as::<_, BetaRequest>(&format!(
            "SELECT {} FROM beta_requests WHERE email = ?",
            BETA_COLUMNS
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(request)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<BetaRequest>> {
        let request = sqlx::query_as::<_, BetaRequest>(&format!(
            "SELECT {} FROM beta_requests WHERE id = ?",
            BETA_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(request)
    }

    pub async fn create(
        &self,
        email: &str,
        name: Option<&str>,
        reason: Option<&str>,
    ) -> Result<BetaRequest> {
        let now = Utc::now();

        let request = sqlx::query_as::<_, BetaRequest>(&format!(
            r#"
            INSERT INTO beta_requests (email, name, reason, status, created_at, updated_at)
            VALUES (?, ?, ?, 'pending', ?, ?)
            RETURNING {}
            "#,
            BETA_COLUMNS
        ))
        .bind(email)
        .bind(name)
        .bind(reason)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        info!("Created beta request {} for {}", request.id, email);
        Ok(request)
    }

    pub async fn list(&self, status: Option<BetaStatus>) -> Result<Vec<BetaRequest>> {
        let requests = match status {
            Some(status) => {
                sqlx::query_as::<_, BetaRequest>(&format!(
                    "SELECT {} FROM beta_requests WHERE status = ? ORDER BY created_at ASC, id ASC",
                    BETA_COLUMNS
                ))
                .bind(status)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, BetaRequest>(&format!(
                    "SELECT {} FROM beta_requests ORDER BY created_at ASC, id ASC",
                    BETA_COLUMNS
                ))
                .fetch_all(self.pool)
                .await?
            }
        };

        Ok(requests)
    }

    pub async fn set_status(&self, id: i64, status: BetaStatus) -> Result<Option<BetaRequest>> {
        let request = sqlx::query_as::<_, BetaRequest>(&format!(
            "UPDATE beta_requests SET status = ?, updated_at = ? WHERE id = ? RETURNING {}",
            BETA_COLUMNS
        ))
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        if let Some(request) = &request {
            info!("Beta request {} ({}) is now {}", id, request.email, status.as_str());
        }

        Ok(request)
    }
}
