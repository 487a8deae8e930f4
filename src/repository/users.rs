// src/repository/users.rs
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::models::User;

const USER_COLUMNS: &str = "id, email, name, picture, resume_text, desired_roles, \
     desired_locations, min_salary, additional_context, created_at, updated_at";

pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record the identity carried by a verified token, keeping profile fields intact
    pub async fn upsert_identity(
        &self,
        uid: &str,
        email: &str,
        name: Option<&str>,
        picture: Option<&str>,
    ) -> Result<User> {
        let now = Utc::now();
        let email = email.trim().to_lowercase();

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, name, picture, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                name = COALESCE(users.name, excluded.name),
                picture = COALESCE(excluded.picture, users.picture)
            "#,
        )
        .bind(uid)
        .bind(&email)
        .bind(name)
        .bind(picture)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .with_context(|| format!("Failed to upsert user {}", email))?;

        if result.rows_affected() > 0 {
            info!("Upserted user {} ({})", uid, email);
        }

        self.find_by_id(uid)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User {} vanished after upsert", uid))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Persist every profile column of `user`
    pub async fn save_profile(&self, user: &User) -> Result<User> {
        sqlx::query(
            r#"
            UPDATE users SET
                name = ?,
                resume_text = ?,
                desired_roles = ?,
                desired_locations = ?,
                min_salary = ?,
                additional_context = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.name)
        .bind(&user.resume_text)
        .bind(&user.desired_roles)
        .bind(&user.desired_locations)
        .bind(user.min_salary)
        .bind(&user.additional_context)
        .bind(Utc::now())
        .bind(&user.id)
        .execute(self.pool)
        .await?;

        self.find_by_id(&user.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User {} not found", user.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Database;

    #[tokio::test]
    async fn test_upsert_identity_is_idempotent_and_keeps_profile() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        let user = repo
            .upsert_identity("uid-1", "Ada@Example.com", Some("Ada"), None)
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.name.as_deref(), Some("Ada"));

        let mut edited = user.clone();
        edited.resume_text = Some("Rust engineer".to_string());
        edited.min_salary = Some(120_000);
        repo.save_profile(&edited).await.unwrap();

        let again = repo
            .upsert_identity("uid-1", "ada@example.com", Some("Other"), Some("pic.png"))
            .await
            .unwrap();
        assert_eq!(again.name.as_deref(), Some("Ada"));
        assert_eq!(again.picture.as_deref(), Some("pic.png"));
        assert_eq!(again.resume_text.as_deref(), Some("Rust engineer"));
        assert_eq!(again.min_salary, Some(120_000));

        let by_email = repo.find_by_email("ADA@example.com").await.unwrap();
        assert!(by_email.is_some());
    }
}
