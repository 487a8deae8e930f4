// src/repository/cover_letters.rs
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::CoverLetter;

const LETTER_COLUMNS: &str =
    "id, user_id, job_id, content, document_id, document_url, created_at, updated_at";

pub struct CoverLetterRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CoverLetterRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: &str, job_id: i64, content: &str) -> Result<CoverLetter> {
        let now = Utc::now();

        let letter = sqlx::query_as::<_, CoverLetter>(&format!(
            r#"
            INSERT INTO cover_letters (user_id, job_id, content, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            LETTER_COLUMNS
        ))
        .bind(user_id)
        .bind(job_id)
        .bind(content)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(letter)
    }

    pub async fn find(&self, user_id: &str, id: i64) -> Result<Option<CoverLetter>> {
        let letter = sqlx::query_as::<_, CoverLetter>(&format!(
            "SELECT {} FROM cover_letters WHERE user_id = ? AND id = ?",
            LETTER_COLUMNS
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(letter)
    }

    pub async fn list(&self, user_id: &str, job_id: Option<i64>) -> Result<Vec<CoverLetter>> {
        let letters = sqlx::query_as::<_, CoverLetter>(&format!(
            r#"
            SELECT {} FROM cover_letters
            WHERE user_id = ? AND (? IS NULL OR job_id = ?)
            ORDER BY created_at DESC, id DESC
            "#,
            LETTER_COLUMNS
        ))
        .bind(user_id)
        .bind(job_id)
        .bind(job_id)
        .fetch_all(self.pool)
        .await?;

        Ok(letters)
    }

    pub async fn update_content(
        &self,
        user_id: &str,
        id: i64,
        content: &str,
    ) -> Result<Option<CoverLetter>> {
        let letter = sqlx::query_as::<_, CoverLetter>(&format!(
            "UPDATE cover_letters SET content = ?, updated_at = ? WHERE user_id = ? AND id = ? RETURNING {}",
            LETTER_COLUMNS
        ))
        .bind(content)
        .bind(Utc::now())
        .bind(user_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(letter)
    }

    pub async fn set_document(
        &self,
        user_id: &str,
        id: i64,
        document_id: &str,
        document_url: &str,
    ) -> Result<Option<CoverLetter>> {
        let letter = sqlx::query_as::<_, CoverLetter>(&format!(
            "UPDATE cover_letters SET document_id = ?, document_url = ?, updated_at = ? \
             WHERE user_id = ? AND id = ? RETURNING {}",
            LETTER_COLUMNS
        ))
        .bind(document_id)
        .bind(document_url)
        .bind(Utc::now())
        .bind(user_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(letter)
    }

    pub async fn delete(&self, user_id: &str, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cover_letters WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Database;
    use crate::repository::fixtures::{new_job, seed_user};
    use crate::repository::JobRepository;

    #[tokio::test]
    async fn test_letters_lifecycle_and_job_filter() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(&db, "u1").await;
        let jobs = JobRepository::new(db.pool());
        let a = jobs.insert(&new_job("https://jobs.test/a", "A", "Acme")).await.unwrap().unwrap();
        let b = jobs.insert(&new_job("https://jobs.test/b", "B", "Globex")).await.unwrap().unwrap();
        let repo = CoverLetterRepository::new(db.pool());

        let first = repo.create(&user.id, a, "Dear Acme").await.unwrap();
        repo.create(&user.id, b, "Dear Globex").await.unwrap();

        assert_eq!(repo.list(&user.id, None).await.unwrap().len(), 2);
        let only_a = repo.list(&user.id, Some(a)).await.unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].content, "Dear Acme");

        let edited = repo.update_content(&user.id, first.id, "Hello Acme").await.unwrap().unwrap();
        assert_eq!(edited.content, "Hello Acme");

        let linked = repo
            .set_document(&user.id, first.id, "doc_1", "https://docs.test/doc_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(linked.document_id.as_deref(), Some("doc_1"));

        assert!(repo.update_content("nobody", first.id, "x").await.unwrap().is_none());
        assert!(repo.delete(&user.id, first.id).await.unwrap());
        assert!(repo.find(&user.id, first.id).await.unwrap().is_none());
    }
}
