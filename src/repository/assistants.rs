// src/repository/assistants.rs
//! Assistant configuration, vector store and reference document rows

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{AssistantSpec, UserAssistant, UserDocument, UserVectorStore};

pub struct AssistantRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AssistantRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user(&self, user_id: &str) -> Result<Option<UserAssistant>> {
        let assistant = sqlx::query_as::<_, UserAssistant>(
            r#"
            SELECT id, user_id, assistant_id, name, model, instructions, temperature,
                   created_at, updated_at
            FROM user_assistants
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(assistant)
    }

    pub async fn upsert(
        &self,
        user_id: &str,
        assistant_id: &str,
        spec: &AssistantSpec,
    ) -> Result<UserAssistant> {
        let now = Utc::now();

        let assistant = sqlx::query_as::<_, UserAssistant>(
            r#"
            INSERT INTO user_assistants (user_id, assistant_id, name, model, instructions,
                                         temperature, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                assistant_id = excluded.assistant_id,
                name = excluded.name,
                model = excluded.model,
                instructions = excluded.instructions,
                temperature = excluded.temperature,
                updated_at = excluded.updated_at
            RETURNING id, user_id, assistant_id, name, model, instructions, temperature,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(assistant_id)
        .bind(&spec.name)
        .bind(&spec.model)
        .bind(&spec.instructions)
        .bind(spec.temperature)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(assistant)
    }

    pub async fn delete_by_user(&self, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_assistants WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct VectorStoreRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> VectorStoreRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user(&self, user_id: &str) -> Result<Option<UserVectorStore>> {
        let store = sqlx::query_as::<_, UserVectorStore>(
            "SELECT id, user_id, vector_store_id, name, created_at FROM user_vector_stores WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(store)
    }

    pub async fn create(
        &self,
        user_id: &str,
        vector_store_id: &str,
        name: &str,
    ) -> Result<UserVectorStore> {
        let store = sqlx::query_as::<_, UserVectorStore>(
            r#"
            INSERT INTO user_vector_stores (user_id, vector_store_id, name, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, user_id, vector_store_id, name, created_at
            "#,
        )
        .bind(user_id)
        .bind(vector_store_id)
        .bind(name)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        Ok(store)
    }
}

pub struct DocumentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DocumentRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<UserDocument>> {
        let documents = sqlx::query_as::<_, UserDocument>(
            r#"
            SELECT id, user_id, vector_store_id, file_id, file_name, size_bytes, created_at
            FROM user_documents
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(documents)
    }

    pub async fn find(&self, user_id: &str, id: i64) -> Result<Option<UserDocument>> {
        let document = sqlx::query_as::<_, UserDocument>(
            r#"
            SELECT id, user_id, vector_store_id, file_id, file_name, size_bytes, created_at
            FROM user_documents
            WHERE user_id = ? AND id = ?
            "#,
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(document)
    }

    pub async fn create(
        &self,
        user_id: &str,
        vector_store_id: &str,
        file_id: &str,
        file_name: &str,
        size_bytes: i64,
    ) -> Result<UserDocument> {
        let document = sqlx::query_as::<_, UserDocument>(
            r#"
            INSERT INTO user_documents (user_id, vector_store_id, file_id, file_name,
                                        size_bytes, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, user_id, vector_store_id, file_id, file_name, size_bytes, created_at
            "#,
        )
        .bind(user_id)
        .bind(vector_store_id)
        .bind(file_id)
        .bind(file_name)
        .bind(size_bytes)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        Ok(document)
    }

    pub async fn delete(&self, user_id: &str, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_documents WHERE user_id = ? AND id = ?")
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
    use crate::repository::fixtures::seed_user;

    fn spec(name: &str) -> AssistantSpec {
        AssistantSpec {
            name: name.to_string(),
            model: "gpt-4o-mini".to_string(),
            instructions: "Be concise".to_string(),
            temperature: Some(0.3),
            vector_store_id: None,
        }
    }

    #[tokio::test]
    async fn test_assistant_upsert_keeps_one_row_per_user() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(&db, "u1").await;
        let repo = AssistantRepository::new(db.pool());

        let created = repo.upsert(&user.id, "asst_1", &spec("First")).await.unwrap();
        let updated = repo.upsert(&user.id, "asst_1", &spec("Second")).await.unwrap();
        assert_eq!(created.id, updated.id);
        assert_eq!(updated.name, "Second");

        assert!(repo.delete_by_user(&user.id).await.unwrap());
        assert!(repo.find_by_user(&user.id).await.unwrap().is_none());
        assert!(!repo.delete_by_user(&user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_documents_are_scoped_to_owner() {
        let db = Database::in_memory().await.unwrap();
        let owner = seed_user(&db, "owner").await;
        let other = seed_user(&db, "other").await;
        let stores = VectorStoreRepository::new(db.pool());
        let docs = DocumentRepository::new(db.pool());

        let store = stores.create(&owner.id, "vs_1", "owner docs").await.unwrap();
        assert_eq!(
            stores.find_by_user(&owner.id).await.unwrap().unwrap().vector_store_id,
            "vs_1"
        );

        let doc = docs
            .create(&owner.id, &store.vector_store_id, "file_1", "resume.pdf", 2048)
            .await
            .unwrap();

        assert!(docs.find(&other.id, doc.id).await.unwrap().is_none());
        assert!(!docs.delete(&other.id, doc.id).await.unwrap());
        assert_eq!(docs.list_by_user(&owner.id).await.unwrap().len(), 1);
        assert!(docs.delete(&owner.id, doc.id).await.unwrap());
        assert!(docs.list_by_user(&owner.id).await.unwrap().is_empty());
    }
}
