// src/services/profile.rs
//! Profile fields, the hosted assistant, and the reference documents behind it

use serde::Deserialize;
use tracing::{info, warn};

use crate::core::config_manager::LlmSettings;
use crate::core::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::llm::AssistantBackend;
use crate::models::{AssistantSpec, ProfileUpdate, User, UserAssistant, UserDocument, UserVectorStore};
use crate::repository::{
    AssistantRepository, DocumentRepository, UserRepository, VectorStoreRepository,
};
use crate::utils::{clean_optional, sanitize_file_name, validate_file_extension};

pub const ALLOWED_DOCUMENT_EXTENSIONS: [&str; 4] = ["pdf", "docx", "txt", "md"];
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantInput {
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    pub instructions: String,
    #[serde(default)]
    pub temperature: Option<f64>,
}

pub struct ProfileService<'a> {
    db: &'a Database,
    assistants: &'a dyn AssistantBackend,
    llm_settings: &'a LlmSettings,
}

impl<'a> ProfileService<'a> {
    pub fn new(
        db: &'a Database,
        assistants: &'a dyn AssistantBackend,
        llm_settings: &'a LlmSettings,
    ) -> Self {
        Self {
            db,
            assistants,
            llm_settings,
        }
    }

    pub async fn get_profile(&self, user_id: &str) -> ServiceResult<User> {
        UserRepository::new(self.db.pool())
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    /// Absent fields stay as they are; blank strings clear the field
    pub async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> ServiceResult<User> {
        if matches!(update.min_salary, Some(salary) if salary < 0) {
            return Err(ServiceError::BadRequest(
                "min_salary cannot be negative".to_string(),
            ));
        }

        let mut user = self.get_profile(user_id).await?;

        if update.name.is_some() {
            user.name = clean_optional(update.name);
        }
        if update.resume_text.is_some() {
            user.resume_text = clean_optional(update.resume_text);
        }
        if update.desired_roles.is_some() {
            user.desired_roles = clean_optional(update.desired_roles);
        }
        if update.desired_locations.is_some() {
            user.desired_locations = clean_optional(update.desired_locations);
        }
        if update.additional_context.is_some() {
            user.additional_context = clean_optional(update.additional_context);
        }
        if update.min_salary.is_some() {
            user.min_salary = update.min_salary;
        }

        let saved = UserRepository::new(self.db.pool()).save_profile(&user).await?;
        info!("Updated profile for {}", user_id);
        Ok(saved)
    }

    pub async fn get_assistant(&self, user_id: &str) -> ServiceResult<Option<UserAssistant>> {
        Ok(AssistantRepository::new(self.db.pool())
            .find_by_user(user_id)
            .await?)
    }

    pub async fn save_assistant(&self, user_id: &str, input: AssistantInput) -> ServiceResult<UserAssistant> {
        let name = input.name.trim();
        let instructions = input.instructions.trim();
        if name.is_empty() || instructions.is_empty() {
            return Err(ServiceError::BadRequest(
                "Assistant name and instructions are required".to_string(),
            ));
        }
        if let Some(t) = input.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ServiceError::BadRequest(
                    "temperature must be between 0 and 2".to_string(),
                ));
            }
        }

        let store = VectorStoreRepository::new(self.db.pool())
            .find_by_user(user_id)
            .await?;
        let spec = AssistantSpec {
            name: name.to_string(),
            model: clean_optional(input.model).unwrap_or_else(|| self.llm_settings.model.clone()),
            instructions: instructions.to_string(),
            temperature: input.temperature,
            vector_store_id: store.map(|s| s.vector_store_id),
        };

        let repo = AssistantRepository::new(self.db.pool());
        let remote_id = match repo.find_by_user(user_id).await? {
            Some(existing) => {
                self.assistants
                    .update_assistant(&existing.assistant_id, &spec)
                    .await
                    .map_err(ServiceError::Upstream)?;
                existing.assistant_id
            }
            None => self
                .assistants
                .create_assistant(&spec)
                .await
                .map_err(ServiceError::Upstream)?,
        };

        let saved = repo.upsert(user_id, &remote_id, &spec).await?;
        info!("Saved assistant {} for {}", remote_id, user_id);
        Ok(saved)
    }

    pub async fn delete_assistant(&self, user_id: &str) -> ServiceResult<()> {
        let repo = AssistantRepository::new(self.db.pool());
        let existing = repo
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("No assistant configured".to_string()))?;

        if let Err(e) = self.assistants.delete_assistant(&existing.assistant_id).await {
            warn!("Failed to delete remote assistant {}: {:#}", existing.assistant_id, e);
        }

        repo.delete_by_user(user_id).await?;
        info!("Deleted assistant for {}", user_id);
        Ok(())
    }

    /// The user's vector store, created remotely on first use and linked to
    /// an existing assistant
    async fn ensure_vector_store(&self, user_id: &str) -> ServiceResult<UserVectorStore> {
        let stores = VectorStoreRepository::new(self.db.pool());
        if let Some(store) = stores.find_by_user(user_id).await? {
            return Ok(store);
        }

        let name = format!("jobhunt-{}", user_id);
        let remote_id = self
            .assistants
            .create_vector_store(&name)
            .await
            .map_err(ServiceError::Upstream)?;
        let store = stores.create(user_id, &remote_id, &name).await?;
        info!("Created vector store {} for {}", remote_id, user_id);

        if let Some(assistant) = AssistantRepository::new(self.db.pool())
            .find_by_user(user_id)
            .await?
        {
            let spec = AssistantSpec {
                name: assistant.name,
                model: assistant.model,
                instructions: assistant.instructions,
                temperature: assistant.temperature,
                vector_store_id: Some(remote_id),
            };
            if let Err(e) = self
                .assistants
                .update_assistant(&assistant.assistant_id, &spec)
                .await
            {
                warn!("Failed to link vector store to assistant {}: {:#}", assistant.assistant_id, e);
            }
        }

        Ok(store)
    }

    pub async fn upload_document(
        &self,
        user_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> ServiceResult<UserDocument> {
        let file_name = sanitize_file_name(file_name);
        if file_name.is_empty() {
            return Err(ServiceError::BadRequest("File name is required".to_string()));
        }
        validate_file_extension(&file_name, &ALLOWED_DOCUMENT_EXTENSIONS)
            .map_err(|e| ServiceError::BadRequest(e.to_string()))?;
        if bytes.is_empty() {
            return Err(ServiceError::BadRequest("File is empty".to_string()));
        }
        if bytes.len() > MAX_DOCUMENT_BYTES {
            return Err(ServiceError::BadRequest(format!(
                "File exceeds the {} MiB limit",
                MAX_DOCUMENT_BYTES / (1024 * 1024)
            )));
        }

        let store = self.ensure_vector_store(user_id).await?;
        let size_bytes = bytes.len() as i64;

        let file_id = self
            .assistants
            .upload_file(&file_name, bytes)
            .await
            .map_err(ServiceError::Upstream)?;
        self.assistants
            .attach_file(&store.vector_store_id, &file_id)
            .await
            .map_err(ServiceError::Upstream)?;

        let document = DocumentRepository::new(self.db.pool())
            .create(user_id, &store.vector_store_id, &file_id, &file_name, size_bytes)
            .await?;

        info!("Stored document {} ({} bytes) for {}", file_name, size_bytes, user_id);
        Ok(document)
    }

    pub async fn list_documents(&self, user_id: &str) -> ServiceResult<Vec<UserDocument>> {
        Ok(DocumentRepository::new(self.db.pool())
            .list_by_user(user_id)
            .await?)
    }

    pub async fn delete_document(&self, user_id: &str, id: i64) -> ServiceResult<()> {
        let repo = DocumentRepository::new(self.db.pool());
        let document = repo
            .find(user_id, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Document {} not found", id)))?;

        if let Err(e) = self.assistants.delete_file(&document.file_id).await {
            warn!("Failed to delete remote file {}: {:#}", document.file_id, e);
        }

        repo.delete(user_id, id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::seed_user;
    use crate::services::stubs::StubAssistants;

    fn input(name: &str) -> AssistantInput {
        AssistantInput {
            name: name.to_string(),
            model: None,
            instructions: "Be concise".to_string(),
            temperature: Some(0.3),
        }
    }

    #[tokio::test]
    async fn test_update_profile_partial_and_clearing() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(&db, "u1").await;
        let backend = StubAssistants::default();
        let settings = LlmSettings::default();
        let service = ProfileService::new(&db, &backend, &settings);

        let updated = service
            .update_profile(
                &user.id,
                ProfileUpdate {
                    resume_text: Some("  Rust dev  ".into()),
                    desired_roles: Some("Backend".into()),
                    min_salary: Some(100_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.resume_text.as_deref(), Some("Rust dev"));
        assert_eq!(updated.name.as_deref(), Some("u1"));

        let cleared = service
            .update_profile(
                &user.id,
                ProfileUpdate {
                    desired_roles: Some("   ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.desired_roles, None);
        assert_eq!(cleared.resume_text.as_deref(), Some("Rust dev"));
        assert_eq!(cleared.min_salary, Some(100_000));

        let err = service
            .update_profile(
                &user.id,
                ProfileUpdate {
                    min_salary: Some(-1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_assistant_created_then_updated() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(&db, "u1").await;
        let backend = StubAssistants::default();
        let settings = LlmSettings::default();
        let service = ProfileService::new(&db, &backend, &settings);

        let created = service.save_assistant(&user.id, input("Coach")).await.unwrap();
        assert_eq!(created.assistant_id, "asst_1");
        assert_eq!(created.model, settings.model);

        let updated = service.save_assistant(&user.id, input("Mentor")).await.unwrap();
        assert_eq!(updated.assistant_id, "asst_1");
        assert_eq!(updated.name, "Mentor");
        assert_eq!(
            backend.recorded(),
            vec!["create_assistant:-", "update_assistant:asst_1:-"]
        );

        let err = service
            .save_assistant(
                &user.id,
                AssistantInput {
                    temperature: Some(3.5),
                    ..input("Coach")
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_upload_creates_store_once_and_links_assistant() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(&db, "u1").await;
        let backend = StubAssistants::default();
        let settings = LlmSettings::default();
        let service = ProfileService::new(&db, &backend, &settings);

        service.save_assistant(&user.id, input("Coach")).await.unwrap();
        let doc = service
            .upload_document(&user.id, "../resume.pdf", b"%PDF-1.7".to_vec())
            .await
            .unwrap();
        assert_eq!(doc.file_name, "resume.pdf");
        assert_eq!(doc.size_bytes, 8);
        service
            .upload_document(&user.id, "notes.md", b"# notes".to_vec())
            .await
            .unwrap();

        assert_eq!(
            backend.recorded(),
            vec![
                "create_assistant:-",
                "create_vector_store:jobhunt-u1",
                "update_assistant:asst_1:vs_2",
                "upload_file:resume.pdf",
                "attach_file:vs_2:file_3",
                "upload_file:notes.md",
                "attach_file:vs_2:file_4",
            ]
        );
        assert_eq!(service.list_documents(&user.id).await.unwrap().len(), 2);

        // Saving again keeps the store linked
        service.save_assistant(&user.id, input("Coach")).await.unwrap();
        assert_eq!(
            backend.recorded().last().map(String::as_str),
            Some("update_assistant:asst_1:vs_2")
        );
    }

    #[tokio::test]
    async fn test_upload_validation() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(&db, "u1").await;
        let backend = StubAssistants::default();
        let settings = LlmSettings::default();
        let service = ProfileService::new(&db, &backend, &settings);

        for (name, bytes) in [
            ("virus.exe", vec![1u8]),
            ("empty.txt", Vec::new()),
            ("huge.pdf", vec![0u8; MAX_DOCUMENT_BYTES + 1]),
            ("", vec![1u8]),
        ] {
            let err = service.upload_document(&user.id, name, bytes).await.unwrap_err();
            assert_eq!(err.code(), "BAD_REQUEST", "{}", name);
        }
        assert!(backend.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_deletes_tolerate_remote_failures() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(&db, "u1").await;
        let backend = StubAssistants {
            fail_deletes: true,
            ..Default::default()
        };
        let settings = LlmSettings::default();
        let service = ProfileService::new(&db, &backend, &settings);

        service.save_assistant(&user.id, input("Coach")).await.unwrap();
        let doc = service
            .upload_document(&user.id, "cv.txt", b"text".to_vec())
            .await
            .unwrap();

        service.delete_document(&user.id, doc.id).await.unwrap();
        assert!(service.list_documents(&user.id).await.unwrap().is_empty());
        assert_eq!(
            service.delete_document(&user.id, doc.id).await.unwrap_err().code(),
            "NOT_FOUND"
        );

        service.delete_assistant(&user.id).await.unwrap();
        assert!(service.get_assistant(&user.id).await.unwrap().is_none());
        assert_eq!(service.delete_assistant(&user.id).await.unwrap_err().code(), "NOT_FOUND");
    }
}
