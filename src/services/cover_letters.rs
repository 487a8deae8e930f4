// src/services/cover_letters.rs
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::config_manager::LlmSettings;
use crate::core::Database;
use crate::documents::DocumentBackend;
use crate::error::{ServiceError, ServiceResult};
use crate::llm::{prompts, ChatRequest, LanguageModel};
use crate::models::{CoverLetter, Job, User};
use crate::repository::{AssistantRepository, CoverLetterRepository, JobRepository};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateLetter {
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub create_document: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedLetter {
    #[serde(flatten)]
    pub letter: CoverLetter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_error: Option<String>,
}

pub struct CoverLetterService<'a> {
    db: &'a Database,
    llm: &'a dyn LanguageModel,
    documents: &'a dyn DocumentBackend,
    llm_settings: &'a LlmSettings,
}

fn document_title(job: &Job) -> String {
    format!("Cover letter - {} at {}", job.title, job.company)
}

impl<'a> CoverLetterService<'a> {
    pub fn new(
        db: &'a Database,
        llm: &'a dyn LanguageModel,
        documents: &'a dyn DocumentBackend,
        llm_settings: &'a LlmSettings,
    ) -> Self {
        Self {
            db,
            llm,
            documents,
            llm_settings,
        }
    }

    async fn load_job(&self, job_id: i64) -> ServiceResult<Job> {
        JobRepository::new(self.db.pool())
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Job {} not found", job_id)))
    }

    async fn load_letter(&self, user_id: &str, id: i64) -> ServiceResult<CoverLetter> {
        CoverLetterRepository::new(self.db.pool())
            .find(user_id, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cover letter {} not found", id)))
    }

    pub async fn generate(
        &self,
        user: &User,
        job_id: i64,
        request: GenerateLetter,
    ) -> ServiceResult<GeneratedLetter> {
        let job = self.load_job(job_id).await?;

        if !user.has_resume() {
            return Err(ServiceError::ProfileIncomplete(
                "Add your resume to your profile before generating cover letters".to_string(),
            ));
        }

        let assistant = AssistantRepository::new(self.db.pool())
            .find_by_user(&user.id)
            .await?;

        let request_body = ChatRequest {
            model: assistant
                .as_ref()
                .map(|a| a.model.clone())
                .unwrap_or_else(|| self.llm_settings.model.clone()),
            messages: prompts::cover_letter_messages(
                assistant.as_ref().map(|a| a.instructions.as_str()),
                user,
                &job,
                request.instructions.as_deref(),
                self.llm_settings.max_description_chars,
            ),
            temperature: assistant.as_ref().and_then(|a| a.temperature),
        };

        let content = self
            .llm
            .complete(&request_body)
            .await
            .map_err(ServiceError::Upstream)?;

        let repo = CoverLetterRepository::new(self.db.pool());
        let mut letter = repo.create(&user.id, job.id, content.trim()).await?;
        info!("Generated cover letter {} for job {}", letter.id, job.id);

        let mut document_error = None;
        if request.create_document {
            match self
                .documents
                .create_document(&document_title(&job), &letter.content)
                .await
            {
                Ok(document) => {
                    if let Some(updated) = repo
                        .set_document(&user.id, letter.id, &document.id, &document.url)
                        .await?
                    {
                        letter = updated;
                    }
                }
                Err(e) => {
                    warn!("Document creation failed for letter {}: {:#}", letter.id, e);
                    document_error = Some(format!("{:#}", e));
                }
            }
        }

        Ok(GeneratedLetter {
            letter,
            document_error,
        })
    }

    pub async fn list(&self, user_id: &str, job_id: Option<i64>) -> ServiceResult<Vec<CoverLetter>> {
        Ok(CoverLetterRepository::new(self.db.pool())
            .list(user_id, job_id)
            .await?)
    }

    pub async fn get(&self, user_id: &str, id: i64) -> ServiceResult<CoverLetter> {
        self.load_letter(user_id, id).await
    }

    pub async fn update(&self, user_id: &str, id: i64, content: &str) -> ServiceResult<CoverLetter> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::BadRequest(
                "Cover letter content cannot be empty".to_string(),
            ));
        }

        CoverLetterRepository::new(self.db.pool())
            .update_content(user_id, id, content)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cover letter {} not found", id)))
    }

    pub async fn delete(&self, user_id: &str, id: i64) -> ServiceResult<()> {
        let letter = self.load_letter(user_id, id).await?;

        if let Some(document_id) = &letter.document_id {
            if let Err(e) = self.documents.delete_document(document_id).await {
                warn!("Failed to delete document {} for letter {}: {:#}", document_id, id, e);
            }
        }

        CoverLetterRepository::new(self.db.pool())
            .delete(user_id, id)
            .await?;
        info!("Deleted cover letter {}", id);
        Ok(())
    }

    /// Create a fresh remote document from the current letter text
    pub async fn export_document(&self, user_id: &str, id: i64) -> ServiceResult<CoverLetter> {
        let letter = self.load_letter(user_id, id).await?;
        let job = self.load_job(letter.job_id).await?;

        let document = self
            .documents
            .create_document(&document_title(&job), &letter.content)
            .await
            .map_err(ServiceError::Upstream)?;

        if let Some(previous) = letter.document_id.as_deref().filter(|p| *p != document.id) {
            if let Err(e) = self.documents.delete_document(previous).await {
                warn!("Failed to delete superseded document {}: {:#}", previous, e);
            }
        }

        CoverLetterRepository::new(self.db.pool())
            .set_document(user_id, id, &document.id, &document.url)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cover letter {} not found", id)))
    }
}
