// src/services/jobs.rs
use tracing::info;

use crate::core::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{JobFilter, JobPage, JobPreference, JobStats, JobWithPreference, PreferencePatch};
use crate::repository::{JobRepository, PreferenceRepository};

pub const MAX_NOTES_CHARS: usize = 5000;

pub struct JobService<'a> {
    db: &'a Database,
}

impl<'a> JobService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn list_jobs(&self, user_id: &str, filter: JobFilter) -> ServiceResult<JobPage> {
        let filter = filter.normalized();
        let page = JobRepository::new(self.db.pool())
            .list_for_user(user_id, &filter)
            .await?;
        Ok(page)
    }

    pub async fn get_job(&self, user_id: &str, job_id: i64) -> ServiceResult<JobWithPreference> {
        JobRepository::new(self.db.pool())
            .find_for_user(user_id, job_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Job {} not found", job_id)))
    }

    pub async fn update_preference(
        &self,
        user_id: &str,
        job_id: i64,
        mut patch: PreferencePatch,
    ) -> ServiceResult<JobPreference> {
        if patch.is_empty() {
            return Err(ServiceError::BadRequest(
                "Nothing to update: send starred, hidden, status or notes".to_string(),
            ));
        }

        if let Some(notes) = patch.notes.as_mut() {
            *notes = notes.trim().to_string();
            if notes.chars().count() > MAX_NOTES_CHARS {
                return Err(ServiceError::BadRequest(format!(
                    "Notes are limited to {} characters",
                    MAX_NOTES_CHARS
                )));
            }
        }

        if JobRepository::new(self.db.pool())
            .find_by_id(job_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(format!("Job {} not found", job_id)));
        }

        let preference = PreferenceRepository::new(self.db.pool())
            .apply_patch(user_id, job_id, &patch)
            .await?;

        info!(
            "Updated preference for job {}: starred={}, hidden={}, status={}",
            job_id, preference.starred, preference.hidden, preference.status
        );
        Ok(preference)
    }

    pub async fn job_stats(&self, user_id: &str) -> ServiceResult<JobStats> {
        Ok(JobRepository::new(self.db.pool())
            .stats_for_user(user_id)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;
    use crate::repository::fixtures::{new_job, seed_user};

    async fn setup() -> (Database, String, i64) {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(&db, "u1").await;
        let job_id = JobRepository::new(db.pool())
            .insert(&new_job("https://jobs.test/1", "Engineer", "Acme"))
            .await
            .unwrap()
            .unwrap();
        (db, user.id, job_id)
    }

    #[tokio::test]
    async fn test_update_preference_merges_fields() {
        let (db, user_id, job_id) = setup().await;
        let service = JobService::new(&db);

        service
            .update_preference(
                &user_id,
                job_id,
                PreferencePatch {
                    starred: Some(true),
                    notes: Some("  call recruiter  ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let updated = service
            .update_preference(
                &user_id,
                job_id,
                PreferencePatch {
                    status: Some(JobStatus::Applied),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.starred);
        assert_eq!(updated.status, JobStatus::Applied);
        assert_eq!(updated.notes.as_deref(), Some("call recruiter"));

        let cleared = service
            .update_preference(
                &user_id,
                job_id,
                PreferencePatch {
                    notes: Some("   ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.notes, None);
    }

    #[tokio::test]
    async fn test_update_preference_validation() {
        let (db, user_id, job_id) = setup().await;
        let service = JobService::new(&db);

        let err = service
            .update_preference(&user_id, job_id, PreferencePatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");

        let err = service
            .update_preference(
                &user_id,
                job_id,
                PreferencePatch {
                    notes: Some("x".repeat(MAX_NOTES_CHARS + 1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");

        let err = service
            .update_preference(
                &user_id,
                4242,
                PreferencePatch {
                    starred: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_get_and_list() {
        let (db, user_id, job_id) = setup().await;
        let service = JobService::new(&db);

        let job = service.get_job(&user_id, job_id).await.unwrap();
        assert_eq!(job.job.title, "Engineer");
        assert!(job.preference.is_none());
        assert_eq!(service.get_job(&user_id, 77).await.unwrap_err().code(), "NOT_FOUND");

        let page = service.list_jobs(&user_id, JobFilter::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, JobFilter::DEFAULT_PER_PAGE);

        let stats = service.job_stats(&user_id).await.unwrap();
        assert_eq!(stats.total_jobs, 1);
    }
}
