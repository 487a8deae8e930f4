// src/repository/preferences.rs
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{JobPreference, JobStatus, PreferencePatch, RankingLabel, RankingSource};

const PREFERENCE_COLUMNS: &str = "id, user_id, job_id, starred, hidden, status, notes, ranking, \
     ranking_score, ranking_reason, ranking_source, ranked_at, updated_at";

pub struct PreferenceRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PreferenceRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, user_id: &str, job_id: i64) -> Result<Option<JobPreference>> {
        let preference = sqlx::query_as::<_, JobPreference>(&format!(
            "SELECT {} FROM job_preferences WHERE user_id = ? AND job_id = ?",
            PREFERENCE_COLUMNS
        ))
        .bind(user_id)
        .bind(job_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(preference)
    }

    /// Merge the patch into the stored annotation (creating it), ranking columns untouched.
    /// `notes: Some("")` clears the notes.
    pub async fn apply_patch(
        &self,
        user_id: &str,
        job_id: i64,
        patch: &PreferencePatch,
    ) -> Result<JobPreference> {
        let existing = self.find(user_id, job_id).await?;

        let starred = patch
            .starred
            .or(existing.as_ref().map(|p| p.starred))
            .unwrap_or(false);
        let hidden = patch
            .hidden
            .or(existing.as_ref().map(|p| p.hidden))
            .unwrap_or(false);
        let status = patch
            .status
            .or(existing.as_ref().map(|p| p.status))
            .unwrap_or(JobStatus::New);
        let notes = match &patch.notes {
            Some(n) if n.trim().is_empty() => None,
            Some(n) => Some(n.trim().to_string()),
            None => existing.as_ref().and_then(|p| p.notes.clone()),
        };

        let preference = sqlx::query_as::<_, JobPreference>(&format!(
            r#"
            INSERT INTO job_preferences (user_id, job_id, starred, hidden, status, notes, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, job_id) DO UPDATE SET
                starred = excluded.starred,
                hidden = excluded.hidden,
                status = excluded.status,
                notes = excluded.notes,
                updated_at = excluded.updated_at
            RETURNING {}
            "#,
            PREFERENCE_COLUMNS
        ))
        .bind(user_id)
        .bind(job_id)
        .bind(starred)
        .bind(hidden)
        .bind(status)
        .bind(notes)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await
        .with_context(|| format!("Failed to save preference for job {}", job_id))?;

        Ok(preference)
    }

    /// Store a ranking verdict, leaving the user's annotations untouched
    pub async fn save_ranking(
        &self,
        user_id: &str,
        job_id: i64,
        label: RankingLabel,
        score: i64,
        reason: &str,
        source: RankingSource,
    ) -> Result<JobPreference> {
        let now = Utc::now();

        let preference = sqlx::query_as::<_, JobPreference>(&format!(
            r#"
            INSERT INTO job_preferences (user_id, job_id, ranking, ranking_score, ranking_reason,
                                         ranking_source, ranked_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, job_id) DO UPDATE SET
                ranking = excluded.ranking,
                ranking_score = excluded.ranking_score,
                ranking_reason = excluded.ranking_reason,
                ranking_source = excluded.ranking_source,
                ranked_at = excluded.ranked_at,
                updated_at = excluded.updated_at
            RETURNING {}
            "#,
            PREFERENCE_COLUMNS
        ))
        .bind(user_id)
        .bind(job_id)
        .bind(label)
        .bind(score)
        .bind(reason)
        .bind(source)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await
        .with_context(|| format!("Failed to save ranking for job {}", job_id))?;

        Ok(preference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Database;
    use crate::repository::fixtures::{new_job, seed_user};
    use crate::repository::JobRepository;

    #[tokio::test]
    async fn test_patch_merges_with_existing_row() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(&db, "u1").await;
        let job_id = JobRepository::new(db.pool())
            .insert(&new_job("https://jobs.test/a", "A", "Acme"))
            .await
            .unwrap()
            .unwrap();
        let repo = PreferenceRepository::new(db.pool());

        let first = repo
            .apply_patch(
                &user.id,
                job_id,
                &PreferencePatch {
                    starred: Some(true),
                    notes: Some("  call recruiter  ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(first.starred);
        assert!(!first.hidden);
        assert_eq!(first.status, JobStatus::New);
        assert_eq!(first.notes.as_deref(), Some("call recruiter"));

        let second = repo
            .apply_patch(
                &user.id,
                job_id,
                &PreferencePatch {
                    status: Some(JobStatus::Interviewing),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert!(second.starred);
        assert_eq!(second.status, JobStatus::Interviewing);
        assert_eq!(second.notes.as_deref(), Some("call recruiter"));

        let cleared = repo
            .apply_patch(
                &user.id,
                job_id,
                &PreferencePatch {
                    notes: Some(String::new()),
                    starred: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.notes.is_none());
        assert!(!cleared.starred);
    }

    #[tokio::test]
    async fn test_ranking_and_annotations_do_not_clobber_each_other() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(&db, "u1").await;
        let job_id = JobRepository::new(db.pool())
            .insert(&new_job("https://jobs.test/a", "A", "Acme"))
            .await
            .unwrap()
            .unwrap();
        let repo = PreferenceRepository::new(db.pool());

        repo.apply_patch(
            &user.id,
            job_id,
            &PreferencePatch {
                hidden: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let ranked = repo
            .save_ranking(&user.id, job_id, RankingLabel::Good, 72, "solid match", RankingSource::Batch)
            .await
            .unwrap();
        assert!(ranked.hidden);
        let stored = ranked.stored_ranking().unwrap();
        assert_eq!(stored.label, RankingLabel::Good);
        assert_eq!(stored.score, 72);
        assert_eq!(stored.source, RankingSource::Batch);

        let patched = repo
            .apply_patch(
                &user.id,
                job_id,
                &PreferencePatch {
                    hidden: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.ranking_score, Some(72));
        assert!(!patched.hidden);
    }
}
