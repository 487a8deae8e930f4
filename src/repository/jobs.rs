// src/repository/jobs.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::{
    Job, JobFilter, JobPage, JobPreference, JobSort, JobStats, JobStatus, JobWithPreference,
    NewJob, RankingLabel, RankingSource, StatusCount,
};

const JOB_COLUMNS: &str = "j.id, j.url, j.title, j.company, j.location, j.salary, j.posted, \
     j.snippet, j.description, j.source, j.scraped_at, j.updated_at";

const PREFERENCE_ALIASES: &str = "p.id AS pref_id, p.user_id AS pref_user_id, \
     p.starred AS pref_starred, p.hidden AS pref_hidden, p.status AS pref_status, \
     p.notes AS pref_notes, p.ranking AS pref_ranking, p.ranking_score AS pref_ranking_score, \
     p.ranking_reason AS pref_ranking_reason, p.ranking_source AS pref_ranking_source, \
     p.ranked_at AS pref_ranked_at, p.updated_at AS pref_updated_at";

#[derive(sqlx::FromRow)]
struct JoinedRow {
    #[sqlx(flatten)]
    job: Job,
    pref_id: Option<i64>,
    pref_user_id: Option<String>,
    pref_starred: Option<bool>,
    pref_hidden: Option<bool>,
    pref_status: Option<JobStatus>,
    pref_notes: Option<String>,
    pref_ranking: Option<RankingLabel>,
    pref_ranking_score: Option<i64>,
    pref_ranking_reason: Option<String>,
    pref_ranking_source: Option<RankingSource>,
    pref_ranked_at: Option<DateTime<Utc>>,
    pref_updated_at: Option<DateTime<Utc>>,
}

impl From<JoinedRow> for JobWithPreference {
    fn from(row: JoinedRow) -> Self {
        let preference = match (row.pref_id, row.pref_user_id, row.pref_updated_at) {
            (Some(id), Some(user_id), Some(updated_at)) => Some(JobPreference {
                id,
                user_id,
                job_id: row.job.id,
                starred: row.pref_starred.unwrap_or(false),
                hidden: row.pref_hidden.unwrap_or(false),
                status: row.pref_status.unwrap_or(JobStatus::New),
                notes: row.pref_notes,
                ranking: row.pref_ranking,
                ranking_score: row.pref_ranking_score,
                ranking_reason: row.pref_ranking_reason,
                ranking_source: row.pref_ranking_source,
                ranked_at: row.pref_ranked_at,
                updated_at,
            }),
            _ => None,
        };

        JobWithPreference {
            job: row.job,
            preference,
        }
    }
}

pub struct JobRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> JobRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert unless the URL is already known; returns the new id when a row was written
    pub async fn insert(&self, job: &NewJob) -> Result<Option<i64>> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (url, title, company, location, salary, posted, snippet,
                              description, source, scraped_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO NOTHING
            "#,
        )
        .bind(&job.url)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.salary)
        .bind(&job.posted)
        .bind(&job.snippet)
        .bind(&job.description)
        .bind(&job.source)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .with_context(|| format!("Failed to insert job {}", job.url))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(result.last_insert_rowid()))
    }

    pub async fn exists_by_url(&self, url: &str) -> Result<bool> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM jobs WHERE url = ?")
            .bind(url)
            .fetch_optional(self.pool)
            .await?;

        Ok(found.is_some())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(&format!("SELECT {} FROM jobs j WHERE j.id = ?", JOB_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(job)
    }

    /// Job plus the caller's annotation on it
    pub async fn find_for_user(&self, user_id: &str, id: i64) -> Result<Option<JobWithPreference>> {
        let row = sqlx::query_as::<_, JoinedRow>(&format!(
            "SELECT {}, {} FROM jobs j \
             LEFT JOIN job_preferences p ON p.job_id = j.id AND p.user_id = ? \
             WHERE j.id = ?",
            JOB_COLUMNS, PREFERENCE_ALIASES
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    pub async fn list_all(&self) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs j ORDER BY j.scraped_at DESC, j.id DESC",
            JOB_COLUMNS
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(jobs)
    }

    pub async fn list_for_user(&self, user_id: &str, filter: &JobFilter) -> Result<JobPage> {
        let mut count_query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*) FROM jobs j \
             LEFT JOIN job_preferences p ON p.job_id = j.id AND p.user_id = ",
        );
        count_query.push_bind(user_id);
        push_filters(&mut count_query, filter);

        let (total,): (i64,) = count_query
            .build_query_as()
            .fetch_one(self.pool)
            .await
            .context("Failed to count jobs")?;

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {}, {} FROM jobs j \
             LEFT JOIN job_preferences p ON p.job_id = j.id AND p.user_id = ",
            JOB_COLUMNS, PREFERENCE_ALIASES
        ));
        query.push_bind(user_id);
        push_filters(&mut query, filter);

        query.push(match filter.sort {
            JobSort::Newest => " ORDER BY j.scraped_at DESC, j.id DESC",
            JobSort::Score => {
                " ORDER BY p.ranking_score IS NULL, p.ranking_score DESC, j.scraped_at DESC, j.id DESC"
            }
            JobSort::Company => " ORDER BY j.company COLLATE NOCASE ASC, j.id DESC",
        });
        query.push(" LIMIT ");
        query.push_bind(filter.per_page as i64);
        query.push(" OFFSET ");
        query.push_bind(filter.offset());

        let rows: Vec<JoinedRow> = query
            .build_query_as()
            .fetch_all(self.pool)
            .await
            .context("Failed to list jobs")?;

        Ok(JobPage {
            items: rows.into_iter().map(Into::into).collect(),
            total,
            page: filter.page,
            per_page: filter.per_page,
        })
    }

    /// Visible jobs whose ranking is missing or older than `stale_before`, newest first
    pub async fn needing_ranking(
        &self,
        user_id: &str,
        stale_before: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs j \
             LEFT JOIN job_preferences p ON p.job_id = j.id AND p.user_id = ? \
             WHERE COALESCE(p.hidden, FALSE) = FALSE \
               AND (p.ranked_at IS NULL OR p.ranked_at < ?) \
             ORDER BY j.scraped_at DESC, j.id DESC \
             LIMIT ?",
            JOB_COLUMNS
        ))
        .bind(user_id)
        .bind(stale_before)
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(jobs)
    }

    pub async fn stats_for_user(&self, user_id: &str) -> Result<JobStats> {
        let (total_jobs,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs")
            .fetch_one(self.pool)
            .await?;

        let (annotated, starred, hidden, ranked): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN starred THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN hidden THEN 1 ELSE 0 END), 0),
                   COUNT(ranking_score)
            FROM job_preferences
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        let mut by_status = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT status, COUNT(*) AS count
            FROM job_preferences
            WHERE user_id = ?
            GROUP BY status
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        // Jobs the user never touched count as new
        let untouched = (total_jobs - annotated).max(0);
        match by_status.iter_mut().find(|c| c.status == JobStatus::New) {
            Some(entry) => entry.count += untouched,
            None if untouched > 0 => by_status.push(StatusCount {
                status: JobStatus::New,
                count: untouched,
            }),
            None => {}
        }
        by_status.sort_by_key(|c| JobStatus::ALL.iter().position(|s| *s == c.status));

        Ok(JobStats {
            total_jobs,
            starred,
            hidden,
            ranked,
            by_status,
        })
    }
}

fn push_filters<'q>(query: &mut QueryBuilder<'q, Sqlite>, filter: &'q JobFilter) {
    query.push(" WHERE 1 = 1");

    if filter.hidden_only {
        query.push(" AND COALESCE(p.hidden, FALSE) = TRUE");
    } else if !filter.include_hidden {
        query.push(" AND COALESCE(p.hidden, FALSE) = FALSE");
    }

    if let Some(starred) = filter.starred {
        query.push(" AND COALESCE(p.starred, FALSE) = ");
        query.push_bind(starred);
    }

    if let Some(status) = filter.status {
        query.push(" AND COALESCE(p.status, 'new') = ");
        query.push_bind(status.as_str());
    }

    if let Some(min_score) = filter.min_score {
        query.push(" AND p.ranking_score >= ");
        query.push_bind(min_score);
    }

    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        query.push(" AND (j.title LIKE ");
        query.push_bind(pattern.clone());
        query.push(" ESCAPE '\\' OR j.company LIKE ");
        query.push_bind(pattern.clone());
        query.push(" ESCAPE '\\' OR j.location LIKE ");
        query.push_bind(pattern.clone());
        query.push(" ESCAPE '\\' OR j.snippet LIKE ");
        query.push_bind(pattern);
        query.push(" ESCAPE '\\')");
    }
}

/// Search text matches literally, `%` and `_` included
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
