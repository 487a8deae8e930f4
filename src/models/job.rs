// src/models/job.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub posted: Option<String>,
    pub snippet: Option<String>,
    pub description: Option<String>,
    pub source: String,
    pub scraped_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A listing ready to be stored, before it has an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub url: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub posted: Option<String>,
    pub snippet: Option<String>,
    pub description: Option<String>,
    pub source: String,
}

impl Job {
    /// Text handed to the model: description when scraped, snippet otherwise
    pub fn best_description(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or(self.snippet.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum JobStatus {
    New,
    Interested,
    Applied,
    Interviewing,
    Offer,
    Rejected,
    Archived,
}

impl JobStatus {
    pub const ALL: [JobStatus; 7] = [
        JobStatus::New,
        JobStatus::Interested,
        JobStatus::Applied,
        JobStatus::Interviewing,
        JobStatus::Offer,
        JobStatus::Rejected,
        JobStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::New => "new",
            JobStatus::Interested => "interested",
            JobStatus::Applied => "applied",
            JobStatus::Interviewing => "interviewing",
            JobStatus::Offer => "offer",
            JobStatus::Rejected => "rejected",
            JobStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == lowered)
            .ok_or_else(|| anyhow::anyhow!("Unknown job status: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RankingLabel {
    Strong,
    Good,
    Fair,
    Poor,
}

impl RankingLabel {
    pub fn from_score(score: i64) -> Self {
        match score {
            s if s >= 80 => RankingLabel::Strong,
            s if s >= 60 => RankingLabel::Good,
            s if s >= 40 => RankingLabel::Fair,
            _ => RankingLabel::Poor,
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "strong" | "excellent" | "great" => Some(RankingLabel::Strong),
            "good" => Some(RankingLabel::Good),
            "fair" | "maybe" | "okay" | "ok" => Some(RankingLabel::Fair),
            "poor" | "bad" | "weak" => Some(RankingLabel::Poor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RankingSource {
    Sync,
    Batch,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobPreference {
    pub id: i64,
    pub user_id: String,
    pub job_id: i64,
    pub starred: bool,
    pub hidden: bool,
    pub status: JobStatus,
    pub notes: Option<String>,
    pub ranking: Option<RankingLabel>,
    pub ranking_score: Option<i64>,
    pub ranking_reason: Option<String>,
    pub ranking_source: Option<RankingSource>,
    pub ranked_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl JobPreference {
    pub fn stored_ranking(&self) -> Option<StoredRanking> {
        Some(StoredRanking {
            label: self.ranking?,
            score: self.ranking_score?,
            reason: self.ranking_reason.clone().unwrap_or_default(),
            source: self.ranking_source?,
            ranked_at: self.ranked_at?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRanking {
    pub label: RankingLabel,
    pub score: i64,
    pub reason: String,
    pub source: RankingSource,
    pub ranked_at: DateTime<Utc>,
}

/// Partial update of a user's annotation; `None` leaves the field as is
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencePatch {
    pub starred: Option<bool>,
    pub hidden: Option<bool>,
    pub status: Option<JobStatus>,
    pub notes: Option<String>,
}

impl PreferencePatch {
    pub fn is_empty(&self) -> bool {
        self.starred.is_none()
            && self.hidden.is_none()
            && self.status.is_none()
            && self.notes.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobWithPreference {
    #[serde(flatten)]
    pub job: Job,
    pub preference: Option<JobPreference>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobSort {
    #[default]
    Newest,
    Score,
    Company,
}

impl FromStr for JobSort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest" | "date" => Ok(JobSort::Newest),
            "score" | "ranking" => Ok(JobSort::Score),
            "company" => Ok(JobSort::Company),
            other => anyhow::bail!("Unknown sort order: {}", other),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub starred: Option<bool>,
    pub status: Option<JobStatus>,
    pub include_hidden: bool,
    pub hidden_only: bool,
    pub min_score: Option<i64>,
    pub search: Option<String>,
    pub sort: JobSort,
    pub page: u32,
    pub per_page: u32,
}

impl JobFilter {
    pub const DEFAULT_PER_PAGE: u32 = 25;
    pub const MAX_PER_PAGE: u32 = 100;

    /// Clamp paging to sane bounds
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.per_page = match self.per_page {
            0 => Self::DEFAULT_PER_PAGE,
            n => n.min(Self::MAX_PER_PAGE),
        };
        self.search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobPage {
    pub items: Vec<JobWithPreference>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStats {
    pub total_jobs: i64,
    pub starred: i64,
    pub hidden: i64,
    pub ranked: i64,
    pub by_status: Vec<StatusCount>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: JobStatus,
    pub count: i64,
}
