// src/services/ranking.rs
//! Hybrid job ranking: reuse a fresh stored score or ask the model now

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn, Instrument};

use crate::core::config_manager::{LlmSettings, RankingSettings};
use crate::core::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::llm::{parse_ranking_verdict, prompts, ChatRequest, LanguageModel};
use crate::models::{Job, RankingLabel, RankingSource, StoredRanking, User};
use crate::repository::{AssistantRepository, JobRepository, PreferenceRepository};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RankMode {
    #[default]
    Hybrid,
    Sync,
    Batch,
}

impl FromStr for RankMode {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "hybrid" => Ok(RankMode::Hybrid),
            "sync" => Ok(RankMode::Sync),
            "batch" => Ok(RankMode::Batch),
            other => Err(ServiceError::BadRequest(format!(
                "Unknown ranking mode '{}' (expected hybrid, sync or batch)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingOutcome {
    pub job_id: i64,
    pub ranking: RankingLabel,
    pub score: i64,
    pub reasoning: String,
    pub source: RankingSource,
    pub ranked_at: DateTime<Utc>,
    /// Served from storage rather than a fresh model call
    pub cached: bool,
}

impl RankingOutcome {
    fn from_stored(job_id: i64, stored: StoredRanking, cached: bool) -> Self {
        Self {
            job_id,
            ranking: stored.label,
            score: stored.score,
            reasoning: stored.reason,
            source: stored.source,
            ranked_at: stored.ranked_at,
            cached,
        }
    }
}

/// Ask the model about one job and persist the verdict under `source`
async fn rank_with_model(
    db: &Database,
    llm: &dyn LanguageModel,
    settings: &LlmSettings,
    user: &User,
    job: &Job,
    source: RankingSource,
) -> ServiceResult<StoredRanking> {
    if !user.has_resume() {
        return Err(ServiceError::ProfileIncomplete(
            "Your profile has no resume text to rank against".to_string(),
        ));
    }

    let assistant = AssistantRepository::new(db.pool()).find_by_user(&user.id).await?;
    let (model, temperature) = match &assistant {
        Some(a) => (a.model.clone(), a.temperature),
        None => (settings.model.clone(), None),
    };

    let request = ChatRequest {
        model,
        messages: prompts::ranking_messages(user, job, settings.max_description_chars),
        temperature,
    };

    let reply = llm
        .complete(&request)
        .await
        .map_err(ServiceError::Upstream)?;
    let verdict = parse_ranking_verdict(&reply).map_err(|e| {
        warn!("Unusable ranking reply for job {}: {}", job.id, reply);
        ServiceError::Upstream(e)
    })?;

    let preference = PreferenceRepository::new(db.pool())
        .save_ranking(
            &user.id,
            job.id,
            verdict.label,
            verdict.score,
            &verdict.reasoning,
            source,
        )
        .await?;

    preference
        .stored_ranking()
        .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("Ranking was not stored")))
}

pub struct RankingService<'a> {
    db: &'a Database,
    llm: &'a dyn LanguageModel,
    llm_settings: &'a LlmSettings,
    settings: &'a RankingSettings,
}

impl<'a> RankingService<'a> {
    pub fn new(
        db: &'a Database,
        llm: &'a dyn LanguageModel,
        llm_settings: &'a LlmSettings,
        settings: &'a RankingSettings,
    ) -> Self {
        Self {
            db,
            llm,
            llm_settings,
            settings,
        }
    }

    pub async fn rank_job(&self, user: &User, job_id: i64, mode: RankMode) -> ServiceResult<RankingOutcome> {
        let job = JobRepository::new(self.db.pool())
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Job {} not found", job_id)))?;

        let stored = PreferenceRepository::new(self.db.pool())
            .find(&user.id, job_id)
            .await?
            .and_then(|p| p.stored_ranking());

        match mode {
            RankMode::Batch => {
                return stored
                    .filter(|r| r.source == RankingSource::Batch)
                    .map(|r| RankingOutcome::from_stored(job_id, r, true))
                    .ok_or_else(|| {
                        ServiceError::NotRanked(format!("Job {} has no batch ranking yet", job_id))
                    });
            }
            RankMode::Hybrid => {
                let fresh_after = stale_cutoff(Utc::now(), self.settings.batch_max_age_hours);
                if let Some(stored) = stored.filter(|r| r.ranked_at > fresh_after) {
                    info!("Serving stored {:?} ranking for job {}", stored.source, job_id);
                    return Ok(RankingOutcome::from_stored(job_id, stored, true));
                }
            }
            RankMode::Sync => {}
        }

        let ranked = rank_with_model(
            self.db,
            self.llm,
            self.llm_settings,
            user,
            &job,
            RankingSource::Sync,
        )
        .await?;

        info!("Ranked job {} for {}: {} ({:?})", job_id, user.id, ranked.score, ranked.label);
        Ok(RankingOutcome::from_stored(job_id, ranked, false))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchStatus {
    pub running: bool,
    pub run_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total: u32,
    pub ranked: u32,
    pub failed: u32,
    pub last_error: Option<String>,
}

/// Background ranking of a user's unranked jobs, one run per user
#[derive(Clone)]
pub struct BatchRanker {
    db: Database,
    llm: Arc<dyn LanguageModel>,
    llm_settings: LlmSettings,
    settings: RankingSettings,
    runs: Arc<Mutex<HashMap<String, BatchStatus>>>,
}

impl BatchRanker {
    pub fn new(
        db: Database,
        llm: Arc<dyn LanguageModel>,
        llm_settings: LlmSettings,
        settings: RankingSettings,
    ) -> Self {
        Self {
            db,
            llm,
            llm_settings,
            settings,
            runs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn update<F>(&self, user_id: &str, apply: F)
    where
        F: FnOnce(&mut BatchStatus),
    {
        let mut runs = self.runs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        apply(runs.entry(user_id.to_string()).or_default());
    }

    pub fn status(&self, user_id: &str) -> BatchStatus {
        let runs = self.runs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        runs.get(user_id).cloned().unwrap_or_default()
    }

    pub fn start(&self, user: &User) -> ServiceResult<String> {
        if !user.has_resume() {
            return Err(ServiceError::ProfileIncomplete(
                "Your profile has no resume text to rank against".to_string(),
            ));
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        {
            let mut runs = self.runs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let entry = runs.entry(user.id.clone()).or_default();
            if entry.running {
                return Err(ServiceError::Conflict(
                    "A batch ranking is already running for this user".to_string(),
                ));
            }
            *entry = BatchStatus {
                running: true,
                run_id: Some(run_id.clone()),
                started_at: Some(Utc::now()),
                ..BatchStatus::default()
            };
        }

        let ranker = self.clone();
        let user = user.clone();
        let span = tracing::info_span!("batch_rank", run_id = %run_id, user_id = %user.id);
        tokio::spawn(async move { ranker.run(user).await }.instrument(span));

        Ok(run_id)
    }

    async fn run(&self, user: User) {
        let stale_before = stale_cutoff(Utc::now(), self.settings.batch_max_age_hours);
        let jobs = match JobRepository::new(self.db.pool())
            .needing_ranking(&user.id, stale_before, self.settings.batch_limit)
            .await
        {
            Ok(jobs) => jobs,
            Err(e) => {
                error!("Failed to select jobs for batch ranking: {:#}", e);
                self.update(&user.id, |s| {
                    s.running = false;
                    s.finished_at = Some(Utc::now());
                    s.last_error = Some(format!("{:#}", e));
                });
                return;
            }
        };

        info!("Batch ranking {} jobs", jobs.len());
        self.update(&user.id, |s| s.total = jobs.len() as u32);

        for job in &jobs {
            let result = rank_with_model(
                &self.db,
                self.llm.as_ref(),
                &self.llm_settings,
                &user,
                job,
                RankingSource::Batch,
            )
            .await;

            match result {
                Ok(_) => self.update(&user.id, |s| s.ranked += 1),
                Err(e) => {
                    warn!("Batch ranking failed for job {}: {}", job.id, e);
                    let message = e.to_string();
                    self.update(&user.id, |s| {
                        s.failed += 1;
                        s.last_error = Some(message);
                    });
                }
            }
        }

        self.update(&user.id, |s| {
            s.running = false;
            s.finished_at = Some(Utc::now());
        });

        let status = self.status(&user.id);
        info!("Batch ranking finished: {} ranked, {} failed", status.ranked, status.failed);
    }
}

/// Rankings older than this instant are stale. Ages outside chrono's range saturate
fn stale_cutoff(now: DateTime<Utc>, max_age_hours: i64) -> DateTime<Utc> {
    Duration::try_hours(max_age_hours.max(0))
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
