// src/web/handlers/job_handlers.rs
use rocket::serde::json::Json;
use rocket::State;
use std::str::FromStr;
use tracing::info;

use crate::auth::AuthenticatedUser;
use crate::models::{JobPage, JobPreference, JobStats, JobWithPreference, PreferencePatch};
use crate::services::{AppState, BatchStatus, RankMode, RankingOutcome};
use crate::web::types::*;

pub async fn list_jobs_handler(
    query: JobQuery,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<JobPage>> {
    let filter = query.into_filter().map_err(|e| api_error(e, None))?;

    let page = state
        .jobs()
        .list_jobs(auth.id(), filter)
        .await
        .map_err(|e| api_error(e, None))?;

    Ok(Json(DataResponse::success(
        format!("{} of {} job(s)", page.items.len(), page.total),
        page,
        None,
    )))
}

pub async fn job_stats_handler(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<JobStats>> {
    let stats = state
        .jobs()
        .job_stats(auth.id())
        .await
        .map_err(|e| api_error(e, None))?;

    Ok(Json(DataResponse::success(
        "Job statistics".to_string(),
        stats,
        None,
    )))
}

pub async fn get_job_handler(
    id: i64,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<JobWithPreference>> {
    let job = state
        .jobs()
        .get_job(auth.id(), id)
        .await
        .map_err(|e| api_error(e, None))?;

    Ok(Json(DataResponse::success(job.job.title.clone(), job, None)))
}

pub async fn update_preference_handler(
    id: i64,
    request: Json<StandardRequest<PreferencePatch>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<JobPreference>> {
    let conversation_id = request.conversation_id();

    let preference = state
        .jobs()
        .update_preference(auth.id(), id, request.into_inner().data)
        .await
        .map_err(|e| api_error(e, conversation_id.clone()))?;

    Ok(Json(DataResponse::success(
        format!("Preference for job {} updated", id),
        preference,
        conversation_id,
    )))
}

pub async fn rank_job_handler(
    id: i64,
    mode: Option<String>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<RankingOutcome>> {
    let mode = RankMode::from_str(mode.as_deref().unwrap_or_default())
        .map_err(|e| api_error(e, None))?;

    info!("User {} ranking job {} ({:?})", auth.email(), id, mode);

    let outcome = state
        .ranking()
        .rank_job(&auth.user, id, mode)
        .await
        .map_err(|e| api_error(e, None))?;

    let message = if outcome.cached {
        format!("Job {} ranking served from storage", id)
    } else {
        format!("Job {} ranked", id)
    };
    Ok(Json(DataResponse::success(message, outcome, None)))
}

pub async fn start_batch_handler(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<BatchStatus>> {
    let run_id = state
        .batch_ranker
        .start(&auth.user)
        .map_err(|e| api_error(e, None))?;

    info!("User {} started batch ranking {}", auth.email(), run_id);

    Ok(Json(DataResponse::success(
        format!("Batch ranking {} started", run_id),
        state.batch_ranker.status(auth.id()),
        None,
    )))
}

pub async fn batch_status_handler(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Json<DataResponse<BatchStatus>> {
    let status = state.batch_ranker.status(auth.id());
    let message = if status.running {
        "Batch ranking in progress"
    } else {
        "No batch ranking running"
    };
    Json(DataResponse::success(message.to_string(), status, None))
}
