// src/web/handlers/scrape_handlers.rs
use rocket::serde::json::Json;
use rocket::State;
use tracing::info;

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::scrape::{ScrapeParams, ScrapeStatus};
use crate::services::AppState;
use crate::web::types::*;

pub async fn start_scrape_handler(
    request: Option<Json<StandardRequest<ScrapeRequest>>>,
    admin: AdminUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<ScrapeStatus>> {
    let (options, conversation_id) = match request {
        Some(request) => {
            let request = request.into_inner();
            (request.data, request.conversation_id)
        }
        None => (ScrapeRequest::default(), None),
    };

    let params = ScrapeParams::from_settings(
        &state.config.scraper,
        options.query,
        options.location,
        options.max_pages,
    );

    let run_id = state
        .scraper
        .start(params)
        .await
        .map_err(|e| api_error(e, conversation_id.clone()))?;

    info!("{} started scrape run {}", admin.0.email(), run_id);

    Ok(Json(DataResponse::success(
        format!("Scrape {} started", run_id),
        state.scraper.status().await,
        conversation_id,
    )))
}

pub async fn scrape_status_handler(
    _auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Json<DataResponse<ScrapeStatus>> {
    let message = if state.scraper.is_running() {
        "Scrape in progress"
    } else {
        "No scrape running"
    };
    Json(DataResponse::success(
        message.to_string(),
        state.scraper.status().await,
        None,
    ))
}
