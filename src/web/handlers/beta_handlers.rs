// src/web/handlers/beta_handlers.rs
use rocket::serde::json::Json;
use rocket::State;
use std::str::FromStr;
use tracing::info;

use crate::auth::AdminUser;
use crate::error::ServiceError;
use crate::models::{BetaRequest, BetaStatus};
use crate::services::AppState;
use crate::web::types::*;

fn parse_status(raw: &str) -> Result<BetaStatus, ApiError> {
    BetaStatus::from_str(raw).map_err(|e| api_error(ServiceError::BadRequest(e.to_string()), None))
}

pub async fn create_beta_request_handler(
    request: Json<StandardRequest<CreateBetaRequest>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<BetaRequest>> {
    let StandardRequest {
        data,
        conversation_id,
    } = request.into_inner();

    let (beta_request, created) = state
        .beta()
        .create(&data.email, data.name, data.reason)
        .await
        .map_err(|e| api_error(e, conversation_id.clone()))?;

    let message = if created {
        info!("New beta access request from {}", beta_request.email);
        "Beta access requested".to_string()
    } else {
        format!(
            "A beta request for this email already exists ({})",
            beta_request.status.as_str()
        )
    };
    Ok(Json(DataResponse::success(message, beta_request, conversation_id)))
}

pub async fn list_beta_requests_handler(
    status: Option<String>,
    _admin: AdminUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<BetaRequest>>> {
    let status = match status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_status(raw)?),
    };

    let requests = state
        .beta()
        .list(status)
        .await
        .map_err(|e| api_error(e, None))?;

    Ok(Json(DataResponse::success(
        format!("{} beta request(s)", requests.len()),
        requests,
        None,
    )))
}

pub async fn decide_beta_request_handler(
    id: i64,
    request: Json<StandardRequest<BetaDecision>>,
    admin: AdminUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<BetaRequest>> {
    let conversation_id = request.conversation_id();
    let status = parse_status(&request.data.status)?;

    let updated = state
        .beta()
        .set_status(id, status)
        .await
        .map_err(|e| api_error(e, conversation_id.clone()))?;

    info!(
        "{} marked beta request {} ({}) as {}",
        admin.0.email(),
        id,
        updated.email,
        updated.status.as_str()
    );

    Ok(Json(DataResponse::success(
        format!("Beta request {}", updated.status.as_str()),
        updated,
        conversation_id,
    )))
}
