// src/web/handlers/system_handlers.rs
use rocket::serde::json::Json;
use rocket::State;
use tracing::info;

use crate::auth::{AuthenticatedUser, OptionalAuth};
use crate::error::ServiceError;
use crate::services::AppState;
use crate::web::types::*;

pub async fn health_handler(auth: OptionalAuth, state: &State<AppState>) -> ApiResult<TextResponse> {
    if let Some(user) = auth.user {
        info!("Health check by authenticated user: {}", user.email());
    } else {
        info!("Health check by anonymous user");
    }

    state
        .db
        .health_check()
        .await
        .map_err(|e| api_error(ServiceError::Database(e), None))?;

    Ok(Json(TextResponse::success("OK".to_string(), None)))
}

pub async fn get_current_user_handler(auth: AuthenticatedUser) -> Json<DataResponse<UserInfo>> {
    let info = UserInfo::from_user(&auth.user, auth.is_admin);
    Json(DataResponse::success(
        format!("Authenticated as {}", info.email),
        info,
        None,
    ))
}
