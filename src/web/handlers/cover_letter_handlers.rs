// src/web/handlers/cover_letter_handlers.rs
use rocket::serde::json::Json;
use rocket::State;
use tracing::info;

use crate::auth::AuthenticatedUser;
use crate::models::CoverLetter;
use crate::services::{AppState, GenerateLetter, GeneratedLetter};
use crate::web::types::*;

pub async fn generate_letter_handler(
    job_id: i64,
    request: Option<Json<StandardRequest<GenerateLetter>>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<GeneratedLetter>> {
    let (options, conversation_id) = match request {
        Some(request) => {
            let request = request.into_inner();
            (request.data, request.conversation_id)
        }
        None => (GenerateLetter::default(), None),
    };

    info!("User {} generating a cover letter for job {}", auth.email(), job_id);

    let generated = state
        .cover_letters()
        .generate(&auth.user, job_id, options)
        .await
        .map_err(|e| api_error(e, conversation_id.clone()))?;

    let message = match &generated.document_error {
        Some(_) => "Cover letter generated; document export failed".to_string(),
        None => "Cover letter generated".to_string(),
    };
    Ok(Json(DataResponse::success(message, generated, conversation_id)))
}

pub async fn list_letters_handler(
    job_id: Option<i64>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<CoverLetter>>> {
    let letters = state
        .cover_letters()
        .list(auth.id(), job_id)
        .await
        .map_err(|e| api_error(e, None))?;

    Ok(Json(DataResponse::success(
        format!("{} cover letter(s)", letters.len()),
        letters,
        None,
    )))
}

pub async fn get_letter_handler(
    id: i64,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<CoverLetter>> {
    let letter = state
        .cover_letters()
        .get(auth.id(), id)
        .await
        .map_err(|e| api_error(e, None))?;

    Ok(Json(DataResponse::success(
        format!("Cover letter {}", id),
        letter,
        None,
    )))
}

pub async fn update_letter_handler(
    id: i64,
    request: Json<StandardRequest<UpdateLetterRequest>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<CoverLetter>> {
    let conversation_id = request.conversation_id();

    let letter = state
        .cover_letters()
        .update(auth.id(), id, &request.data.content)
        .await
        .map_err(|e| api_error(e, conversation_id.clone()))?;

    Ok(Json(DataResponse::success(
        "Cover letter updated".to_string(),
        letter,
        conversation_id,
    )))
}

pub async fn delete_letter_handler(
    id: i64,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<ActionResponse> {
    state
        .cover_letters()
        .delete(auth.id(), id)
        .await
        .map_err(|e| api_error(e, None))?;

    Ok(Json(ActionResponse::success(
        format!("Cover letter {} deleted", id),
        "deleted".to_string(),
        None,
    )))
}

pub async fn export_letter_handler(
    id: i64,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<CoverLetter>> {
    info!("User {} exporting cover letter {}", auth.email(), id);

    let letter = state
        .cover_letters()
        .export_document(auth.id(), id)
        .await
        .map_err(|e| api_error(e, None))?;

    Ok(Json(DataResponse::success(
        "Cover letter exported".to_string(),
        letter,
        None,
    )))
}
