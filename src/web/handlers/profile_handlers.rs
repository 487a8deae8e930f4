// src/web/handlers/profile_handlers.rs
use rocket::form::Form;
use rocket::serde::json::Json;
use rocket::State;
use tokio::io::AsyncReadExt;
use tracing::{error, info};

use crate::auth::AuthenticatedUser;
use crate::error::ServiceError;
use crate::models::{ProfileUpdate, User, UserAssistant, UserDocument};
use crate::services::{AppState, AssistantInput};
use crate::web::types::*;

pub async fn get_profile_handler(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<User>> {
    let profile = state
        .profile()
        .get_profile(auth.id())
        .await
        .map_err(|e| api_error(e, None))?;

    Ok(Json(DataResponse::success(
        "Profile loaded".to_string(),
        profile,
        None,
    )))
}

pub async fn update_profile_handler(
    request: Json<StandardRequest<ProfileUpdate>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<User>> {
    let conversation_id = request.conversation_id();
    info!("User {} updating profile", auth.email());

    let profile = state
        .profile()
        .update_profile(auth.id(), request.into_inner().data)
        .await
        .map_err(|e| api_error(e, conversation_id.clone()))?;

    Ok(Json(DataResponse::success(
        "Profile updated".to_string(),
        profile,
        conversation_id,
    )))
}

pub async fn get_assistant_handler(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Option<UserAssistant>>> {
    let assistant = state
        .profile()
        .get_assistant(auth.id())
        .await
        .map_err(|e| api_error(e, None))?;

    let message = match &assistant {
        Some(a) => format!("Assistant '{}' configured", a.name),
        None => "No assistant configured".to_string(),
    };
    Ok(Json(DataResponse::success(message, assistant, None)))
}

pub async fn save_assistant_handler(
    request: Json<StandardRequest<AssistantInput>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<UserAssistant>> {
    let conversation_id = request.conversation_id();
    info!("User {} saving assistant configuration", auth.email());

    let assistant = state
        .profile()
        .save_assistant(auth.id(), request.into_inner().data)
        .await
        .map_err(|e| api_error(e, conversation_id.clone()))?;

    Ok(Json(DataResponse::success(
        format!("Assistant '{}' saved", assistant.name),
        assistant,
        conversation_id,
    )))
}

pub async fn delete_assistant_handler(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<ActionResponse> {
    state
        .profile()
        .delete_assistant(auth.id())
        .await
        .map_err(|e| api_error(e, None))?;

    Ok(Json(
        ActionResponse::success(
            "Assistant deleted".to_string(),
            "deleted".to_string(),
            None,
        )
        .with_next_actions(vec![
            "Create a new assistant with PUT /api/assistant".to_string(),
        ]),
    ))
}

pub async fn list_documents_handler(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<UserDocument>>> {
    let documents = state
        .profile()
        .list_documents(auth.id())
        .await
        .map_err(|e| api_error(e, None))?;

    Ok(Json(DataResponse::success(
        format!("{} document(s)", documents.len()),
        documents,
        None,
    )))
}

pub async fn upload_document_handler(
    upload: Form<DocumentUploadForm<'_>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<UserDocument>> {
    // The raw name keeps the extension; the service sanitizes it
    let file_name = upload
        .file
        .raw_name()
        .map(|n| n.dangerous_unsafe_unsanitized_raw().as_str().to_string())
        .unwrap_or_default();

    info!(
        "User {} uploading document '{}' ({} bytes)",
        auth.email(),
        file_name,
        upload.file.len()
    );

    let mut bytes = Vec::with_capacity(upload.file.len() as usize);
    let read = match upload.file.open().await {
        Ok(reader) => {
            tokio::pin!(reader);
            reader.read_to_end(&mut bytes).await.map(|_| ())
        }
        Err(e) => Err(e),
    };
    if let Err(e) = read {
        error!("Failed to read uploaded file: {}", e);
        return Err(api_error(
            ServiceError::BadRequest("Failed to read uploaded file".to_string()),
            None,
        ));
    }

    let document = state
        .profile()
        .upload_document(auth.id(), &file_name, bytes)
        .await
        .map_err(|e| api_error(e, None))?;

    Ok(Json(DataResponse::success(
        format!("Document '{}' uploaded", document.file_name),
        document,
        None,
    )))
}

pub async fn delete_document_handler(
    id: i64,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<ActionResponse> {
    state
        .profile()
        .delete_document(auth.id(), id)
        .await
        .map_err(|e| api_error(e, None))?;

    Ok(Json(ActionResponse::success(
        format!("Document {} deleted", id),
        "deleted".to_string(),
        None,
    )))
}
