// src/web/types.rs
use rocket::form::FromForm;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{JobFilter, JobSort, JobStatus, User};

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TextResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ActionResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_actions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Data,
    Action,
    Error,
}

// Request bodies carry their payload flattened next to an optional conversation_id
#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardRequest<T> {
    #[serde(flatten)]
    pub data: T,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

pub trait WithConversationId {
    fn conversation_id(&self) -> Option<String>;
}

impl<T> WithConversationId for StandardRequest<T> {
    fn conversation_id(&self) -> Option<String> {
        self.conversation_id.clone()
    }
}

pub type ApiError = (Status, Json<StandardErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

impl TextResponse {
    pub fn success(message: String, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Text,
            success: true,
            message,
            conversation_id,
        }
    }
}

impl<T> DataResponse<T> {
    pub fn success(message: String, data: T, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message,
            data,
            conversation_id,
        }
    }
}

impl ActionResponse {
    pub fn success(message: String, action: String, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Action,
            success: true,
            message,
            action,
            next_actions: None,
            conversation_id,
        }
    }

    pub fn with_next_actions(mut self, next_actions: Vec<String>) -> Self {
        self.next_actions = Some(next_actions);
        self
    }
}

impl StandardErrorResponse {
    pub fn new(
        error: String,
        error_code: String,
        suggestions: Vec<String>,
        conversation_id: Option<String>,
    ) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
            conversation_id,
        }
    }
}

/// Translate a service failure into its HTTP status and error body
pub fn api_error(err: ServiceError, conversation_id: Option<String>) -> ApiError {
    if err.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::debug!("Request rejected: {}", err);
    }

    let status = Status::from_code(err.http_status()).unwrap_or(Status::InternalServerError);
    let message = if matches!(err, ServiceError::Database(_) | ServiceError::Internal(_)) {
        "Internal server error".to_string()
    } else {
        err.to_string()
    };

    (
        status,
        Json(StandardErrorResponse::new(
            message,
            err.code().to_string(),
            err.suggestions(),
            conversation_id,
        )),
    )
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct UserInfo {
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub is_admin: bool,
    pub has_resume: bool,
}

impl UserInfo {
    pub fn from_user(user: &User, is_admin: bool) -> Self {
        Self {
            uid: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            picture: user.picture.clone(),
            is_admin,
            has_resume: user.has_resume(),
        }
    }
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct CreateBetaRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct BetaDecision {
    pub status: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct UpdateLetterRequest {
    pub content: String,
}

#[derive(Deserialize, Default)]
#[serde(crate = "rocket::serde")]
pub struct ScrapeRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub max_pages: Option<u32>,
}

#[derive(FromForm)]
pub struct DocumentUploadForm<'f> {
    pub file: TempFile<'f>,
}

/// Query string accepted by `GET /jobs`
#[derive(FromForm, Default, Debug)]
pub struct JobQuery {
    pub starred: Option<bool>,
    pub status: Option<String>,
    pub include_hidden: Option<bool>,
    pub hidden_only: Option<bool>,
    pub min_score: Option<i64>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl JobQuery {
    pub fn into_filter(self) -> ServiceResult<JobFilter> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                JobStatus::from_str(raw).map_err(|e| ServiceError::BadRequest(e.to_string()))?,
            ),
        };
        let sort = match self.sort.as_deref().map(str::trim) {
            None | Some("") => JobSort::default(),
            Some(raw) => {
                JobSort::from_str(raw).map_err(|e| ServiceError::BadRequest(e.to_string()))?
            }
        };

        Ok(JobFilter {
            starred: self.starred,
            status,
            include_hidden: self.include_hidden.unwrap_or(false),
            hidden_only: self.hidden_only.unwrap_or(false),
            min_score: self.min_score,
            search: self.search,
            sort,
            page: self.page.unwrap_or(1),
            per_page: self.per_page.unwrap_or(0),
        }
        .normalized())
    }
}
