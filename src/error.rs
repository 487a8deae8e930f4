// src/error.rs
//! Failure kinds the service layer reports, each with a stable error code

use std::fmt;

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    NotRanked(String),
    Conflict(String),
    ProfileIncomplete(String),
    Unprocessable(String),
    Upstream(anyhow::Error),
    Database(anyhow::Error),
    Internal(anyhow::Error),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "BAD_REQUEST",
            ServiceError::Forbidden(_) => "FORBIDDEN",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::NotRanked(_) => "NOT_RANKED",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::ProfileIncomplete(_) => "PROFILE_INCOMPLETE",
            ServiceError::Unprocessable(_) => "UNPROCESSABLE",
            ServiceError::Upstream(_) => "UPSTREAM_ERROR",
            ServiceError::Database(_) => "DATABASE_ERROR",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::Forbidden(_) => 403,
            ServiceError::NotFound(_) | ServiceError::NotRanked(_) => 404,
            ServiceError::Conflict(_) => 409,
            ServiceError::ProfileIncomplete(_) | ServiceError::Unprocessable(_) => 422,
            ServiceError::Upstream(_) => 502,
            ServiceError::Database(_) | ServiceError::Internal(_) => 500,
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        let hints: &[&str] = match self {
            ServiceError::NotRanked(_) => &[
                "Start a batch ranking run with POST /api/jobs/rank-batch",
                "Or rank this job directly with mode=sync",
            ],
            ServiceError::ProfileIncomplete(_) => &["Add your resume text to your profile first"],
            ServiceError::Conflict(_) => &["Wait for the current run to finish and try again"],
            ServiceError::Upstream(_) => &["The external service failed; try again later"],
            ServiceError::Database(_) | ServiceError::Internal(_) => &["Try again later"],
            _ => &[],
        };
        hints.iter().map(|h| h.to_string()).collect()
    }

    pub fn is_server_error(&self) -> bool {
        self.http_status() >= 500
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::BadRequest(msg)
            | ServiceError::Forbidden(msg)
            | ServiceError::NotFound(msg)
            | ServiceError::NotRanked(msg)
            | ServiceError::Conflict(msg)
            | ServiceError::ProfileIncomplete(msg)
            | ServiceError::Unprocessable(msg) => f.write_str(msg),
            ServiceError::Upstream(err) => write!(f, "Upstream service error: {:#}", err),
            ServiceError::Database(err) => write!(f, "Database error: {:#}", err),
            ServiceError::Internal(err) => write!(f, "Internal error: {:#}", err),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Repository failures surface through `?` as database errors
impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Database(err)
    }
}
