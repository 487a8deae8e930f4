// src/services/beta.rs
use tracing::info;

use crate::core::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{BetaRequest, BetaStatus};
use crate::repository::BetaRequestRepository;
use crate::utils::{clean_optional, normalize_email};

const MAX_REASON_CHARS: usize = 2000;

pub struct BetaService<'a> {
    db: &'a Database,
}

impl<'a> BetaService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Returns the request and whether it was newly created
    pub async fn create(
        &self,
        email: &str,
        name: Option<String>,
        reason: Option<String>,
    ) -> ServiceResult<(BetaRequest, bool)> {
        let email = normalize_email(email).map_err(|e| ServiceError::BadRequest(e.to_string()))?;
        let name = clean_optional(name);
        let reason = clean_optional(reason);
        if reason.as_ref().map_or(false, |r| r.chars().count() > MAX_REASON_CHARS) {
            return Err(ServiceError::BadRequest(format!(
                "Reason is limited to {} characters",
                MAX_REASON_CHARS
            )));
        }

        let repo = BetaRequestRepository::new(self.db.pool());
        if let Some(existing) = repo.find_by_email(&email).await? {
            info!("Beta request for {} already exists ({})", email, existing.status.as_str());
            return Ok((existing, false));
        }

        let created = repo
            .create(&email, name.as_deref(), reason.as_deref())
            .await?;
        Ok((created, true))
    }

    pub async fn list(&self, status: Option<BetaStatus>) -> ServiceResult<Vec<BetaRequest>> {
        Ok(BetaRequestRepository::new(self.db.pool()).list(status).await?)
    }

    pub async fn set_status(&self, id: i64, status: BetaStatus) -> ServiceResult<BetaRequest> {
        if status == BetaStatus::Pending {
            return Err(ServiceError::BadRequest(
                "Status must be approved or rejected".to_string(),
            ));
        }

        BetaRequestRepository::new(self.db.pool())
            .set_status(id, status)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Beta request {} not found", id)))
    }

    /// Same as `set_status`, addressed by email; used by the CLI
    pub async fn set_status_by_email(&self, email: &str, status: BetaStatus) -> ServiceResult<BetaRequest> {
        let email = normalize_email(email).map_err(|e| ServiceError::BadRequest(e.to_string()))?;
        let request = BetaRequestRepository::new(self.db.pool())
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No beta request for {}", email)))?;
        self.set_status(request.id, status).await
    }

    pub async fn is_approved(&self, email: &str) -> ServiceResult<bool> {
        let email = email.trim().to_lowercase();
        let request = BetaRequestRepository::new(self.db.pool())
            .find_by_email(&email)
            .await?;
        Ok(matches!(request, Some(r) if r.status == BetaStatus::Approved))
    }
}
