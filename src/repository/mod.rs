// src/repository/mod.rs
//! Per-entity repositories borrowing the shared SQLite pool

pub mod assistants;
pub mod beta_requests;
pub mod cover_letters;
pub mod jobs;
pub mod preferences;
pub mod users;

pub use assistants::{AssistantRepository, DocumentRepository, VectorStoreRepository};
pub use beta_requests::BetaRequestRepository;
pub use cover_letters::CoverLetterRepository;
pub use jobs::JobRepository;
pub use preferences::PreferenceRepository;
pub use users::UserRepository;

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::core::Database;
    use crate::models::{NewJob, User};

    use super::UserRepository;

    pub async fn seed_user(db: &Database, uid: &str) -> User {
        UserRepository::new(db.pool())
            .upsert_identity(uid, &format!("{}@example.com", uid), Some(uid), None)
            .await
            .unwrap()
    }

    pub fn new_job(url: &str, title: &str, company: &str) -> NewJob {
        NewJob {
            url: url.to_string(),
            title: title.to_string(),
            company: company.to_string(),
            location: Some("Remote".to_string()),
            salary: None,
            posted: None,
            snippet: Some(format!("{} at {}", title, company)),
            description: None,
            source: "test".to_string(),
        }
    }
}
