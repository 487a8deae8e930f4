// src/models/mod.rs
pub mod assistant;
pub mod beta;
pub mod cover_letter;
pub mod job;
pub mod user;

pub use assistant::{AssistantSpec, UserAssistant, UserDocument, UserVectorStore};
pub use beta::{BetaRequest, BetaStatus};
pub use cover_letter::CoverLetter;
pub use job::{
    Job, JobFilter, JobPage, JobPreference, JobSort, JobStats, JobStatus, JobWithPreference,
    NewJob, PreferencePatch, RankingLabel, RankingSource, StatusCount, StoredRanking,
};
pub use user::{ProfileUpdate, User};
