// src/services/mod.rs
//! Business operations behind the HTTP handlers and the CLI

pub mod beta;
pub mod cover_letters;
pub mod jobs;
pub mod profile;
pub mod ranking;

pub use beta::BetaService;
pub use cover_letters::{CoverLetterService, GenerateLetter, GeneratedLetter};
pub use jobs::JobService;
pub use profile::{AssistantInput, ProfileService};
pub use ranking::{BatchRanker, BatchStatus, RankMode, RankingOutcome, RankingService};

use anyhow::Result;
use std::sync::Arc;

use crate::core::{ConfigManager, Database};
use crate::documents::{self, DocumentBackend};
use crate::llm::{AssistantBackend, LanguageModel, LlmClient};
use crate::scrape::{HttpListingSource, ListingSource, ScrapeManager};

/// Everything a request needs, shared across handlers and background tasks
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigManager>,
    pub db: Database,
    pub llm: Arc<dyn LanguageModel>,
    pub assistants: Arc<dyn AssistantBackend>,
    pub documents: Arc<dyn DocumentBackend>,
    pub scraper: ScrapeManager,
    pub batch_ranker: BatchRanker,
}

impl AppState {
    pub fn new(
        config: ConfigManager,
        db: Database,
        llm: Arc<dyn LanguageModel>,
        assistants: Arc<dyn AssistantBackend>,
        documents: Arc<dyn DocumentBackend>,
        source: Arc<dyn ListingSource>,
    ) -> Self {
        let batch_ranker = BatchRanker::new(
            db.clone(),
            llm.clone(),
            config.llm.clone(),
            config.ranking.clone(),
        );
        let scraper = ScrapeManager::new(source, db.clone());

        Self {
            config: Arc::new(config),
            db,
            llm,
            assistants,
            documents,
            scraper,
            batch_ranker,
        }
    }

    /// Wire the real HTTP integrations from configuration
    pub fn from_config(config: ConfigManager, db: Database) -> Result<Self> {
        let llm = Arc::new(LlmClient::new(&config.llm)?);
        let documents = documents::backend_from_settings(&config.documents)?;
        let source = Arc::new(HttpListingSource::new(&config.scraper)?);

        Ok(Self::new(config, db, llm.clone(), llm, documents, source))
    }

    pub fn jobs(&self) -> JobService<'_> {
        JobService::new(&self.db)
    }

    pub fn ranking(&self) -> RankingService<'_> {
        RankingService::new(
            &self.db,
            self.llm.as_ref(),
            &self.config.llm,
            &self.config.ranking,
        )
    }

    pub fn cover_letters(&self) -> CoverLetterService<'_> {
        CoverLetterService::new(
            &self.db,
            self.llm.as_ref(),
            self.documents.as_ref(),
            &self.config.llm,
        )
    }

    pub fn profile(&self) -> ProfileService<'_> {
        ProfileService::new(&self.db, self.assistants.as_ref(), &self.config.llm)
    }

    pub fn beta(&self) -> BetaService<'_> {
        BetaService::new(&self.db)
    }
}
