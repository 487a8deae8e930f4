// src/scrape/mod.rs
//! Job-site scraping: fetch result pages, parse cards, store new listings

pub mod parser;
pub mod runner;
pub mod source;

pub use parser::{normalize_job_url, parse_listing, ParsedListing};
pub use runner::{run_scrape, ScrapeParams, ScrapeStatus, ScrapeSummary, StopReason};
pub use source::{HttpListingSource, ListingSource, RawListing, SearchQuery};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, Instrument};

use crate::core::Database;
use crate::error::{ServiceError, ServiceResult};

/// Owns the single in-process scrape slot
#[derive(Clone)]
pub struct ScrapeManager {
    source: Arc<dyn ListingSource>,
    db: Database,
    running: Arc<AtomicBool>,
    status: Arc<RwLock<ScrapeStatus>>,
}

impl ScrapeManager {
    pub fn new(source: Arc<dyn ListingSource>, db: Database) -> Self {
        Self {
            source,
            db,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(RwLock::new(ScrapeStatus::default())),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn a run in the background; returns its id
    pub async fn start(&self, params: ScrapeParams) -> ServiceResult<String> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ServiceError::Conflict(
                "A scrape is already running".to_string(),
            ));
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        *self.status.write().await = ScrapeStatus::started(&run_id, &params);

        let manager = self.clone();
        let span = tracing::info_span!(
            "scrape",
            run_id = %run_id,
            query = %params.query.query,
            location = %params.query.location
        );

        tokio::spawn(
            async move {
                info!("Scrape run started");
                let summary =
                    run_scrape(manager.source.as_ref(), &manager.db, &params, &manager.status)
                        .await;
                manager.status.write().await.finish(&summary);
                manager.running.store(false, Ordering::SeqCst);
                info!(
                    "Scrape run finished: {:?}, {} inserted, {} duplicates",
                    summary.stop_reason, summary.jobs_inserted, summary.duplicates
                );
            }
            .instrument(span),
        );

        Ok(run_id)
    }

    /// Run in the caller's task; used by the CLI
    pub async fn run_foreground(&self, params: ScrapeParams) -> ServiceResult<ScrapeSummary> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ServiceError::Conflict(
                "A scrape is already running".to_string(),
            ));
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        *self.status.write().await = ScrapeStatus::started(&run_id, &params);

        let summary = run_scrape(self.source.as_ref(), &self.db, &params, &self.status)
            .instrument(tracing::info_span!("scrape", run_id = %run_id))
            .await;

        self.status.write().await.finish(&summary);
        self.running.store(false, Ordering::SeqCst);
        Ok(summary)
    }

    pub async fn status(&self) -> ScrapeStatus {
        self.status.read().await.clone()
    }
}
