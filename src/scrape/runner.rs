// src/scrape/runner.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::parser::{normalize_job_url, parse_listing};
use super::source::{ListingSource, RawListing, SearchQuery};
use crate::core::config_manager::ScraperSettings;
use crate::core::Database;
use crate::models::NewJob;
use crate::repository::JobRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The site returned an empty page
    Exhausted,
    DuplicateLimit,
    PageLimit,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ScrapeParams {
    pub query: SearchQuery,
    pub max_pages: u32,
    pub max_consecutive_duplicates: u32,
    pub page_delay: Duration,
    pub fetch_details: bool,
    pub site_base_url: String,
    pub source_name: String,
}

impl ScrapeParams {
    pub fn from_settings(
        settings: &ScraperSettings,
        query: Option<String>,
        location: Option<String>,
        max_pages: Option<u32>,
    ) -> Self {
        let source_name = reqwest::Url::parse(&settings.site_base_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
            .unwrap_or_else(|| "web".to_string());

        Self {
            query: SearchQuery {
                query: query
                    .filter(|q| !q.trim().is_empty())
                    .unwrap_or_else(|| settings.default_query.clone()),
                location: location
                    .filter(|l| !l.trim().is_empty())
                    .unwrap_or_else(|| settings.default_location.clone()),
            },
            max_pages: max_pages.unwrap_or(settings.max_pages),
            max_consecutive_duplicates: settings.max_consecutive_duplicates.max(1),
            page_delay: Duration::from_millis(settings.page_delay_ms),
            fetch_details: settings.fetch_details,
            site_base_url: settings.site_base_url.clone(),
            source_name,
        }
    }
}

/// Live view of the current (or last) scrape run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeStatus {
    pub running: bool,
    pub run_id: Option<String>,
    pub query: Option<String>,
    pub location: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub pages_scraped: u32,
    pub listings_seen: u32,
    pub jobs_inserted: u32,
    pub duplicates: u32,
    pub skipped: u32,
    pub stop_reason: Option<StopReason>,
    pub last_error: Option<String>,
}

impl ScrapeStatus {
    pub fn started(run_id: &str, params: &ScrapeParams) -> Self {
        Self {
            running: true,
            run_id: Some(run_id.to_string()),
            query: Some(params.query.query.clone()),
            location: Some(params.query.location.clone()),
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    fn record(&mut self, summary: &ScrapeSummary) {
        self.pages_scraped = summary.pages_scraped;
        self.listings_seen = summary.listings_seen;
        self.jobs_inserted = summary.jobs_inserted;
        self.duplicates = summary.duplicates;
        self.skipped = summary.skipped;
    }

    pub fn finish(&mut self, summary: &ScrapeSummary) {
        self.record(summary);
        self.running = false;
        self.finished_at = Some(Utc::now());
        self.stop_reason = Some(summary.stop_reason);
        self.last_error = summary.error.clone();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeSummary {
    pub pages_scraped: u32,
    pub listings_seen: u32,
    pub jobs_inserted: u32,
    pub duplicates: u32,
    pub skipped: u32,
    pub stop_reason: StopReason,
    pub error: Option<String>,
}

impl Default for ScrapeSummary {
    fn default() -> Self {
        Self {
            pages_scraped: 0,
            listings_seen: 0,
            jobs_inserted: 0,
            duplicates: 0,
            skipped: 0,
            stop_reason: StopReason::PageLimit,
            error: None,
        }
    }
}

enum ListingOutcome {
    Inserted,
    Duplicate,
    Skipped,
}

struct Run<'a> {
    source: &'a dyn ListingSource,
    jobs: JobRepository<'a>,
    params: &'a ScrapeParams,
    seen: HashSet<String>,
    consecutive_duplicates: u32,
}

impl<'a> Run<'a> {
    /// Returns false once the run must stop; the reason is left on `summary`
    async fn scrape_page(
        &mut self,
        page: u32,
        summary: &mut ScrapeSummary,
        status: &RwLock<ScrapeStatus>,
    ) -> bool {
        let listings = match self.source.fetch_page(&self.params.query, page).await {
            Ok(listings) => listings,
            Err(e) => {
                error!("Failed to fetch page {}: {:#}", page, e);
                summary.stop_reason = StopReason::Failed;
                summary.error = Some(format!("page {}: {:#}", page, e));
                return false;
            }
        };
        summary.pages_scraped += 1;

        if listings.is_empty() {
            info!("Page {} is empty, stopping", page);
            summary.stop_reason = StopReason::Exhausted;
            return false;
        }

        for raw in &listings {
            summary.listings_seen += 1;

            match self.process(raw).await {
                Ok(ListingOutcome::Inserted) => summary.jobs_inserted += 1,
                Ok(ListingOutcome::Skipped) => summary.skipped += 1,
                Ok(ListingOutcome::Duplicate) => {
                    summary.duplicates += 1;
                    if self.consecutive_duplicates >= self.params.max_consecutive_duplicates {
                        info!(
                            "Hit {} consecutive duplicates on page {}, stopping",
                            self.consecutive_duplicates, page
                        );
                        summary.stop_reason = StopReason::DuplicateLimit;
                        return false;
                    }
                }
                Err(e) => {
                    error!("Failed to store listing {}: {:#}", raw.url, e);
                    summary.stop_reason = StopReason::Failed;
                    summary.error = Some(format!("{:#}", e));
                    return false;
                }
            }
        }

        status.write().await.record(summary);
        info!(
            "Page {} done: {} new, {} duplicates so far",
            page, summary.jobs_inserted, summary.duplicates
        );
        true
    }

    async fn process(&mut self, raw: &RawListing) -> anyhow::Result<ListingOutcome> {
        let url = match normalize_job_url(&raw.url, &self.params.site_base_url) {
            Ok(url) => url,
            Err(e) => {
                debug!("Skipping listing with bad URL {}: {}", raw.url, e);
                return Ok(ListingOutcome::Skipped);
            }
        };

        if !self.seen.insert(url.clone()) || self.jobs.exists_by_url(&url).await? {
            self.consecutive_duplicates += 1;
            return Ok(ListingOutcome::Duplicate);
        }
        self.consecutive_duplicates = 0;

        let Some(parsed) = parse_listing(raw) else {
            debug!("Skipping unparseable listing {}", url);
            return Ok(ListingOutcome::Skipped);
        };

        let description = if self.params.fetch_details {
            match self.source.fetch_description(&url).await {
                Ok(description) => description,
                Err(e) => {
                    warn!("Failed to fetch description for {}: {}", url, e);
                    None
                }
            }
        } else {
            None
        };

        let job = NewJob {
            url,
            title: parsed.title,
            company: parsed.company,
            location: parsed.location,
            salary: parsed.salary,
            posted: parsed.posted,
            snippet: parsed.snippet,
            description,
            source: self.params.source_name.clone(),
        };

        match self.jobs.insert(&job).await? {
            Some(id) => {
                debug!("Stored job {}: {} at {}", id, job.title, job.company);
                Ok(ListingOutcome::Inserted)
            }
            None => Ok(ListingOutcome::Duplicate),
        }
    }
}

/// Walk result pages in order until the site runs dry, the duplicate streak
/// hits its limit, the page budget is spent, or something fails
pub async fn run_scrape(
    source: &dyn ListingSource,
    db: &Database,
    params: &ScrapeParams,
    status: &RwLock<ScrapeStatus>,
) -> ScrapeSummary {
    let mut summary = ScrapeSummary::default();
    let mut run = Run {
        source,
        jobs: JobRepository::new(db.pool()),
        params,
        seen: HashSet::new(),
        consecutive_duplicates: 0,
    };

    for page in 0..params.max_pages {
        if page > 0 && !params.page_delay.is_zero() {
            tokio::time::sleep(params.page_delay).await;
        }

        let keep_going = run
            .scrape_page(page, &mut summary, status)
            .instrument(info_span!("page", page))
            .await;
        if !keep_going {
            break;
        }
    }

    status.write().await.record(&summary);
    summary
}
