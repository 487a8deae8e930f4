// src/scrape/source.rs
use anyhow::{Context, Result};
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::core::config_manager::ScraperSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub location: String,
}

/// One search-result card: its link and its visible text, one line per text node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawListing {
    pub url: String,
    pub text: String,
}

impl RawListing {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

#[rocket::async_trait]
pub trait ListingSource: Send + Sync {
    /// Listings on result page `page` (0-based); empty when the site has no more
    async fn fetch_page(&self, query: &SearchQuery, page: u32) -> Result<Vec<RawListing>>;

    async fn fetch_description(&self, url: &str) -> Result<Option<String>>;
}

const DESCRIPTION_SELECTORS: [&str; 4] = [
    "#jobDescriptionText",
    "[data-testid='jobsearch-JobComponent-description']",
    ".jobsearch-JobComponent-description",
    ".jobsearch-jobDescriptionText",
];

const GENERIC_DESCRIPTION_SELECTORS: [&str; 5] = [
    "[class*='description']",
    "[class*='job-details']",
    "[class*='content']",
    "main",
    "article",
];

pub struct HttpListingSource {
    client: Client,
    settings: ScraperSettings,
}

impl HttpListingSource {
    pub fn new(settings: &ScraperSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(std::time::Duration::from_secs(settings.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            settings: settings.clone(),
        })
    }

    pub fn page_url(&self, query: &SearchQuery, page: u32) -> Result<Url> {
        let offset = (page * self.settings.page_size).to_string();
        Url::parse_with_params(
            &self.settings.search_url,
            &[
                (self.settings.query_param.as_str(), query.query.as_str()),
                (self.settings.location_param.as_str(), query.location.as_str()),
                (self.settings.page_param.as_str(), offset.as_str()),
            ],
        )
        .with_context(|| format!("Invalid search URL: {}", self.settings.search_url))
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP error {} for {}", response.status(), url);
        }

        response
            .text()
            .await
            .context("Failed to read response body")
    }
}

#[rocket::async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_page(&self, query: &SearchQuery, page: u32) -> Result<Vec<RawListing>> {
        let url = self.page_url(query, page)?;
        info!("Fetching result page {}: {}", page, url);

        let html = self.fetch_html(url.as_str()).await?;
        let listings = extract_listings(
            &html,
            &self.settings.card_selector,
            &self.settings.link_selector,
        )?;

        debug!("Page {} yielded {} cards", page, listings.len());
        Ok(listings)
    }

    async fn fetch_description(&self, url: &str) -> Result<Option<String>> {
        let html = self.fetch_html(url).await?;
        Ok(extract_description(&html))
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow::anyhow!("Invalid selector '{}': {:?}", selector, e))
}

/// Pull listing cards out of a result page
pub fn extract_listings(
    html: &str,
    card_selector: &str,
    link_selector: &str,
) -> Result<Vec<RawListing>> {
    let cards = parse_selector(card_selector)?;
    let link = parse_selector(link_selector)?;
    let document = Html::parse_document(html);

    let listings = document
        .select(&cards)
        .filter_map(|card| {
            let href = card
                .select(&link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::trim)
                .filter(|h| !h.is_empty());

            match href {
                Some(href) => Some(RawListing {
                    url: href.to_string(),
                    text: card_lines(card).join("\n"),
                }),
                None => {
                    debug!("Skipping card without link");
                    None
                }
            }
        })
        .collect();

    Ok(listings)
}

fn card_lines(card: ElementRef<'_>) -> Vec<String> {
    card.text()
        .map(clean_text)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Job page body, trying site-specific selectors before generic ones
pub fn extract_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    find_text_by_selectors(&document, &DESCRIPTION_SELECTORS).or_else(|| {
        warn!("Falling back to generic description selectors");
        find_text_by_selectors(&document, &GENERIC_DESCRIPTION_SELECTORS)
    })
}

fn find_text_by_selectors(document: &Html, selectors: &[&str]) -> Option<String> {
    for selector_str in selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let text = clean_text(&element.text().collect::<Vec<_>>().join(" "));
                if text.len() > 20 {
                    return Some(text);
                }
            }
        }
    }
    None
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
