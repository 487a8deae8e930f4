// src/scrape/parser.rs
//! Listing text is positional: title, company, location, then loose extras

use anyhow::{Context, Result};
use reqwest::Url;

use super::source::RawListing;

const BADGE_LINES: [&str; 8] = [
    "new",
    "promoted",
    "sponsored",
    "urgently hiring",
    "easily apply",
    "hiring multiple candidates",
    "responsive employer",
    "featured",
];

const TRACKING_PARAMS: [&str; 3] = ["from", "tk", "vjs"];

const CURRENCY_SYMBOLS: [char; 5] = ['$', '£', '€', '¥', '₹'];

const PAY_PERIODS: [&str; 6] = [
    "an hour",
    "a year",
    "a month",
    "per hour",
    "per year",
    "per month",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedListing {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub posted: Option<String>,
    pub snippet: Option<String>,
}

fn is_badge(line: &str) -> bool {
    let lowered = line.trim_end_matches(['!', '.']).to_lowercase();
    BADGE_LINES.contains(&lowered.as_str())
}

fn looks_like_salary(line: &str) -> bool {
    let lowered = line.to_lowercase();
    line.contains(CURRENCY_SYMBOLS) || PAY_PERIODS.iter().any(|p| lowered.contains(p))
}

fn looks_like_posted(line: &str) -> bool {
    let lowered = line.to_lowercase();
    if lowered.contains("just posted") {
        return true;
    }
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| matches!(word, "ago" | "posted" | "today" | "active"))
}

pub fn parse_listing(raw: &RawListing) -> Option<ParsedListing> {
    let mut lines = raw.lines().filter(|line| !is_badge(line));

    let title = lines.next()?.to_string();
    let company = lines.next()?.to_string();
    let location = lines.next().map(str::to_string);

    let mut parsed = ParsedListing {
        title,
        company,
        location,
        ..ParsedListing::default()
    };

    let mut snippet = Vec::new();
    for line in lines {
        if parsed.salary.is_none() && looks_like_salary(line) {
            parsed.salary = Some(line.to_string());
        } else if parsed.posted.is_none() && looks_like_posted(line) {
            parsed.posted = Some(line.to_string());
        } else {
            snippet.push(line);
        }
    }

    if !snippet.is_empty() {
        parsed.snippet = Some(snippet.join(" "));
    }

    Some(parsed)
}

/// Absolute, fragment-free URL without tracking parameters
pub fn normalize_job_url(url: &str, base: &str) -> Result<String> {
    let base = Url::parse(base).with_context(|| format!("Invalid base URL: {}", base))?;
    let mut resolved = base
        .join(url.trim())
        .with_context(|| format!("Invalid job URL: {}", url))?;

    if !matches!(resolved.scheme(), "http" | "https") {
        anyhow::bail!("Unsupported URL scheme: {}", resolved.scheme());
    }

    resolved.set_fragment(None);

    let kept: Vec<(String, String)> = resolved
        .query_pairs()
        .filter(|(key, _)| !key.starts_with("utm_") && !TRACKING_PARAMS.contains(&&**key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        resolved.set_query(None);
    } else {
        resolved.query_pairs_mut().clear().extend_pairs(kept);
    }

    Ok(resolved.to_string())
}
