// src/core/config_manager.rs
//! Configuration loading: `config.yaml` sections selected by environment, then env overrides

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::FsOps;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigManager {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub llm: LlmSettings,
    pub documents: DocumentSettings,
    pub scraper: ScraperSettings,
    pub ranking: RankingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    pub data_path: PathBuf,
    pub database_path: PathBuf,
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub firebase_project_id: String,
    pub shared_secret: Option<String>,
    pub admin_emails: Vec<String>,
    pub require_beta_approval: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_description_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    pub search_url: String,
    pub site_base_url: String,
    pub default_query: String,
    pub default_location: String,
    pub query_param: String,
    pub location_param: String,
    pub page_param: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub max_consecutive_duplicates: u32,
    pub page_delay_ms: u64,
    pub card_selector: String,
    pub link_selector: String,
    pub fetch_details: bool,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingSettings {
    pub batch_max_age_hours: i64,
    pub batch_limit: u32,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    local: Option<ConfigManager>,
    #[serde(default)]
    production: Option<ConfigManager>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            auth: AuthSettings::default(),
            llm: LlmSettings::default(),
            documents: DocumentSettings::default(),
            scraper: ScraperSettings::default(),
            ranking: RankingSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8000,
            data_path: PathBuf::from("data"),
            database_path: PathBuf::from("data/jobhunt.db"),
            log_path: None,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            firebase_project_id: "jobhunt".to_string(),
            shared_secret: None,
            admin_emails: Vec::new(),
            require_beta_approval: false,
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 120,
            max_description_chars: 6000,
        }
    }
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_seconds: 60,
        }
    }
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            search_url: "https://www.indeed.com/jobs".to_string(),
            site_base_url: "https://www.indeed.com".to_string(),
            default_query: "software engineer".to_string(),
            default_location: "Remote".to_string(),
            query_param: "q".to_string(),
            location_param: "l".to_string(),
            page_param: "start".to_string(),
            page_size: 10,
            max_pages: 20,
            max_consecutive_duplicates: 5,
            page_delay_ms: 1500,
            card_selector: "div.job_seen_beacon".to_string(),
            link_selector: "h2 a".to_string(),
            fetch_details: true,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            batch_max_age_hours: 24 * 7,
            batch_limit: 50,
        }
    }
}

impl ConfigManager {
    /// Load configuration for the current environment
    pub fn load() -> Result<Self> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);

        let config_path = std::env::var("JOBHUNT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.yaml"));

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path, &environment)?
        } else {
            warn!(
                "{} not found, using built-in defaults",
                config_path.display()
            );
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.resolve_paths()?;
        Ok(config)
    }

    fn get_environment() -> String {
        std::env::var("JOBHUNT_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    }

    fn load_from_file(path: &Path, environment: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content, environment)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Pick the section for `environment` out of a YAML document
    pub fn from_yaml(content: &str, environment: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        let section = match environment {
            "production" => file.production,
            _ => file.local,
        };
        section.ok_or_else(|| anyhow::anyhow!("No '{}' section in configuration", environment))
    }

    /// Apply secrets and deploy knobs from the environment
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("LLM_API_KEY") {
            self.llm.api_key = key;
        }
        if let Some(url) = lookup("LLM_API_URL") {
            self.llm.base_url = url;
        }
        if let Some(url) = lookup("DOCUMENT_API_URL") {
            self.documents.base_url = Some(url);
        }
        if let Some(key) = lookup("DOCUMENT_API_KEY") {
            self.documents.api_key = Some(key);
        }
        if let Some(secret) = lookup("AUTH_SHARED_SECRET") {
            self.auth.shared_secret = Some(secret);
        }
        if let Some(project) = lookup("FIREBASE_PROJECT_ID") {
            self.auth.firebase_project_id = project;
        }
        if let Some(emails) = lookup("ADMIN_EMAILS") {
            self.auth.admin_emails = emails
                .split(',')
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect();
        }
        if let Some(port) = lookup("ROCKET_PORT") {
            self.server.port = port
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("ROCKET_PORT must be a valid port number"))?;
        }
        Ok(())
    }

    fn resolve_paths(&mut self) -> Result<()> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        self.server.data_path = FsOps::normalize_path(&current_dir, &self.server.data_path);
        self.server.database_path =
            FsOps::normalize_path(&current_dir, &self.server.database_path);
        if let Some(log_path) = &self.server.log_path {
            self.server.log_path = Some(FsOps::normalize_path(&current_dir, log_path));
        }
        Ok(())
    }

    /// Ensure all required directories exist
    pub async fn ensure_directories(&self) -> Result<()> {
        FsOps::ensure_dir_exists(&self.server.data_path).await?;

        if let Some(db_parent) = self.server.database_path.parent() {
            FsOps::ensure_dir_exists(db_parent).await?;
        }

        Ok(())
    }

    pub fn is_admin(&self, email: &str) -> bool {
        let email = email.trim();
        self.auth
            .admin_emails
            .iter()
            .any(|admin| admin.trim().eq_ignore_ascii_case(email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
local:
  server:
    port: 9000
    database_path: local.db
  scraper:
    max_pages: 3
    max_consecutive_duplicates: 2
production:
  server:
    port: 80
    database_path: /var/lib/jobhunt/jobhunt.db
  auth:
    require_beta_approval: true
"#;

    #[test]
    fn test_from_yaml_selects_section_and_keeps_defaults() {
        let local = ConfigManager::from_yaml(SAMPLE, "local").unwrap();
        assert_eq!(local.server.port, 9000);
        assert_eq!(local.scraper.max_pages, 3);
        assert_eq!(local.scraper.max_consecutive_duplicates, 2);
        assert_eq!(local.scraper.query_param, "q");
        assert!(!local.auth.require_beta_approval);

        let prod = ConfigManager::from_yaml(SAMPLE, "production").unwrap();
        assert_eq!(prod.server.port, 80);
        assert!(prod.auth.require_beta_approval);
    }

    #[test]
    fn test_from_yaml_missing_section() {
        let yaml = "local:\n  server:\n    port: 1\n";
        assert!(ConfigManager::from_yaml(yaml, "production").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("LLM_API_KEY", "sk-test"),
            ("ADMIN_EMAILS", "Boss@Example.com, ops@example.com ,"),
            ("ROCKET_PORT", "8123"),
            ("DOCUMENT_API_URL", "http://docs.local"),
        ]
        .into_iter()
        .collect();

        let mut config = ConfigManager::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.server.port, 8123);
        assert_eq!(config.documents.base_url.as_deref(), Some("http://docs.local"));
        assert_eq!(
            config.auth.admin_emails,
            vec!["boss@example.com".to_string(), "ops@example.com".to_string()]
        );
        assert!(config.is_admin("BOSS@example.com"));
        assert!(!config.is_admin("someone@example.com"));
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = ConfigManager::default();
        let result = config.apply_env_overrides(|k| {
            (k == "ROCKET_PORT").then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }
}
