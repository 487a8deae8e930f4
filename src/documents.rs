// src/documents.rs
//! Document-generation API: turns cover letters into shareable documents

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::core::config_manager::DocumentSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
struct CreateDocumentRequest<'a> {
    title: &'a str,
    content: &'a str,
}

#[rocket::async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn create_document(&self, title: &str, content: &str) -> Result<GeneratedDocument>;
    async fn delete_document(&self, document_id: &str) -> Result<()>;
}

pub struct DocumentClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl DocumentClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

/// Real client when a base URL is configured, otherwise the disabled stand-in
pub fn backend_from_settings(settings: &DocumentSettings) -> Result<Arc<dyn DocumentBackend>> {
    match settings.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => {
            info!("Document service enabled at {}", url);
            Ok(Arc::new(DocumentClient::new(
                url,
                settings.api_key.clone(),
                settings.timeout_seconds,
            )?))
        }
        None => {
            info!("Document service not configured; exports disabled");
            Ok(Arc::new(DisabledDocuments))
        }
    }
}

#[rocket::async_trait]
impl DocumentBackend for DocumentClient {
    async fn create_document(&self, title: &str, content: &str) -> Result<GeneratedDocument> {
        let url = format!("{}/documents", self.base_url);
        let response = self
            .authorized(self.client.post(&url))
            .json(&CreateDocumentRequest { title, content })
            .send()
            .await
            .context("Failed to send request to document service")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Document service error {}: {}", status, error_text);
            anyhow::bail!("Document service returned {}: {}", status, error_text);
        }

        let document: GeneratedDocument = response
            .json()
            .await
            .context("Failed to parse document service response")?;

        info!("Created document {} ({})", document.id, title);
        Ok(document)
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        let url = format!("{}/documents/{}", self.base_url, document_id);
        let response = self
            .authorized(self.client.delete(&url))
            .send()
            .await
            .context("Failed to send request to document service")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Document service returned {}: {}", status, error_text);
        }

        Ok(())
    }
}

pub struct DisabledDocuments;

#[rocket::async_trait]
impl DocumentBackend for DisabledDocuments {
    async fn create_document(&self, _title: &str, _content: &str) -> Result<GeneratedDocument> {
        anyhow::bail!("document service not configured")
    }

    async fn delete_document(&self, _document_id: &str) -> Result<()> {
        anyhow::bail!("document service not configured")
    }
}
