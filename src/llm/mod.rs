// src/llm/mod.rs
//! Hosted LLM access: chat completions for ranking/composing, assistants + vector stores for profile config

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::AssistantSpec;

pub mod client;
pub mod parse;
pub mod prompts;

pub use client::LlmClient;
pub use parse::{parse_ranking_verdict, RankingVerdict};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[rocket::async_trait]
pub trait LanguageModel: Send + Sync {
    /// Text of the first choice
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// Remote assistant / vector store / file management
#[rocket::async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String>;
    async fn update_assistant(&self, assistant_id: &str, spec: &AssistantSpec) -> Result<()>;
    async fn delete_assistant(&self, assistant_id: &str) -> Result<()>;
    async fn create_vector_store(&self, name: &str) -> Result<String>;
    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String>;
    async fn attach_file(&self, vector_store_id: &str, file_id: &str) -> Result<()>;
    async fn delete_file(&self, file_id: &str) -> Result<()>;
}
