// src/llm/client.rs
//! HTTP client for an OpenAI-compatible API

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, trace};

use super::{AssistantBackend, ChatMessage, ChatRequest, LanguageModel};
use crate::core::config_manager::LlmSettings;
use crate::models::AssistantSpec;

const CHAT_ENDPOINT: &str = "/chat/completions";
const ASSISTANTS_ENDPOINT: &str = "/assistants";
const VECTOR_STORES_ENDPOINT: &str = "/vector_stores";
const FILES_ENDPOINT: &str = "/files";

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ObjectId {
    id: String,
}

pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(settings.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn assistants_request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send<R>(&self, builder: RequestBuilder, what: &str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to LLM API", what))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("LLM API {} error {}: {}", what, status, error_text);
            anyhow::bail!("LLM API {} failed with status {}: {}", what, status, error_text);
        }

        response
            .json::<R>()
            .await
            .with_context(|| format!("Failed to parse LLM API {} response", what))
    }

    fn assistant_body(spec: &AssistantSpec) -> serde_json::Value {
        let mut body = json!({
            "name": spec.name,
            "model": spec.model,
            "instructions": spec.instructions,
            "tools": [{ "type": "file_search" }],
        });

        if let Some(temperature) = spec.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(store) = &spec.vector_store_id {
            body["tool_resources"] = json!({
                "file_search": { "vector_store_ids": [store] }
            });
        }

        body
    }
}

#[rocket::async_trait]
impl LanguageModel for LlmClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        trace!(
            "Sending chat completion: model={}, messages={}",
            request.model,
            request.messages.len()
        );

        let builder = self
            .client
            .post(self.url(CHAT_ENDPOINT))
            .bearer_auth(&self.api_key)
            .json(request);
        let response: ChatCompletionResponse = self.send(builder, "chat completion").await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("LLM API returned an empty completion"))?;

        info!("Received chat completion ({} chars)", content.len());
        Ok(content)
    }
}

#[rocket::async_trait]
impl AssistantBackend for LlmClient {
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String> {
        let builder = self.assistants_request(
            self.client
                .post(self.url(ASSISTANTS_ENDPOINT))
                .json(&Self::assistant_body(spec)),
        );
        let created: ObjectId = self.send(builder, "create assistant").await?;

        info!("Created remote assistant {}", created.id);
        Ok(created.id)
    }

    async fn update_assistant(&self, assistant_id: &str, spec: &AssistantSpec) -> Result<()> {
        let builder = self.assistants_request(
            self.client
                .post(self.url(&format!("{}/{}", ASSISTANTS_ENDPOINT, assistant_id)))
                .json(&Self::assistant_body(spec)),
        );
        let _: ObjectId = self.send(builder, "update assistant").await?;

        info!("Updated remote assistant {}", assistant_id);
        Ok(())
    }

    async fn delete_assistant(&self, assistant_id: &str) -> Result<()> {
        let builder = self.assistants_request(
            self.client
                .delete(self.url(&format!("{}/{}", ASSISTANTS_ENDPOINT, assistant_id))),
        );
        let _: serde_json::Value = self.send(builder, "delete assistant").await?;
        Ok(())
    }

    async fn create_vector_store(&self, name: &str) -> Result<String> {
        let builder = self.assistants_request(
            self.client
                .post(self.url(VECTOR_STORES_ENDPOINT))
                .json(&json!({ "name": name })),
        );
        let created: ObjectId = self.send(builder, "create vector store").await?;

        info!("Created vector store {}", created.id);
        Ok(created.id)
    }

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let form = Form::new().text("purpose", "assistants").part(
            "file",
            Part::bytes(bytes).file_name(file_name.to_string()),
        );

        let builder = self
            .client
            .post(self.url(FILES_ENDPOINT))
            .bearer_auth(&self.api_key)
            .multipart(form);
        let uploaded: ObjectId = self.send(builder, "upload file").await?;

        info!("Uploaded file {} as {}", file_name, uploaded.id);
        Ok(uploaded.id)
    }

    async fn attach_file(&self, vector_store_id: &str, file_id: &str) -> Result<()> {
        let builder = self.assistants_request(
            self.client
                .post(self.url(&format!(
                    "{}/{}/files",
                    VECTOR_STORES_ENDPOINT, vector_store_id
                )))
                .json(&json!({ "file_id": file_id })),
        );
        let _: ObjectId = self.send(builder, "attach file").await?;
        Ok(())
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        let builder = self
            .client
            .delete(self.url(&format!("{}/{}", FILES_ENDPOINT, file_id)))
            .bearer_auth(&self.api_key);
        let _: serde_json::Value = self.send(builder, "delete file").await?;
        Ok(())
    }
}
