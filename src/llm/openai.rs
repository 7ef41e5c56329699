use crate::config::Config;
use crate::error::TaggerError;
use crate::llm::schema::{parse_tagging_content, response_format};
use crate::llm::TaggingBackend;
use crate::models::{Batch, TagCategory, TaggingResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Chat-completion client for an OpenAI-compatible endpoint
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String, url: String, timeout: Duration) -> Result<Self, TaggerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TaggerError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model,
            url,
        })
    }

    /// Fails with a configuration error when no API key is available
    pub fn from_config(config: &Config) -> Result<Self, TaggerError> {
        let api_key = config.api_key()?;
        Self::new(
            api_key,
            config.openai.model.clone(),
            config.openai.url.clone(),
            Duration::from_secs(config.openai.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, body: &Value) -> Result<String, TaggerError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| TaggerError::Network(format!("Failed to reach {}: {}", self.url, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TaggerError::Network(format!("Failed to read response from {}: {}", self.url, e)))?;

        if !status.is_success() {
            return Err(TaggerError::Network(format!("{} returned {}: {}", self.url, status, text)));
        }

        parse_chat_content(&text)
    }
}

/// Request body carrying the batch's previews as base64 data URLs
pub fn image_request_body(
    model: &str,
    prompt: &str,
    names: &[String],
    images_base64: &[String],
    categories: &[TagCategory],
) -> Value {
    let mut content = vec![json!({
        "type": "text",
        "text": format!("Please tag these images: {}", names.join(", ")),
    })];
    content.extend(images_base64.iter().map(|image| {
        json!({
            "type": "image_url",
            "image_url": { "url": format!("data:image/jpeg;base64,{}", image) },
        })
    }));

    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": prompt },
            { "role": "user", "content": content },
        ],
        "response_format": response_format(categories),
    })
}

pub fn text_request_body(model: &str, system: &str, prompt: &str, max_tokens: u32) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": system },
            { "role": "user", "content": prompt },
        ],
        "max_tokens": max_tokens,
    })
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Extract `choices[0].message.content` from a chat-completion body
pub fn parse_chat_content(body: &str) -> Result<String, TaggerError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| TaggerError::ResponseShape(format!("not a chat completion: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| TaggerError::ResponseShape("response has no message content".to_string()))
}

#[async_trait::async_trait]
impl TaggingBackend for OpenAiClient {
    async fn tag_images(
        &self,
        prompt: &str,
        batch: &Batch,
        categories: &[TagCategory],
    ) -> Result<Vec<TaggingResult>, TaggerError> {
        let mut images = Vec::with_capacity(batch.len());
        for entry in &batch.previews {
            let bytes = tokio::fs::read(&entry.preview).await?;
            images.push(STANDARD.encode(bytes));
        }

        let names = batch.source_names();
        debug!(batch = batch.index, files = ?names, "Requesting tags");
        let body = image_request_body(&self.model, prompt, &names, &images, categories);
        let content = self.send(&body).await?;
        parse_tagging_content(&content, categories)
    }

    async fn complete(&self, system: &str, prompt: &str, max_tokens: u32) -> Result<String, TaggerError> {
        let body = text_request_body(&self.model, system, prompt, max_tokens);
        self.send(&body).await
    }
}
