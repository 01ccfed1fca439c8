//! OpenAI-compatible Chat Completions backend for the LLM strategy.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info};

use moodlens_core::config::LlmConfig;
use moodlens_core::error::{AnalysisError, AnalysisOutcome};
use moodlens_core::strategies::llm::LLM_LABEL;
use moodlens_core::strategies::ChatBackend;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);
const RETRY_DELAY: Duration = Duration::from_secs(2);
/// Max chars of an error body carried into logs and errors.
const ERROR_PREVIEW: usize = 300;

pub struct ChatCompletionsBackend {
    config: LlmConfig,
    client: reqwest::Client,
}

impl ChatCompletionsBackend {
    pub fn new(config: LlmConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn send(&self, body: &serde_json::Value) -> AnalysisOutcome<reqwest::Response> {
        // Local servers such as Ollama ignore the key
        let api_key = self.config.api_key.as_deref().unwrap_or("ollama");
        self.client
            .post(self.url())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| AnalysisError::execution(LLM_LABEL, format!("HTTP request failed: {}", e)))
    }
}

fn preview(text: &str) -> String {
    text.chars().take(ERROR_PREVIEW).collect()
}

/// Pull the assistant text out of a Chat Completions response.
fn completion_text(data: &serde_json::Value) -> AnalysisOutcome<String> {
    data["choices"][0]["message"]["content"]
        .as_str()
        .map(String::from)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AnalysisError::InvalidResponse("completion has no message content".into()))
}

#[async_trait]
impl ChatBackend for ChatCompletionsBackend {
    async fn complete(&self, system: &str, user: &str) -> AnalysisOutcome<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "max_tokens": self.config.max_output_tokens,
            "temperature": 0,
        });

        info!(model = %self.config.model, url = %self.url(), "chat_completions request");

        let mut response = self.send(&body).await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("API HTTP {}: {}", status, preview(&text));

            // Retry once on 500 errors (transient local model server issues)
            if status.as_u16() != 500 {
                return Err(AnalysisError::execution(
                    LLM_LABEL,
                    format!("HTTP {}: {}", status, preview(&text)),
                ));
            }
            tokio::time::sleep(RETRY_DELAY).await;
            response = self.send(&body).await?;
            if !response.status().is_success() {
                return Err(AnalysisError::execution(
                    LLM_LABEL,
                    format!("HTTP {} after retry", response.status()),
                ));
            }
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidResponse(format!("Failed to parse API response: {}", e)))?;
        completion_text(&data)
    }

    async fn is_available(&self) -> AnalysisOutcome<bool> {
        Ok(self.config.has_credentials())
    }
}
