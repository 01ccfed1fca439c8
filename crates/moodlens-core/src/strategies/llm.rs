//! LLM-backed strategy.
//!
//! The wire protocol is not implemented here: the strategy talks to a
//! [`ChatBackend`] and only owns prompt construction and reply parsing.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex_lite::Regex;
use serde::Deserialize;
use tracing::debug;

use super::{AnalysisStrategy, BatchCapable};
use crate::error::{AnalysisError, AnalysisOutcome};
use crate::prompts::{analysis_prompt, batch_prompt, ANALYSIS_SYSTEM_PROMPT, BATCH_SYSTEM_PROMPT};
use crate::types::{AnalysisResult, MoodType};

pub const LLM_LABEL: &str = "llm";

/// Max tags kept from a model reply.
const MAX_TAGS: usize = 5;

/// A chat-completion provider.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one system + user exchange and return the assistant's text.
    async fn complete(&self, system: &str, user: &str) -> AnalysisOutcome<String>;

    /// Credentials / reachability check.
    async fn is_available(&self) -> AnalysisOutcome<bool>;
}

pub struct LlmStrategy {
    backend: Arc<dyn ChatBackend>,
}

impl LlmStrategy {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }
}

/// One analysis as the model returns it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelVerdict {
    #[serde(alias = "mood", alias = "mood_type")]
    mood_type: String,
    #[serde(alias = "score", alias = "emotion_score")]
    emotion_score: f64,
    #[serde(default, alias = "extractedTags", alias = "extracted_tags")]
    tags: Vec<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl ModelVerdict {
    fn into_result(self) -> AnalysisOutcome<AnalysisResult> {
        let mood: MoodType = self.mood_type.parse()?;
        if !self.emotion_score.is_finite() {
            return Err(AnalysisError::InvalidResponse(
                "emotionScore is not a number".into(),
            ));
        }
        let tags = self
            .tags
            .into_iter()
            .map(|t| t.trim().trim_start_matches('#').to_lowercase())
            .filter(|t| !t.is_empty())
            .take(MAX_TAGS)
            .collect();

        let mut result =
            AnalysisResult::new(mood, self.emotion_score.round() as i64, tags, LLM_LABEL);
        if let Some(reasoning) = self.reasoning {
            result = result.with_reasoning(reasoning);
        }
        if let Some(confidence) = self.confidence {
            result = result.with_confidence(confidence);
        }
        Ok(result)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BatchReply {
    List(Vec<ModelVerdict>),
    Wrapped { results: Vec<ModelVerdict> },
}

/// Pull the JSON payload out of a reply that may wrap it in prose or a code fence.
fn extract_json(reply: &str, open: char, close: char) -> AnalysisOutcome<&str> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("fence pattern is valid")
    });
    let body = fence
        .captures(reply)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(reply);

    let start = body.find(open);
    let end = body.rfind(close);
    match (start, end) {
        (Some(s), Some(e)) if s < e => Ok(&body[s..=e]),
        _ => {
            let preview: String = reply.chars().take(120).collect();
            Err(AnalysisError::InvalidResponse(format!(
                "no JSON payload in reply: {}",
                preview
            )))
        }
    }
}

fn parse_single(reply: &str) -> AnalysisOutcome<AnalysisResult> {
    let json = extract_json(reply, '{', '}')?;
    let verdict: ModelVerdict = serde_json::from_str(json)
        .map_err(|e| AnalysisError::InvalidResponse(format!("bad analysis JSON: {}", e)))?;
    verdict.into_result()
}

fn parse_batch(reply: &str, expected: usize) -> AnalysisOutcome<Vec<AnalysisResult>> {
    // A wrapped object reply starts with '{', a bare list with '['
    let trimmed = reply.trim_start();
    let json = if trimmed.starts_with('{') {
        extract_json(reply, '{', '}')?
    } else {
        extract_json(reply, '[', ']')?
    };
    let verdicts = match serde_json::from_str::<BatchReply>(json)
        .map_err(|e| AnalysisError::InvalidResponse(format!("bad batch JSON: {}", e)))?
    {
        BatchReply::List(list) => list,
        BatchReply::Wrapped { results } => results,
    };

    if verdicts.len() != expected {
        return Err(AnalysisError::InvalidResponse(format!(
            "expected {} results, got {}",
            expected,
            verdicts.len()
        )));
    }
    verdicts.into_iter().map(ModelVerdict::into_result).collect()
}

#[async_trait]
impl AnalysisStrategy for LlmStrategy {
    fn label(&self) -> &str {
        LLM_LABEL
    }

    async fn is_available(&self) -> AnalysisOutcome<bool> {
        self.backend.is_available().await
    }

    async fn analyze(&self, content: &str) -> AnalysisOutcome<AnalysisResult> {
        let reply = self
            .backend
            .complete(ANALYSIS_SYSTEM_PROMPT, &analysis_prompt(content))
            .await?;
        debug!(reply_len = reply.len(), "llm analysis reply");
        parse_single(&reply)
    }

    fn as_batch(&self) -> Option<&dyn BatchCapable> {
        Some(self)
    }
}

#[async_trait]
impl BatchCapable for LlmStrategy {
    async fn analyze_batch(&self, contents: &[String]) -> AnalysisOutcome<Vec<AnalysisResult>> {
        if contents.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self
            .backend
            .complete(BATCH_SYSTEM_PROMPT, &batch_prompt(contents))
            .await?;
        debug!(count = contents.len(), reply_len = reply.len(), "llm batch reply");
        parse_batch(&reply, contents.len())
    }
}
