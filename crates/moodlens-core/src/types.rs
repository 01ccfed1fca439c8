//! Core types: AnalysisMethod, MoodType, AnalysisResult, StrategyStatus, CacheStats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Label carried by the zero-information default result.
pub const NEUTRAL_LABEL: &str = "neutral";

/// Score carried by the neutral result (midpoint of 0-100).
pub const NEUTRAL_SCORE: u8 = 50;

// ── Analysis method (external configuration) ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMethod {
    Rule,
    Llm,
    Local,
}

impl AnalysisMethod {
    /// Registry identifier for this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMethod::Rule => "rule",
            AnalysisMethod::Llm => "llm",
            AnalysisMethod::Local => "local",
        }
    }
}

impl std::fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AnalysisMethod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rule" => Ok(AnalysisMethod::Rule),
            "llm" => Ok(AnalysisMethod::Llm),
            "local" => Ok(AnalysisMethod::Local),
            other => Err(AnalysisError::UnknownMethod(other.to_string())),
        }
    }
}

// ── Mood ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodType {
    Positive,
    Negative,
    Neutral,
}

impl std::fmt::Display for MoodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoodType::Positive => write!(f, "positive"),
            MoodType::Negative => write!(f, "negative"),
            MoodType::Neutral => write!(f, "neutral"),
        }
    }
}

impl std::str::FromStr for MoodType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(MoodType::Positive),
            "negative" => Ok(MoodType::Negative),
            "neutral" => Ok(MoodType::Neutral),
            other => Err(AnalysisError::InvalidResponse(format!(
                "unknown mood type '{}'",
                other
            ))),
        }
    }
}

// ── Analysis result ──

/// Immutable outcome of analysing one piece of content.
///
/// `analysis_method` names the backend that actually produced the value, which
/// after a fallback differs from the configured method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub mood_type: MoodType,
    pub emotion_score: u8,
    pub extracted_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub analysis_method: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl AnalysisResult {
    /// Build a result, clamping score into 0-100 and confidence into 0-1.
    pub fn new(
        mood_type: MoodType,
        emotion_score: i64,
        extracted_tags: Vec<String>,
        analysis_method: impl Into<String>,
    ) -> Self {
        Self {
            mood_type,
            emotion_score: emotion_score.clamp(0, 100) as u8,
            extracted_tags,
            reasoning: None,
            analysis_method: analysis_method.into(),
            timestamp: Utc::now(),
            confidence: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        let reasoning = reasoning.into();
        self.reasoning = if reasoning.trim().is_empty() {
            None
        } else {
            Some(reasoning)
        };
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = if confidence.is_finite() {
            Some(confidence.clamp(0.0, 1.0))
        } else {
            None
        };
        self
    }

    /// The last-resort default: neutral mood, score 50, nothing extracted.
    pub fn neutral() -> Self {
        Self::new(
            MoodType::Neutral,
            NEUTRAL_SCORE as i64,
            Vec::new(),
            NEUTRAL_LABEL,
        )
    }

    /// True when this value is the neutral default (timestamp ignored).
    pub fn is_neutral(&self) -> bool {
        self.mood_type == MoodType::Neutral
            && self.emotion_score == NEUTRAL_SCORE
            && self.extracted_tags.is_empty()
            && self.reasoning.is_none()
            && self.confidence.is_none()
            && self.analysis_method == NEUTRAL_LABEL
    }
}

// ── Diagnostics ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyStatus {
    pub method: AnalysisMethod,
    pub is_available: bool,
    pub status_message: String,
    pub can_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub max_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_round_trips_through_str() {
        for method in [AnalysisMethod::Rule, AnalysisMethod::Llm, AnalysisMethod::Local] {
            assert_eq!(method.as_str().parse::<AnalysisMethod>().unwrap(), method);
        }
        assert_eq!(" LLM ".parse::<AnalysisMethod>().unwrap(), AnalysisMethod::Llm);
        assert!("cloud".parse::<AnalysisMethod>().is_err());
    }

    #[test]
    fn test_result_clamps_score_and_confidence() {
        let high = AnalysisResult::new(MoodType::Positive, 180, vec![], "rule").with_confidence(3.5);
        assert_eq!(high.emotion_score, 100);
        assert_eq!(high.confidence, Some(1.0));

        let low = AnalysisResult::new(MoodType::Negative, -20, vec![], "rule").with_confidence(-1.0);
        assert_eq!(low.emotion_score, 0);
        assert_eq!(low.confidence, Some(0.0));

        let nan = AnalysisResult::neutral().with_confidence(f64::NAN);
        assert_eq!(nan.confidence, None);
    }

    #[test]
    fn test_neutral_shape() {
        let n = AnalysisResult::neutral();
        assert_eq!(n.mood_type, MoodType::Neutral);
        assert_eq!(n.emotion_score, 50);
        assert!(n.extracted_tags.is_empty());
        assert_eq!(n.analysis_method, "neutral");
        assert!(n.is_neutral());

        let tagged = AnalysisResult::neutral().with_reasoning("calm day");
        assert!(!tagged.is_neutral());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = AnalysisResult::new(MoodType::Positive, 72, vec!["happy".into()], "llm")
            .with_confidence(0.8);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["moodType"], "positive");
        assert_eq!(value["emotionScore"], 72);
        assert_eq!(value["extractedTags"][0], "happy");
        assert_eq!(value["analysisMethod"], "llm");
        assert!(value.get("reasoning").is_none());
    }
}
