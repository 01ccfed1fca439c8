//! Deterministic lexicon scorer. Always available; the universal fallback target.

use async_trait::async_trait;

use super::AnalysisStrategy;
use crate::error::AnalysisOutcome;
use crate::types::{AnalysisResult, MoodType, NEUTRAL_SCORE};

pub const RULE_LABEL: &str = "rule";

const POSITIVE_WORDS: &[&str] = &[
    "happy", "joy", "joyful", "glad", "grateful", "thankful", "love", "loved", "excited",
    "calm", "peaceful", "proud", "relaxed", "hopeful", "great", "good", "wonderful",
    "amazing", "fun", "content", "cheerful", "delighted", "optimistic", "satisfied",
    "energized", "inspired", "relieved", "confident", "enjoyed", "smile", "laughed",
];

const NEGATIVE_WORDS: &[&str] = &[
    "sad", "angry", "upset", "anxious", "worried", "stressed", "tired", "exhausted",
    "lonely", "afraid", "scared", "frustrated", "annoyed", "depressed", "bad", "awful",
    "terrible", "hate", "hurt", "disappointed", "miserable", "overwhelmed", "nervous",
    "guilty", "ashamed", "bored", "cried", "crying", "sick", "pain", "regret",
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "don't", "dont", "didn't", "didnt", "isn't", "isnt", "wasn't",
    "wasnt", "can't", "cant", "cannot", "hardly", "without",
];

/// How many following tokens a negator reaches.
const NEGATION_WINDOW: u8 = 3;
const POINTS_PER_CUE: i64 = 12;
const MAX_TAGS: usize = 5;

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleStrategy;

#[derive(Debug, Default, PartialEq)]
struct Tally {
    positive: i64,
    negative: i64,
    cues: Vec<String>,
}

fn tokenize(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.trim_matches('\'').to_lowercase())
}

fn tally(content: &str) -> Tally {
    let mut tally = Tally::default();
    let mut negation: u8 = 0;

    for token in tokenize(content) {
        if NEGATORS.contains(&token.as_str()) {
            negation = NEGATION_WINDOW;
            continue;
        }

        let polarity = if POSITIVE_WORDS.contains(&token.as_str()) {
            Some(true)
        } else if NEGATIVE_WORDS.contains(&token.as_str()) {
            Some(false)
        } else {
            None
        };

        if let Some(positive) = polarity {
            // A negated cue counts for the opposite side
            if positive != (negation > 0) {
                tally.positive += 1;
            } else {
                tally.negative += 1;
            }
            if !tally.cues.contains(&token) {
                tally.cues.push(token);
            }
            negation = 0;
        } else {
            negation = negation.saturating_sub(1);
        }
    }

    tally
}

impl RuleStrategy {
    /// Synchronous scoring; the async trait method just wraps this.
    pub fn score(&self, content: &str) -> AnalysisResult {
        let tally = tally(content);
        let score = NEUTRAL_SCORE as i64 + POINTS_PER_CUE * (tally.positive - tally.negative);
        let mood = if score > 55 {
            MoodType::Positive
        } else if score < 45 {
            MoodType::Negative
        } else {
            MoodType::Neutral
        };

        let matched = tally.positive + tally.negative;
        let confidence = if matched == 0 {
            0.3
        } else {
            (0.4 + 0.1 * matched as f64).min(0.9)
        };

        let tags: Vec<String> = tally.cues.into_iter().take(MAX_TAGS).collect();

        AnalysisResult::new(mood, score, tags, RULE_LABEL)
            .with_reasoning(format!(
                "{} positive and {} negative cue(s)",
                tally.positive, tally.negative
            ))
            .with_confidence(confidence)
    }
}

#[async_trait]
impl AnalysisStrategy for RuleStrategy {
    fn label(&self) -> &str {
        RULE_LABEL
    }

    async fn is_available(&self) -> AnalysisOutcome<bool> {
        Ok(true)
    }

    async fn analyze(&self, content: &str) -> AnalysisOutcome<AnalysisResult> {
        Ok(self.score(content))
    }
}
