//! Error taxonomy for strategy execution.
//!
//! `Unavailable` is the configuration-unavailable case. Every other variant is a
//! strategy execution failure and follows the same fallback path. A cache miss
//! is plain `Option::None`, never an error.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error("strategy '{0}' is not available")]
    Unavailable(String),

    #[error("strategy '{strategy}' failed: {message}")]
    Execution { strategy: String, message: String },

    #[error("invalid response from backend: {0}")]
    InvalidResponse(String),

    #[error("strategy '{strategy}' timed out after {after:?}")]
    Timeout { strategy: String, after: Duration },

    #[error("strategy '{0}' does not support this operation")]
    Unsupported(String),

    #[error("unknown analysis method '{0}'")]
    UnknownMethod(String),
}

impl AnalysisError {
    pub fn execution(strategy: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AnalysisError::Execution {
            strategy: strategy.into(),
            message: message.to_string(),
        }
    }

    /// True for the configuration-unavailable case, false for execution failures.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AnalysisError::Unavailable(_))
    }
}

pub type AnalysisOutcome<T> = Result<T, AnalysisError>;
