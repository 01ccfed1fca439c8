//! On-device model backend. Not shipped yet: never available, never succeeds.

use async_trait::async_trait;

use super::AnalysisStrategy;
use crate::error::{AnalysisError, AnalysisOutcome};
use crate::types::AnalysisResult;

pub const LOCAL_LABEL: &str = "local";

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalModelStrategy;

#[async_trait]
impl AnalysisStrategy for LocalModelStrategy {
    fn label(&self) -> &str {
        LOCAL_LABEL
    }

    async fn is_available(&self) -> AnalysisOutcome<bool> {
        Ok(false)
    }

    async fn analyze(&self, _content: &str) -> AnalysisOutcome<AnalysisResult> {
        Err(AnalysisError::Unsupported(LOCAL_LABEL.to_string()))
    }
}
