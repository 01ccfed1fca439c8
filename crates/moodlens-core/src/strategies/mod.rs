//! Analysis backends: rule engine, LLM, local model stub.
//!
//! Every backend implements [`AnalysisStrategy`]. Backends with a native batch
//! API also implement [`BatchCapable`] and return themselves from
//! [`AnalysisStrategy::as_batch`]; the engine never inspects concrete types.

pub mod llm;
pub mod local;
pub mod rule;

use async_trait::async_trait;

use crate::error::AnalysisOutcome;
use crate::types::AnalysisResult;

pub use llm::{ChatBackend, LlmStrategy};
pub use local::LocalModelStrategy;
pub use rule::RuleStrategy;

#[async_trait]
pub trait AnalysisStrategy: Send + Sync {
    /// Label stamped on results this backend produces.
    fn label(&self) -> &str;

    /// Cheap probe (credentials, config presence). An `Err` means the probe
    /// itself broke and is reported as data by the status surface.
    async fn is_available(&self) -> AnalysisOutcome<bool>;

    async fn analyze(&self, content: &str) -> AnalysisOutcome<AnalysisResult>;

    fn as_batch(&self) -> Option<&dyn BatchCapable> {
        None
    }
}

#[async_trait]
pub trait BatchCapable: Send + Sync {
    /// One result per input, in input order.
    async fn analyze_batch(&self, contents: &[String]) -> AnalysisOutcome<Vec<AnalysisResult>>;
}
