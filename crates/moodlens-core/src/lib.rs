//! moodlens-core: emotion analysis engine, no UI and no wire protocol.
//!
//! An [`AnalysisEngine`] picks the configured backend from a
//! [`StrategyRegistry`], falls back to the rule engine when that backend is
//! unavailable or fails, memoizes results in a bounded TTL cache, and analyses
//! batches concurrently while preserving input order. Its public operations
//! never fail; the worst outcome is the neutral result.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod prompts;
pub mod registry;
pub mod settings;
pub mod strategies;
pub mod types;

pub use config::EngineConfig;
pub use engine::{AnalysisEngine, EngineOptions};
pub use error::AnalysisError;
pub use registry::StrategyRegistry;
pub use settings::{MethodSource, SharedMethod};
pub use types::{AnalysisMethod, AnalysisResult, CacheStats, MoodType, StrategyStatus};
