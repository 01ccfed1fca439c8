//! Configuration: YAML config + env var overrides.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::types::AnalysisMethod;

/// Hosts treated as local model servers (no API key required)
/// Ten years.
const MAX_CACHE_TTL_HOURS: u64 = 10 * 365 * 24;
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "[::1]"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Initially selected backend: "rule" | "llm" | "local"
    #[serde(default = "default_method", deserialize_with = "lenient_method")]
    pub method: AnalysisMethod,

    /// Max entries held by the result cache
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Hours a cached result stays valid
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,

    /// Upper bound on a single strategy call
    #[serde(default = "default_strategy_timeout_secs")]
    pub strategy_timeout_secs: u64,

    /// Max simultaneous per-item calls in a batch (unbounded when unset)
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL for an OpenAI-compatible Chat Completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (set here or via OPENAI_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Max output tokens per completion
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_method() -> AnalysisMethod {
    AnalysisMethod::Rule
}
fn default_cache_max_entries() -> usize {
    100
}
fn default_cache_ttl_hours() -> u64 {
    24
}
fn default_strategy_timeout_secs() -> u64 {
    30
}
fn default_model() -> String {
    "gpt-4.1-mini".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_max_output_tokens() -> u32 {
    600
}

/// Unknown method names fall back to the rule engine instead of failing the load.
fn lenient_method<'de, D>(deserializer: D) -> std::result::Result<AnalysisMethod, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(parse_method_or_rule(&raw))
}

fn parse_method_or_rule(raw: &str) -> AnalysisMethod {
    raw.parse().unwrap_or_else(|e| {
        warn!("{}, using rule-based analysis", e);
        AnalysisMethod::Rule
    })
}

impl EngineConfig {
    /// Load config from a YAML file with env var overrides.
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config: {}", config_path.display()))?;

        let mut config: EngineConfig =
            serde_yaml::from_str(&content).context("Failed to parse config.yaml")?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Like `load`, but a missing file yields defaults (env overrides still apply).
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.is_file() {
            return Self::load(config_path);
        }
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from the default location (project_root/config.yaml)
    pub fn load_from_dir(project_root: &Path) -> Result<Self> {
        Self::load_or_default(&project_root.join("config.yaml"))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(m) = std::env::var("MOODLENS_METHOD") {
            self.method = parse_method_or_rule(&m);
        }
        if let Ok(url) = std::env::var("MOODLENS_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("MOODLENS_MODEL") {
            self.llm.model = model;
        }
        // Config file key wins over the generic OpenAI env var
        if self.llm.api_key.is_none() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.llm.api_key = Some(key);
            }
        }
        if let Ok(secs) = std::env::var("MOODLENS_TIMEOUT_SECS") {
            self.strategy_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("MOODLENS_TIMEOUT_SECS is not a number: {}", secs))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.cache_max_entries == 0 {
            anyhow::bail!("cache_max_entries must be at least 1");
        }
        if self.cache_ttl_hours > MAX_CACHE_TTL_HOURS {
            anyhow::bail!("cache_ttl_hours must be at most {}", MAX_CACHE_TTL_HOURS);
        }
        if self.strategy_timeout_secs == 0 {
            anyhow::bail!("strategy_timeout_secs must be at least 1");
        }
        if self.max_concurrency == Some(0) {
            anyhow::bail!("max_concurrency must be at least 1 when set");
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours.saturating_mul(3600))
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_secs(self.strategy_timeout_secs)
    }
}

impl LlmConfig {
    /// Whether the base URL points at a model server on this machine.
    pub fn is_local(&self) -> bool {
        let rest = self
            .base_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.base_url);
        let host = rest.split(['/', ':']).next().unwrap_or("");
        // IPv6 literals contain ':' so match on the bracketed prefix instead
        LOCAL_HOSTS.contains(&host) || rest.starts_with("[::1]")
    }

    /// Credentials are present or not needed.
    pub fn has_credentials(&self) -> bool {
        self.is_local() || self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            cache_max_entries: default_cache_max_entries(),
            cache_ttl_hours: default_cache_ttl_hours(),
            strategy_timeout_secs: default_strategy_timeout_secs(),
            max_concurrency: None,
            llm: LlmConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: None,
            max_output_tokens: default_max_output_tokens(),
        }
    }
}
