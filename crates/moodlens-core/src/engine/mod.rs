//! The analysis engine: single-item orchestration with a bounded fallback chain.
//!
//! Resolution runs `Primary -> RuleFallback -> Neutral` and stops at the first
//! success. At most two strategy calls happen per item; the pipeline has no
//! re-entry point, so a failing rule engine cannot recurse.

mod batch;
mod status;

#[cfg(test)]
pub(crate) mod fakes;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::cache::{cache_key, ResultCache, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
use crate::config::EngineConfig;
use crate::error::{AnalysisError, AnalysisOutcome};
use crate::registry::StrategyRegistry;
use crate::settings::MethodSource;
use crate::strategies::AnalysisStrategy;
use crate::types::{AnalysisMethod, AnalysisResult, CacheStats};

const DEFAULT_STRATEGY_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for an [`AnalysisEngine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub cache_max_entries: usize,
    pub cache_ttl: Duration,
    /// Applied to every strategy call and availability probe.
    pub strategy_timeout: Duration,
    /// Cap on simultaneous per-item calls in a batch; `None` is unbounded.
    pub max_concurrency: Option<usize>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cache_max_entries: DEFAULT_MAX_ENTRIES,
            cache_ttl: DEFAULT_TTL,
            strategy_timeout: DEFAULT_STRATEGY_TIMEOUT,
            max_concurrency: None,
        }
    }
}

impl From<&EngineConfig> for EngineOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            cache_max_entries: config.cache_max_entries,
            cache_ttl: config.cache_ttl(),
            strategy_timeout: config.strategy_timeout(),
            max_concurrency: config.max_concurrency,
        }
    }
}

/// How an item was resolved.
enum Resolution {
    Primary(AnalysisResult),
    Fallback(AnalysisResult),
    Exhausted,
}

struct EngineInner {
    registry: StrategyRegistry,
    methods: Arc<dyn MethodSource>,
    cache: Mutex<ResultCache>,
    options: EngineOptions,
}

/// Cheap to clone; clones share the registry and the cache.
#[derive(Clone)]
pub struct AnalysisEngine {
    inner: Arc<EngineInner>,
}

impl AnalysisEngine {
    pub fn new(
        registry: StrategyRegistry,
        methods: Arc<dyn MethodSource>,
        options: EngineOptions,
    ) -> Self {
        info!(
            strategies = ?registry.ids(),
            cache_max_entries = options.cache_max_entries,
            timeout_secs = options.strategy_timeout.as_secs(),
            "Creating analysis engine"
        );
        let cache = ResultCache::new(options.cache_max_entries, options.cache_ttl);
        Self {
            inner: Arc::new(EngineInner {
                registry,
                methods,
                cache: Mutex::new(cache),
                options,
            }),
        }
    }

    pub fn current_method(&self) -> AnalysisMethod {
        self.inner.methods.current_method()
    }

    /// Analyse one entry. Never fails: the worst case is the neutral result.
    pub async fn analyze(&self, content: &str) -> AnalysisResult {
        if content.trim().is_empty() {
            return AnalysisResult::neutral();
        }
        let method = self.current_method();
        self.analyze_with(content, method).await
    }

    /// Cache lookup, then the fallback pipeline, then write-through.
    pub(crate) async fn analyze_with(&self, content: &str, method: AnalysisMethod) -> AnalysisResult {
        let key = cache_key(content, method);
        let cached = self.cache().get(&key);
        if let Some(hit) = cached {
            debug!(method = %method, "cache hit");
            return hit;
        }

        match self.resolve(content, method).await {
            Resolution::Primary(result) | Resolution::Fallback(result) => {
                self.cache().put(key, result.clone());
                result
            }
            Resolution::Exhausted => AnalysisResult::neutral(),
        }
    }

    async fn resolve(&self, content: &str, method: AnalysisMethod) -> Resolution {
        let registry = &self.inner.registry;
        let (primary, may_fall_back) = match registry.get(method.as_str()) {
            Some(strategy) => (strategy, method != AnalysisMethod::Rule),
            None => {
                warn!(method = %method, "No strategy registered, using rule-based analysis");
                (registry.fallback(), false)
            }
        };

        if self.probe(primary.as_ref()).await.unwrap_or(false) {
            match self.call(primary.as_ref(), content).await {
                Ok(result) => return Resolution::Primary(result),
                Err(e) if !may_fall_back => {
                    error!(strategy = primary.label(), error = %e, "Analysis failed with no fallback left");
                    return Resolution::Exhausted;
                }
                Err(e) => {
                    warn!(strategy = primary.label(), error = %e, "Analysis failed, falling back to rule-based");
                }
            }
        } else {
            info!(strategy = primary.label(), "Strategy unavailable, using rule-based analysis");
        }

        let fallback = registry.fallback();
        match self.call(fallback.as_ref(), content).await {
            Ok(result) => Resolution::Fallback(result),
            Err(e) => {
                error!(strategy = fallback.label(), error = %e, "Fallback analysis failed");
                Resolution::Exhausted
            }
        }
    }

    /// Availability probe under the strategy timeout.
    pub(crate) async fn probe(&self, strategy: &dyn AnalysisStrategy) -> AnalysisOutcome<bool> {
        let after = self.inner.options.strategy_timeout;
        match tokio::time::timeout(after, strategy.is_available()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AnalysisError::Timeout {
                strategy: strategy.label().to_string(),
                after,
            }),
        }
    }

    async fn call(&self, strategy: &dyn AnalysisStrategy, content: &str) -> AnalysisOutcome<AnalysisResult> {
        let after = self.inner.options.strategy_timeout;
        match tokio::time::timeout(after, strategy.analyze(content)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AnalysisError::Timeout {
                strategy: strategy.label().to_string(),
                after,
            }),
        }
    }

    pub fn clear_cache(&self) {
        self.cache().clear();
        info!("Analysis cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache().stats()
    }

    fn cache(&self) -> MutexGuard<'_, ResultCache> {
        // Cache operations cannot leave the map half-updated, so a poisoned lock is still usable
        self.inner.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn registry(&self) -> &StrategyRegistry {
        &self.inner.registry
    }

    pub(crate) fn options(&self) -> &EngineOptions {
        &self.inner.options
    }
}
