//! Strategy registry keyed by identifier.
//!
//! Strategies are shared read-only capability objects. The registry always
//! holds a fallback strategy (the rule engine) so resolution never fails.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::strategies::{AnalysisStrategy, ChatBackend, LlmStrategy, LocalModelStrategy, RuleStrategy};
use crate::types::AnalysisMethod;

pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn AnalysisStrategy>>,
    fallback: Arc<dyn AnalysisStrategy>,
}

impl StrategyRegistry {
    /// Registry holding only `fallback`, registered under the rule identifier.
    pub fn new(fallback: Arc<dyn AnalysisStrategy>) -> Self {
        let mut strategies = HashMap::new();
        strategies.insert(AnalysisMethod::Rule.as_str().to_string(), Arc::clone(&fallback));
        Self {
            strategies,
            fallback,
        }
    }

    /// Rule engine, LLM over `chat`, and the local-model stub.
    pub fn with_defaults(chat: Arc<dyn ChatBackend>) -> Self {
        let mut registry = Self::new(Arc::new(RuleStrategy));
        registry.register(AnalysisMethod::Llm.as_str(), Arc::new(LlmStrategy::new(chat)));
        registry.register(AnalysisMethod::Local.as_str(), Arc::new(LocalModelStrategy));
        registry
    }

    /// Register (or replace) the strategy for `id`.
    ///
    /// Replacing the rule identifier also replaces the fallback target.
    pub fn register(&mut self, id: &str, strategy: Arc<dyn AnalysisStrategy>) {
        if self.strategies.contains_key(id) {
            warn!(id, "Strategy already registered, replacing");
        } else {
            info!(id, label = strategy.label(), "Registering analysis strategy");
        }
        if id == AnalysisMethod::Rule.as_str() {
            self.fallback = Arc::clone(&strategy);
        }
        self.strategies.insert(id.to_string(), strategy);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn AnalysisStrategy>> {
        self.strategies.get(id).cloned()
    }

    pub fn fallback(&self) -> Arc<dyn AnalysisStrategy> {
        Arc::clone(&self.fallback)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.strategies.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let mut registry = Self::new(Arc::new(RuleStrategy));
        registry.register(AnalysisMethod::Local.as_str(), Arc::new(LocalModelStrategy));
        registry
    }
}
