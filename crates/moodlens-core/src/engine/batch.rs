//! Batch analysis with cache partitioning, concurrent dispatch, and
//! order-preserving assembly.
//!
//! The output always has the input's length and order. Blank entries resolve to
//! neutral without touching the cache. A slot left unresolved by a crashed task
//! becomes neutral.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::AnalysisEngine;
use crate::cache::cache_key;
use crate::error::AnalysisError;
use crate::types::{AnalysisMethod, AnalysisResult};

/// An entry that missed the cache, with its position in the input.
struct Pending {
    index: usize,
    content: String,
    key: String,
}

impl AnalysisEngine {
    /// Analyse many entries. Never fails; one item's failure never affects another.
    pub async fn analyze_batch(&self, contents: &[String]) -> Vec<AnalysisResult> {
        // Read once so every key in this call is scoped to the same method
        let method = self.current_method();
        let mut slots: Vec<Option<AnalysisResult>> = vec![None; contents.len()];

        let pending = self.partition(contents, method, &mut slots);
        debug!(
            total = contents.len(),
            uncached = pending.len(),
            method = %method,
            "batch partitioned"
        );

        if !pending.is_empty() {
            let pending = match self.try_native_batch(pending, method, &mut slots).await {
                Ok(()) => Vec::new(),
                Err(rest) => rest,
            };
            if !pending.is_empty() {
                self.dispatch_each(pending, method, &mut slots).await;
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    warn!(index, "batch slot unresolved, using neutral");
                    AnalysisResult::neutral()
                })
            })
            .collect()
    }

    /// Fill blanks and cache hits; return the misses in input order.
    fn partition(
        &self,
        contents: &[String],
        method: AnalysisMethod,
        slots: &mut [Option<AnalysisResult>],
    ) -> Vec<Pending> {
        let mut cache = self.cache();
        let mut pending = Vec::new();
        for (index, content) in contents.iter().enumerate() {
            if content.trim().is_empty() {
                slots[index] = Some(AnalysisResult::neutral());
                continue;
            }
            let key = cache_key(content, method);
            match cache.get(&key) {
                Some(hit) => slots[index] = Some(hit),
                None => pending.push(Pending {
                    index,
                    content: content.clone(),
                    key,
                }),
            }
        }
        pending
    }

    /// Use the strategy's native batch API when it has one and there is more
    /// than one item. Hands the items back if the batch path is not taken or fails.
    async fn try_native_batch(
        &self,
        pending: Vec<Pending>,
        method: AnalysisMethod,
        slots: &mut [Option<AnalysisResult>],
    ) -> Result<(), Vec<Pending>> {
        if pending.len() < 2 {
            return Err(pending);
        }
        let Some(strategy) = self.registry().get(method.as_str()) else {
            return Err(pending);
        };
        if strategy.as_batch().is_none() {
            return Err(pending);
        }
        // Per-item dispatch probes again inside the single-item pipeline;
        // availability may have changed by then.
        if !self.probe(strategy.as_ref()).await.unwrap_or(false) {
            debug!(strategy = strategy.label(), "batch strategy unavailable, dispatching per item");
            return Err(pending);
        }

        let contents: Vec<String> = pending.iter().map(|p| p.content.clone()).collect();
        let after = self.options().strategy_timeout;
        // Own task so a panicking backend surfaces as a JoinError
        let backend = Arc::clone(&strategy);
        let mut handle = tokio::spawn(async move {
            match backend.as_batch() {
                Some(batch) => batch.analyze_batch(&contents).await,
                None => Err(AnalysisError::Unsupported(backend.label().to_string())),
            }
        });
        let outcome = tokio::time::timeout(after, &mut handle).await;

        let results = match outcome {
            Ok(Ok(Ok(results))) if results.len() == pending.len() => results,
            Ok(Ok(Ok(results))) => {
                warn!(
                    expected = pending.len(),
                    got = results.len(),
                    "batch result count mismatch, dispatching per item"
                );
                return Err(pending);
            }
            Ok(Ok(Err(e))) => {
                warn!(strategy = strategy.label(), error = %e, "batch analysis failed, dispatching per item");
                return Err(pending);
            }
            Ok(Err(e)) => {
                error!(strategy = strategy.label(), error = %e, "batch task crashed, dispatching per item");
                return Err(pending);
            }
            Err(_) => {
                handle.abort();
                warn!(strategy = strategy.label(), ?after, "batch analysis timed out, dispatching per item");
                return Err(pending);
            }
        };

        let mut cache = self.cache();
        for (item, result) in pending.into_iter().zip(results) {
            cache.put(item.key, result.clone());
            slots[item.index] = Some(result);
        }
        info!(strategy = strategy.label(), "batch analysed via native batch API");
        Ok(())
    }

    /// Fan out one task per item through the single-item pipeline, then fan in.
    async fn dispatch_each(
        &self,
        pending: Vec<Pending>,
        method: AnalysisMethod,
        slots: &mut [Option<AnalysisResult>],
    ) {
        let limiter = self.options().max_concurrency.map(|n| Arc::new(Semaphore::new(n)));
        let mut tasks = JoinSet::new();

        for item in pending {
            let engine = self.clone();
            let limiter = limiter.clone();
            tasks.spawn(async move {
                // Held for the task's lifetime; a closed semaphore just means no cap
                let _permit = match limiter {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };
                let result = engine.analyze_with(&item.content, method).await;
                (item.index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => error!(error = %e, "batch item task crashed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fakes::{engine_with, BatchMode, FakeStrategy};
    use super::super::EngineOptions;
    use super::*;
    use crate::registry::StrategyRegistry;
    use crate::strategies::AnalysisStrategy;

    fn inputs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_blank_slot_and_order() {
        let rule = FakeStrategy::working("rule");
        let engine = engine_with(AnalysisMethod::Rule, &rule, None);

        let results = engine.analyze_batch(&inputs(&["", "a", "b"])).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_neutral());
        assert_eq!(results[1].extracted_tags, vec!["a"]);
        assert_eq!(results[2].extracted_tags, vec!["b"]);
        assert_eq!(rule.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let rule = FakeStrategy::working("rule");
        let engine = engine_with(AnalysisMethod::Rule, &rule, None);
        assert!(engine.analyze_batch(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_its_item() {
        let rule = FakeStrategy::working("rule");
        let llm = FakeStrategy::failing_on("llm", &["second"]);
        let engine = engine_with(AnalysisMethod::Llm, &rule, Some(&llm));

        let results = engine
            .analyze_batch(&inputs(&["first", "second", "third"]))
            .await;

        assert_eq!(results[0].analysis_method, "llm");
        assert_eq!(results[0].extracted_tags, vec!["first"]);
        assert_eq!(results[1].analysis_method, "rule");
        assert_eq!(results[1].extracted_tags, vec!["second"]);
        assert_eq!(results[2].analysis_method, "llm");
        assert_eq!(results[2].extracted_tags, vec!["third"]);
        assert_eq!(rule.seen(), vec!["second"]);
    }

    #[tokio::test]
    async fn test_cache_hits_skip_dispatch() {
        let rule = FakeStrategy::working("rule");
        let engine = engine_with(AnalysisMethod::Rule, &rule, None);

        engine.analyze("a").await;
        let results = engine.analyze_batch(&inputs(&["a", "b", "a"])).await;
        assert_eq!(results[0].extracted_tags, vec!["a"]);
        assert_eq!(results[1].extracted_tags, vec!["b"]);
        assert_eq!(results[2].extracted_tags, vec!["a"]);
        assert_eq!(rule.calls(), 2);
    }

    #[tokio::test]
    async fn test_results_are_written_through() {
        let rule = FakeStrategy::working("rule");
        let engine = engine_with(AnalysisMethod::Rule, &rule, None);

        let batch = engine.analyze_batch(&inputs(&["x", "", "y"])).await;
        assert_eq!(engine.cache_stats().total_entries, 2);

        let single = engine.analyze("y").await;
        assert_eq!(single, batch[2]);
        assert_eq!(rule.calls(), 2);
    }

    #[tokio::test]
    async fn test_native_batch_is_preferred() {
        let rule = FakeStrategy::working("rule");
        let llm = FakeStrategy::batching("llm", BatchMode::Working);
        let engine = engine_with(AnalysisMethod::Llm, &rule, Some(&llm));

        let results = engine.analyze_batch(&inputs(&["p", " ", "q", "r"])).await;
        assert_eq!(llm.batch_calls(), 1);
        assert_eq!(llm.calls(), 0);
        assert!(results[1].is_neutral());
        assert_eq!(results[0].extracted_tags, vec!["p"]);
        assert_eq!(results[2].extracted_tags, vec!["q"]);
        assert_eq!(results[3].extracted_tags, vec!["r"]);
        assert_eq!(engine.cache_stats().total_entries, 3);
    }

    #[tokio::test]
    async fn test_single_uncached_item_skips_native_batch() {
        let rule = FakeStrategy::working("rule");
        let llm = FakeStrategy::batching("llm", BatchMode::Working);
        let engine = engine_with(AnalysisMethod::Llm, &rule, Some(&llm));

        engine.analyze_batch(&inputs(&["only", ""])).await;
        assert_eq!(llm.batch_calls(), 0);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_native_batch_falls_back_per_item() {
        for mode in [BatchMode::Failing, BatchMode::Short] {
            let rule = FakeStrategy::working("rule");
            let llm = FakeStrategy::batching("llm", mode);
            let engine = engine_with(AnalysisMethod::Llm, &rule, Some(&llm));

            let results = engine.analyze_batch(&inputs(&["m", "n"])).await;
            assert_eq!(llm.batch_calls(), 1);
            assert_eq!(llm.calls(), 2);
            assert_eq!(results[0].extracted_tags, vec!["m"]);
            assert_eq!(results[1].extracted_tags, vec!["n"]);
            assert_eq!(results[0].analysis_method, "llm");
        }
    }

    #[tokio::test]
    async fn test_crashing_native_batch_falls_back_per_item() {
        let rule = FakeStrategy::working("rule");
        let llm = FakeStrategy::batching("llm", BatchMode::Panicking);
        let engine = engine_with(AnalysisMethod::Llm, &rule, Some(&llm));

        let results = engine.analyze_batch(&inputs(&["m", "n"])).await;
        assert_eq!(results.len(), 2);
        assert_eq!(llm.batch_calls(), 1);
        assert_eq!(llm.calls(), 2);
        assert_eq!(results[0].extracted_tags, vec!["m"]);
        assert_eq!(results[1].extracted_tags, vec!["n"]);
        assert_eq!(results[0].analysis_method, "llm");
    }

    #[tokio::test]
    async fn test_unavailable_batch_strategy_goes_to_rule() {
        let rule = FakeStrategy::working("rule");
        let llm = FakeStrategy::batching_unavailable("llm");
        let engine = engine_with(AnalysisMethod::Llm, &rule, Some(&llm));

        let results = engine.analyze_batch(&inputs(&["u", "v"])).await;
        assert_eq!(llm.batch_calls(), 0);
        assert_eq!(llm.calls(), 0);
        // One probe for the batch path, then one per item
        assert_eq!(llm.probes(), 3);
        assert!(results.iter().all(|r| r.analysis_method == "rule"));
        assert_eq!(results[1].extracted_tags, vec!["v"]);
    }

    #[tokio::test]
    async fn test_concurrency_cap_still_attempts_every_item() {
        let rule = FakeStrategy::working("rule");
        let llm = FakeStrategy::failing_on("llm", &["3"]);
        let rule_dyn: Arc<dyn AnalysisStrategy> = rule.clone();
        let mut registry = StrategyRegistry::new(rule_dyn);
        registry.register("llm", llm.clone());
        let options = EngineOptions {
            max_concurrency: Some(2),
            ..EngineOptions::default()
        };
        let engine = AnalysisEngine::new(registry, Arc::new(AnalysisMethod::Llm), options);

        let items: Vec<String> = (0..8).map(|i| i.to_string()).collect();
        let results = engine.analyze_batch(&items).await;

        assert_eq!(results.len(), 8);
        assert_eq!(llm.calls(), 8);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.extracted_tags, vec![i.to_string()]);
        }
        assert_eq!(results[3].analysis_method, "rule");
    }

    #[tokio::test]
    async fn test_total_failure_fills_neutral() {
        let rule = FakeStrategy::failing("rule");
        let llm = FakeStrategy::failing("llm");
        let engine = engine_with(AnalysisMethod::Llm, &rule, Some(&llm));

        let results = engine.analyze_batch(&inputs(&["a", "b"])).await;
        assert!(results.iter().all(|r| r.is_neutral()));
        assert_eq!(engine.cache_stats().total_entries, 0);
    }
}
