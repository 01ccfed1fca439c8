//! Scriptable strategies for engine tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{AnalysisEngine, EngineOptions};
use crate::error::{AnalysisError, AnalysisOutcome};
use crate::registry::StrategyRegistry;
use crate::settings::MethodSource;
use crate::strategies::{AnalysisStrategy, BatchCapable};
use crate::types::{AnalysisMethod, AnalysisResult, MoodType};

#[derive(Clone, Copy, PartialEq)]
enum Probe {
    Up,
    Down,
    Broken,
}

pub(crate) struct FakeStrategy {
    label: String,
    probe: Probe,
    fail_all: bool,
    /// Content strings whose analysis fails.
    fail_on: HashSet<String>,
    delay: Option<Duration>,
    batch: Option<BatchMode>,
    calls: AtomicUsize,
    probes: AtomicUsize,
    batch_calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

#[derive(Clone, Copy, PartialEq)]
pub(crate) enum BatchMode {
    Working,
    Failing,
    /// Returns one result too few.
    Short,
    Panicking,
}

impl FakeStrategy {
    fn base(label: &str) -> Self {
        Self {
            label: label.to_string(),
            probe: Probe::Up,
            fail_all: false,
            fail_on: HashSet::new(),
            delay: None,
            batch: None,
            calls: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn working(label: &str) -> Arc<Self> {
        Arc::new(Self::base(label))
    }

    pub fn unavailable(label: &str) -> Arc<Self> {
        Arc::new(Self {
            probe: Probe::Down,
            ..Self::base(label)
        })
    }

    pub fn broken_probe(label: &str) -> Arc<Self> {
        Arc::new(Self {
            probe: Probe::Broken,
            ..Self::base(label)
        })
    }

    pub fn failing(label: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_all: true,
            ..Self::base(label)
        })
    }

    pub fn failing_on(label: &str, contents: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fail_on: contents.iter().map(|c| c.to_string()).collect(),
            ..Self::base(label)
        })
    }

    pub fn slow(label: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::base(label)
        })
    }

    pub fn batching(label: &str, mode: BatchMode) -> Arc<Self> {
        Arc::new(Self {
            batch: Some(mode),
            ..Self::base(label)
        })
    }

    pub fn batching_unavailable(label: &str) -> Arc<Self> {
        Arc::new(Self {
            probe: Probe::Down,
            batch: Some(BatchMode::Working),
            ..Self::base(label)
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// Contents passed to `analyze`, in call order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    /// Deterministic result that encodes the content, so tests can match slots.
    pub fn result_for(&self, content: &str) -> AnalysisResult {
        AnalysisResult::new(MoodType::Positive, 60, vec![content.to_string()], self.label.as_str())
    }
}

#[async_trait]
impl AnalysisStrategy for FakeStrategy {
    fn label(&self) -> &str {
        &self.label
    }

    async fn is_available(&self) -> AnalysisOutcome<bool> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match self.probe {
            Probe::Up => Ok(true),
            Probe::Down => Ok(false),
            Probe::Broken => Err(AnalysisError::execution(&self.label, "probe exploded")),
        }
    }

    async fn analyze(&self, content: &str) -> AnalysisOutcome<AnalysisResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(content.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_all || self.fail_on.contains(content) {
            return Err(AnalysisError::execution(&self.label, "scripted failure"));
        }
        Ok(self.result_for(content))
    }

    fn as_batch(&self) -> Option<&dyn BatchCapable> {
        self.batch.map(|_| self as &dyn BatchCapable)
    }
}

#[async_trait]
impl BatchCapable for FakeStrategy {
    async fn analyze_batch(&self, contents: &[String]) -> AnalysisOutcome<Vec<AnalysisResult>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        match self.batch {
            Some(BatchMode::Working) => Ok(contents.iter().map(|c| self.result_for(c)).collect()),
            Some(BatchMode::Short) => Ok(contents
                .iter()
                .skip(1)
                .map(|c| self.result_for(c))
                .collect()),
            Some(BatchMode::Panicking) => panic!("batch backend crashed"),
            _ => Err(AnalysisError::execution(&self.label, "batch endpoint down")),
        }
    }
}

pub(crate) fn engine_with_source(
    methods: Arc<dyn MethodSource>,
    rule: &Arc<FakeStrategy>,
    llm: Option<&Arc<FakeStrategy>>,
) -> AnalysisEngine {
    let rule: Arc<dyn AnalysisStrategy> = rule.clone();
    let mut registry = StrategyRegistry::new(rule);
    if let Some(llm) = llm {
        registry.register(AnalysisMethod::Llm.as_str(), llm.clone());
    }
    AnalysisEngine::new(registry, methods, EngineOptions::default())
}

pub(crate) fn engine_with(
    method: AnalysisMethod,
    rule: &Arc<FakeStrategy>,
    llm: Option<&Arc<FakeStrategy>>,
) -> AnalysisEngine {
    engine_with_source(Arc::new(method), rule, llm)
}
