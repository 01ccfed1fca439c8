//! Source of the currently selected analysis method.
//!
//! The engine reads the method on every call and never caches it, so a
//! settings change takes effect on the next analysis.

use std::sync::{Arc, RwLock};

use tracing::info;

use crate::types::AnalysisMethod;

pub trait MethodSource: Send + Sync {
    fn current_method(&self) -> AnalysisMethod;
}

impl MethodSource for AnalysisMethod {
    fn current_method(&self) -> AnalysisMethod {
        *self
    }
}

/// In-memory selectable method, shared between the engine and a settings surface.
#[derive(Debug, Clone)]
pub struct SharedMethod {
    inner: Arc<RwLock<AnalysisMethod>>,
}

impl SharedMethod {
    pub fn new(method: AnalysisMethod) -> Self {
        Self {
            inner: Arc::new(RwLock::new(method)),
        }
    }

    pub fn set(&self, method: AnalysisMethod) {
        // A poisoned lock still holds a valid Copy value
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if *guard != method {
            info!(from = %*guard, to = %method, "Analysis method changed");
        }
        *guard = method;
    }
}

impl MethodSource for SharedMethod {
    fn current_method(&self) -> AnalysisMethod {
        *self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}
