//! Availability and fallback diagnostics for the settings surface.

use tracing::debug;

use super::AnalysisEngine;
use crate::types::{AnalysisMethod, StrategyStatus};

impl AnalysisEngine {
    /// Probe the configured strategy. Probe errors are reported in
    /// `error_details`, never returned as `Err`.
    pub async fn strategy_status(&self) -> StrategyStatus {
        let method = self.current_method();
        let (available, error_details) = match self.registry().get(method.as_str()) {
            Some(strategy) => match self.probe(strategy.as_ref()).await {
                Ok(available) => (available, None),
                Err(e) => (false, Some(e.to_string())),
            },
            None => (false, Some(format!("no strategy registered for '{}'", method))),
        };
        debug!(method = %method, available, "strategy status probed");

        if available {
            return StrategyStatus {
                method,
                is_available: true,
                status_message: format!("{} analysis is available", describe(method)),
                can_fallback: method != AnalysisMethod::Rule,
                error_details: None,
            };
        }

        let fallback = self.registry().fallback();
        let rule_ready = method != AnalysisMethod::Rule
            && self.probe(fallback.as_ref()).await.unwrap_or(false);

        let status_message = if rule_ready {
            format!(
                "{} analysis is unavailable; rule-based analysis will be used instead",
                describe(method)
            )
        } else {
            format!("{} analysis is unavailable", describe(method))
        };

        StrategyStatus {
            method,
            is_available: false,
            status_message,
            can_fallback: rule_ready,
            error_details,
        }
    }
}

fn describe(method: AnalysisMethod) -> &'static str {
    match method {
        AnalysisMethod::Rule => "Rule-based",
        AnalysisMethod::Llm => "LLM",
        AnalysisMethod::Local => "Local AI",
    }
}
