//! Plan Analyzer: one chat request to the language model.
//!
//! The request is a system message (the analyst role) followed by a user
//! message carrying the instruction and the plan text. The first choice's
//! content comes back verbatim; nothing here parses it.
//!
//! A single attempt is made. Errors, an elapsed timeout, or an empty answer
//! all end the request; pricing is never reached.

use crate::config::EstimatorConfig;
use crate::error::AnalysisError;
use crate::output::{AnalysisResult, PlanText};
use crate::prompts::{analysis_prompt, ANALYSIS_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Produces a natural-language analysis of a plan.
#[async_trait]
pub trait PlanAnalyzer: Send + Sync {
    async fn analyze(&self, plan: &PlanText) -> Result<AnalysisResult, AnalysisError>;
}

/// [`PlanAnalyzer`] backed by an `edgequake-llm` chat provider.
pub struct LlmPlanAnalyzer {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    options: CompletionOptions,
    timeout: Option<Duration>,
}

impl LlmPlanAnalyzer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &EstimatorConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| ANALYSIS_SYSTEM_PROMPT.to_string()),
            options: build_options(config),
            timeout: config.analysis_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// The two-message conversation sent for `plan_text`.
pub fn build_messages(system_prompt: &str, plan_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(analysis_prompt(plan_text)),
    ]
}

#[async_trait]
impl PlanAnalyzer for LlmPlanAnalyzer {
    async fn analyze(&self, plan: &PlanText) -> Result<AnalysisResult, AnalysisError> {
        let start = Instant::now();
        let messages = build_messages(&self.system_prompt, &plan.text);
        let call = self.provider.chat(&messages, Some(&self.options));

        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| AnalysisError::Timeout {
                    secs: limit.as_secs(),
                })?,
            None => call.await,
        };

        let response = outcome.map_err(|e| {
            let message = format!("{}", e);
            warn!("Plan analysis failed: {}", message);
            AnalysisError::Api { message }
        })?;

        debug!(
            "Analysis: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if response.content.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }

        // Prefer the model the provider says answered.
        let model = if response.model.is_empty() {
            self.provider.model().to_string()
        } else {
            response.model
        };

        Ok(AnalysisResult {
            content: response.content,
            model: Some(model),
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

/// Build `CompletionOptions` from the estimator config.
fn build_options(config: &EstimatorConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
