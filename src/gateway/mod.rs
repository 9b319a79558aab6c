//! Hosted LLM text generation.
//!
//! The orchestrator only sees the [`LlmGateway`] trait. [`GeminiGateway`] is the
//! production implementation; tests substitute scripted gateways.

mod gemini;

pub use gemini::{GeminiGateway, GenerationParams, DEFAULT_BASE_URL as GEMINI_BASE_URL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures from the hosted model. All of them are retryable by the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("model request timed out")]
    Timeout,

    #[error("model rate limit reached (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("model unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "gateway_timeout",
            Self::RateLimited { .. } => "gateway_rate_limited",
            Self::Unavailable(_) => "gateway_unavailable",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout => "The model took too long to answer.".to_string(),
            Self::RateLimited {
                retry_after: Some(secs),
            } => format!("The model is rate limited. Try again in {secs} seconds."),
            Self::RateLimited { retry_after: None } => {
                "The model is rate limited. Try again shortly.".to_string()
            }
            Self::Unavailable(_) => "The model service is unavailable.".to_string(),
        }
    }
}

/// A labelled section of the invocation context (prior artifacts, feedback, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextBlock {
    pub label: String,
    pub body: String,
}

impl ContextBlock {
    pub fn new(label: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            body: body.into(),
        }
    }
}

/// Text generation capability consumed by the orchestrator.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Run `prompt` (the role's instructions) over `context` and return the text.
    async fn generate(&self, prompt: &str, context: &[ContextBlock]) -> Result<String, GatewayError>;
}

/// Flatten context blocks into one markdown message.
pub fn render_context(context: &[ContextBlock]) -> String {
    if context.is_empty() {
        return "Begin.".to_string();
    }
    context
        .iter()
        .map(|block| format!("## {}\n\n{}", block.label, block.body.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
