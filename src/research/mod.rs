//! Web research used by the `ANALYST_RESEARCH` phase.
//!
//! Research is optional. Any [`ResearchError`] puts the phase in degraded
//! mode instead of failing it.

mod cache;
mod tavily;

pub use cache::SearchCache;
pub use tavily::{TavilyResearch, DEFAULT_BASE_URL as TAVILY_BASE_URL};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResearchError {
    #[error("research API key is not configured (set TAVILY_API_KEY)")]
    MissingKey,

    #[error("research request timed out")]
    Timeout,

    #[error("research rate limit reached")]
    RateLimited,

    #[error("research topic is empty")]
    InvalidTopic,

    #[error("research service error: {0}")]
    Service(String),
}

impl ResearchError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingKey => "research_missing_key",
            Self::Timeout => "research_timeout",
            Self::RateLimited => "research_rate_limited",
            Self::InvalidTopic => "research_invalid_topic",
            Self::Service(_) => "research_service",
        }
    }
}

/// Web research capability.
#[async_trait]
pub trait ResearchTool: Send + Sync {
    /// Research `query` and return markdown findings.
    async fn research(&self, query: &str) -> Result<String, ResearchError>;
}

/// Research tool used when no key is configured. Every call degrades.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResearch;

#[async_trait]
impl ResearchTool for NoResearch {
    async fn research(&self, _query: &str) -> Result<String, ResearchError> {
        Err(ResearchError::MissingKey)
    }
}
