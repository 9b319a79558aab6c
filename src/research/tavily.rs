//! Tavily search client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{ResearchError, ResearchTool, SearchCache};
use crate::config::Config;

pub const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

const MAX_RESULTS: usize = 5;
const PREVIEW_CHARS: usize = 200;
const NO_SUMMARY: &str = "No summary available from search.";

#[derive(Debug, Clone)]
pub struct TavilyResearch {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    cache: SearchCache,
}

impl TavilyResearch {
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        cache: SearchCache,
    ) -> Result<Self, ResearchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResearchError::Service(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            cache,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ResearchError> {
        Self::new(
            config.tavily_api_key.clone(),
            config.tavily_base_url.clone(),
            config.request_timeout,
            SearchCache::default(),
        )
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, api_key: &str, topic: &str) -> Result<SearchResponse, ResearchError> {
        let request = SearchRequest {
            query: format!(
                "Current Product Development design trends and best practices for {topic}"
            ),
            search_depth: "advanced",
            max_results: MAX_RESULTS,
            include_answer: true,
            include_raw_content: false,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ResearchError::Timeout
                } else {
                    ResearchError::Service(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(ResearchError::RateLimited),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ResearchError::Service(
                "the research API key was rejected".to_string(),
            )),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                Err(ResearchError::Timeout)
            }
            status if !status.is_success() => Err(ResearchError::Service(format!(
                "status {}",
                status.as_u16()
            ))),
            _ => response
                .json::<SearchResponse>()
                .await
                .map_err(|e| ResearchError::Service(format!("invalid response: {e}"))),
        }
    }
}

#[async_trait]
impl ResearchTool for TavilyResearch {
    async fn research(&self, query: &str) -> Result<String, ResearchError> {
        let topic = SearchCache::normalize(query);
        if topic.is_empty() {
            return Err(ResearchError::InvalidTopic);
        }
        if let Some(cached) = self.cache.get(&topic) {
            tracing::info!(topic = %topic, "Returning cached research findings");
            return Ok(cached);
        }
        let api_key = self.api_key.as_deref().ok_or(ResearchError::MissingKey)?;

        tracing::info!(topic = %topic, "Running research");
        let response = self.search(api_key, &topic).await?;
        let findings = format_findings(&topic, response);

        self.cache.insert(&topic, findings.clone());
        Ok(findings)
    }
}

/// Render a search response as markdown.
fn format_findings(topic: &str, response: SearchResponse) -> String {
    let summary = response
        .answer
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| NO_SUMMARY.to_string());

    if response.results.is_empty() && summary == NO_SUMMARY {
        tracing::warn!(topic = %topic, "Research returned no results");
        return format!(
            "Could not find significant Product Development trends for: {topic}. \
             Please try a more specific or different topic."
        );
    }

    let mut out = format!("# Product Development Research Findings: {topic}\n\n## Summary\n{summary}\n");
    if !response.results.is_empty() {
        out.push_str("\n## Top Results\n");
        for (i, result) in response.results.iter().take(MAX_RESULTS).enumerate() {
            out.push_str(&format!(
                "\n### {}. {}\n**Source**: [{}]({})\n\n{}\n",
                i + 1,
                result.title,
                result.url,
                result.url,
                preview(&result.content)
            ));
        }
    }
    out.trim_end().to_string()
}

fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

// ============================================================
// Wire types
// ============================================================

#[derive(Debug, Serialize)]
struct SearchRequest {
    query: String,
    search_depth: &'static str,
    max_results: usize,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}
