//! Web search collaborator

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{error::Result, state::SearchResult};

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that turns a query into ranked results
#[async_trait]
pub trait Lookup: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

/// Errors from the search API
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("search API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("search API rate limited")]
    RateLimited,

    #[error("Invalid or missing search API key")]
    InvalidApiKey,
}

impl LookupError {
    pub fn is_retryable(&self) -> bool {
        match self {
            LookupError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            LookupError::RateLimited => true,
            LookupError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// How hard the search API should look
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Basic,
    #[default]
    Advanced,
}

impl SearchDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchDepth::Basic => "basic",
            SearchDepth::Advanced => "advanced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Some(SearchDepth::Basic),
            "advanced" => Some(SearchDepth::Advanced),
            _ => None,
        }
    }
}

/// Pass-through search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub max_results: usize,
    pub depth: SearchDepth,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            depth: SearchDepth::Advanced,
        }
    }
}

/// Tavily search API client
pub struct TavilyLookup {
    client: reqwest::Client,
    api_key: String,
    options: SearchOptions,
}

impl TavilyLookup {
    /// Fails only if the HTTP client cannot be built (e.g. no TLS backend).
    pub fn new(
        api_key: impl Into<String>,
        options: SearchOptions,
    ) -> std::result::Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            options,
        })
    }

    fn build_request<'a>(&'a self, query: &'a str) -> TavilyRequest<'a> {
        TavilyRequest {
            api_key: &self.api_key,
            query,
            max_results: self.options.max_results,
            search_depth: self.options.depth.as_str(),
        }
    }

    async fn send(&self, query: &str) -> std::result::Result<Vec<SearchResult>, LookupError> {
        tracing::debug!("Tavily search: {:?} ({})", query, self.options.depth.as_str());

        let response = self
            .client
            .post(TAVILY_SEARCH_URL)
            .json(&self.build_request(query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), message));
        }

        let body = response.text().await?;
        let parsed: TavilyResponse = serde_json::from_str(&body)?;
        Ok(into_results(parsed, self.options.max_results))
    }
}

#[async_trait]
impl Lookup for TavilyLookup {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        Ok(self.send(query).await?)
    }
}

/// Classify a non-success HTTP status. Only 429 and 5xx are worth retrying.
fn status_error(code: u16, message: String) -> LookupError {
    match code {
        401 | 403 => LookupError::InvalidApiKey,
        429 => LookupError::RateLimited,
        code => LookupError::Api {
            status: code,
            message,
        },
    }
}

/// Map the wire format onto `SearchResult`s, dropping entries without a url
/// and keeping the API's ranking.
fn into_results(response: TavilyResponse, max_results: usize) -> Vec<SearchResult> {
    response
        .results
        .into_iter()
        .filter(|r| !r.url.trim().is_empty())
        .take(max_results)
        .map(|r| SearchResult {
            title: r.title,
            url: r.url,
            snippet: r.content,
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}
