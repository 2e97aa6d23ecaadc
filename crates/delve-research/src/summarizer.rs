//! Summarization step

use std::sync::Arc;

use async_trait::async_trait;

use crate::{error::Result, prompts, reasoner::Reasoner, state::SearchResult};

/// Folds one iteration's results into the running summary
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn update(
        &self,
        topic: &str,
        running_summary: &str,
        results: &[SearchResult],
    ) -> Result<String>;
}

/// Summarizer that asks the reasoning model
pub struct LlmSummarizer {
    reasoner: Arc<dyn Reasoner>,
}

impl LlmSummarizer {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn update(
        &self,
        topic: &str,
        running_summary: &str,
        results: &[SearchResult],
    ) -> Result<String> {
        if results.is_empty() {
            tracing::debug!("No search results; summary unchanged");
            return Ok(running_summary.to_string());
        }

        let summary = self
            .reasoner
            .complete(&prompts::summarize(topic, running_summary, results))
            .await?;
        let summary = summary.trim();

        if summary.is_empty() && !running_summary.is_empty() {
            tracing::warn!("Reasoner returned an empty summary; keeping the previous one");
            return Ok(running_summary.to_string());
        }
        Ok(summary.to_string())
    }
}
