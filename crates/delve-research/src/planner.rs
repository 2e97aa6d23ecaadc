//! Query planning step

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::EmptyQueryPolicy,
    error::{Error, Result},
    events::Step,
    prompts,
    reasoner::Reasoner,
};

/// Proposes the next search query from the topic and what is known so far
#[async_trait]
pub trait QueryPlanner: Send + Sync {
    /// Must return a non-empty query or fail.
    async fn next_query(&self, topic: &str, running_summary: &str, iteration: u32)
    -> Result<String>;
}

/// Planner that asks the reasoning model
pub struct LlmPlanner {
    reasoner: Arc<dyn Reasoner>,
    empty_query: EmptyQueryPolicy,
}

impl LlmPlanner {
    pub fn new(reasoner: Arc<dyn Reasoner>, empty_query: EmptyQueryPolicy) -> Self {
        Self {
            reasoner,
            empty_query,
        }
    }
}

#[async_trait]
impl QueryPlanner for LlmPlanner {
    async fn next_query(
        &self,
        topic: &str,
        running_summary: &str,
        iteration: u32,
    ) -> Result<String> {
        let raw = self
            .reasoner
            .complete(&prompts::plan(topic, running_summary))
            .await?;
        let query = clean_query(&raw);
        if !query.is_empty() {
            tracing::debug!("Iteration {}: planned query {:?}", iteration + 1, query);
            return Ok(query);
        }

        match self.empty_query {
            EmptyQueryPolicy::Fail => Err(Error::malformed(
                Step::Plan,
                "reasoner proposed an empty query",
            )),
            EmptyQueryPolicy::UseTopic => {
                tracing::warn!("Empty query proposed; searching for the topic instead");
                Ok(topic.trim().to_string())
            }
        }
    }
}

/// First non-blank line of the answer, trimmed, with surrounding quotes removed
pub fn clean_query(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedReasoner;

    #[test]
    fn test_clean_query() {
        assert_eq!(clean_query("  \"quantum error correction\"\n"), "quantum error correction");
        assert_eq!(clean_query("'qubits'"), "qubits");
        assert_eq!(clean_query("\n\nfirst line\nsecond line"), "first line");
        assert_eq!(clean_query(" \"\" "), "");
        assert_eq!(clean_query(""), "");
    }

    #[tokio::test]
    async fn test_planner_returns_cleaned_query() {
        let reasoner = Arc::new(ScriptedReasoner::new().plans(&["\"quantum computing basics\""]));
        let planner = LlmPlanner::new(reasoner.clone(), EmptyQueryPolicy::Fail);

        let query = planner
            .next_query("What is quantum computing?", "", 0)
            .await
            .unwrap();
        assert_eq!(query, "quantum computing basics");
        assert!(reasoner.prompts.lock()[0].contains(prompts::EMPTY_SUMMARY));
    }

    #[tokio::test]
    async fn test_empty_query_fails_by_default() {
        let reasoner = Arc::new(ScriptedReasoner::new().plans(&["  \"\"  "]));
        let planner = LlmPlanner::new(reasoner, EmptyQueryPolicy::Fail);

        let err = planner.next_query("topic", "", 0).await.unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedOutput {
                step: Step::Plan,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_query_can_fall_back_to_topic() {
        let reasoner = Arc::new(ScriptedReasoner::new().plans(&[""]));
        let planner = LlmPlanner::new(reasoner, EmptyQueryPolicy::UseTopic);

        let query = planner
            .next_query(" What is quantum computing? ", "", 0)
            .await
            .unwrap();
        assert_eq!(query, "What is quantum computing?");
    }

    #[tokio::test]
    async fn test_reasoner_failure_propagates() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        reasoner.fail_next(delve_ai::Error::api("server_error", "down").into());
        let planner = LlmPlanner::new(reasoner, EmptyQueryPolicy::Fail);

        let err = planner.next_query("topic", "", 0).await.unwrap_err();
        assert!(err.is_collaborator_unavailable());
    }
}
