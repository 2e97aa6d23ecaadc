//! Reflection gate: decides whether another research pass is worthwhile

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{error::Result, prompts, reasoner::Reasoner};

static SUFFICIENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsufficient\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Continue,
    Stop,
}

#[async_trait]
pub trait ReflectionGate: Send + Sync {
    /// `iteration` counts completed passes, including the one just finished.
    async fn should_continue(
        &self,
        topic: &str,
        running_summary: &str,
        iteration: u32,
        max_iterations: u32,
    ) -> Result<Verdict>;
}

/// Gate that applies the iteration floor and cap, then asks the reasoner
pub struct LlmReflectionGate {
    reasoner: Arc<dyn Reasoner>,
    min_iterations: u32,
    min_summary_chars: usize,
}

impl LlmReflectionGate {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self {
            reasoner,
            min_iterations: 1,
            min_summary_chars: 0,
        }
    }

    pub fn with_min_iterations(mut self, min_iterations: u32) -> Self {
        self.min_iterations = min_iterations;
        self
    }

    pub fn with_min_summary_chars(mut self, chars: usize) -> Self {
        self.min_summary_chars = chars;
        self
    }
}

#[async_trait]
impl ReflectionGate for LlmReflectionGate {
    async fn should_continue(
        &self,
        topic: &str,
        running_summary: &str,
        iteration: u32,
        max_iterations: u32,
    ) -> Result<Verdict> {
        if iteration >= max_iterations {
            return Ok(Verdict::Stop);
        }
        if iteration < self.min_iterations {
            return Ok(Verdict::Continue);
        }
        let chars = running_summary.chars().count();
        if chars < self.min_summary_chars {
            tracing::debug!(
                "Summary has {} chars (< {}); continuing",
                chars,
                self.min_summary_chars
            );
            return Ok(Verdict::Continue);
        }

        let answer = self
            .reasoner
            .complete(&prompts::reflect(
                topic,
                running_summary,
                iteration,
                max_iterations,
            ))
            .await?;
        Ok(parse_verdict(&answer))
    }
}

/// Stop iff the answer contains the word SUFFICIENT, in any case.
/// "INSUFFICIENT" does not count.
pub fn parse_verdict(answer: &str) -> Verdict {
    if SUFFICIENT.is_match(answer) {
        Verdict::Stop
    } else {
        Verdict::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedReasoner;

    #[test]
    fn test_parse_verdict() {
        assert_eq!(parse_verdict("SUFFICIENT"), Verdict::Stop);
        assert_eq!(parse_verdict("  sufficient.\n"), Verdict::Stop);
        assert_eq!(parse_verdict("The research is Sufficient"), Verdict::Stop);
        assert_eq!(parse_verdict("CONTINUE"), Verdict::Continue);
        assert_eq!(parse_verdict("insufficient"), Verdict::Continue);
        assert_eq!(parse_verdict(""), Verdict::Continue);
    }

    #[tokio::test]
    async fn test_cap_stops_without_reasoner() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        let gate = LlmReflectionGate::new(reasoner.clone());

        let verdict = gate.should_continue("t", "notes", 3, 3).await.unwrap();
        assert_eq!(verdict, Verdict::Stop);
        assert!(reasoner.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_min_iterations_forces_continue() {
        let reasoner = Arc::new(ScriptedReasoner::new().verdicts(&["SUFFICIENT"]));
        let gate = LlmReflectionGate::new(reasoner.clone()).with_min_iterations(2);

        let verdict = gate.should_continue("t", "notes", 1, 5).await.unwrap();
        assert_eq!(verdict, Verdict::Continue);
        assert!(reasoner.prompts.lock().is_empty());

        let verdict = gate.should_continue("t", "notes", 2, 5).await.unwrap();
        assert_eq!(verdict, Verdict::Stop);
    }

    #[tokio::test]
    async fn test_short_summary_forces_continue() {
        let reasoner = Arc::new(ScriptedReasoner::new().verdicts(&["SUFFICIENT"]));
        let gate = LlmReflectionGate::new(reasoner.clone()).with_min_summary_chars(200);

        let verdict = gate.should_continue("t", "short", 1, 5).await.unwrap();
        assert_eq!(verdict, Verdict::Continue);
        assert!(reasoner.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_reasoner_decides_between_floor_and_cap() {
        let reasoner = Arc::new(ScriptedReasoner::new().verdicts(&["CONTINUE", "SUFFICIENT"]));
        let gate = LlmReflectionGate::new(reasoner.clone());

        assert_eq!(
            gate.should_continue("t", "notes", 1, 5).await.unwrap(),
            Verdict::Continue
        );
        assert_eq!(
            gate.should_continue("t", "notes", 2, 5).await.unwrap(),
            Verdict::Stop
        );
        assert!(reasoner.prompts.lock()[1].contains("2 of 5"));
    }
}
