//! Deterministic collaborators for tests

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    error::{Error, Result},
    lookup::{Lookup, LookupError},
    prompts,
    reasoner::Reasoner,
    state::SearchResult,
};

pub fn hit(n: usize) -> SearchResult {
    SearchResult::new(
        format!("Result {}", n),
        format!("https://example.com/{}", n),
        format!("snippet {}", n),
    )
}

/// Answers each prompt kind from its own queue, falling back to a default.
/// Every prompt is recorded.
pub struct ScriptedReasoner {
    plans: Mutex<VecDeque<String>>,
    summaries: Mutex<VecDeque<String>>,
    verdicts: Mutex<VecDeque<String>>,
    report: String,
    fail_with: Mutex<Option<Error>>,
    pub prompts: Mutex<Vec<String>>,
}

impl Default for ScriptedReasoner {
    fn default() -> Self {
        Self {
            plans: Mutex::new(VecDeque::new()),
            summaries: Mutex::new(VecDeque::new()),
            verdicts: Mutex::new(VecDeque::new()),
            report: "Quantum computers use qubits [1].".to_string(),
            fail_with: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedReasoner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plans(self, answers: &[&str]) -> Self {
        *self.plans.lock() = answers.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn summaries(self, answers: &[&str]) -> Self {
        *self.summaries.lock() = answers.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn verdicts(self, answers: &[&str]) -> Self {
        *self.verdicts.lock() = answers.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn report(mut self, text: &str) -> Self {
        self.report = text.to_string();
        self
    }

    /// Fail the next call with `err`
    pub fn fail_next(&self, err: Error) {
        *self.fail_with.lock() = Some(err);
    }

    pub fn calls_starting_with(&self, role: &str) -> usize {
        self.prompts
            .lock()
            .iter()
            .filter(|p| p.starts_with(role))
            .count()
    }
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(err) = self.fail_with.lock().take() {
            return Err(err);
        }

        let n = self.prompts.lock().len();
        let answer = if prompt.starts_with(prompts::PLAN_ROLE) {
            self.plans
                .lock()
                .pop_front()
                .unwrap_or_else(|| format!("query {}", n))
        } else if prompt.starts_with(prompts::SUMMARIZE_ROLE) {
            self.summaries
                .lock()
                .pop_front()
                .unwrap_or_else(|| format!("summary after call {}", n))
        } else if prompt.starts_with(prompts::REFLECT_ROLE) {
            self.verdicts
                .lock()
                .pop_front()
                .unwrap_or_else(|| "CONTINUE".to_string())
        } else {
            self.report.clone()
        };
        Ok(answer)
    }
}

/// Returns a scripted batch per call; once the script runs out it keeps
/// returning the last batch.
pub struct ScriptedLookup {
    batches: Mutex<VecDeque<Vec<SearchResult>>>,
    last: Mutex<Vec<SearchResult>>,
    fail_on_call: Option<usize>,
    pub queries: Mutex<Vec<String>>,
}

impl ScriptedLookup {
    pub fn new(batches: Vec<Vec<SearchResult>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            last: Mutex::new(Vec::new()),
            fail_on_call: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Every call returns results numbered from `call * per_call`
    pub fn fresh(calls: usize, per_call: usize) -> Self {
        Self::new(
            (0..calls)
                .map(|c| (0..per_call).map(|i| hit(c * per_call + i + 1)).collect())
                .collect(),
        )
    }

    /// Fail the nth call (1-based) with a server error
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().len()
    }
}

#[async_trait]
impl Lookup for ScriptedLookup {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let call = {
            let mut queries = self.queries.lock();
            queries.push(query.to_string());
            queries.len()
        };
        if self.fail_on_call == Some(call) {
            return Err(LookupError::Api {
                status: 503,
                message: "search backend unavailable".to_string(),
            }
            .into());
        }

        let next = self.batches.lock().pop_front();
        match next {
            Some(batch) => {
                *self.last.lock() = batch.clone();
                Ok(batch)
            }
            None => Ok(self.last.lock().clone()),
        }
    }
}
