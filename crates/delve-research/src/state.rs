//! The research state threaded through one session

use serde::{Deserialize, Serialize};

/// One ranked search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, url: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }
}

/// Who said a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
}

/// A conversation entry: the user's topic or the agent's report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: i64,
}

impl Turn {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Mutable record owned by the controller for the length of one session.
///
/// Fields are read through accessors; the mutators enforce the invariants:
/// the topic never changes, `sources` only grows, `search_results` is
/// replaced wholesale, the summary never falls back to empty, and
/// `iteration` never passes `max_iterations`.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchState {
    topic: String,
    running_summary: String,
    sources: Vec<SearchResult>,
    search_results: Vec<SearchResult>,
    current_query: String,
    iteration: u32,
    max_iterations: u32,
    conversation: Vec<Turn>,
}

impl ResearchState {
    /// Start a session; the topic becomes the user's conversation turn.
    pub fn new(topic: impl Into<String>, max_iterations: u32) -> Self {
        let topic = topic.into();
        Self {
            conversation: vec![Turn::new(Role::User, topic.clone())],
            topic,
            running_summary: String::new(),
            sources: Vec::new(),
            search_results: Vec::new(),
            current_query: String::new(),
            iteration: 0,
            max_iterations,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn running_summary(&self) -> &str {
        &self.running_summary
    }

    pub fn sources(&self) -> &[SearchResult] {
        &self.sources
    }

    pub fn search_results(&self) -> &[SearchResult] {
        &self.search_results
    }

    pub fn current_query(&self) -> &str {
        &self.current_query
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn conversation(&self) -> &[Turn] {
        &self.conversation
    }

    /// Whether the hard iteration cap has been reached
    pub fn at_cap(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    pub(crate) fn set_query(&mut self, query: impl Into<String>) {
        self.current_query = query.into();
    }

    /// Replace the scratch results with this iteration's lookup output.
    pub(crate) fn record_search(&mut self, results: Vec<SearchResult>) {
        self.search_results = results;
    }

    /// Install the summarizer's output. A blank summary is refused once the
    /// running summary has content; returns whether the summary was replaced.
    pub(crate) fn apply_summary(&mut self, summary: String) -> bool {
        if summary.trim().is_empty() && !self.running_summary.is_empty() {
            return false;
        }
        self.running_summary = summary;
        true
    }

    /// Append this iteration's results to `sources`. With `dedup`, urls
    /// already present are skipped. Returns how many were appended.
    pub(crate) fn absorb_results(&mut self, dedup: bool) -> usize {
        let before = self.sources.len();
        for result in &self.search_results {
            if dedup && self.sources.iter().any(|s| s.url == result.url) {
                continue;
            }
            self.sources.push(result.clone());
        }
        self.sources.len() - before
    }

    /// Count one completed pass. Saturates at the cap.
    pub(crate) fn advance(&mut self) {
        if self.iteration < self.max_iterations {
            self.iteration += 1;
        }
    }

    pub(crate) fn push_report(&mut self, report: impl Into<String>) {
        self.conversation.push(Turn::new(Role::Agent, report));
    }
}
