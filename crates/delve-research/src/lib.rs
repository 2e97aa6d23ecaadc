//! delve-research: the iterative research loop
//!
//! A session starts from a topic and repeats plan -> search -> summarize ->
//! reflect until the reflection gate is satisfied or the iteration cap is
//! hit, then writes a cited report. The reasoning model and the web search
//! API sit behind the [`Reasoner`] and [`Lookup`] traits so the loop can be
//! driven by deterministic stubs.

pub mod agent;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod lookup;
pub mod planner;
pub mod prompts;
pub mod reasoner;
pub mod reflection;
pub mod retry;
pub mod state;
pub mod summarizer;
pub mod utils;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_support;

pub use agent::{ResearchAgent, ResearchOutcome};
pub use config::{EmptyQueryPolicy, ResearchConfig};
pub use error::{Error, Result};
pub use events::{ResearchEvent, Step};
pub use lookup::{Lookup, LookupError, SearchDepth, SearchOptions, TavilyLookup};
pub use planner::{LlmPlanner, QueryPlanner};
pub use reasoner::{ProviderReasoner, Reasoner, ReasonerOptions};
pub use reflection::{LlmReflectionGate, ReflectionGate, Verdict};
pub use retry::{RetryConfig, RetryingLookup, RetryingReasoner};
pub use state::{ResearchState, Role, SearchResult, Turn};
pub use summarizer::{LlmSummarizer, Summarizer};
pub use writer::{LlmReportWriter, ReportWriter, render_references};
