//! Research session event types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{reflection::Verdict, state::SearchResult};

/// The steps of one research pass, plus the final report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Plan,
    Search,
    Summarize,
    Reflect,
    Report,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Plan => "plan",
            Step::Search => "search",
            Step::Summarize => "summarize",
            Step::Reflect => "reflect",
            Step::Report => "report",
        };
        f.write_str(name)
    }
}

/// Events emitted while a session runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResearchEvent {
    /// Session accepted its topic
    SessionStart {
        session_id: String,
        topic: String,
        max_iterations: u32,
    },

    /// A pass started; `iteration` is 1-based
    IterationStart { iteration: u32 },

    /// The planner proposed a query
    QueryPlanned { iteration: u32, query: String },

    /// The lookup answered
    SearchCompleted {
        iteration: u32,
        query: String,
        results: Vec<SearchResult>,
        cached: bool,
    },

    /// The summarizer ran and this pass's results joined `sources`
    SummaryUpdated {
        iteration: u32,
        chars: usize,
        preview: String,
        total_sources: usize,
    },

    /// The gate answered. `capped` is set when the iteration cap ends the loop.
    Reflected {
        iteration: u32,
        verdict: Verdict,
        capped: bool,
    },

    /// Report writing started
    ReportStart { sources: usize },

    /// Session finished with a report. `cached_lookups` counts searches
    /// answered from the session cache.
    SessionEnd {
        session_id: String,
        iterations: u32,
        sources: usize,
        cached_lookups: usize,
    },

    /// Session failed
    Error { step: Option<Step>, message: String },
}

impl ResearchEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResearchEvent::SessionEnd { .. } | ResearchEvent::Error { .. }
        )
    }
}
