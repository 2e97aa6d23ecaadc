//! The research loop controller

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    cache::LookupCache,
    config::ResearchConfig,
    error::{Error, Result},
    events::{ResearchEvent, Step},
    lookup::Lookup,
    planner::{LlmPlanner, QueryPlanner},
    reasoner::Reasoner,
    reflection::{LlmReflectionGate, ReflectionGate, Verdict},
    state::{ResearchState, SearchResult, Turn},
    summarizer::{LlmSummarizer, Summarizer},
    utils::preview,
    writer::{LlmReportWriter, ReportWriter},
};

/// What a finished session hands back
#[derive(Debug, Clone, Serialize)]
pub struct ResearchOutcome {
    pub topic: String,
    pub report: String,
    pub sources: Vec<SearchResult>,
    pub iterations_used: u32,
    pub summary: String,
    pub conversation: Vec<Turn>,
}

/// Drives plan -> search -> summarize -> reflect until the gate stops or the
/// cap is reached, then writes the report.
///
/// Each call to [`run_session`](Self::run_session) owns a fresh
/// [`ResearchState`]; nothing carries over between sessions.
pub struct ResearchAgent {
    config: ResearchConfig,
    planner: Arc<dyn QueryPlanner>,
    lookup: Arc<dyn Lookup>,
    summarizer: Arc<dyn Summarizer>,
    gate: Arc<dyn ReflectionGate>,
    writer: Arc<dyn ReportWriter>,
    event_tx: broadcast::Sender<ResearchEvent>,
}

impl ResearchAgent {
    /// Wire the LLM-backed steps around one reasoner and one lookup.
    pub fn new(config: ResearchConfig, reasoner: Arc<dyn Reasoner>, lookup: Arc<dyn Lookup>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            planner: Arc::new(LlmPlanner::new(reasoner.clone(), config.empty_query)),
            summarizer: Arc::new(LlmSummarizer::new(reasoner.clone())),
            gate: Arc::new(
                LlmReflectionGate::new(reasoner.clone())
                    .with_min_iterations(config.min_iterations)
                    .with_min_summary_chars(config.min_summary_chars),
            ),
            writer: Arc::new(LlmReportWriter::new(reasoner, config.report_source_limit)),
            lookup,
            config,
            event_tx,
        }
    }

    pub fn with_planner(mut self, planner: Arc<dyn QueryPlanner>) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_gate(mut self, gate: Arc<dyn ReflectionGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_writer(mut self, writer: Arc<dyn ReportWriter>) -> Self {
        self.writer = writer;
        self
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<ResearchEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    fn emit(&self, event: ResearchEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Research `topic` with the configured iteration cap
    pub async fn run(&self, topic: &str) -> Result<ResearchOutcome> {
        self.run_session(topic, self.config.max_iterations).await
    }

    /// Research `topic` for at most `max_iterations` passes.
    ///
    /// Any collaborator failure ends the session; the partial state is
    /// dropped and only the error is returned.
    pub async fn run_session(&self, topic: &str, max_iterations: u32) -> Result<ResearchOutcome> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(Error::InvalidConfig("research topic is empty".to_string()));
        }
        let config = self
            .config
            .clone()
            .with_max_iterations(max_iterations)
            .validate()?;

        let session_id = Uuid::new_v4().to_string();
        tracing::info!(
            "Research session {} started: {:?} (max {} iterations)",
            session_id,
            topic,
            config.max_iterations
        );
        self.emit(ResearchEvent::SessionStart {
            session_id: session_id.clone(),
            topic: topic.to_string(),
            max_iterations: config.max_iterations,
        });

        let mut state = ResearchState::new(topic, config.max_iterations);
        let mut step = Step::Plan;
        match self.drive(&config, &mut state, &mut step).await {
            Ok(cached_lookups) => {
                tracing::info!(
                    "Research session {} finished after {} iterations with {} sources ({} cached lookups)",
                    session_id,
                    state.iteration(),
                    state.sources().len(),
                    cached_lookups
                );
                self.emit(ResearchEvent::SessionEnd {
                    session_id,
                    iterations: state.iteration(),
                    sources: state.sources().len(),
                    cached_lookups,
                });
                Ok(into_outcome(state))
            }
            Err(e) => {
                tracing::warn!("Research session {} failed at {}: {}", session_id, step, e);
                self.emit(ResearchEvent::Error {
                    step: Some(step),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Run the loop and the report; returns how many lookups the cache served.
    async fn drive(
        &self,
        config: &ResearchConfig,
        state: &mut ResearchState,
        step: &mut Step,
    ) -> Result<usize> {
        let mut cache = config.cache_lookups.then(LookupCache::new);

        loop {
            let pass = state.iteration() + 1;
            self.emit(ResearchEvent::IterationStart { iteration: pass });

            *step = Step::Plan;
            let query = self
                .planner
                .next_query(state.topic(), state.running_summary(), state.iteration())
                .await?;
            let query = query.trim();
            if query.is_empty() {
                return Err(Error::malformed(Step::Plan, "planner returned an empty query"));
            }
            state.set_query(query);
            self.emit(ResearchEvent::QueryPlanned {
                iteration: pass,
                query: query.to_string(),
            });

            *step = Step::Search;
            let (results, cached) = self.search(state.current_query(), cache.as_mut()).await?;
            if let Some(pos) = results.iter().position(|r| r.url.trim().is_empty()) {
                return Err(Error::malformed(
                    Step::Search,
                    format!("result {} has no url", pos + 1),
                ));
            }
            tracing::debug!(
                "Iteration {}: {} results for {:?}{}",
                pass,
                results.len(),
                state.current_query(),
                if cached { " (cached)" } else { "" }
            );
            self.emit(ResearchEvent::SearchCompleted {
                iteration: pass,
                query: state.current_query().to_string(),
                results: results.clone(),
                cached,
            });
            state.record_search(results);

            *step = Step::Summarize;
            let summary = self
                .summarizer
                .update(state.topic(), state.running_summary(), state.search_results())
                .await?;
            if !state.apply_summary(summary) {
                tracing::warn!(
                    "Iteration {}: summarizer returned nothing; keeping previous summary",
                    pass
                );
            }
            let added = state.absorb_results(config.dedup_sources);
            self.emit(ResearchEvent::SummaryUpdated {
                iteration: pass,
                chars: state.running_summary().chars().count(),
                preview: preview(state.running_summary(), 200),
                total_sources: state.sources().len(),
            });
            tracing::debug!(
                "Iteration {}: {} new sources, summary {} chars",
                pass,
                added,
                state.running_summary().len()
            );

            state.advance();

            *step = Step::Reflect;
            let verdict = self
                .gate
                .should_continue(
                    state.topic(),
                    state.running_summary(),
                    state.iteration(),
                    state.max_iterations(),
                )
                .await?;
            let capped = state.at_cap();
            self.emit(ResearchEvent::Reflected {
                iteration: state.iteration(),
                verdict,
                capped,
            });

            if capped {
                tracing::debug!("Iteration cap of {} reached", state.max_iterations());
                break;
            }
            if verdict == Verdict::Stop {
                break;
            }
        }

        *step = Step::Report;
        self.emit(ResearchEvent::ReportStart {
            sources: state.sources().len(),
        });
        let report = self
            .writer
            .write(state.topic(), state.running_summary(), state.sources())
            .await?;
        if report.trim().is_empty() {
            return Err(Error::malformed(Step::Report, "writer returned an empty report"));
        }
        state.push_report(report);
        Ok(cache.map_or(0, |c| c.hits()))
    }

    async fn search(
        &self,
        query: &str,
        cache: Option<&mut LookupCache>,
    ) -> Result<(Vec<SearchResult>, bool)> {
        let Some(cache) = cache else {
            return Ok((self.lookup.search(query).await?, false));
        };
        if let Some(results) = cache.get(query) {
            return Ok((results, true));
        }
        let results = self.lookup.search(query).await?;
        cache.insert(query, results.clone());
        Ok((results, false))
    }
}

fn into_outcome(state: ResearchState) -> ResearchOutcome {
    let conversation = state.conversation().to_vec();
    let report = conversation
        .last()
        .map(|turn| turn.text.clone())
        .unwrap_or_default();
    ResearchOutcome {
        topic: state.topic().to_string(),
        report,
        sources: state.sources().to_vec(),
        iterations_used: state.iteration(),
        summary: state.running_summary().to_string(),
        conversation,
    }
}
