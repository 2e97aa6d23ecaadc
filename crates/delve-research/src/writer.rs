//! Report writing step

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;

use crate::{
    error::{Error, Result},
    events::Step,
    prompts,
    reasoner::Reasoner,
    state::SearchResult,
};

/// Produces the final report from everything gathered
#[async_trait]
pub trait ReportWriter: Send + Sync {
    async fn write(
        &self,
        topic: &str,
        running_summary: &str,
        sources: &[SearchResult],
    ) -> Result<String>;
}

/// Writer that asks the reasoning model for prose and appends the
/// reference list itself
pub struct LlmReportWriter {
    reasoner: Arc<dyn Reasoner>,
    source_limit: usize,
}

impl LlmReportWriter {
    pub fn new(reasoner: Arc<dyn Reasoner>, source_limit: usize) -> Self {
        Self {
            reasoner,
            source_limit,
        }
    }
}

#[async_trait]
impl ReportWriter for LlmReportWriter {
    async fn write(
        &self,
        topic: &str,
        running_summary: &str,
        sources: &[SearchResult],
    ) -> Result<String> {
        let unique = unique_sources(sources);
        let cited: Vec<&SearchResult> = unique.iter().copied().take(self.source_limit).collect();
        if unique.len() > cited.len() {
            tracing::debug!(
                "Report prompt lists {} of {} sources",
                cited.len(),
                unique.len()
            );
        }

        let prose = self
            .reasoner
            .complete(&prompts::report(topic, running_summary, &cited))
            .await?;
        let prose = prose.trim();
        if prose.is_empty() {
            return Err(Error::malformed(Step::Report, "reasoner returned an empty report"));
        }

        let references = render_references(sources);
        if references.is_empty() {
            Ok(prose.to_string())
        } else {
            Ok(format!("{}\n\n{}", prose, references))
        }
    }
}

/// First occurrence of each url, in the order gathered. The first title seen
/// for a url wins.
pub fn unique_sources(sources: &[SearchResult]) -> Vec<&SearchResult> {
    let mut seen = HashSet::new();
    sources
        .iter()
        .filter(|s| seen.insert(s.url.as_str()))
        .collect()
}

/// A `## References` section listing every unique url once. Empty when there
/// are no sources.
pub fn render_references(sources: &[SearchResult]) -> String {
    let unique = unique_sources(sources);
    if unique.is_empty() {
        return String::new();
    }

    let mut out = String::from("## References\n");
    for (i, source) in unique.iter().enumerate() {
        let title = source.title.trim();
        if title.is_empty() {
            out.push_str(&format!("\n[{}] {}", i + 1, source.url));
        } else {
            out.push_str(&format!("\n[{}] {}: {}", i + 1, title, source.url));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedReasoner, hit};

    #[test]
    fn test_unique_sources_keeps_first_title() {
        let mut dup = hit(1);
        dup.title = "Later title".into();
        let sources = vec![hit(1), hit(2), dup, hit(3)];

        let unique = unique_sources(&sources);
        assert_eq!(unique.len(), 3);
        assert_eq!(unique[0].title, "Result 1");
        assert_eq!(unique[2].url, "https://example.com/3");
    }

    #[test]
    fn test_render_references_lists_each_url_once() {
        let sources = vec![hit(1), hit(2), hit(1)];
        let refs = render_references(&sources);
        assert_eq!(
            refs,
            "## References\n\n[1] Result 1: https://example.com/1\n[2] Result 2: https://example.com/2"
        );
        assert!(render_references(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_report_appends_references() {
        let reasoner = Arc::new(ScriptedReasoner::new().report("# Quantum Computing\n\nQubits [1]."));
        let writer = LlmReportWriter::new(reasoner.clone(), 15);

        let report = writer
            .write("t", "notes", &[hit(1), hit(2), hit(2)])
            .await
            .unwrap();
        assert!(report.starts_with("# Quantum Computing"));
        assert_eq!(report.matches("https://example.com/2").count(), 1);
        assert!(report.ends_with("[2] Result 2: https://example.com/2"));
    }

    #[tokio::test]
    async fn test_prompt_respects_source_limit() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        let writer = LlmReportWriter::new(reasoner.clone(), 2);
        let sources: Vec<_> = (1..=4).map(hit).collect();

        let report = writer.write("t", "notes", &sources).await.unwrap();
        let prompt = reasoner.prompts.lock()[0].clone();
        assert!(prompt.contains("https://example.com/2"));
        assert!(!prompt.contains("https://example.com/3"));
        // The reference list is never truncated
        assert!(report.contains("[4] Result 4: https://example.com/4"));
    }

    #[tokio::test]
    async fn test_empty_report_is_malformed() {
        let reasoner = Arc::new(ScriptedReasoner::new().report("   "));
        let writer = LlmReportWriter::new(reasoner, 15);

        let err = writer.write("t", "notes", &[hit(1)]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedOutput {
                step: Step::Report,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_report_without_sources_has_no_reference_section() {
        let reasoner = Arc::new(ScriptedReasoner::new().report("Nothing was found."));
        let writer = LlmReportWriter::new(reasoner, 15);

        let report = writer.write("t", "", &[]).await.unwrap();
        assert_eq!(report, "Nothing was found.");
    }
}
