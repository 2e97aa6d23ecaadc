//! Terminal rendering for sessions and their events

use delve_research::{
    ResearchEvent, Verdict,
    utils::{preview, truncate_chars},
};

const RULE_WIDTH: usize = 60;
const SECTION_WIDTH: usize = 50;

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn section(title: &str) -> String {
    let line = "-".repeat(SECTION_WIDTH);
    format!("\n{line}\n{title}\n{line}")
}

/// Banner printed before a single-query session
pub fn header(topic: &str, model: &str, max_iterations: u32, verbose: bool) -> String {
    let mut out = format!(
        "\n{}\nResearch Topic: {}\nModel: {}\nMax Iterations: {}",
        rule(),
        topic,
        model,
        max_iterations
    );
    if verbose {
        out.push_str("\nVerbose Mode: ON");
    }
    out.push_str(&format!("\n{}\n", rule()));
    out
}

/// Banner printed when interactive mode starts
pub fn interactive_header(model: &str, max_iterations: u32, verbose: bool) -> String {
    let mut out = format!(
        "\n{}\nDelve - Interactive Research\nModel: {}\nMax Iterations: {}",
        rule(),
        model,
        max_iterations
    );
    if verbose {
        out.push_str("\nVerbose Mode: ON");
    }
    out.push_str(&format!("\nType 'quit' or 'exit' to stop\n{}\n", rule()));
    out
}

/// The report between rules
pub fn report(report: &str) -> String {
    format!(
        "\n{rule}\nRESEARCH REPORT\n{rule}\n\n{report}\n\n{rule}",
        rule = rule()
    )
}

pub fn stats(iterations: u32, sources: usize) -> String {
    format!("\nStats: {} iterations, {} sources gathered", iterations, sources)
}

/// Verbose progress line(s) for an event, or `None` for events that print
/// nothing.
pub fn event(event: &ResearchEvent) -> Option<String> {
    match event {
        ResearchEvent::SessionStart { topic, .. } => {
            Some(format!("Starting research...\n   Topic: {}", topic))
        }
        ResearchEvent::IterationStart { iteration } => Some(format!("\n[Iteration {}]", iteration)),
        ResearchEvent::QueryPlanned { query, .. } => Some(format!(
            "{}\n   Generated search query: \"{}\"",
            section("Generating Search Query"),
            query
        )),
        ResearchEvent::SearchCompleted {
            results, cached, ..
        } => {
            let mut out = format!(
                "{}\n   Found {} results{}",
                section("Searching the Web"),
                results.len(),
                if *cached { " (cached)" } else { "" }
            );
            for result in results.iter().take(3) {
                out.push_str(&format!("\n      • {}", truncate_chars(&result.title, 50)));
            }
            Some(out)
        }
        ResearchEvent::SummaryUpdated {
            chars,
            preview: text,
            total_sources,
            ..
        } => Some(format!(
            "{}\n   Updated summary ({} chars)\n   Preview: {}\n   Sources gathered: {}",
            section("Summarizing Results"),
            chars,
            preview(text, 200),
            total_sources
        )),
        ResearchEvent::Reflected {
            iteration,
            verdict,
            capped,
        } => {
            let decision = match (capped, verdict) {
                (true, _) => "iteration cap reached",
                (false, Verdict::Stop) => "research is sufficient",
                (false, Verdict::Continue) => "more research needed",
            };
            Some(format!(
                "{}\n   After iteration {}: {}",
                section("Reflecting on Progress"),
                iteration,
                decision
            ))
        }
        ResearchEvent::ReportStart { sources } => Some(format!(
            "{}\n   Drawing on {} sources...",
            section("Writing Final Report"),
            sources
        )),
        ResearchEvent::SessionEnd { .. } => None,
        ResearchEvent::Error { step, message } => Some(match step {
            Some(step) => format!("   Failed during {}: {}", step, message),
            None => format!("   Failed: {}", message),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delve_research::{SearchResult, Step};

    #[test]
    fn test_header() {
        let out = header("What is quantum computing?", "gpt-4o-mini", 5, false);
        assert!(out.contains("Research Topic: What is quantum computing?"));
        assert!(out.contains("Max Iterations: 5"));
        assert!(!out.contains("Verbose"));
        assert!(out.contains(&"=".repeat(60)));
    }

    #[test]
    fn test_report_and_stats() {
        let out = report("# Quantum");
        assert!(out.contains("RESEARCH REPORT"));
        assert!(out.contains("\n\n# Quantum\n\n"));
        assert_eq!(stats(3, 12), "\nStats: 3 iterations, 12 sources gathered");
    }

    #[test]
    fn test_search_event_lists_first_three_titles() {
        let results: Vec<_> = (1..=5)
            .map(|i| SearchResult::new(format!("Title {}", i), format!("https://e.com/{}", i), ""))
            .collect();
        let out = event(&ResearchEvent::SearchCompleted {
            iteration: 1,
            query: "q".into(),
            results,
            cached: false,
        })
        .unwrap();
        assert!(out.contains("Found 5 results"));
        assert!(out.contains("• Title 3"));
        assert!(!out.contains("Title 4"));
    }

    #[test]
    fn test_reflected_event_wording() {
        let capped = event(&ResearchEvent::Reflected {
            iteration: 3,
            verdict: Verdict::Continue,
            capped: true,
        })
        .unwrap();
        assert!(capped.contains("iteration cap reached"));

        let stop = event(&ResearchEvent::Reflected {
            iteration: 1,
            verdict: Verdict::Stop,
            capped: false,
        })
        .unwrap();
        assert!(stop.contains("research is sufficient"));
    }

    #[test]
    fn test_error_and_end_events() {
        let out = event(&ResearchEvent::Error {
            step: Some(Step::Search),
            message: "search service unavailable".into(),
        })
        .unwrap();
        assert_eq!(out, "   Failed during search: search service unavailable");

        assert!(
            event(&ResearchEvent::SessionEnd {
                session_id: "s".into(),
                iterations: 1,
                sources: 2,
                cached_lookups: 0,
            })
            .is_none()
        );
    }
}
