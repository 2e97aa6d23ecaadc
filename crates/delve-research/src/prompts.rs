//! Prompt templates for the LLM-backed steps

use crate::state::SearchResult;

/// Stands in for the running summary before anything has been learned
pub const EMPTY_SUMMARY: &str = "No research yet.";

pub const PLAN_ROLE: &str = "You plan web searches for a research assistant.";
pub const SUMMARIZE_ROLE: &str = "You maintain the running notes of a research assistant.";
pub const REFLECT_ROLE: &str = "You decide whether a research assistant has gathered enough material.";
pub const REPORT_ROLE: &str = "You write research reports from gathered notes.";

fn summary_or_placeholder(summary: &str) -> &str {
    if summary.trim().is_empty() {
        EMPTY_SUMMARY
    } else {
        summary
    }
}

pub fn plan(topic: &str, running_summary: &str) -> String {
    format!(
        "{PLAN_ROLE}

Topic: {topic}

Notes so far:
{notes}

Propose the single next web search query. With no notes yet, ask a broad \
opening question about the topic. Otherwise aim at something the notes do \
not cover.

Keep it short (a handful of words) and specific.
Reply with the query text only.",
        notes = summary_or_placeholder(running_summary),
    )
}

/// Render results as numbered `[i] title / URL / snippet` blocks
pub fn format_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[{}] {}\nURL: {}\n{}",
                i + 1,
                r.title,
                r.url,
                r.snippet
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn summarize(topic: &str, running_summary: &str, results: &[SearchResult]) -> String {
    format!(
        "{SUMMARIZE_ROLE}

Topic: {topic}

Current notes:
{notes}

New search results:
{results}

Fold whatever in the new results bears on the topic into the notes. Do not \
repeat facts already present, keep the notes organized, and mention the \
source URL next to important facts. If nothing new is relevant, return the \
current notes as they are.

Reply with the complete updated notes.",
        notes = summary_or_placeholder(running_summary),
        results = format_results(results),
    )
}

pub fn reflect(topic: &str, running_summary: &str, iteration: u32, max_iterations: u32) -> String {
    format!(
        "{REFLECT_ROLE}

Topic: {topic}

Notes:
{notes}

Search rounds completed: {iteration} of {max_iterations}

Could a thorough report on the topic be written from these notes alone, \
or are important angles still missing?

Reply with exactly one word: SUFFICIENT if the notes are enough, CONTINUE \
if more searching is needed.",
        notes = summary_or_placeholder(running_summary),
    )
}

pub fn report(topic: &str, running_summary: &str, sources: &[&SearchResult]) -> String {
    let listed = sources
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] {}: {}", i + 1, s.title, s.url))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{REPORT_ROLE}

Topic: {topic}

Notes:
{notes}

Sources:
{listed}

Write a structured report in Markdown: an introduction saying what it \
covers, sections with headers, and a short conclusion. Cite sources inline \
as [n] using the numbers above. Do not add a reference list; one is \
appended automatically.",
        notes = summary_or_placeholder(running_summary),
    )
}
