//! Shared utilities

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// One-line preview: whitespace runs collapsed, then truncated.
pub fn preview(s: &str, max: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&flat, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_counts_chars() {
        assert_eq!(truncate_chars("qubit", 10), "qubit");
        assert_eq!(truncate_chars("superposition", 5), "super...");
        assert_eq!(truncate_chars("ψψψψ", 2), "ψψ...");
    }

    #[test]
    fn test_preview_flattens_lines() {
        assert_eq!(preview("Qubits\n\n  superpose.", 100), "Qubits superpose.");
        assert_eq!(preview("one two three", 7), "one two...");
    }
}
