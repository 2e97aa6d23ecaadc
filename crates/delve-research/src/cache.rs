//! Per-session memo of lookup results

use std::collections::HashMap;

use crate::state::SearchResult;

/// Remembers lookup results by normalized query. Lives only as long as the
/// session that created it.
#[derive(Debug, Default)]
pub struct LookupCache {
    entries: HashMap<String, Vec<SearchResult>>,
    hits: usize,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case- and whitespace-insensitive key
    fn key(query: &str) -> String {
        query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn get(&mut self, query: &str) -> Option<Vec<SearchResult>> {
        let found = self.entries.get(&Self::key(query)).cloned();
        if found.is_some() {
            self.hits += 1;
        }
        found
    }

    pub fn insert(&mut self, query: &str, results: Vec<SearchResult>) {
        self.entries.insert(Self::key(query), results);
    }

    /// Lookups answered from the cache so far
    pub fn hits(&self) -> usize {
        self.hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::hit;

    #[test]
    fn test_normalized_lookup() {
        let mut cache = LookupCache::new();
        cache.insert("Quantum  Computing basics", vec![hit(1)]);

        assert_eq!(cache.get(" quantum computing BASICS "), Some(vec![hit(1)]));
        assert_eq!(cache.get("quantum computing"), None);
        assert_eq!(cache.hits(), 1);
    }
}
