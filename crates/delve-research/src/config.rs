//! Research session configuration

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What the planner does when the reasoner proposes an empty query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyQueryPolicy {
    /// End the session with a malformed-output error
    #[default]
    Fail,
    /// Search for the topic itself
    UseTopic,
}

/// Knobs for one research session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Hard cap on plan/search/summarize/reflect passes
    pub max_iterations: u32,
    /// The gate always continues below this many passes
    pub min_iterations: u32,
    /// The gate continues while the summary is shorter than this. 0 disables.
    pub min_summary_chars: usize,
    /// Skip results whose url is already in `sources`
    pub dedup_sources: bool,
    pub empty_query: EmptyQueryPolicy,
    /// Reuse results for a repeated query within one session
    pub cache_lookups: bool,
    /// How many unique sources the report prompt lists
    pub report_source_limit: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            min_iterations: 1,
            min_summary_chars: 0,
            dedup_sources: false,
            empty_query: EmptyQueryPolicy::Fail,
            cache_lookups: false,
            report_source_limit: 15,
        }
    }
}

impl ResearchConfig {
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Reject unusable values and clamp the rest into range.
    pub fn validate(mut self) -> Result<Self> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.report_source_limit == 0 {
            return Err(Error::InvalidConfig(
                "report_source_limit must be at least 1".to_string(),
            ));
        }
        self.min_iterations = self.min_iterations.clamp(1, self.max_iterations);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResearchConfig::default();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.min_iterations, 1);
        assert_eq!(config.min_summary_chars, 0);
        assert!(!config.dedup_sources);
        assert!(!config.cache_lookups);
        assert_eq!(config.empty_query, EmptyQueryPolicy::Fail);
        assert_eq!(config.report_source_limit, 15);
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let err = ResearchConfig::default()
            .with_max_iterations(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_clamps_min_iterations() {
        let config = ResearchConfig {
            max_iterations: 2,
            min_iterations: 9,
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(config.min_iterations, 2);

        let config = ResearchConfig {
            min_iterations: 0,
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(config.min_iterations, 1);
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: ResearchConfig =
            serde_json::from_str(r#"{"max_iterations": 3, "empty_query": "use_topic"}"#).unwrap();
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.empty_query, EmptyQueryPolicy::UseTopic);
        assert_eq!(config.report_source_limit, 15);
    }
}
