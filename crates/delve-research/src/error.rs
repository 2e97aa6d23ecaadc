//! Error types for delve-research

use thiserror::Error;

use crate::{events::Step, lookup::LookupError};

/// Result type alias using delve-research Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end a research session.
///
/// Every variant is fatal for the session that raised it; no partial report
/// is produced.
#[derive(Error, Debug)]
pub enum Error {
    /// The reasoning service failed or timed out
    #[error("reasoning service unavailable: {0}")]
    Reasoning(#[from] delve_ai::Error),

    /// The search service failed or timed out
    #[error("search service unavailable: {0}")]
    Lookup(#[from] LookupError),

    /// A collaborator answered, but with something the loop cannot use
    #[error("malformed {step} output: {detail}")]
    MalformedOutput { step: Step, detail: String },

    /// The session was started with unusable parameters
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn malformed(step: Step, detail: impl Into<String>) -> Self {
        Self::MalformedOutput {
            step,
            detail: detail.into(),
        }
    }

    /// True for failures of an external service, as opposed to bad output
    /// or bad input.
    pub fn is_collaborator_unavailable(&self) -> bool {
        matches!(self, Error::Reasoning(_) | Error::Lookup(_))
    }

    /// The prompt outgrew the reasoning model's context window. Retrying the
    /// same session cannot help; a smaller one might.
    pub fn is_context_overflow(&self) -> bool {
        matches!(self, Error::Reasoning(e) if e.is_context_overflow())
    }

    /// Check if retrying the failed call could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Reasoning(e) => e.is_retryable(),
            Error::Lookup(e) => e.is_retryable(),
            _ => false,
        }
    }
}
