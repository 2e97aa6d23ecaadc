//! delve-ai: LLM provider layer
//!
//! Wraps the chat APIs the research agent reasons with (OpenAI-compatible
//! Chat Completions and Anthropic Messages) behind a streaming provider trait,
//! plus a `complete` helper for callers that only want the final text.

pub mod error;
pub mod models;
pub mod providers;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use providers::{LlmProvider, complete};
pub use stream::MessageEventStream;
pub use types::*;
