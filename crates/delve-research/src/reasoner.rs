//! Reasoning collaborator
//!
//! Every LLM-backed step goes through [`Reasoner::complete`]: one prompt in,
//! one block of text out.

use async_trait::async_trait;
use delve_ai::{Context, LlmProvider, Model, StreamOptions, Usage};
use parking_lot::Mutex;

use crate::error::Result;

/// Anything that can answer a prompt with text
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Answer `prompt`. An empty string is a valid answer; the calling step
    /// decides whether it is usable.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Sampling parameters for the reasoning model
#[derive(Debug, Clone, Copy)]
pub struct ReasonerOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for ReasonerOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: None,
        }
    }
}

/// A [`Reasoner`] backed by a delve-ai provider
pub struct ProviderReasoner {
    provider: Box<dyn LlmProvider>,
    model: Model,
    options: ReasonerOptions,
    usage: Mutex<Usage>,
}

impl ProviderReasoner {
    /// Build a reasoner for `model`, picking the provider by its API.
    pub fn new(model: Model, api_key: impl Into<String>) -> Self {
        let provider = delve_ai::providers::for_model(&model, api_key);
        Self::with_provider(provider, model)
    }

    pub fn with_provider(provider: Box<dyn LlmProvider>, model: Model) -> Self {
        Self {
            provider,
            model,
            options: ReasonerOptions::default(),
            usage: Mutex::new(Usage::default()),
        }
    }

    pub fn with_options(mut self, options: ReasonerOptions) -> Self {
        self.options = options;
        self
    }

    /// Token usage summed over every completed call
    pub fn total_usage(&self) -> Usage {
        self.usage.lock().clone()
    }

    fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            max_tokens: self.options.max_tokens,
            temperature: Some(self.options.temperature),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Reasoner for ProviderReasoner {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let context = Context::prompt(prompt);

        let result = delve_ai::complete(
            self.provider.as_ref(),
            &self.model,
            &context,
            &self.stream_options(),
        )
        .await;

        match result {
            Ok(message) => {
                if let Some(usage) = message.usage() {
                    self.usage.lock().add(usage);
                }
                Ok(message.text())
            }
            // Blank answers are handed to the step, which owns the policy
            Err(delve_ai::Error::EmptyResponse(model)) => {
                tracing::debug!("{} returned no text", model);
                Ok(String::new())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delve_ai::{
        AssistantMetadata, Content, Message, MessageEventStream, Provider, StopReason, models,
        stream::MessageEvent,
    };
    use std::sync::Arc;

    type Seen = Arc<Mutex<Vec<(Context, StreamOptions)>>>;

    struct CannedProvider {
        reply: Option<String>,
        seen: Seen,
    }

    fn canned(reply: Option<&str>) -> (Box<dyn LlmProvider>, Seen) {
        let seen = Seen::default();
        let provider = CannedProvider {
            reply: reply.map(str::to_string),
            seen: seen.clone(),
        };
        (Box::new(provider), seen)
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn stream(
            &self,
            _model: &Model,
            context: &Context,
            options: &StreamOptions,
        ) -> delve_ai::Result<MessageEventStream> {
            self.seen.lock().push((context.clone(), options.clone()));
            let events = match &self.reply {
                Some(text) => vec![MessageEvent::Done {
                    message: Message::Assistant {
                        content: vec![Content::text(text.clone())],
                        metadata: AssistantMetadata {
                            usage: Usage {
                                input: 10,
                                output: 4,
                                ..Default::default()
                            },
                            ..Default::default()
                        },
                    },
                    stop_reason: StopReason::Stop,
                    usage: Usage::default(),
                }],
                None => vec![MessageEvent::Error {
                    message: "SSE error: Invalid status code: 503 Service Unavailable".into(),
                }],
            };
            Ok(Box::pin(futures::stream::iter(events)))
        }
    }

    fn model() -> Model {
        models::resolve(Provider::OpenAI, "gpt-4o-mini")
    }

    #[tokio::test]
    async fn test_complete_returns_text_and_tracks_usage() {
        let (provider, seen) = canned(Some("quantum computing basics"));
        let reasoner = ProviderReasoner::with_provider(provider, model());

        let text = reasoner.complete("plan a query").await.unwrap();
        assert_eq!(text, "quantum computing basics");
        reasoner.complete("again").await.unwrap();

        let usage = reasoner.total_usage();
        assert_eq!(usage.input, 20);
        assert_eq!(usage.output, 8);

        let seen = seen.lock();
        let (context, options) = &seen[0];
        assert_eq!(context.messages.len(), 1);
        assert_eq!(context.messages[0].text(), "plan a query");
        assert_eq!(options.temperature, Some(0.0));
    }

    #[tokio::test]
    async fn test_blank_reply_is_empty_string() {
        let (provider, _) = canned(Some("  "));
        let reasoner = ProviderReasoner::with_provider(provider, model());
        assert_eq!(reasoner.complete("q").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_provider_failure_is_collaborator_unavailable() {
        let (provider, _) = canned(None);
        let reasoner = ProviderReasoner::with_provider(provider, model());
        let err = reasoner.complete("q").await.unwrap_err();
        assert!(err.is_collaborator_unavailable());
        assert!(err.is_retryable());
    }
}
