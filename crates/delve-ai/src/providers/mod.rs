//! LLM Provider implementations

pub mod anthropic;
pub mod openai;

use std::sync::LazyLock;

use crate::{
    Api, Context, Error, Message, MessageEventStream, Model, Result, StreamOptions,
    error::mentions_context_overflow,
    stream::{MessageBuilder, MessageEvent},
};
use async_trait::async_trait;
use futures::StreamExt;
use regex::Regex;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stream a response from the LLM
    async fn stream(
        &self,
        model: &Model,
        context: &Context,
        options: &StreamOptions,
    ) -> Result<MessageEventStream>;
}

/// Pick the provider implementation that speaks `model.api`
pub fn for_model(model: &Model, api_key: impl Into<String>) -> Box<dyn LlmProvider> {
    let api_key = api_key.into();
    match model.api {
        Api::OpenAICompletions => Box::new(openai::OpenAIProvider::new(api_key)),
        Api::AnthropicMessages => Box::new(anthropic::AnthropicProvider::new(api_key)),
    }
}

/// Run a request to completion and return the assistant message.
///
/// Fails with `Error::EmptyResponse` when the model produced no text.
pub async fn complete(
    provider: &dyn LlmProvider,
    model: &Model,
    context: &Context,
    options: &StreamOptions,
) -> Result<Message> {
    let mut stream = provider.stream(model, context, options).await?;
    let mut builder = MessageBuilder::new();
    let mut final_message = None;

    while let Some(event) = stream.next().await {
        builder.process_event(&event);
        match event {
            MessageEvent::Done { message, .. } => {
                final_message = Some(message);
                break;
            }
            MessageEvent::Error { message } => return Err(classify_stream_error(message)),
            _ => {}
        }
    }

    let message = match final_message {
        Some(message) if !message.text().is_empty() => message,
        Some(_) => builder.build(),
        None => {
            return Err(Error::UnexpectedResponse(
                "stream ended before the message completed".to_string(),
            ));
        }
    };

    if message.text().trim().is_empty() {
        return Err(Error::EmptyResponse(model.id.clone()));
    }

    tracing::debug!(
        "{} completed: {} chars, usage {:?}",
        model.id,
        message.text().len(),
        message.usage()
    );
    Ok(message)
}

/// HTTP status reported by reqwest-eventsource, e.g. "Invalid status code: 503 Service Unavailable"
static STATUS_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\binvalid status code:\s*(\d{3})\b").unwrap());

/// Turn an in-stream error string into a typed error so callers can decide
/// whether to retry.
fn classify_stream_error(message: String) -> Error {
    let lower = message.to_lowercase();
    if lower.contains("failed to parse") {
        return Error::UnexpectedResponse(message);
    }
    if mentions_context_overflow(&message) {
        return Error::ContextOverflow(message);
    }

    let status = STATUS_CODE_PATTERN
        .captures(&message)
        .and_then(|caps| caps[1].parse::<u16>().ok());
    match status {
        Some(429) => Error::RateLimited { retry_after: None },
        Some(401 | 403) => Error::Auth(message),
        Some(500..=599) => Error::api("server_error", message),
        Some(_) => Error::api("http_error", message),
        // In-stream error events carry the provider's error type instead of a status
        None if lower.contains("rate_limit") || lower.contains("rate limit") => {
            Error::RateLimited { retry_after: None }
        }
        None if lower.contains("authentication_error") => Error::Auth(message),
        None if lower.contains("overloaded") => Error::api("overloaded", message),
        None if lower.contains("api_error") => Error::api("server_error", message),
        None if lower.contains("_error:") => Error::api("request_error", message),
        None => Error::Sse(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssistantMetadata, Content, Provider, StopReason, Usage, models};

    struct CannedProvider {
        events: Vec<MessageEvent>,
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn stream(
            &self,
            _model: &Model,
            _context: &Context,
            _options: &StreamOptions,
        ) -> Result<MessageEventStream> {
            Ok(Box::pin(futures::stream::iter(self.events.clone())))
        }
    }

    fn done(text: &str) -> MessageEvent {
        MessageEvent::Done {
            message: Message::Assistant {
                content: vec![Content::text(text)],
                metadata: AssistantMetadata::default(),
            },
            stop_reason: StopReason::Stop,
            usage: Usage::default(),
        }
    }

    fn model() -> Model {
        models::resolve(Provider::OpenAI, "gpt-4o-mini")
    }

    #[tokio::test]
    async fn test_complete_returns_done_message() {
        let provider = CannedProvider {
            events: vec![
                MessageEvent::TextDelta {
                    content_index: 0,
                    delta: "quantum".into(),
                },
                done("quantum"),
            ],
        };
        let msg = complete(&provider, &model(), &Context::prompt("q"), &StreamOptions::default())
            .await
            .unwrap();
        assert_eq!(msg.text(), "quantum");
    }

    #[tokio::test]
    async fn test_complete_rejects_blank_text() {
        let provider = CannedProvider {
            events: vec![done("   ")],
        };
        let err = complete(&provider, &model(), &Context::prompt("q"), &StreamOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyResponse(_)));
    }

    #[tokio::test]
    async fn test_complete_surfaces_stream_errors() {
        let provider = CannedProvider {
            events: vec![MessageEvent::Error {
                message: "SSE error: Invalid status code: 429 Too Many Requests".into(),
            }],
        };
        let err = complete(&provider, &model(), &Context::prompt("q"), &StreamOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_complete_without_done_is_unexpected() {
        let provider = CannedProvider {
            events: vec![MessageEvent::TextDelta {
                content_index: 0,
                delta: "partial".into(),
            }],
        };
        let err = complete(&provider, &model(), &Context::prompt("q"), &StreamOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse(_)));
    }

    #[test]
    fn test_classify_stream_error() {
        assert!(matches!(
            classify_stream_error("Invalid status code: 401 Unauthorized".into()),
            Error::Auth(_)
        ));
        assert!(classify_stream_error("Invalid status code: 503".into()).is_retryable());
        assert!(!classify_stream_error("Invalid status code: 400 Bad Request".into()).is_retryable());
        assert!(classify_stream_error("connection reset by peer".into()).is_retryable());
        assert!(
            classify_stream_error("SSE error: Invalid status code: 529 Overloaded".into())
                .is_retryable()
        );
    }

    #[test]
    fn test_classify_ignores_digits_outside_status() {
        let err =
            classify_stream_error("Failed to parse chunk: expected value at line 1 column 1503".into());
        assert!(matches!(err, Error::UnexpectedResponse(_)));
        assert!(!err.is_retryable());

        let err = classify_stream_error("invalid_request_error: max_tokens 4290 is too large".into());
        assert!(!err.is_retryable());
        assert!(!matches!(err, Error::RateLimited { .. }));
    }

    #[test]
    fn test_classify_provider_error_types() {
        assert!(matches!(
            classify_stream_error("rate_limit_error: Number of request tokens has exceeded your limit".into()),
            Error::RateLimited { .. }
        ));
        assert!(classify_stream_error("overloaded_error: Overloaded".into()).is_retryable());
        assert!(matches!(
            classify_stream_error("authentication_error: invalid x-api-key".into()),
            Error::Auth(_)
        ));
    }

    #[test]
    fn test_classify_context_overflow() {
        let err = classify_stream_error("invalid_request_error: prompt is too long: 210000 tokens > 200000 maximum".into());
        assert!(matches!(err, Error::ContextOverflow(_)));
        assert!(err.is_context_overflow());
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_complete_parse_failure_is_not_retryable() {
        let provider = CannedProvider {
            events: vec![MessageEvent::Error {
                message: "Failed to parse chunk: expected value at line 1 column 1503".into(),
            }],
        };
        let err = complete(&provider, &model(), &Context::prompt("q"), &StreamOptions::default())
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }
}
