//! OpenAI Chat Completions API provider
//!
//! Also serves any OpenAI-compatible endpoint (Groq, OpenRouter, Ollama).

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    providers::LlmProvider,
    stream::{MessageEvent, MessageEventStream},
    types::{
        Api, AssistantMetadata, Content, Context, Message, Model, StopReason, StreamOptions, Usage,
    },
};

/// OpenAI API client
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    fn build_headers(&self, model: &Model) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        // Ollama accepts any bearer token, including an empty one
        if !self.api_key.is_empty() {
            let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|_| Error::InvalidApiKey)?;
            headers.insert(reqwest::header::AUTHORIZATION, bearer);
        }
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        for (key, value) in &model.headers {
            if let (Ok(name), Ok(val)) = (key.parse::<HeaderName>(), value.parse::<HeaderValue>()) {
                headers.insert(name, val);
            }
        }
        Ok(headers)
    }

    fn build_request(
        &self,
        model: &Model,
        context: &Context,
        options: &StreamOptions,
    ) -> OpenAIRequest {
        let mut messages = Vec::new();
        for msg in &context.messages {
            let text = msg.text();
            if text.is_empty() {
                continue;
            }
            messages.push(OpenAIMessage {
                role: msg.role().to_string(),
                content: text,
            });
        }

        OpenAIRequest {
            model: model.id.clone(),
            messages,
            stream: true,
            stream_options: Some(StreamOptionsBody {
                include_usage: true,
            }),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stop: if options.stop_sequences.is_empty() {
                None
            } else {
                Some(options.stop_sequences.clone())
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn stream(
        &self,
        model: &Model,
        context: &Context,
        options: &StreamOptions,
    ) -> Result<MessageEventStream> {
        let request = self.build_request(model, context, options);
        let url = format!("{}/chat/completions", model.base_url);
        tracing::debug!("OpenAI-compatible API URL: {}", url);

        let request_builder = self
            .client
            .post(&url)
            .headers(self.build_headers(model)?)
            .json(&request);

        let event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        Ok(Box::pin(create_stream(event_source, model.clone())))
    }
}

fn create_stream(
    mut event_source: EventSource,
    model: Model,
) -> impl futures::Stream<Item = MessageEvent> {
    stream! {
        let mut accumulated_text = String::new();
        let mut finish_reason: Option<String> = None;
        let mut usage = Usage::default();

        yield MessageEvent::Start { message: Message::assistant_empty() };

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data == "[DONE]" {
                        break;
                    }

                    match serde_json::from_str::<StreamChunk>(&msg.data) {
                        Ok(chunk) => {
                            for choice in &chunk.choices {
                                if let Some(ref content) = choice.delta.content {
                                    accumulated_text.push_str(content);
                                    yield MessageEvent::TextDelta {
                                        content_index: 0,
                                        delta: content.clone(),
                                    };
                                }
                                if let Some(ref reason) = choice.finish_reason {
                                    finish_reason = Some(reason.clone());
                                }
                            }

                            if let Some(ref stream_usage) = chunk.usage {
                                usage.input = stream_usage.prompt_tokens;
                                usage.output = stream_usage.completion_tokens;
                            }
                        }
                        Err(e) => {
                            yield MessageEvent::Error {
                                message: format!("Failed to parse chunk: {}", e),
                            };
                            event_source.close();
                            return;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(e) => {
                    yield MessageEvent::Error {
                        message: format!("SSE error: {}", e),
                    };
                    event_source.close();
                    return;
                }
            }
        }
        event_source.close();

        let stop_reason = map_finish_reason(finish_reason.as_deref());
        let content = if accumulated_text.is_empty() {
            vec![]
        } else {
            vec![Content::Text { text: accumulated_text }]
        };

        let final_message = Message::Assistant {
            content,
            metadata: AssistantMetadata {
                api: Some(Api::OpenAICompletions),
                provider: Some(model.provider),
                model: Some(model.id.clone()),
                usage: usage.clone(),
                stop_reason: Some(stop_reason),
                timestamp: chrono::Utc::now().timestamp_millis(),
                ..Default::default()
            },
        };

        yield MessageEvent::Done {
            message: final_message,
            stop_reason,
            usage,
        };
    }
}

fn map_finish_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("length") => StopReason::Length,
        Some("content_filter") => StopReason::Error,
        _ => StopReason::Stop,
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptionsBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct StreamOptionsBody {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<StreamUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Provider, models};

    #[test]
    fn test_build_request_carries_options() {
        let provider = OpenAIProvider::new("sk-test");
        let model = models::resolve(Provider::OpenAI, "gpt-4o-mini");
        let context = Context::prompt("What is quantum computing?");
        let options = StreamOptions {
            temperature: Some(0.0),
            max_tokens: Some(256),
            ..Default::default()
        };

        let body = serde_json::to_value(provider.build_request(&model, &context, &options)).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["stream"], true);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "What is quantum computing?");
        assert!(body.get("stop").is_none());
    }

    #[test]
    fn test_parse_stream_chunk_with_usage() {
        let data = r#"{"choices":[{"delta":{"content":"qubits"},"finish_reason":"stop"}],
                       "usage":{"prompt_tokens":11,"completion_tokens":3}}"#;
        let chunk: StreamChunk = serde_json::from_str(data).unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("qubits"));
        assert_eq!(chunk.usage.unwrap().completion_tokens, 3);
    }

    #[test]
    fn test_parse_usage_only_chunk() {
        let chunk: StreamChunk =
            serde_json::from_str(r#"{"choices":[],"usage":{"prompt_tokens":1,"completion_tokens":2}}"#)
                .unwrap();
        assert!(chunk.choices.is_empty());
    }

    #[test]
    fn test_map_finish_reason() {
        assert_eq!(map_finish_reason(Some("stop")), StopReason::Stop);
        assert_eq!(map_finish_reason(Some("length")), StopReason::Length);
        assert_eq!(map_finish_reason(None), StopReason::Stop);
    }

    #[test]
    fn test_headers_skip_empty_key() {
        let model = models::resolve(Provider::Ollama, "llama3");
        let headers = OpenAIProvider::new("").build_headers(&model).unwrap();
        assert!(headers.get(reqwest::header::AUTHORIZATION).is_none());
    }
}
