//! Anthropic Messages API provider

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
    types::{Api, AssistantMetadata, Content, Context, Message, Model, StopReason, StreamOptions, Usage},
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic API client
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    fn build_headers(&self, model: &Model) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key).map_err(|_| Error::InvalidApiKey)?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );
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
    ) -> AnthropicRequest {
        let messages = context
            .messages
            .iter()
            .filter_map(|msg| {
                let text = msg.text();
                if text.is_empty() {
                    return None;
                }
                Some(AnthropicMessage {
                    role: msg.role().to_string(),
                    content: vec![TextBlock {
                        block_type: "text".to_string(),
                        text,
                    }],
                })
            })
            .collect();

        AnthropicRequest {
            model: model.id.clone(),
            messages,
            max_tokens: options.max_tokens.unwrap_or(model.max_tokens / 3),
            stream: true,
            temperature: options.temperature,
            stop_sequences: if options.stop_sequences.is_empty() {
                None
            } else {
                Some(options.stop_sequences.clone())
            },
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn stream(
        &self,
        model: &Model,
        context: &Context,
        options: &StreamOptions,
    ) -> Result<MessageEventStream> {
        let request = self.build_request(model, context, options);
        let url = format!("{}/v1/messages", model.base_url);
        tracing::debug!("Anthropic API URL: {}", url);

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

/// Create the event stream from SSE events
fn create_stream(
    mut event_source: EventSource,
    model: Model,
) -> impl futures::Stream<Item = MessageEvent> {
    stream! {
        let mut usage = Usage::default();
        let mut stop_reason = StopReason::Stop;
        let mut blocks: Vec<Block> = vec![];
        let mut error_message: Option<String> = None;

        yield MessageEvent::Start { message: Message::assistant_empty() };

        while let Some(event_result) = event_source.next().await {
            match event_result {
                Ok(Event::Open) => {}
                Ok(Event::Message(message)) => match message.event.as_str() {
                    "message_start" => {
                        if let Ok(data) = serde_json::from_str::<MessageStartEvent>(&message.data) {
                            usage.input = data.message.usage.input_tokens;
                            usage.output = data.message.usage.output_tokens;
                            usage.cache_read = data.message.usage.cache_read_input_tokens.unwrap_or(0);
                            usage.cache_write = data.message.usage.cache_creation_input_tokens.unwrap_or(0);
                        }
                    }
                    "content_block_start" => {
                        if let Ok(data) = serde_json::from_str::<ContentBlockStartEvent>(&message.data) {
                            let index = data.index as usize;
                            while blocks.len() <= index {
                                blocks.push(Block::Other);
                            }
                            match data.content_block.block_type.as_str() {
                                "text" => {
                                    blocks[index] = Block::Text(String::new());
                                    yield MessageEvent::TextStart { content_index: index };
                                }
                                _ => {}
                            }
                        }
                    }
                    "content_block_delta" => {
                        if let Ok(data) = serde_json::from_str::<ContentBlockDeltaEvent>(&message.data) {
                            let index = data.index as usize;
                            match (blocks.get_mut(index), data.delta.delta_type.as_str()) {
                                (Some(Block::Text(text)), "text_delta") => {
                                    let delta = data.delta.text.unwrap_or_default();
                                    text.push_str(&delta);
                                    yield MessageEvent::TextDelta { content_index: index, delta };
                                }
                                _ => {}
                            }
                        }
                    }
                    "content_block_stop" => {
                        if let Ok(data) = serde_json::from_str::<ContentBlockStopEvent>(&message.data) {
                            let index = data.index as usize;
                            if let Some(Block::Text(text)) = blocks.get(index) {
                                yield MessageEvent::TextEnd { content_index: index, text: text.clone() };
                            }
                        }
                    }
                    "message_delta" => {
                        if let Ok(data) = serde_json::from_str::<MessageDeltaEvent>(&message.data) {
                            if let Some(reason) = data.delta.stop_reason {
                                stop_reason = map_stop_reason(&reason);
                            }
                            usage.output = data.usage.output_tokens;
                        }
                    }
                    "message_stop" => break,
                    "error" => {
                        error_message = Some(
                            serde_json::from_str::<ErrorEvent>(&message.data)
                                .map(|data| format!("{}: {}", data.error.error_type, data.error.message))
                                .unwrap_or(message.data),
                        );
                        break;
                    }
                    _ => {}
                },
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(e) => {
                    error_message = Some(format!("SSE error: {}", e));
                    break;
                }
            }
        }
        event_source.close();

        if let Some(message) = error_message {
            yield MessageEvent::Error { message };
            return;
        }

        let content: Vec<Content> = blocks
            .into_iter()
            .filter_map(|block| match block {
                Block::Text(text) => Some(Content::Text { text }),
                Block::Other => None,
            })
            .collect();

        let final_message = Message::Assistant {
            content,
            metadata: AssistantMetadata {
                api: Some(Api::AnthropicMessages),
                provider: Some(model.provider),
                model: Some(model.id.clone()),
                usage: usage.clone(),
                stop_reason: Some(stop_reason),
                error_message: None,
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
        };

        yield MessageEvent::Done {
            message: final_message,
            stop_reason,
            usage,
        };
    }
}

fn map_stop_reason(reason: &str) -> StopReason {
    match reason {
        "max_tokens" => StopReason::Length,
        "refusal" => StopReason::Error,
        _ => StopReason::Stop,
    }
}

#[derive(Debug)]
enum Block {
    Text(String),
    Other,
}

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<TextBlock>,
}

#[derive(Debug, Serialize)]
struct TextBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: String,
}

// ============================================================================
// Response event types
// ============================================================================

#[derive(Debug, Deserialize)]
struct MessageStartEvent {
    message: MessageInfo,
}

#[derive(Debug, Deserialize)]
struct MessageInfo {
    usage: UsageInfo,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
    cache_read_input_tokens: Option<u32>,
    cache_creation_input_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ContentBlockStartEvent {
    index: u32,
    content_block: ContentBlockInfo,
}

#[derive(Debug, Deserialize)]
struct ContentBlockInfo {
    #[serde(rename = "type")]
    block_type: String,
}

#[derive(Debug, Deserialize)]
struct ContentBlockDeltaEvent {
    index: u32,
    delta: DeltaInfo,
}

#[derive(Debug, Deserialize)]
struct DeltaInfo {
    #[serde(rename = "type")]
    delta_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlockStopEvent {
    index: u32,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaEvent {
    delta: MessageDelta,
    usage: UsageInfo,
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEvent {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}
