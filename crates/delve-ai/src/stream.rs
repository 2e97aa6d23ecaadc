//! Streaming event types and utilities

use crate::types::{AssistantMetadata, Content, Message, StopReason, Usage};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted during message streaming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageEvent {
    /// Initial message structure
    Start { message: Message },
    /// Text content started
    TextStart { content_index: usize },
    /// Text content delta
    TextDelta { content_index: usize, delta: String },
    /// Text content completed
    TextEnd { content_index: usize, text: String },
    /// Message completed successfully
    Done {
        message: Message,
        stop_reason: StopReason,
        usage: Usage,
    },
    /// Error occurred
    Error { message: String },
}

impl MessageEvent {
    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageEvent::Done { .. } | MessageEvent::Error { .. })
    }

    /// Get the final message if this is a Done event
    pub fn into_message(self) -> Option<Message> {
        match self {
            MessageEvent::Done { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// A stream of message events
pub type MessageEventStream = Pin<Box<dyn Stream<Item = MessageEvent> + Send>>;

/// Builder for constructing an assistant message from streaming events
#[derive(Debug, Default)]
pub struct MessageBuilder {
    content_buffers: Vec<String>,
    usage: Usage,
    stop_reason: Option<StopReason>,
}

impl MessageBuilder {
    /// Create a new message builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a streaming event and update the message state
    pub fn process_event(&mut self, event: &MessageEvent) {
        match event {
            MessageEvent::TextStart { content_index } => {
                self.ensure_buffer(*content_index);
            }
            MessageEvent::TextDelta {
                content_index,
                delta,
            } => {
                // Providers that never send TextStart (OpenAI) still need a buffer
                self.ensure_buffer(*content_index);
                self.content_buffers[*content_index].push_str(delta);
            }
            MessageEvent::TextEnd {
                content_index,
                text,
            } => {
                if let Some(buffer) = self.content_buffers.get_mut(*content_index) {
                    *buffer = text.clone();
                }
            }
            MessageEvent::Done {
                stop_reason, usage, ..
            } => {
                self.stop_reason = Some(*stop_reason);
                self.usage = usage.clone();
            }
            _ => {}
        }
    }

    /// Build the final message
    pub fn build(self) -> Message {
        let content = self
            .content_buffers
            .into_iter()
            .map(|text| Content::Text { text })
            .collect();

        Message::Assistant {
            content,
            metadata: AssistantMetadata {
                usage: self.usage,
                stop_reason: self.stop_reason,
                timestamp: chrono::Utc::now().timestamp_millis(),
                ..Default::default()
            },
        }
    }

    /// Text accumulated so far
    pub fn current_text(&self) -> String {
        self.content_buffers.concat()
    }

    fn ensure_buffer(&mut self, index: usize) {
        if self.content_buffers.len() <= index {
            self.content_buffers.resize(index + 1, String::new());
        }
    }
}
