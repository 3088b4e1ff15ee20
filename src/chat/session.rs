use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::analyzer::prompts::CHAT_SYSTEM_INSTRUCTION;
use crate::client::{Content, GeminiClient, GenerateContentRequest, Part, Transport};
use crate::error::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    /// Role name on the wire.
    pub fn role(self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// In-memory conversation. Messages are only ever appended.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    system_instruction: String,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self::with_system_instruction(CHAT_SYSTEM_INSTRUCTION)
    }

    pub fn with_system_instruction(instruction: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            system_instruction: instruction.into(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    fn append(&mut self, speaker: Speaker, text: String) -> &ChatMessage {
        self.messages.push(ChatMessage {
            speaker,
            text,
            sent_at: Utc::now(),
        });
        &self.messages[self.messages.len() - 1]
    }

    /// Whole history as request contents.
    ///
    /// A user turn whose reply failed stays in the history, so consecutive
    /// messages from the same speaker are folded into one turn.
    pub fn to_request(&self) -> GenerateContentRequest {
        let mut contents: Vec<Content> = Vec::new();
        for message in &self.messages {
            let role = message.speaker.role();
            let part = Part::text(message.text.clone());
            let same_speaker = contents
                .last()
                .is_some_and(|last| last.role.as_deref() == Some(role));
            if !same_speaker {
                contents.push(Content::new(role, Vec::new()));
            }
            if let Some(last) = contents.last_mut() {
                last.parts.push(part);
            }
        }
        GenerateContentRequest::new(contents).with_system_instruction(self.system_instruction.clone())
    }

    /// Append the user's message, ask the endpoint, append the reply.
    ///
    /// On failure the user message stays and no assistant message is added.
    pub async fn send<T: Transport>(
        &mut self,
        client: &GeminiClient<T>,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<&ChatMessage, AnalysisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AnalysisError::Precondition("Message is empty".to_string()));
        }

        self.append(Speaker::User, text.to_string());
        info!("Sending chat turn ({} messages in history)", self.messages.len());

        let request = self.to_request();
        match client.generate_text(&request, cancel).await {
            Ok(reply) => Ok(self.append(Speaker::Assistant, reply)),
            Err(e) => {
                warn!("Chat turn failed ({}): {}", e.kind(), e);
                Err(e)
            }
        }
    }
}
