//! UI-agnostic conversation types
//!
//! These structures are shared by every front end and don't depend on any UI framework.
//! A message carries exactly one body variant; console blocks have no raw text of their own.

use serde::{Deserialize, Serialize};

use crate::classify::{classify, has_markdown_syntax, ResponseKind};
use crate::console_block::ConsoleBlock;

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Speaker label used when replaying history into a prompt.
    pub fn prompt_label(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "ai",
        }
    }
}

/// How a message is rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MessageBody {
    Plain(String),
    Markdown(String),
    Yaml(String),
    Console(ConsoleBlock),
}

impl MessageBody {
    /// Pick a body for an assistant text using the response classifier.
    pub fn from_response(text: &str) -> Self {
        match classify(text) {
            ResponseKind::Yaml => MessageBody::Yaml(text.to_string()),
            ResponseKind::Table | ResponseKind::RichMarkdown => {
                MessageBody::Markdown(text.to_string())
            }
            ResponseKind::Nutrition if has_markdown_syntax(text) => {
                MessageBody::Markdown(text.to_string())
            }
            ResponseKind::Nutrition | ResponseKind::Plain => MessageBody::Plain(text.to_string()),
        }
    }
}

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub body: MessageBody,
    /// Model reasoning, shown collapsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            body: MessageBody::Plain(text.into()),
            thinking: None,
        }
    }

    /// Assistant text rendered without classification (errors, notices).
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            body: MessageBody::Plain(text.into()),
            thinking: None,
        }
    }

    pub fn assistant_body(body: MessageBody) -> Self {
        Self {
            role: ChatRole::Assistant,
            body,
            thinking: None,
        }
    }

    pub fn with_thinking(mut self, thinking: Option<String>) -> Self {
        self.thinking = thinking.filter(|t| !t.trim().is_empty());
        self
    }

    /// Original text payload; empty for console blocks.
    pub fn raw_text(&self) -> &str {
        match &self.body {
            MessageBody::Plain(text) | MessageBody::Markdown(text) | MessageBody::Yaml(text) => {
                text
            }
            MessageBody::Console(_) => "",
        }
    }

    /// Text replayed to the model as conversation context.
    pub fn prompt_text(&self) -> String {
        match &self.body {
            MessageBody::Console(block) => block.content(),
            _ => self.raw_text().to_string(),
        }
    }

    pub fn is_console(&self) -> bool {
        matches!(self.body, MessageBody::Console(_))
    }
}
