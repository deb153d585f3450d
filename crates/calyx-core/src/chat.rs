//! Chat orchestration.
//!
//! A turn goes through three steps so a UI can run the network part on a background task:
//!
//! 1. [`ChatSession::begin`] appends the user message and decides what to ask the backend;
//! 2. [`execute`] talks to the backend and always produces assistant messages, never an error;
//! 3. [`ChatSession::complete`] appends them and re-opens the session for input.
//!
//! [`ChatController`] chains the three for callers that can simply await.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::api::{CalyxClient, ChatReply, ClientError, FoodLookup};
use crate::classify::{is_console_text, is_yaml_block};
use crate::console_block::ConsoleBlock;
use crate::food::{detect_food_intent, format_food_lookup, FoodIntent};
use crate::locale::Locale;
use crate::state::{ChatMessage, MessageBody};

pub const CONTEXT_WINDOW: usize = 6;
pub const EXTENDED_CONTEXT_WINDOW: usize = 20;

/// Phrases that suggest a multi-turn body-composition calculation is under way. It is a
/// keyword heuristic: a false positive only costs a longer prompt.
pub const MEDICAL_FORMULA_KEYWORDS: &[&str] = &[
    "imc",
    "composicion corporal",
    "composición corporal",
    "peso en kg",
    "altura en metros",
    "años tienes",
    "pliegue cutáneo",
    "circunferencia",
];

static CANNOT_CALCULATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)no estoy capacitado para calcular").unwrap());
static GENERIC_ADVICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)porción recomendada|consulta a un experto|aplicaciones dedicadas").unwrap()
});

const CANNOT_CALCULATE_HINT: &str = "\nPuedes usar el bloque técnico para cálculos simples, o consultar fuentes confiables para resultados médicos.";
const GENERIC_ADVICE_HINT: &str =
    "\nSi necesitas datos concretos, por favor especifica cantidad, unidad y contexto.";

/// What the backend is used for.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, prompt: &str) -> Result<ChatReply, ClientError>;
    async fn lookup_food(&self, query: &str) -> Result<FoodLookup, ClientError>;
}

#[async_trait]
impl ChatBackend for CalyxClient {
    async fn chat(&self, prompt: &str) -> Result<ChatReply, ClientError> {
        CalyxClient::chat(self, prompt).await
    }

    async fn lookup_food(&self, query: &str) -> Result<FoodLookup, ClientError> {
        CalyxClient::lookup_food(self, query).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingRequest {
    Food(FoodIntent),
    Chat { prompt: String },
}

/// Conversation history plus the single in-flight flag.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    processing: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Start a turn. Returns `None`, leaving the history untouched, when the text is blank or
    /// a request is already outstanding.
    pub fn begin(&mut self, text: &str) -> Option<PendingRequest> {
        if text.trim().is_empty() || self.processing {
            return None;
        }

        let request = match detect_food_intent(text) {
            Some(intent) => PendingRequest::Food(intent),
            None => PendingRequest::Chat {
                prompt: build_prompt(&self.messages, text),
            },
        };

        self.messages.push(ChatMessage::user(text));
        self.processing = true;
        Some(request)
    }

    /// Finish the outstanding turn.
    pub fn complete(&mut self, replies: Vec<ChatMessage>) {
        self.messages.extend(replies);
        self.processing = false;
    }

    /// Append a message outside a turn, e.g. a model switch notice.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// New chat. Also drops the in-flight flag; the caller aborts the request itself.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.processing = false;
    }
}

/// How many earlier messages are replayed to the model.
pub fn context_window(history: &[ChatMessage]) -> usize {
    let medical = history.iter().any(|message| {
        let text = message.prompt_text().to_lowercase();
        MEDICAL_FORMULA_KEYWORDS.iter().any(|kw| text.contains(kw))
    });
    if medical {
        EXTENDED_CONTEXT_WINDOW
    } else {
        CONTEXT_WINDOW
    }
}

/// `user: ...` / `ai: ...` lines for the recent history, then the new input.
pub fn build_prompt(history: &[ChatMessage], input: &str) -> String {
    let window = context_window(history);
    let start = history.len().saturating_sub(window);

    let mut lines: Vec<String> = history[start..]
        .iter()
        .map(|message| format!("{}: {}", message.role.prompt_label(), message.prompt_text()))
        .collect();
    lines.push(format!("user: {}", input));
    lines.join("\n")
}

/// Run a request against the backend. Every failure becomes an assistant message.
pub async fn execute<B>(
    backend: &B,
    request: PendingRequest,
    timeout: Duration,
    locale: Locale,
) -> Vec<ChatMessage>
where
    B: ChatBackend + ?Sized,
{
    match request {
        PendingRequest::Food(intent) => {
            let query = intent.query();
            info!(%query, "routing to food lookup");
            match tokio::time::timeout(timeout, backend.lookup_food(&query)).await {
                Ok(Ok(lookup)) => format_food_lookup(&intent, &lookup, locale),
                Ok(Err(ClientError::Timeout)) | Err(_) => {
                    warn!("food lookup timed out after {:?}", timeout);
                    vec![ChatMessage::assistant(locale.timeout())]
                }
                Ok(Err(err)) => {
                    warn!("food lookup failed: {}", err);
                    vec![ChatMessage::assistant(locale.food_backend_error())]
                }
            }
        }
        PendingRequest::Chat { prompt } => {
            debug!(prompt_len = prompt.len(), "sending chat request");
            match tokio::time::timeout(timeout, backend.chat(&prompt)).await {
                Ok(Ok(reply)) => reply_messages(reply, locale),
                Ok(Err(ClientError::Timeout)) | Err(_) => {
                    warn!("chat request timed out after {:?}", timeout);
                    vec![ChatMessage::assistant(locale.timeout())]
                }
                Ok(Err(ClientError::Decode(detail))) => {
                    warn!("could not decode chat reply: {}", detail);
                    vec![ChatMessage::assistant(locale.unexpected_error())]
                }
                Ok(Err(err)) => {
                    warn!("chat request failed: {}", err);
                    vec![ChatMessage::assistant(locale.connection_error())]
                }
            }
        }
    }
}

/// Messages for a `/chat` reply, in display order.
pub fn reply_messages(reply: ChatReply, locale: Locale) -> Vec<ChatMessage> {
    let mut messages = Vec::new();

    if let Some(text) = reply.message.as_deref().filter(|m| !m.trim().is_empty()) {
        messages.push(
            ChatMessage::assistant_body(MessageBody::from_response(text))
                .with_thinking(reply.thinking.clone()),
        );
    }
    if let Some(block) = reply.console_block {
        messages.push(ChatMessage::assistant_body(MessageBody::Console(block.into())));
    }
    if !messages.is_empty() {
        return messages;
    }

    if let Some(text) = reply.response.as_deref().filter(|r| !r.trim().is_empty()) {
        return vec![legacy_message(text)];
    }
    if let Some(error) = reply.error.filter(|e| !e.trim().is_empty()) {
        warn!("backend reported: {}", error);
        return vec![ChatMessage::assistant(error)];
    }
    vec![ChatMessage::assistant(locale.no_response())]
}

/// Bare `response` strings from older backends.
fn legacy_message(text: &str) -> ChatMessage {
    let mut text = text.to_string();
    if CANNOT_CALCULATE.is_match(&text) {
        text.push_str(CANNOT_CALCULATE_HINT);
    }
    if GENERIC_ADVICE.is_match(&text) {
        text.push_str(GENERIC_ADVICE_HINT);
    }

    let body = if is_yaml_block(&text) {
        MessageBody::Yaml(text)
    } else if is_console_text(&text) {
        MessageBody::Console(ConsoleBlock::from_text(&text))
    } else {
        MessageBody::from_response(&text)
    };
    ChatMessage::assistant_body(body)
}

/// Session, backend and timeout bundled for callers that await each turn.
pub struct ChatController<B: ChatBackend + ?Sized> {
    session: ChatSession,
    backend: Arc<B>,
    timeout: Duration,
    locale: Locale,
}

impl<B: ChatBackend + ?Sized> ChatController<B> {
    pub fn new(backend: Arc<B>, timeout: Duration, locale: Locale) -> Self {
        Self {
            session: ChatSession::new(),
            backend,
            timeout,
            locale,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.session.messages()
    }

    pub fn clear(&mut self) {
        self.session.clear();
    }

    /// Returns `false` when the input was rejected.
    pub async fn send(&mut self, text: &str) -> bool {
        let Some(request) = self.session.begin(text) else {
            return false;
        };
        let replies = execute(self.backend.as_ref(), request, self.timeout, self.locale).await;
        self.session.complete(replies);
        true
    }
}
