//! Wire types for the local backend.
//!
//! The backend is an external collaborator whose payloads drifted between revisions, so
//! every field is optional or defaulted and unknown status strings never fail decoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::console_block::ConsoleBlock;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("backend returned status {0}")]
    Status(u16),
    #[error("{0}")]
    Backend(String),
    #[error("invalid response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub prompt: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SwitchModelRequest<'a> {
    pub model_key: &'a str,
}

/// Console payload as sent by the backend; any field may be missing or null.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsoleBlockPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

impl From<ConsoleBlockPayload> for ConsoleBlock {
    fn from(payload: ConsoleBlockPayload) -> Self {
        ConsoleBlock::new(
            payload.title.unwrap_or_default(),
            payload.input.unwrap_or_default(),
            payload.output.unwrap_or_default(),
        )
    }
}

/// `POST /chat` reply. Current backends send `message`/`thinking`/`console_block`, older ones
/// a bare `response`, and failures an `error`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub thinking: Option<String>,
    #[serde(default)]
    pub console_block: Option<ConsoleBlockPayload>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    Checking,
    NotDownloaded,
    Loading,
    Ready,
    Error,
    #[serde(other)]
    Unknown,
}

impl Default for ModelState {
    fn default() -> Self {
        ModelState::Unknown
    }
}

/// `GET /model/status`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelStatus {
    #[serde(default)]
    pub status: ModelState,
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "ready")]
    pub model_ready: bool,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub is_downloaded: Option<bool>,
    #[serde(default)]
    pub cache_size_mb: Option<f64>,
    #[serde(default)]
    pub cache_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupPhase {
    Starting,
    Dependencies,
    LoadingModel,
    Ready,
    Error,
}

impl StartupPhase {
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            StartupPhase::Starting | StartupPhase::Dependencies | StartupPhase::LoadingModel
        )
    }
}

/// `GET /backend/startup/progress`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StartupProgress {
    pub status: StartupPhase,
    #[serde(default)]
    pub progress_percentage: f64,
    #[serde(default)]
    pub current_step: String,
    #[serde(default)]
    pub current_step_number: u32,
    #[serde(default)]
    pub total_steps: u32,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// `GET /model/current`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentModel {
    #[serde(default)]
    pub key: String,
    /// Model key to human label
    #[serde(default)]
    pub available_models: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct VersionBody {
    #[serde(default)]
    pub version: String,
}

/// `GET /alimento`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FoodLookup {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub mensaje: Option<String>,
    /// Basic rows, usually `[{clave, valor}]`; older backends sent a flat object.
    #[serde(default)]
    pub filas: Option<serde_json::Value>,
    /// Complete info, `[{linea: "clave: valor"}]`.
    #[serde(default)]
    pub info_completa: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub sugerencias: Option<Vec<String>>,
}

impl FoodLookup {
    pub fn suggestions(&self) -> &[String] {
        self.sugerencias.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_reply_shapes() {
        let reply: ChatReply = serde_json::from_str(
            r#"{"message": "hola", "thinking": "pensando", "console_block": null}"#,
        )
        .unwrap();
        assert_eq!(reply.message.as_deref(), Some("hola"));
        assert!(reply.console_block.is_none());

        let reply: ChatReply = serde_json::from_str(r#"{"response": "legacy"}"#).unwrap();
        assert_eq!(reply.response.as_deref(), Some("legacy"));

        let reply: ChatReply = serde_json::from_str(
            r#"{"console_block": {"title": null, "input": "2+2", "output": "4"}}"#,
        )
        .unwrap();
        let block: ConsoleBlock = reply.console_block.unwrap().into();
        assert_eq!(block, ConsoleBlock::new("", "2+2", "4"));
    }

    #[test]
    fn test_model_status_accepts_both_ready_names() {
        let status: ModelStatus =
            serde_json::from_str(r#"{"status": "ready", "ready": true, "model_name": "m"}"#)
                .unwrap();
        assert_eq!(status.status, ModelState::Ready);
        assert!(status.model_ready);

        let status: ModelStatus =
            serde_json::from_str(r#"{"status": "Unknown", "model_ready": false}"#).unwrap();
        assert_eq!(status.status, ModelState::Unknown);
    }

    #[test]
    fn test_food_lookup_shapes() {
        let lookup: FoodLookup = serde_json::from_str(
            r#"{"filas": [{"clave": "energia", "valor": 52}], "sugerencias": ["manzana roja"]}"#,
        )
        .unwrap();
        let filas = lookup.filas.as_ref().unwrap();
        assert_eq!(filas[0]["clave"], "energia");
        assert_eq!(filas[0]["valor"], serde_json::json!(52));
        assert_eq!(lookup.suggestions(), ["manzana roja".to_string()]);
    }
}
