use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{
    ChatReply, ChatRequest, ClientError, CurrentModel, ErrorBody, FoodLookup, ModelStatus,
    StartupProgress, SwitchModelRequest, VersionBody,
};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

const PING_TIMEOUT: Duration = Duration::from_secs(3);
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);
const SHORT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the local Calyx backend.
///
/// Chat and food requests carry no timeout of their own; the chat controller aborts them.
#[derive(Clone)]
pub struct CalyxClient {
    client: Client,
    base_url: String,
}

impl CalyxClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        let url = format!("{}/ping", self.base_url);
        let response = self.client.get(&url).timeout(PING_TIMEOUT).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }
        Ok(())
    }

    pub async fn model_status(&self) -> Result<ModelStatus, ClientError> {
        let url = format!("{}/model/status", self.base_url);
        let response = self.client.get(&url).timeout(STATUS_TIMEOUT).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }

    pub async fn startup_progress(&self) -> Result<StartupProgress, ClientError> {
        let url = format!("{}/backend/startup/progress", self.base_url);
        let response = self.client.get(&url).timeout(SHORT_TIMEOUT).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }

    pub async fn current_model(&self) -> Result<CurrentModel, ClientError> {
        let url = format!("{}/model/current", self.base_url);
        let response = self.client.get(&url).timeout(SHORT_TIMEOUT).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;
        if let Ok(ErrorBody { error: Some(error) }) = serde_json::from_str(&body) {
            return Err(ClientError::Backend(error));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Switching reloads the model, which can take a while; no client-side timeout.
    pub async fn switch_model(&self, model_key: &str) -> Result<(), ClientError> {
        let url = format!("{}/model/switch", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SwitchModelRequest { model_key })
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status().as_u16();
        let body: ErrorBody = response.json().await.unwrap_or_default();
        Err(body
            .error
            .map(ClientError::Backend)
            .unwrap_or(ClientError::Status(status)))
    }

    /// `GET /alimento`. Error statuses still carry a JSON `{error}` body, so the body is
    /// decoded whatever the status.
    pub async fn lookup_food(&self, query: &str) -> Result<FoodLookup, ClientError> {
        let url = format!("{}/alimento", self.base_url);
        debug!(query, "food lookup");
        let response = self.client.get(&url).query(&[("nombre", query)]).send().await?;
        read_json(response).await
    }

    pub async fn chat(&self, prompt: &str) -> Result<ChatReply, ClientError> {
        let url = format!("{}/chat", self.base_url);
        debug!(prompt_len = prompt.len(), "chat request");
        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { prompt })
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn version(&self) -> Result<String, ClientError> {
        let url = format!("{}/version", self.base_url);
        let response = self.client.get(&url).timeout(SHORT_TIMEOUT).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }
        let body: VersionBody = response.json().await?;
        Ok(body.version)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    match serde_json::from_str::<T>(&body) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(ClientError::Status(status.as_u16())),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = CalyxClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(CalyxClient::new(DEFAULT_API_URL).base_url(), DEFAULT_API_URL);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_a_connection_error() {
        // Port 9 (discard) is not expected to have an HTTP server
        let client = CalyxClient::new("http://127.0.0.1:9");
        match client.ping().await {
            Err(ClientError::Connection(_)) | Err(ClientError::Timeout) => {}
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
