//! Model readiness watcher.
//!
//! Polls the backend on an interval that depends on the last state seen and publishes
//! snapshots on a `watch` channel. A failed poll is just another snapshot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::{CalyxClient, ClientError, ModelState, ModelStatus};
use crate::locale::Locale;

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub state: ModelState,
    pub message: String,
    pub model_name: Option<String>,
    pub device: Option<String>,
    pub is_downloaded: Option<bool>,
    pub cache_size_mb: Option<f64>,
    pub cache_path: Option<String>,
    /// Known only once the model is ready
    pub progress_percentage: Option<f64>,
}

impl StatusSnapshot {
    pub fn checking() -> Self {
        Self {
            state: ModelState::Checking,
            message: String::new(),
            model_name: None,
            device: None,
            is_downloaded: None,
            cache_size_mb: None,
            cache_path: None,
            progress_percentage: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: ModelState::Error,
            message: message.into(),
            ..Self::checking()
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == ModelState::Ready
    }
}

impl From<ModelStatus> for StatusSnapshot {
    fn from(status: ModelStatus) -> Self {
        let state = match status.status {
            ModelState::Unknown if status.model_ready => ModelState::Ready,
            other => other,
        };
        Self {
            state,
            message: status.message,
            model_name: status.model_name,
            device: status.device,
            is_downloaded: status.is_downloaded,
            cache_size_mb: status.cache_size_mb,
            cache_path: status.cache_path,
            progress_percentage: (state == ModelState::Ready).then_some(100.0),
        }
    }
}

/// Poll slowly once ready, quickly while the model loads.
pub fn poll_interval(state: ModelState) -> Duration {
    match state {
        ModelState::Ready => Duration::from_secs(60),
        ModelState::Loading => Duration::from_secs(10),
        ModelState::Error => Duration::from_secs(15),
        ModelState::NotDownloaded => Duration::from_secs(30),
        ModelState::Checking | ModelState::Unknown => Duration::from_secs(20),
    }
}

/// One poll: liveness first, then the model status. Never fails.
pub async fn check_status(client: &CalyxClient, locale: Locale) -> StatusSnapshot {
    if let Err(err) = client.ping().await {
        debug!("ping failed: {}", err);
        return StatusSnapshot::error(locale.cannot_connect());
    }
    match client.model_status().await {
        Ok(status) => status.into(),
        Err(ClientError::Timeout) => StatusSnapshot::error(locale.timeout()),
        Err(err) => StatusSnapshot::error(err.to_string()),
    }
}

/// Owns the polling task; dropping it stops polling.
pub struct StatusWatcher {
    rx: watch::Receiver<StatusSnapshot>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

impl StatusWatcher {
    pub fn spawn(client: CalyxClient, locale: Locale) -> Self {
        let (tx, rx) = watch::channel(StatusSnapshot::checking());
        let refresh = Arc::new(Notify::new());
        let wake = refresh.clone();

        let task = tokio::spawn(async move {
            loop {
                let snapshot = check_status(&client, locale).await;
                let interval = poll_interval(snapshot.state);
                if tx.borrow().state != snapshot.state {
                    info!(state = ?snapshot.state, "model status changed");
                }
                if tx.send(snapshot).is_err() {
                    break;
                }
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = wake.notified() => {}
                }
            }
        });

        Self { rx, refresh, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.rx.clone()
    }

    pub fn current(&self) -> StatusSnapshot {
        self.rx.borrow().clone()
    }

    /// Poll now instead of waiting for the interval, e.g. after a model switch.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }
}

impl Drop for StatusWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_intervals() {
        assert_eq!(poll_interval(ModelState::Ready), Duration::from_secs(60));
        assert_eq!(poll_interval(ModelState::Loading), Duration::from_secs(10));
        assert_eq!(poll_interval(ModelState::Error), Duration::from_secs(15));
        assert_eq!(poll_interval(ModelState::NotDownloaded), Duration::from_secs(30));
        assert_eq!(poll_interval(ModelState::Unknown), Duration::from_secs(20));
        assert!(poll_interval(ModelState::Loading) < poll_interval(ModelState::Ready));
    }

    #[test]
    fn test_snapshot_from_status() {
        let status: ModelStatus = serde_json::from_str(
            r#"{"status": "ready", "message": "ok", "model_name": "deepseek", "device": "cuda"}"#,
        )
        .unwrap();
        let snapshot = StatusSnapshot::from(status);
        assert!(snapshot.is_ready());
        assert_eq!(snapshot.progress_percentage, Some(100.0));
        assert_eq!(snapshot.device.as_deref(), Some("cuda"));

        let status: ModelStatus =
            serde_json::from_str(r#"{"status": "loading", "message": "cargando"}"#).unwrap();
        let snapshot = StatusSnapshot::from(status);
        assert_eq!(snapshot.state, ModelState::Loading);
        assert_eq!(snapshot.progress_percentage, None);
    }

    #[test]
    fn test_unknown_status_with_ready_flag() {
        let status: ModelStatus =
            serde_json::from_str(r#"{"status": "Unknown", "ready": true}"#).unwrap();
        assert!(StatusSnapshot::from(status).is_ready());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error_snapshot() {
        let client = CalyxClient::new("http://127.0.0.1:9");
        let snapshot = check_status(&client, Locale::Es).await;
        assert_eq!(snapshot.state, ModelState::Error);
        assert_eq!(snapshot.message, Locale::Es.cannot_connect());
    }

    #[tokio::test]
    async fn test_watcher_publishes_and_stops_on_drop() {
        let watcher = StatusWatcher::spawn(CalyxClient::new("http://127.0.0.1:9"), Locale::Es);
        let mut rx = watcher.subscribe();
        assert_eq!(rx.borrow().state, ModelState::Checking);

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().state, ModelState::Error);

        drop(watcher);
        // The task is aborted, so the sender goes away and `changed` reports it
        assert!(rx.changed().await.is_err());
    }
}
