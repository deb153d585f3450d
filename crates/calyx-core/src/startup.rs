//! Backend startup progress.
//!
//! While the backend boots it cannot answer anything, so failed polls are expected for a
//! while. Until the grace period runs out the tracker reports a synthetic `starting` phase
//! with linear progress.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{CalyxClient, StartupPhase, StartupProgress};
use crate::locale::Locale;

pub const STARTUP_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const STARTUP_GRACE: Duration = Duration::from_secs(30);
/// Failed polls tolerated before giving up, in addition to the grace period.
pub const MAX_FAILED_ATTEMPTS: u32 = 10;
const TOTAL_STEPS: u32 = 4;

#[derive(Debug)]
pub struct StartupTracker {
    failed_attempts: u32,
    locale: Locale,
}

impl StartupTracker {
    pub fn new(locale: Locale) -> Self {
        Self {
            failed_attempts: 0,
            locale,
        }
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn on_success(&mut self, progress: StartupProgress) -> StartupProgress {
        self.failed_attempts = 0;
        progress
    }

    /// Snapshot for a failed poll `elapsed` after tracking began.
    pub fn on_failure(&mut self, elapsed: Duration) -> StartupProgress {
        self.failed_attempts += 1;

        if elapsed > STARTUP_GRACE && self.failed_attempts > MAX_FAILED_ATTEMPTS {
            let (step, detail) = self.locale.startup_failed();
            return StartupProgress {
                status: StartupPhase::Error,
                progress_percentage: 0.0,
                current_step: step.to_string(),
                current_step_number: 1,
                total_steps: TOTAL_STEPS,
                error_message: Some(detail.to_string()),
            };
        }

        let ratio = elapsed.as_secs_f64() / STARTUP_GRACE.as_secs_f64();
        StartupProgress {
            status: StartupPhase::Starting,
            progress_percentage: (ratio * 100.0).min(100.0).round(),
            current_step: self.locale.startup_step(elapsed.as_secs()).to_string(),
            current_step_number: 1,
            total_steps: TOTAL_STEPS,
            error_message: None,
        }
    }
}

/// Owns the startup polling task. Polling ends once the backend reports `ready`; dropping the
/// watcher ends it early.
pub struct StartupWatcher {
    rx: watch::Receiver<Option<StartupProgress>>,
    task: JoinHandle<()>,
}

impl StartupWatcher {
    pub fn spawn(client: CalyxClient, locale: Locale) -> Self {
        let (tx, rx) = watch::channel(None);

        let task = tokio::spawn(async move {
            let started = Instant::now();
            let mut tracker = StartupTracker::new(locale);
            let mut interval = tokio::time::interval(STARTUP_POLL_INTERVAL);

            loop {
                interval.tick().await;
                let progress = match client.startup_progress().await {
                    Ok(progress) => tracker.on_success(progress),
                    Err(err) => {
                        debug!("startup progress unavailable: {}", err);
                        tracker.on_failure(started.elapsed())
                    }
                };

                let phase = progress.status;
                if phase == StartupPhase::Error && tracker.failed_attempts() == MAX_FAILED_ATTEMPTS + 1
                {
                    warn!("backend did not come up within {:?}", STARTUP_GRACE);
                }
                if tx.send(Some(progress)).is_err() {
                    break;
                }
                if phase == StartupPhase::Ready {
                    info!("backend ready after {:?}", started.elapsed());
                    break;
                }
            }
        });

        Self { rx, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<StartupProgress>> {
        self.rx.clone()
    }

    pub fn current(&self) -> Option<StartupProgress> {
        self.rx.borrow().clone()
    }
}

impl Drop for StartupWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
