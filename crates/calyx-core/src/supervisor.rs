//! Companion backend process.
//!
//! Starts the backend with piped output, forwards every line into the log and reaps the
//! child on shutdown.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::config::BackendLaunch;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct BackendSupervisor {
    pid: u32,
    child: Child,
}

impl BackendSupervisor {
    pub fn spawn(launch: &BackendLaunch) -> Result<Self> {
        let mut command = Command::new(&launch.program);
        command
            .args(&launch.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &launch.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to start backend `{}`", launch.program))?;
        let pid = child
            .id()
            .context("backend exited before its pid could be read")?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, false));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, true));
        }

        info!(pid, program = %launch.program, "backend started");
        Ok(Self { pid, child })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// `Some` once the backend has exited on its own.
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                warn!(pid = self.pid, %status, "backend exited");
                Some(status)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(pid = self.pid, "could not query backend status: {}", err);
                None
            }
        }
    }

    /// Kill the backend and wait for it to be reaped.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Err(err) = self.child.kill().await {
            if self.is_running() {
                return Err(anyhow::anyhow!("failed to kill backend: {}", err));
            }
        }

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.child.wait()).await {
            Ok(Ok(_)) => info!(pid = self.pid, "backend stopped"),
            Ok(Err(err)) => warn!("error waiting for backend {}: {:?}", self.pid, err),
            Err(_) => warn!("timeout waiting for backend {} to exit", self.pid),
        }
        Ok(())
    }
}

async fn forward_lines<R>(reader: R, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if is_stderr => warn!(target: "backend", "{}", line),
            Ok(Some(line)) => info!(target: "backend", "{}", line),
            Ok(None) => break,
            Err(err) => {
                warn!(target: "backend", "output stream closed: {}", err);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launch(program: &str, args: &[&str]) -> BackendLaunch {
        BackendLaunch {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            working_dir: None,
        }
    }

    #[tokio::test]
    async fn test_spawn_and_shutdown() {
        let mut supervisor = BackendSupervisor::spawn(&launch("sleep", &["30"])).unwrap();
        assert!(supervisor.pid() > 0);
        assert!(supervisor.is_running());
        assert!(supervisor.exit_status().is_none());
        supervisor.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unexpected_exit_is_reported() {
        let mut supervisor = BackendSupervisor::spawn(&launch("sh", &["-c", "echo up; exit 3"])).unwrap();

        let mut status = None;
        for _ in 0..50 {
            status = supervisor.exit_status();
            if status.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(status.and_then(|s| s.code()), Some(3));
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_spawn() {
        let err = BackendSupervisor::spawn(&launch("calyx-backend-that-does-not-exist", &[]))
            .unwrap_err();
        assert!(err.to_string().contains("failed to start backend"));
    }
}
