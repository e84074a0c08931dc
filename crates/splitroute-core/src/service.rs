//! Tunnel service driven by external commands.

use crate::config::ServiceConfig;
use crate::coordinator::ServiceControl;
use crate::{Error, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// [`ServiceControl`] that runs the configured argv commands.
///
/// The status command exits 0 while the service is running and non-zero
/// otherwise. Without a status command the service always reads as inactive,
/// so teardown never stops or starts anything.
#[derive(Debug, Clone)]
pub struct CommandService {
    status: Option<Vec<String>>,
    start: Option<Vec<String>>,
    stop: Option<Vec<String>>,
    timeout: Duration,
}

impl CommandService {
    #[must_use]
    pub fn new(config: &ServiceConfig, timeout: Duration) -> Self {
        Self {
            status: config.status_command.clone(),
            start: config.start_command.clone(),
            stop: config.stop_command.clone(),
            timeout,
        }
    }

    async fn run(&self, name: &str, argv: &[String]) -> Result<std::process::Output> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::Service(format!("Empty {name} command")))?;

        debug!("Running {name} command: {}", argv.join(" "));
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| Error::Timeout(format!("{name} command")))?
            .map_err(|e| Error::Service(format!("Failed to run {program}: {e}")))
    }

    async fn run_checked(&self, name: &str, argv: Option<&[String]>) -> Result<()> {
        let Some(argv) = argv else {
            debug!("No {name} command configured");
            return Ok(());
        };

        let output = self.run(name, argv).await?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::Service(format!(
                "{name} command exited with {}: {}",
                output.status,
                stderr.trim()
            )))
        }
    }
}

impl ServiceControl for CommandService {
    async fn is_active(&self) -> Result<bool> {
        let Some(argv) = &self.status else {
            debug!("No status command configured, treating service as inactive");
            return Ok(false);
        };
        let output = self.run("status", argv).await?;
        Ok(output.status.success())
    }

    async fn stop(&self) -> Result<()> {
        self.run_checked("stop", self.stop.as_deref()).await
    }

    async fn start(&self) -> Result<()> {
        self.run_checked("start", self.start.as_deref()).await
    }
}
