//! Reachability probe — a single ICMP echo via the system `ping`.
//!
//! Used only to annotate an offline alert. It never changes the alert
//! level and never suppresses an alert.

use std::future::Future;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

/// Result of a single reachability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The echo was answered.
    Reachable,
    /// The probe ran and got no answer.
    Unreachable,
    /// The probe could not be completed (tool missing, spawn error, timeout).
    Failed,
}

impl ProbeOutcome {
    pub fn is_reachable(self) -> bool {
        self == ProbeOutcome::Reachable
    }
}

/// Something that can check whether an address answers.
pub trait ReachabilityProbe: Send + Sync {
    fn probe(&self, address: &str) -> impl Future<Output = ProbeOutcome> + Send;
}

/// Probe backed by the OS `ping` command.
#[derive(Debug, Clone)]
pub struct PingProbe {
    program: String,
    timeout: Duration,
}

impl PingProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "ping".to_string(),
            timeout,
        }
    }

    /// Use a different executable (for testing).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, address: &str) -> Command {
        let count_flag = if cfg!(windows) { "-n" } else { "-c" };
        let mut cmd = Command::new(&self.program);
        cmd.args([count_flag, "1", address])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for PingProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl ReachabilityProbe for PingProbe {
    async fn probe(&self, address: &str) -> ProbeOutcome {
        let mut child = match self.command(address).spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(program = %self.program, %address, "ping command not found, cannot probe host");
                return ProbeOutcome::Failed;
            }
            Err(e) => {
                warn!(error = %e, %address, "failed to spawn ping");
                return ProbeOutcome::Failed;
            }
        };

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => ProbeOutcome::Reachable,
            Ok(Ok(status)) => {
                debug!(%address, code = ?status.code(), "ping got no reply");
                ProbeOutcome::Unreachable
            }
            Ok(Err(e)) => {
                warn!(error = %e, %address, "waiting for ping failed");
                ProbeOutcome::Failed
            }
            Err(_) => {
                let _ = child.start_kill();
                warn!(%address, timeout_ms = self.timeout.as_millis() as u64, "ping timed out");
                ProbeOutcome::Failed
            }
        }
    }
}
