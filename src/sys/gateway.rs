// src/sys/gateway.rs

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::sys::invocation::{self, ConnectionProfile};
use crate::sys::results::{
    ArtifactResult, BinaryResult, EXIT_NOT_FOUND, EXIT_SPAWN_FAILURE, ExecResult, FailureKind,
};
use crate::sys::runner::ProcessRunner;
use crate::sys::scripts;
use crate::sys::traits::{CommandRunner, RemoteGateway, RunOutcome};

/// The remote-command gateway. Cheap to clone; every clone shares the same
/// read-only profile and runner, and every call is an independent ssh run.
#[derive(Clone)]
pub struct SshGateway {
    profile: Arc<ConnectionProfile>,
    runner: Arc<dyn CommandRunner>,
}

impl SshGateway {
    pub fn new(profile: ConnectionProfile) -> Self {
        Self::with_runner(profile, Arc::new(ProcessRunner))
    }

    /// Injects the process layer; tests swap in a recording fake.
    pub fn with_runner(profile: ConnectionProfile, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            profile: Arc::new(profile),
            runner,
        }
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    async fn run_remote(&self, remote_command: &str) -> RunOutcome {
        let invocation = invocation::build(&self.profile, remote_command);
        self.runner
            .run(&invocation, None, self.profile.timeout)
            .await
    }

    /// Reads the remote clock (`date +%s`).
    pub async fn remote_epoch(&self) -> Result<i64, ExecResult> {
        let res = self.execute(scripts::REMOTE_EPOCH_COMMAND).await;
        if !res.is_success() {
            return Err(res);
        }

        res.output.trim().parse::<i64>().map_err(|_| ExecResult {
            exit_code: EXIT_SPAWN_FAILURE,
            output: format!("Error: unexpected remote clock output {:?}", res.output.trim()),
            failure: Some(FailureKind::RemoteNonzero),
        })
    }

    /// Runs `command` and then collects the artifact it produced.
    ///
    /// The remote clock is read right before the trigger, and the fetch only
    /// accepts files modified at or after that instant, so a stale file from
    /// an earlier run matching the same glob is never returned.
    pub async fn trigger_and_fetch(
        &self,
        command: &str,
        glob: &str,
    ) -> (ExecResult, Option<ArtifactResult>) {
        let since = match self.remote_epoch().await {
            Ok(epoch) => epoch,
            Err(failed) => {
                warn!("Remote clock unavailable, not triggering: {}", failed.output);
                return (failed, None);
            }
        };

        let triggered = self.execute(command).await;
        if !triggered.is_success() {
            return (triggered, None);
        }

        let artifact = self.fetch(glob, Some(since)).await;
        (triggered, Some(artifact))
    }
}

fn archive_result(outcome: RunOutcome) -> BinaryResult {
    match outcome {
        RunOutcome::Completed {
            exit_code,
            stdout,
            stderr,
        } => {
            if !stdout.is_empty() {
                // tar may warn and exit nonzero while the stream is complete
                let warnings = (exit_code != 0).then(|| String::from_utf8_lossy(&stderr).into_owned());
                if let Some(text) = &warnings {
                    warn!("Archive finished with exit {} and warnings: {}", exit_code, text.trim());
                }
                return BinaryResult {
                    exit_code,
                    payload: stdout,
                    warnings,
                    failure: None,
                };
            }

            // No bytes is a failure even if tar claimed success.
            let exit_code = if exit_code == 0 { EXIT_SPAWN_FAILURE } else { exit_code };
            let payload = if stderr.is_empty() {
                b"Error: archive stream was empty".to_vec()
            } else {
                stderr
            };
            BinaryResult {
                exit_code,
                payload,
                warnings: None,
                failure: Some(FailureKind::RemoteNonzero),
            }
        }
        RunOutcome::TimedOut => BinaryResult::timed_out(),
        RunOutcome::SpawnFailed(diag) => BinaryResult::spawn_failed(&diag),
    }
}

fn artifact_result(outcome: RunOutcome) -> ArtifactResult {
    match outcome {
        RunOutcome::Completed {
            exit_code: 0,
            stdout,
            stderr,
        } => ArtifactResult {
            exit_code: 0,
            payload: stdout,
            filename: scripts::announced_filename(&stderr),
            failure: None,
        },
        RunOutcome::Completed {
            exit_code,
            stdout,
            stderr,
        } => ArtifactResult {
            exit_code,
            payload: if stderr.is_empty() { stdout } else { stderr },
            filename: None,
            failure: Some(if exit_code == EXIT_NOT_FOUND {
                FailureKind::NotFound
            } else {
                FailureKind::RemoteNonzero
            }),
        },
        RunOutcome::TimedOut => ArtifactResult::timed_out(),
        RunOutcome::SpawnFailed(diag) => ArtifactResult::spawn_failed(&diag),
    }
}

#[async_trait]
impl RemoteGateway for SshGateway {
    async fn execute(&self, command: &str) -> ExecResult {
        info!("▶️ exec on {}", self.profile.target());
        match self.run_remote(command).await {
            RunOutcome::Completed {
                exit_code,
                stdout,
                stderr,
            } => ExecResult::completed(exit_code, &stdout, &stderr),
            RunOutcome::TimedOut => ExecResult::timed_out(),
            RunOutcome::SpawnFailed(diag) => ExecResult::spawn_failed(&diag),
        }
    }

    async fn archive(&self, directory: &str) -> BinaryResult {
        info!("🗜️ archive {} from {}", directory, self.profile.target());
        let command = scripts::archive_command(directory);
        archive_result(self.run_remote(&command).await)
    }

    async fn fetch(&self, glob: &str, since_epoch: Option<i64>) -> ArtifactResult {
        match since_epoch {
            Some(since) => {
                let when = chrono::DateTime::from_timestamp(since, 0)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| since.to_string());
                info!("📥 fetch {} (modified since {})", glob, when);
            }
            None => info!("📥 fetch newest {}", glob),
        }

        let script = scripts::locate_script(glob, since_epoch);
        let res = artifact_result(self.run_remote(&script).await);

        if let Some(name) = &res.filename {
            info!("Resolved {} to {} ({} bytes)", glob, name, res.payload.len());
        }
        res
    }
}

// ==============================================================================
// 🛡️ Unit Tests: Outcome Mapping & Wiring
// ==============================================================================
