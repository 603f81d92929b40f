// src/sys/runner.rs

use async_trait::async_trait;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::sys::invocation::Invocation;
use crate::sys::traits::{CommandRunner, RunOutcome};

// ==============================================================================
// 1. Process Helpers
// ==============================================================================

/// Runs invocations as real child processes.
///
/// Each child leads its own process group. On timeout the whole group gets
/// SIGKILL and the child is reaped before `run` returns, so nothing the
/// client started outlives the call.
pub struct ProcessRunner;

/// Signal deaths map to the shell convention of 128 + signal number.
fn exit_code_of(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

fn kill_group(pid: Option<u32>) {
    let Some(pid) = pid else { return };
    let Ok(raw) = i32::try_from(pid) else { return };
    // ESRCH just means the group is already gone.
    if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        debug!("killpg({}) returned {}", raw, e);
    }
}

// ==============================================================================
// 2. Concrete Implementation (tokio::process)
// ==============================================================================

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        stdin: Option<&[u8]>,
        limit: Duration,
    ) -> RunOutcome {
        info!(
            "🚀 Spawning {} ({} args, limit {}s)",
            invocation.program,
            invocation.args.len(),
            limit.as_secs()
        );
        debug!(argv = ?invocation.argv(), "full invocation");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn {}: {}", invocation.program, e);
                return RunOutcome::SpawnFailed(e.to_string());
            }
        };

        let pid = child.id();
        let deadline = Instant::now() + limit;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            let input = input.to_vec();
            tokio::spawn(async move {
                let _ = pipe.write_all(&input).await;
                // dropping `pipe` closes the child's stdin
            });
        }

        let stdout_task = tokio::spawn(drain(child.stdout.take()));
        let stderr_task = tokio::spawn(drain(child.stderr.take()));

        // 🛡️ Waiting and draining share one deadline: a grandchild holding a
        // pipe open must not stretch the call past the limit.
        let collected = timeout_at(deadline, async {
            let status = child.wait().await;
            let stdout = stdout_task.await.unwrap_or_default();
            let stderr = stderr_task.await.unwrap_or_default();
            (status, stdout, stderr)
        })
        .await;

        match collected {
            Ok((Ok(status), stdout, stderr)) => {
                let exit_code = exit_code_of(status);
                debug!(
                    "{} exited with {} ({} stdout bytes, {} stderr bytes)",
                    invocation.program,
                    exit_code,
                    stdout.len(),
                    stderr.len()
                );
                RunOutcome::Completed {
                    exit_code,
                    stdout,
                    stderr,
                }
            }
            Ok((Err(e), _, _)) => {
                kill_group(pid);
                RunOutcome::SpawnFailed(format!("failed to wait for {}: {}", invocation.program, e))
            }
            Err(_) => {
                warn!(
                    "⏱️ {} exceeded {}s, killing process group",
                    invocation.program,
                    limit.as_secs()
                );
                kill_group(pid);
                let _ = child.kill().await;
                RunOutcome::TimedOut
            }
        }
    }
}
