// src/sys/traits.rs

use async_trait::async_trait;
use std::time::Duration;

use crate::sys::invocation::Invocation;
use crate::sys::results::{ArtifactResult, BinaryResult, ExecResult};

// ==============================================================================
// 1. Process Primitive (Process-as-RPC)
// ==============================================================================

/// What happened to one child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed {
        exit_code: i32,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    /// The deadline fired; the process group has already been killed and reaped.
    TimedOut,
    /// The process never started.
    SpawnFailed(String),
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `invocation` to completion or until `limit` elapses.
    /// Never returns an error: every failure is folded into the outcome.
    async fn run(
        &self,
        invocation: &Invocation,
        stdin: Option<&[u8]>,
        limit: Duration,
    ) -> RunOutcome;
}

// ==============================================================================
// 2. Gateway Contract (what front-ends call)
// ==============================================================================

#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Runs `command` through the remote login shell.
    async fn execute(&self, command: &str) -> ExecResult;

    /// Streams `directory` back as a gzip-compressed tar.
    async fn archive(&self, directory: &str) -> BinaryResult;

    /// Resolves `glob` to its newest match (optionally no older than
    /// `since_epoch`) and streams that file back.
    async fn fetch(&self, glob: &str, since_epoch: Option<i64>) -> ArtifactResult;
}
