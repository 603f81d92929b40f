// src/sys/results.rs

use std::fmt;

// ==============================================================================
// 1. Sentinel Codes & Failure Kinds
// ==============================================================================

/// Exit code reported when the local deadline fires before ssh returns.
pub const EXIT_TIMEOUT: i32 = 124;
/// Exit code reported when the client process cannot be started at all.
pub const EXIT_SPAWN_FAILURE: i32 = 1;
/// Exit code the artifact locator script uses when nothing qualifies.
pub const EXIT_NOT_FOUND: i32 = 2;

pub const TIMEOUT_MESSAGE: &str = "Timeout";

/// Why an operation did not complete as intended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    SpawnFailure,
    RemoteNonzero,
    NotFound,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::SpawnFailure => "spawn failure",
            FailureKind::RemoteNonzero => "remote nonzero exit",
            FailureKind::NotFound => "not found",
        };
        f.write_str(label)
    }
}

// ==============================================================================
// 2. Result Values
// ==============================================================================

/// Text outcome of a plain remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    pub exit_code: i32,
    pub output: String,
    pub failure: Option<FailureKind>,
}

impl ExecResult {
    /// Picks stdout when it carries anything, otherwise stderr.
    pub fn completed(exit_code: i32, stdout: &[u8], stderr: &[u8]) -> Self {
        let output = if !stdout.is_empty() {
            String::from_utf8_lossy(stdout).into_owned()
        } else {
            String::from_utf8_lossy(stderr).into_owned()
        };

        Self {
            exit_code,
            output,
            failure: (exit_code != 0).then_some(FailureKind::RemoteNonzero),
        }
    }

    pub fn timed_out() -> Self {
        Self {
            exit_code: EXIT_TIMEOUT,
            output: TIMEOUT_MESSAGE.to_string(),
            failure: Some(FailureKind::Timeout),
        }
    }

    pub fn spawn_failed(diagnostic: &str) -> Self {
        Self {
            exit_code: EXIT_SPAWN_FAILURE,
            output: format!("Error: {}", diagnostic),
            failure: Some(FailureKind::SpawnFailure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Raw-byte outcome of an archive transfer.
///
/// A nonzero `exit_code` together with a non-empty payload is a usable
/// archive: tar warned on stderr (e.g. "file changed as we read it") but
/// still wrote a complete stream. In that case `failure` is `None` and the
/// side-channel text is kept in `warnings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryResult {
    pub exit_code: i32,
    pub payload: Vec<u8>,
    pub warnings: Option<String>,
    pub failure: Option<FailureKind>,
}

impl BinaryResult {
    pub fn timed_out() -> Self {
        Self {
            exit_code: EXIT_TIMEOUT,
            payload: TIMEOUT_MESSAGE.as_bytes().to_vec(),
            warnings: None,
            failure: Some(FailureKind::Timeout),
        }
    }

    pub fn spawn_failed(diagnostic: &str) -> Self {
        Self {
            exit_code: EXIT_SPAWN_FAILURE,
            payload: format!("Error: {}", diagnostic).into_bytes(),
            warnings: None,
            failure: Some(FailureKind::SpawnFailure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Lossy text view of the payload, for diagnostics on failure.
    pub fn diagnostic(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Outcome of locating and streaming one remote artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactResult {
    pub exit_code: i32,
    pub payload: Vec<u8>,
    /// Present only when `exit_code == 0`.
    pub filename: Option<String>,
    pub failure: Option<FailureKind>,
}

impl ArtifactResult {
    pub fn timed_out() -> Self {
        Self {
            exit_code: EXIT_TIMEOUT,
            payload: TIMEOUT_MESSAGE.as_bytes().to_vec(),
            filename: None,
            failure: Some(FailureKind::Timeout),
        }
    }

    pub fn spawn_failed(diagnostic: &str) -> Self {
        Self {
            exit_code: EXIT_SPAWN_FAILURE,
            payload: format!("Error: {}", diagnostic).into_bytes(),
            filename: None,
            failure: Some(FailureKind::SpawnFailure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn diagnostic(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}
