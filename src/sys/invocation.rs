// src/sys/invocation.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

// ==============================================================================
// 1. Connection Profile
// ==============================================================================

pub const DEFAULT_CLIENT: &str = "ssh";

/// How the client treats the remote host key.
///
/// The pinned variant owns the known-hosts path, so a profile can never
/// claim to be pinned without a file to pin against (or the reverse).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationPolicy {
    /// Accept and remember an unseen key, fail on a later mismatch.
    TrustOnFirstUse,
    Pinned { known_hosts: PathBuf },
}

impl VerificationPolicy {
    /// Value for ssh's `StrictHostKeyChecking` option.
    pub fn strict_mode(&self) -> &'static str {
        match self {
            VerificationPolicy::TrustOnFirstUse => "accept-new",
            VerificationPolicy::Pinned { .. } => "yes",
        }
    }

    pub fn known_hosts_path(&self) -> Option<&Path> {
        match self {
            VerificationPolicy::TrustOnFirstUse => None,
            VerificationPolicy::Pinned { known_hosts } => Some(known_hosts),
        }
    }
}

/// Everything needed to reach the remote host. Built once at startup and
/// shared read-only by every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub client: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub timeout: Duration,
    pub key_path: PathBuf,
    pub verification: VerificationPolicy,
}

impl ConnectionProfile {
    pub fn known_hosts_path(&self) -> Option<&Path> {
        self.verification.known_hosts_path()
    }

    pub fn target(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

// ==============================================================================
// 2. Invocation Builder
// ==============================================================================

/// A fully resolved client command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }
}

/// Builds the client argument vector for `remote_command`.
///
/// The remote command is always the single last argument. It is never
/// tokenized here; ssh hands it to the remote login shell as-is.
pub fn build(profile: &ConnectionProfile, remote_command: &str) -> Invocation {
    let mut args = vec![
        "-i".to_string(),
        profile.key_path.display().to_string(),
        "-p".to_string(),
        profile.port.to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        format!("StrictHostKeyChecking={}", profile.verification.strict_mode()),
    ];

    if let Some(known_hosts) = profile.known_hosts_path() {
        args.push("-o".to_string());
        args.push(format!("UserKnownHostsFile={}", known_hosts.display()));
    }

    args.push(profile.target());
    args.push("--".to_string());
    args.push(remote_command.to_string());

    Invocation {
        program: profile.client.clone(),
        args,
    }
}
