//! sshgate: run commands and pull files on a remote host through the
//! system `ssh` client, with every outcome folded into a typed result.

pub mod catalog;
pub mod config;
pub mod sys;

pub use crate::catalog::{CommandAction, CommandCatalog, CommandDescriptor};
pub use crate::config::{ConfigError, GatewayConfig};
pub use crate::sys::credentials::{CredentialError, Credentials, materialize};
pub use crate::sys::gateway::SshGateway;
pub use crate::sys::invocation::{ConnectionProfile, Invocation, VerificationPolicy};
pub use crate::sys::results::{ArtifactResult, BinaryResult, ExecResult, FailureKind};
pub use crate::sys::runner::ProcessRunner;
pub use crate::sys::staging::Stager;
pub use crate::sys::traits::{CommandRunner, RemoteGateway, RunOutcome};
