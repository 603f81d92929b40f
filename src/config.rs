// src/config.rs

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::sys::credentials::{self, CredentialError};
use crate::sys::invocation::{ConnectionProfile, DEFAULT_CLIENT};

const DEFAULT_HOST: &str = "host.docker.internal";
const DEFAULT_PORT: u16 = 22;
const DEFAULT_USER: &str = "root";
const DEFAULT_TIMEOUT_SECS: u64 = 25;
const DEFAULT_CATALOG_PATH: &str = "./config.json";

/// Optional dotenv file, read from the working directory.
pub const DOTENV_FILE: &str = ".env";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SSH_KEY_BASE64 is required (base64 of the private key)")]
    MissingKey,

    #[error("no writable runtime directory (last tried {}): {source}", path.display())]
    RuntimeDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct GatewayConfig {
    // 🛡️ Endpoint & Identity
    pub host: String,
    pub port: u16,
    pub user: String,
    pub timeout: Duration,
    pub client: String,
    pub key_base64: SecretString,
    pub known_hosts_line: Option<String>,

    // 📂 Local paths
    pub runtime_dir: PathBuf,
    pub catalog_path: PathBuf,
}

// ==============================================================================
// 1. Variable Sources
// ==============================================================================

/// Reads `KEY=value` pairs from a dotenv file without touching the process
/// environment. A missing file yields no variables.
pub fn read_dotenv(path: &Path) -> HashMap<String, String> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(dotenvy::Error::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            return HashMap::new();
        }
        Err(err) => {
            warn!("failed to load environment file {}: {}", path.display(), err);
            return HashMap::new();
        }
    };

    let mut vars = HashMap::new();
    for item in iter {
        match item {
            Ok((key, value)) => {
                vars.insert(key, value);
            }
            Err(err) => {
                warn!("stopped reading {} at a bad line: {}", path.display(), err);
                break;
            }
        }
    }
    info!("loaded environment file {} ({} vars)", path.display(), vars.len());
    vars
}

/// `lookup` first; `file_vars` only fills in what it lacks. A variable set
/// to an empty string still counts as set.
pub fn layered<'a, F>(
    lookup: F,
    file_vars: &'a HashMap<String, String>,
) -> impl Fn(&str) -> Option<String> + 'a
where
    F: Fn(&str) -> Option<String> + 'a,
{
    move |key: &str| lookup(key).or_else(|| file_vars.get(key).cloned())
}

/// Catalog location. Needs nothing else, so listing works without a key.
pub fn catalog_path<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup("CONFIG_PATH")
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH))
}

// ==============================================================================
// 2. Gateway Settings
// ==============================================================================

impl GatewayConfig {
    /// Reads the process environment over `./.env`.
    pub fn load() -> Result<Self, ConfigError> {
        let file_vars = read_dotenv(Path::new(DOTENV_FILE));
        Self::load_from(layered(|key| env::var(key).ok(), &file_vars))
    }

    /// Same as `load`, with variables supplied by `lookup`.
    pub fn load_from<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // 🛡️ No key, no remote execution: refuse to start.
        let key_base64 = non_empty("SSH_KEY_BASE64").ok_or(ConfigError::MissingKey)?;

        // Unparsable numbers fall back to defaults rather than aborting.
        let port = non_empty("SSH_PORT")
            .and_then(|v| v.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let timeout_secs = non_empty("SSH_TIMEOUT_SEC")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let runtime_dir = choose_runtime_dir(
            non_empty("RUNTIME_DIR").map(PathBuf::from),
            non_empty("HOME").map(PathBuf::from),
        )?;

        Ok(Self {
            host: non_empty("SSH_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            user: non_empty("SSH_USER").unwrap_or_else(|| DEFAULT_USER.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            client: non_empty("SSH_BINARY").unwrap_or_else(|| DEFAULT_CLIENT.to_string()),
            key_base64: SecretString::new(key_base64),
            known_hosts_line: non_empty("SSH_KNOWN_HOSTS_LINE"),
            runtime_dir,
            catalog_path: catalog_path(&lookup),
        })
    }

    /// Writes credentials into the runtime directory and assembles the
    /// profile every invocation will share.
    pub fn connection_profile(&self) -> Result<ConnectionProfile, CredentialError> {
        let creds = credentials::materialize(
            self.key_base64.expose_secret(),
            self.known_hosts_line.as_deref(),
            &self.runtime_dir,
        )?;

        Ok(ConnectionProfile {
            client: self.client.clone(),
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            timeout: self.timeout,
            key_path: creds.key_path,
            verification: creds.verification,
        })
    }
}

/// `$RUNTIME_DIR`, else `./runtime`, else `$HOME/.sshgate/runtime`.
/// The winner is created before it is returned.
fn choose_runtime_dir(
    explicit: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    let create = |path: &Path| {
        fs::create_dir_all(path).map_err(|source| ConfigError::RuntimeDir {
            path: path.to_path_buf(),
            source,
        })
    };

    if let Some(dir) = explicit {
        create(&dir)?;
        return Ok(dir);
    }

    let local = PathBuf::from("./runtime");
    let local_err = match create(&local) {
        Ok(()) => return Ok(local),
        Err(e) => e,
    };

    match home {
        Some(home) => {
            let dir = home.join(".sshgate").join("runtime");
            create(&dir)?;
            Ok(dir)
        }
        None => Err(local_err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_key_refuses_to_load() {
        let env = vars(&[("SSH_HOST", "example.org")]);
        let err = GatewayConfig::load_from(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey));
    }

    #[test]
    fn defaults_and_fallbacks() {
        let rt = TempDir::new().unwrap();
        let rt_path = rt.path().display().to_string();
        let env = vars(&[
            ("SSH_KEY_BASE64", "a2V5"),
            ("SSH_PORT", "not-a-port"),
            ("SSH_TIMEOUT_SEC", ""),
            ("RUNTIME_DIR", rt_path.as_str()),
        ]);
        let cfg = GatewayConfig::load_from(|k| env.get(k).cloned()).unwrap();

        assert_eq!(cfg.host, "host.docker.internal");
        assert_eq!(cfg.port, 22);
        assert_eq!(cfg.user, "root");
        assert_eq!(cfg.timeout, Duration::from_secs(25));
        assert_eq!(cfg.client, "ssh");
        assert_eq!(cfg.runtime_dir, rt.path());
        assert!(cfg.known_hosts_line.is_none());
        assert!(!format!("{:?}", cfg).contains("a2V5"));
    }

    #[test]
    fn dotenv_fills_gaps_but_never_overrides() {
        let dir = TempDir::new().unwrap();
        let rt = dir.path().join("rt");
        let dotenv = dir.path().join(".env");
        fs::write(
            &dotenv,
            format!(
                "# deployment defaults\nSSH_HOST=from-file\nSSH_USER=deploy\nSSH_KEY_BASE64=a2V5\nSSH_PORT=2222\nRUNTIME_DIR=\"{}\"\n",
                rt.display()
            ),
        )
        .unwrap();

        let file_vars = read_dotenv(&dotenv);
        assert_eq!(file_vars.get("SSH_USER").map(String::as_str), Some("deploy"));

        let env = vars(&[("SSH_HOST", "from-env"), ("SSH_PORT", "")]);
        let cfg = GatewayConfig::load_from(layered(|k| env.get(k).cloned(), &file_vars)).unwrap();

        assert_eq!(cfg.host, "from-env");
        assert_eq!(cfg.user, "deploy");
        // set-but-empty still shadows the file, then falls back to the default
        assert_eq!(cfg.port, 22);
        assert_eq!(cfg.runtime_dir, rt);
        assert!(rt.is_dir());
    }

    #[test]
    fn missing_dotenv_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(read_dotenv(&dir.path().join(".env")).is_empty());
    }

    #[test]
    fn catalog_path_needs_no_key() {
        let none = vars(&[]);
        assert_eq!(catalog_path(|k| none.get(k).cloned()), PathBuf::from("./config.json"));

        let env = vars(&[("CONFIG_PATH", "/etc/sshgate/menu.json")]);
        assert_eq!(
            catalog_path(|k| env.get(k).cloned()),
            PathBuf::from("/etc/sshgate/menu.json")
        );
    }

    #[test]
    fn explicit_runtime_dir_is_created() {
        let base = TempDir::new().unwrap();
        let wanted = base.path().join("nested").join("rt");
        let got = choose_runtime_dir(Some(wanted.clone()), None).unwrap();
        assert_eq!(got, wanted);
        assert!(wanted.is_dir());
    }

    #[test]
    fn profile_reflects_pinning() {
        let rt = TempDir::new().unwrap();
        let rt_path = rt.path().display().to_string();
        let env = vars(&[
            ("SSH_KEY_BASE64", "a2V5"),
            ("SSH_HOST", "10.1.2.3"),
            ("SSH_PORT", "2200"),
            ("SSH_USER", "ops"),
            ("SSH_TIMEOUT_SEC", "5"),
            ("SSH_KNOWN_HOSTS_LINE", "10.1.2.3 ssh-ed25519 AAAAC3Nza"),
            ("RUNTIME_DIR", rt_path.as_str()),
        ]);
        let cfg = GatewayConfig::load_from(|k| env.get(k).cloned()).unwrap();
        let profile = cfg.connection_profile().unwrap();

        assert_eq!(profile.target(), "ops@10.1.2.3");
        assert_eq!(profile.port, 2200);
        assert_eq!(profile.timeout, Duration::from_secs(5));
        assert_eq!(
            profile.known_hosts_path(),
            Some(rt.path().join("known_hosts").as_path())
        );
        assert_eq!(profile.verification.strict_mode(), "yes");
    }
}
