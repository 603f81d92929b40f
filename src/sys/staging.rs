// src/sys/staging.rs

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder;
use tokio::fs;
use tracing::info;

// ==============================================================================
// 1. Download Landing Zone
// ==============================================================================

pub const DOWNLOADS_DIR: &str = "downloads";
const FALLBACK_NAME: &str = "artifact";

/// Lands downloaded payloads under `<runtime>/downloads`.
pub struct Stager {
    dir: PathBuf,
}

/// Reduces a remote path to a local basename that cannot escape the
/// staging directory or hide itself as a dotfile.
pub fn sanitize_basename(remote: &str) -> String {
    let base = remote.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .trim_start_matches('.')
        .chars()
        .filter(|c| !c.is_control())
        .collect();

    if cleaned.trim().is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

impl Stager {
    pub fn new(runtime_dir: &Path) -> Self {
        Self {
            dir: runtime_dir.join(DOWNLOADS_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `payload` as `<downloads>/<basename of name>`, replacing any
    /// previous file of that name. Readers never see a half-written file.
    pub async fn stage(&self, name: &str, payload: Vec<u8>) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;

        let target = self.dir.join(sanitize_basename(name));
        let dir = self.dir.clone();
        let dest = target.clone();
        let size = payload.len();

        tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut temp = Builder::new().prefix(".staging-").tempfile_in(&dir)?;
            temp.write_all(&payload)?;
            temp.as_file().sync_all()?;
            temp.persist(&dest).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(io::Error::other)??;

        info!("📦 Staged {} bytes at {}", size, target.display());
        Ok(target)
    }
}
