// src/catalog.rs

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

pub const MANUAL_KEY: &str = "custom";
const DEFAULT_TITLE: &str = "Menu";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read catalog: {0}")]
    Io(#[from] io::Error),

    #[error("malformed catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which gateway operation a catalog entry maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAction {
    Exec(String),
    Archive(String),
    Fetch {
        glob: String,
        /// Run first; the fetch then only accepts files it produced.
        trigger: Option<String>,
    },
    /// The operator types the command.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub key: String,
    pub title: String,
    pub action: CommandAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCatalog {
    pub title: String,
    pub rows: Vec<Vec<String>>,
    pub commands: BTreeMap<String, CommandDescriptor>,
}

// --- Wire shape of config.json ---

#[derive(Deserialize)]
struct RawCatalog {
    ui: RawUi,
    commands: BTreeMap<String, RawCommand>,
}

#[derive(Deserialize)]
struct RawUi {
    title: Option<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct RawCommand {
    title: Option<String>,
    exec: Option<String>,
    archive: Option<String>,
    fetch: Option<RawFetch>,
    #[serde(default)]
    manual: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFetch {
    Glob(String),
    Detailed { glob: String, trigger: Option<String> },
}

impl RawCommand {
    fn into_action(self) -> Option<CommandAction> {
        if self.manual {
            return Some(CommandAction::Manual);
        }
        if let Some(cmd) = self.exec {
            return Some(CommandAction::Exec(cmd));
        }
        if let Some(dir) = self.archive {
            return Some(CommandAction::Archive(dir));
        }
        match self.fetch? {
            RawFetch::Glob(glob) => Some(CommandAction::Fetch { glob, trigger: None }),
            RawFetch::Detailed { glob, trigger } => Some(CommandAction::Fetch { glob, trigger }),
        }
    }
}

impl CommandCatalog {
    /// Loads `path`, falling back to a manual-only catalog when the file is
    /// missing or broken. The gateway stays usable either way.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path)
            .map_err(CatalogError::from)
            .and_then(|text| Self::parse(&text))
        {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(
                    "Failed to load {} ({}). Falling back to manual-only catalog.",
                    path.display(),
                    e
                );
                Self::manual_only()
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(text)?;

        let mut commands = BTreeMap::new();
        for (key, entry) in raw.commands {
            let title = entry.title.clone().unwrap_or_else(|| key.clone());
            match entry.into_action() {
                Some(action) => {
                    commands.insert(key.clone(), CommandDescriptor { key, title, action });
                }
                None => warn!("Catalog entry '{}' has no action; skipping", key),
            }
        }

        let rows = raw
            .ui
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .filter(|key| {
                        let known = commands.contains_key(key);
                        if !known {
                            warn!("Catalog row references unknown command '{}'", key);
                        }
                        known
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|row| !row.is_empty())
            .collect();

        Ok(Self {
            title: raw.ui.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            rows,
            commands,
        })
    }

    pub fn manual_only() -> Self {
        let mut commands = BTreeMap::new();
        commands.insert(
            MANUAL_KEY.to_string(),
            CommandDescriptor {
                key: MANUAL_KEY.to_string(),
                title: "✍️ Manual command".to_string(),
                action: CommandAction::Manual,
            },
        );
        Self {
            title: DEFAULT_TITLE.to_string(),
            rows: vec![vec![MANUAL_KEY.to_string()]],
            commands,
        }
    }

    pub fn get(&self, key: &str) -> Option<&CommandDescriptor> {
        self.commands.get(key)
    }

    /// Entries in menu order.
    pub fn ordered(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.rows.iter().flatten().filter_map(|key| self.commands.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "ui": {
            "title": "Ops",
            "rows": [["uptime", "logs"], ["report", "ghost"], ["custom"]]
        },
        "commands": {
            "uptime": {"title": "Uptime", "exec": "uptime"},
            "logs": {"archive": "/var/log/app"},
            "report": {"title": "Report", "fetch": {"glob": "/out/*.csv", "trigger": "make report"}},
            "latest": {"fetch": "/out/*.log"},
            "custom": {"title": "Manual", "manual": true},
            "broken": {"title": "Nothing"}
        }
    }"#;

    #[test]
    fn parses_every_action_kind() {
        let cat = CommandCatalog::parse(SAMPLE).unwrap();
        assert_eq!(cat.title, "Ops");
        assert_eq!(cat.get("uptime").unwrap().action, CommandAction::Exec("uptime".into()));
        assert_eq!(cat.get("logs").unwrap().action, CommandAction::Archive("/var/log/app".into()));
        assert_eq!(cat.get("logs").unwrap().title, "logs");
        assert_eq!(
            cat.get("report").unwrap().action,
            CommandAction::Fetch {
                glob: "/out/*.csv".into(),
                trigger: Some("make report".into())
            }
        );
        assert_eq!(
            cat.get("latest").unwrap().action,
            CommandAction::Fetch { glob: "/out/*.log".into(), trigger: None }
        );
        assert_eq!(cat.get("custom").unwrap().action, CommandAction::Manual);
        assert!(cat.get("broken").is_none());
    }

    #[test]
    fn unknown_row_keys_are_dropped() {
        let cat = CommandCatalog::parse(SAMPLE).unwrap();
        assert_eq!(
            cat.rows,
            vec![
                vec!["uptime".to_string(), "logs".to_string()],
                vec!["report".to_string()],
                vec!["custom".to_string()],
            ]
        );
        let keys: Vec<_> = cat.ordered().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["uptime", "logs", "report", "custom"]);
    }

    #[test]
    fn missing_file_falls_back_to_manual() {
        let dir = TempDir::new().unwrap();
        let cat = CommandCatalog::load(&dir.path().join("nope.json"));
        assert_eq!(cat, CommandCatalog::manual_only());
    }

    #[test]
    fn malformed_file_falls_back_to_manual() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let cat = CommandCatalog::load(&path);
        assert_eq!(cat.title, "Menu");
        assert_eq!(cat.get(MANUAL_KEY).unwrap().action, CommandAction::Manual);
    }

    #[test]
    fn default_title_applies() {
        let cat = CommandCatalog::parse(r#"{"ui": {"rows": []}, "commands": {}}"#).unwrap();
        assert_eq!(cat.title, "Menu");
        assert!(cat.rows.is_empty());
    }
}
