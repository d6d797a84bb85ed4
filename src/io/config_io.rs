use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::config::WorkspaceConfig;

/// Name of the per-workspace config file
pub const CONFIG_FILE: &str = ".workdesk.toml";

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not parse .workdesk.toml: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Read `<root>/.workdesk.toml`. A missing file gives the defaults.
pub fn read_config(root: &Path) -> Result<WorkspaceConfig, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    let config_text = match fs::read_to_string(&config_path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(WorkspaceConfig::default()),
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: config_path,
                source: e,
            });
        }
    };
    Ok(toml::from_str(&config_text)?)
}

/// Walk up from `start` to the nearest directory holding a config file
pub fn discover_workspace(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}
