use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::DmrError;
use crate::store::default_store_path;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("dendrimer").join("config.toml"))
}

/// Reads the config file at `path`; a missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, DmrError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => return Err(e.into()),
    };
    Ok(toml::from_str(&content)?)
}

pub fn load_config() -> Result<Config, DmrError> {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(Config::default()),
    }
}

/// CLI flag, then config file, then the platform data directory.
pub fn resolve_store_path(cli_path: Option<PathBuf>, config: &Config) -> PathBuf {
    cli_path
        .or_else(|| config.store.path.clone())
        .unwrap_or_else(default_store_path)
}
