//! User configuration (`~/.rpcalc/config.toml`).
//!
//! Everything has a sensible default; a missing config file is not an
//! error. `RPCALC_CONFIG` overrides the default location, which keeps
//! filesystem-touching tests hermetic.

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// How many top stack values each stack-changed notification carries.
    pub display_depth: usize,

    /// Directory scanned for `*.wasm` plugins at startup.
    pub plugin_dir: Option<PathBuf>,

    /// Whether to scan `plugin_dir` when the calculator is constructed.
    pub autoload_plugins: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_depth: 4,
            plugin_dir: None,
            autoload_plugins: true,
        }
    }
}

impl Config {
    /// Load from `$RPCALC_CONFIG`, falling back to `~/.rpcalc/config.toml`.
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from an explicit path. A missing file yields the defaults;
    /// an unreadable or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(toml::from_str(&content)?)
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os("RPCALC_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs_home().map(|home| home.join(".rpcalc").join("config.toml"))
}

fn dirs_home() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}
