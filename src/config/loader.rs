//! Config file resolution and loading.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::types::Config;
use crate::error::{Error, Result};

/// Conventional config path: `~/.config/keywarp/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keywarp")
        .join("config.toml")
}

/// Loads (and re-loads) the configuration from a resolved path.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit override, then `KEYWARP_CONFIG`,
    /// then the conventional location. Tilde is expanded in both overrides.
    pub fn resolve(override_path: Option<&str>) -> Self {
        let path = override_path
            .map(str::to_string)
            .or_else(|| std::env::var("KEYWARP_CONFIG").ok())
            .map(|raw| PathBuf::from(shellexpand::tilde(&raw).as_ref()))
            .unwrap_or_else(default_config_path);
        Self { path }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate. A missing file yields the defaults; a present but
    /// invalid file is an error so the caller can keep its previous config.
    pub fn load(&self) -> Result<Config> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no config file, using defaults");
                return Ok(Config::default());
            }
            Err(err) => return Err(err.into()),
        };
        let config: Config = toml::from_str(&raw).map_err(|err| {
            warn!(path = %self.path.display(), error = %err, "config parse failed");
            Error::ConfigValidation(format!("{}: {err}", self.path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }
}
