//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`] over a single JSON document.  A missing file
//! yields [`SystemConfig::default()`].  Saves are atomic: the document is
//! written to a sibling temp file and renamed over the target.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::ConfigPort;
use crate::config::SystemConfig;
use crate::error::ConfigError;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "config.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("no config at {}, using defaults", self.path.display());
                return Ok(SystemConfig::default());
            }
            Err(e) => {
                warn!("config read failed: {e}");
                return Err(ConfigError::Io);
            }
        };
        let cfg: SystemConfig =
            serde_json::from_slice(&bytes).map_err(|e| ConfigError::Corrupted(e.to_string()))?;
        cfg.validate()?;
        info!("loaded config from {}", self.path.display());
        Ok(cfg)
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let json =
            serde_json::to_vec_pretty(config).map_err(|e| ConfigError::Corrupted(e.to_string()))?;

        let tmp = self.temp_path();
        let write = || -> std::io::Result<()> {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&json)?;
            f.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| {
            warn!("config save to {} failed: {e}", self.path.display());
            let _ = fs::remove_file(&tmp);
            ConfigError::Io
        })
    }
}
