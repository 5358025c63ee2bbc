//! Settings management

use crate::ServiceError;
use barrage_core::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Host settings: the simulation config plus what the runtime drives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub simulation: SimulationConfig,
    pub runtime: RuntimeSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Ticks to run before exiting.
    pub ticks: u64,
    /// Style sheet to register at startup. The built-in demo sheet is used
    /// when unset.
    pub style_sheet: Option<PathBuf>,
    /// Log a tick summary every this many ticks.
    pub report_every: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            ticks: 600,
            style_sheet: None,
            report_every: 120,
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no settings file; using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ServiceError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&text).map_err(|source| ServiceError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ServiceError> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self).map_err(ServiceError::Encode)?;
        std::fs::write(path, text).map_err(|source| ServiceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "saved settings");
        Ok(())
    }
}
