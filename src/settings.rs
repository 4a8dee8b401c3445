//! Settings persistence
//!
//! Controller defaults are stored as JSON at
//! `~/.config/playrec/settings.json` (platform config dir).

use anyhow::Context;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.json";

/// Controller defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Repeat playback when the end is reached
    pub looping: bool,
    /// Recorder duration limit in milliseconds, 0 for none
    pub max_duration_ms: i32,
    /// Recorder file size limit in bytes, 0 for none
    pub max_file_size_bytes: i64,
    /// Interval between time updates
    pub tick_interval_ms: u64,
    /// Where new recordings go; the user data dir when unset
    pub recordings_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            looping: false,
            max_duration_ms: 0,
            max_file_size_bytes: 0,
            tick_interval_ms: 1000,
            recordings_dir: None,
        }
    }
}

impl Settings {
    /// Default settings file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("playrec")
            .join(SETTINGS_FILE)
    }

    /// Load settings from `path`
    ///
    /// A missing file yields the defaults. Anything else that goes wrong is
    /// logged and also yields the defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::read(path) {
            Ok(settings) => settings,
            Err(e) => {
                error!("Failed to load settings: {:#}", e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(settings)
    }

    /// Write settings to `path`, creating the parent directory
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
