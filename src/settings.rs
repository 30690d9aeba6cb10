//! Persisted plugin settings.

use crate::backend::DriverKind;
use crate::error::{PluginError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub driver: DriverKind,
    /// Ask the host OS for 1ms timer granularity while a session runs.
    #[serde(default)]
    pub use_res_timer: bool,
    /// Honour the host's request to block in `update` until there is room.
    #[serde(default = "default_true")]
    pub sync_audio: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            driver: DriverKind::default(),
            use_res_timer: false,
            sync_audio: true,
        }
    }
}

pub trait SettingsStore: Send {
    /// Current settings; falls back to defaults rather than failing.
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Settings kept as JSON on disk.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<Settings>> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PluginError::SettingsIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let mut json = String::new();
        file.read_to_string(&mut json)
            .map_err(|source| PluginError::SettingsIo {
                path: self.path.clone(),
                source,
            })?;
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| PluginError::SettingsFormat {
                path: self.path.clone(),
                source,
            })
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Settings {
        match self.read() {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                log::debug!("No settings at {}, using defaults", self.path.display());
                Settings::default()
            }
            Err(e) => {
                log::warn!("{}; using defaults", e);
                Settings::default()
            }
        }
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let io_err = |source| PluginError::SettingsIo {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(settings).map_err(|source| {
            PluginError::SettingsFormat {
                path: self.path.clone(),
                source,
            }
        })?;
        let mut file = File::create(&self.path).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        log::info!("Settings saved to {}", self.path.display());
        Ok(())
    }
}

/// Settings shared in memory; clones see each other's writes.
#[derive(Clone, Default)]
pub struct MemorySettingsStore(Arc<Mutex<Settings>>);

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self(Arc::new(Mutex::new(settings)))
    }

    pub fn set_driver(&self, driver: DriverKind) {
        if let Ok(mut s) = self.0.lock() {
            s.driver = driver;
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Settings {
        self.0.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Ok(mut s) = self.0.lock() {
            *s = settings.clone();
        }
        Ok(())
    }
}
