use crate::domain::models::DeviceRef;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            console_logging_enabled: default_true(),
            file_logging_enabled: default_false(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "cts_time_sync".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Persisted daemon configuration.
///
/// Loaded once at startup; `last_device` is the only field the daemon itself
/// rewrites, whenever a target is confirmed or replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub last_device: Option<DeviceRef>,
    /// Seconds between discovery/confirmation ticks
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
    /// Seconds between calibration ticks
    #[serde(default = "default_sync_interval")]
    pub sync_interval: u64,
    #[serde(default)]
    pub log: LogSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            last_device: None,
            scan_interval: default_scan_interval(),
            sync_interval: default_sync_interval(),
            log: LogSettings::default(),
        }
    }
}

fn default_scan_interval() -> u64 {
    300
}
fn default_sync_interval() -> u64 {
    1800
}

/// Owns the on-disk config file.
///
/// Persistence is best-effort: a missing or corrupt file is replaced with
/// defaults, and a failed write is logged while the in-memory copy stays
/// authoritative for the rest of the process.
pub struct ConfigStore {
    config: Config,
    config_path: PathBuf,
}

impl ConfigStore {
    /// Load from the per-user config directory.
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self::load_from(Self::default_path()?))
    }

    /// Load from an explicit path, materializing defaults on disk when the
    /// file is absent or unreadable.
    pub fn load_from(config_path: PathBuf) -> Self {
        let config = match Self::read_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "could not load {}: {e:#}; falling back to defaults",
                    config_path.display()
                );
                let config = Config::default();
                if let Err(e) = Self::write_file(&config_path, &config) {
                    warn!("could not write default config: {e:#}");
                }
                config
            }
        };
        Self {
            config,
            config_path,
        }
    }

    fn default_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("cts-time-sync");
        fs::create_dir_all(&path)?;
        path.push("config.json");
        Ok(path)
    }

    fn read_file(path: &Path) -> anyhow::Result<Config> {
        let contents = fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    fn write_file(path: &Path, config: &Config) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Overwrite the file with the in-memory state. Never fails the caller.
    pub fn save(&self) {
        match Self::write_file(&self.config_path, &self.config) {
            Ok(()) => info!("configuration saved to {}", self.config_path.display()),
            Err(e) => warn!(
                "could not save {}: {e:#}; continuing with in-memory config",
                self.config_path.display()
            ),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Replace the remembered target wholesale and persist.
    pub fn set_last_device(&mut self, device: DeviceRef) {
        self.config.last_device = Some(device);
        self.save();
    }
}

/// The configuration handle shared by the discovery and calibration loops.
///
/// All mutation funnels through here; the lock is only ever held for a
/// field copy or a `save`, never across an await point.
#[derive(Clone)]
pub struct SharedConfig {
    inner: Arc<Mutex<ConfigStore>>,
}

impl SharedConfig {
    pub fn new(store: ConfigStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConfigStore> {
        // A poisoned lock means the other loop panicked mid-update; the
        // store itself is still usable.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn last_device(&self) -> Option<DeviceRef> {
        self.lock().config().last_device.clone()
    }

    pub fn set_last_device(&self, device: DeviceRef) {
        self.lock().set_last_device(device);
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.lock().config().scan_interval)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.lock().config().sync_interval)
    }
}
