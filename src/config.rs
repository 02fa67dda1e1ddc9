use crate::watcher::DEFAULT_POLL_INTERVAL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration stored in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Watcher period in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Text file in meminfo format (first line carries `MemTotal:`)
    #[serde(default = "default_meminfo_path")]
    pub meminfo_path: PathBuf,
    /// Label shown when memory stats cannot be read
    #[serde(default = "default_fallback_label")]
    pub fallback_label: String,
    /// Max pointer travel (px, per axis) that still counts as a tap
    #[serde(default)]
    pub tap_slop_px: f32,
    /// Keep the small overlay where it was dragged across hide/show cycles
    #[serde(default = "default_remember_position")]
    pub remember_position: bool,
    /// Overrides the host-reported status bar height
    #[serde(default)]
    pub status_bar_height: Option<i32>,
    /// Extra identifiers treated as the home screen, on top of the host's own list
    #[serde(default)]
    pub home_packages: Vec<String>,
    #[serde(default)]
    pub debug_logging: bool,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_meminfo_path() -> PathBuf {
    PathBuf::from("/proc/meminfo")
}

fn default_fallback_label() -> String {
    "--".into()
}

fn default_remember_position() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            meminfo_path: default_meminfo_path(),
            fallback_label: default_fallback_label(),
            tap_slop_px: 0.0,
            remember_position: default_remember_position(),
            status_bar_height: None,
            home_packages: Vec::new(),
            debug_logging: false,
        }
    }
}

pub fn config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("memfloat").join("config.json")
}

pub fn load_config() -> AppConfig {
    load_config_from(&config_path())
}

/// Missing or malformed files fall back to defaults.
pub fn load_config_from(path: &Path) -> AppConfig {
    if path.exists() {
        let data = fs::read_to_string(path).unwrap_or_default();
        match serde_json::from_str::<AppConfig>(&data) {
            Ok(cfg) => cfg.validated(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                AppConfig::default()
            }
        }
    } else {
        AppConfig::default()
    }
}

impl AppConfig {
    /// Replaces values the watcher cannot run with.
    fn validated(mut self) -> Self {
        if self.poll_interval_ms == 0 {
            tracing::warn!(
                default_ms = default_poll_interval_ms(),
                "poll_interval_ms must be positive, using default"
            );
            self.poll_interval_ms = default_poll_interval_ms();
        }
        self
    }
}

pub fn save_config(config: &AppConfig) {
    save_config_to(&config_path(), config)
}

pub fn save_config_to(path: &Path, config: &AppConfig) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let data = serde_json::to_string_pretty(config).unwrap_or_default();
    if let Err(e) = fs::write(path, data) {
        tracing::warn!(path = %path.display(), error = %e, "failed to write config");
    }
}
