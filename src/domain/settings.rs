use crate::domain::error::OperationError;
use crate::domain::models::{AddressType, SecurityLevel, SubscriptionMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
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
    "ble_suite".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // Connection Settings
    #[serde(default)]
    pub adapter: String,
    #[serde(default)]
    pub address_type: AddressType,
    #[serde(default)]
    pub security_level: SecurityLevel,

    // Operation Settings
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
    #[serde(default = "default_async_timeout_secs")]
    pub async_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub liveness_poll_interval_ms: u64,

    // Subscription Settings
    #[serde(default = "default_subscribe_mode")]
    pub subscribe_mode: u8,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            adapter: String::new(),
            address_type: AddressType::default(),
            security_level: SecurityLevel::default(),
            max_tries: default_max_tries(),
            async_timeout_secs: default_async_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            liveness_poll_interval_ms: default_poll_interval_ms(),
            subscribe_mode: default_subscribe_mode(),
            log_settings: LogSettings::default(),
        }
    }
}

fn default_max_tries() -> u32 {
    5
}
fn default_async_timeout_secs() -> u64 {
    5
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_subscribe_mode() -> u8 {
    1
}

impl Settings {
    /// Validated runtime view of the operation settings.
    pub fn operation_settings(&self) -> Result<OperationSettings, OperationError> {
        OperationSettings {
            max_tries: self.max_tries,
            async_timeout: Duration::from_secs(self.async_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            liveness_poll_interval: Duration::from_millis(self.liveness_poll_interval_ms),
        }
        .validated()
    }

    pub fn subscription_mode(&self) -> Result<SubscriptionMode, OperationError> {
        SubscriptionMode::try_from(self.subscribe_mode)
    }
}

/// Retry and polling knobs used by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSettings {
    /// Retries allowed per target after the first invocation
    pub max_tries: u32,
    /// Per-entry timeout of asynchronous operations
    pub async_timeout: Duration,
    /// Sleep between sweeps of the pending queue
    pub poll_interval: Duration,
    /// Sleep between liveness checks while subscribed
    pub liveness_poll_interval: Duration,
}

impl Default for OperationSettings {
    fn default() -> Self {
        Self {
            max_tries: default_max_tries(),
            async_timeout: Duration::from_secs(default_async_timeout_secs()),
            poll_interval: Duration::from_millis(default_poll_interval_ms()),
            liveness_poll_interval: Duration::from_millis(default_poll_interval_ms()),
        }
    }
}

impl OperationSettings {
    pub fn validated(self) -> Result<Self, OperationError> {
        if self.poll_interval.is_zero() || self.liveness_poll_interval.is_zero() {
            return Err(OperationError::invalid_configuration(
                "poll intervals must be non-zero",
            ));
        }
        Ok(self)
    }
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::from_path(settings_path))
    }

    /// Load from an explicit file, falling back to defaults.
    pub fn from_path(settings_path: PathBuf) -> Self {
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();
        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("BleSuite");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}
