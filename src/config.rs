//! Session settings for the input host
//!
//! Stored as TOML under the user's config directory. Every field has a default,
//! so a missing file or a partial file still yields a usable configuration.

use crate::controller::{InputName, LightColor, DEFAULT_THRESHOLD};
use crate::device::GilrsSettings;
use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn, Level};

const CONFIG_DIR: &str = "gcbridge";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    /// Game-loop tick in milliseconds
    pub tick_interval_ms: u64,

    /// Threshold used when reporting button edges
    pub button_threshold: f32,

    /// Inputs whose edges get reported each tick
    pub watched_inputs: Vec<InputName>,

    /// Start a wireless discovery at start-up
    pub wireless_discovery: bool,

    /// Pause between two gilrs collector passes, in microseconds
    pub collector_idle_us: u64,

    pub log_level: String,

    /// Light bar color applied to every controller on connect
    pub light_color: Option<LightColor>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            button_threshold: DEFAULT_THRESHOLD,
            watched_inputs: InputName::ALL.to_vec(),
            wireless_discovery: false,
            collector_idle_us: 500,
            log_level: "info".to_string(),
            light_color: None,
        }
    }
}

impl SessionSettings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(content).map_err(|e| eyre!("Failed to parse settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| eyre!("Failed to serialize settings: {}", e))
    }

    fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(eyre!("tick_interval_ms must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.button_threshold) {
            return Err(eyre!(
                "button_threshold must be within [0, 1], got {}",
                self.button_threshold
            ));
        }
        Ok(())
    }

    pub fn settings_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir().ok_or_else(|| eyre!("No config directory available"))?;
        path.push(CONFIG_DIR);
        path.push(SETTINGS_FILE);
        Ok(path)
    }

    /// Loads the settings file, writing the defaults first if there is none
    pub async fn load() -> Result<Self> {
        let path = Self::settings_path()?;

        if !tokio::fs::try_exists(&path)
            .await
            .map_err(|e| eyre!("Failed to check settings file {}: {}", path.display(), e))?
        {
            info!("No settings at {}, writing defaults", path.display());
            let defaults = Self::default();
            defaults.save_to(&path).await?;
            return Ok(defaults);
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| eyre!("Failed to read settings file {}: {}", path.display(), e))?;
        let settings = Self::from_toml_str(&content)?;
        debug!("Loaded settings from {}: {:?}", path.display(), settings);
        Ok(settings)
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create settings directory: {}", e))?;
        }

        tokio::fs::write(path, self.to_toml_string()?)
            .await
            .map_err(|e| eyre!("Failed to write settings file: {}", e))
    }

    /// Maximum log level; an unrecognised `log_level` falls back to info
    pub fn max_level(&self) -> Level {
        self.log_level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level {:?}, using info", self.log_level);
            Level::INFO
        })
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn gilrs_settings(&self) -> GilrsSettings {
        GilrsSettings {
            idle: Duration::from_micros(self.collector_idle_us),
        }
    }
}
