//! Application configuration management.
//!
//! This module handles the persistent configuration for sndpad: the bounded
//! channel count, supervisor poll timing, progress bar geometry, the probe
//! fallback duration, and the key-to-clip mapping that drives the board.
//! Configuration is stored in the user's config directory (typically
//! ~/.config/sndpad/config.toml).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_FALLBACK_DURATION_SECS, DEFAULT_MAX_CHANNELS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_PROGRESS_WIDTH,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_max_channels")]
    pub max_channels: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_progress_width")]
    pub progress_width: usize,
    #[serde(default = "default_fallback_duration_secs")]
    pub fallback_duration_secs: f32,
    /// Single-character key -> clip path. An empty path means "no sound".
    #[serde(default = "default_keys")]
    pub keys: BTreeMap<String, String>,
}

fn default_max_channels() -> usize {
    DEFAULT_MAX_CHANNELS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_progress_width() -> usize {
    DEFAULT_PROGRESS_WIDTH
}

fn default_fallback_duration_secs() -> f32 {
    DEFAULT_FALLBACK_DURATION_SECS
}

fn default_keys() -> BTreeMap<String, String> {
    let mut keys = BTreeMap::new();
    keys.insert("a".to_string(), "sounds/kick.wav".to_string());
    keys.insert("s".to_string(), "sounds/snare.wav".to_string());
    keys.insert("d".to_string(), "sounds/hat.mp3".to_string());
    keys
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            max_channels: default_max_channels(),
            poll_interval_ms: default_poll_interval_ms(),
            progress_width: default_progress_width(),
            fallback_duration_secs: default_fallback_duration_secs(),
            keys: default_keys(),
        }
    }

    pub fn config_dir() -> Result<PathBuf, Box<dyn Error>> {
        // Check for XDG_CONFIG_HOME first (useful for testing)
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config).join("sndpad")
        } else {
            dirs::config_dir()
                .ok_or("Unable to find config directory")?
                .join("sndpad")
        };
        Ok(config_dir)
    }

    pub fn config_path() -> Result<PathBuf, Box<dyn Error>> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn load() -> Result<Self, Box<dyn Error>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            // Return default config instead of error
            return Ok(Default::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        let config_path = Self::config_path()?;
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(&config_path, toml_string)?;

        Ok(())
    }

    pub fn exists() -> Result<bool, Box<dyn Error>> {
        Ok(Self::config_path()?.exists())
    }

    /// Look up the clip mapped to a key. Multi-character table entries are
    /// unreachable from single-key input and are ignored here.
    pub fn sound_for(&self, key: char) -> Option<&str> {
        let mut buf = [0u8; 4];
        self.keys
            .get(key.encode_utf8(&mut buf) as &str)
            .map(String::as_str)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        match key {
            "max_channels" => {
                let parsed: usize = value
                    .parse()
                    .map_err(|_| "Value must be a positive integer")?;
                if parsed == 0 {
                    return Err("max_channels must be at least 1".into());
                }
                self.max_channels = parsed;
            }
            "poll_interval_ms" => {
                let parsed: u64 = value
                    .parse()
                    .map_err(|_| "Value must be a positive integer")?;
                if parsed == 0 {
                    return Err("poll_interval_ms must be at least 1".into());
                }
                self.poll_interval_ms = parsed;
            }
            "progress_width" => {
                self.progress_width = value
                    .parse()
                    .map_err(|_| "Value must be a positive integer")?;
            }
            "fallback_duration_secs" => {
                let parsed: f32 = value.parse().map_err(|_| "Value must be a number")?;
                if !parsed.is_finite() || parsed <= 0.0 {
                    return Err("fallback_duration_secs must be a positive number".into());
                }
                self.fallback_duration_secs = parsed;
            }
            _ => return Err(format!("Unknown configuration key: {key}").into()),
        }
        Ok(())
    }
}
