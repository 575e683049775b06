// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for Blurwatch
//!
//! This is the tool's own configuration, not the watched settings file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Watch loop settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Keys scanned for in the settings file
    #[serde(default)]
    pub keys: KeyConfig,

    /// Blurred output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Undo history settings
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// Events arriving within this many seconds of the last run are skipped
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    /// Interval between size checks while waiting for a write to settle
    #[serde(default = "default_settle_interval")]
    pub settle_interval_ms: u64,
    /// Upper bound on the settle wait
    #[serde(default = "default_settle_max")]
    pub settle_max_ms: u64,
    /// How long to block on the event channel per loop iteration
    #[serde(default = "default_poll")]
    pub poll_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KeyConfig {
    #[serde(default = "default_enable_key")]
    pub enable: String,
    #[serde(default = "default_radius_key")]
    pub radius: String,
    #[serde(default = "default_image_key")]
    pub image: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    /// Directory for blurred images (OS temp dir when unset)
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Prefix of generated file names; also marks an image as already blurred
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Comment out the replaced line with `//` instead of keeping it live
    #[serde(default)]
    pub comment_original: bool,
}

/// Undo log; off unless enabled, so the settings file stays the only state
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
}

// Default value functions
fn default_cooldown() -> u64 { 8 }
fn default_settle_interval() -> u64 { 250 }
fn default_settle_max() -> u64 { 2000 }
fn default_poll() -> u64 { 100 }
fn default_enable_key() -> String { "blurEnable".to_string() }
fn default_radius_key() -> String { "blurRadius".to_string() }
fn default_image_key() -> String { "backgroundImage".to_string() }
fn default_prefix() -> String { "blurred-".to_string() }
fn default_jpeg_quality() -> u8 { 75 }
fn default_history_path() -> PathBuf { PathBuf::from("blurwatch_history.jsonl") }

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown(),
            settle_interval_ms: default_settle_interval(),
            settle_max_ms: default_settle_max(),
            poll_ms: default_poll(),
        }
    }
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            enable: default_enable_key(),
            radius: default_radius_key(),
            image: default_image_key(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            prefix: default_prefix(),
            jpeg_quality: default_jpeg_quality(),
            comment_original: false,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_history_path(),
        }
    }
}

impl WatchConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }

    pub fn settle_max(&self) -> Duration {
        Duration::from_millis(self.settle_max_ms)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

impl OutputConfig {
    /// Directory blurred images are written to
    pub fn resolve_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::BlurwatchError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the process step cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        if self.output.prefix.is_empty() {
            return Err(crate::BlurwatchError::Config(
                "output.prefix must not be empty".to_string(),
            ));
        }
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(crate::BlurwatchError::Config(format!(
                "output.jpeg_quality must be within 1..=100, got {}",
                self.output.jpeg_quality
            )));
        }
        for key in [&self.keys.enable, &self.keys.radius, &self.keys.image] {
            if key.is_empty() || key.contains('"') {
                return Err(crate::BlurwatchError::Config(format!(
                    "invalid settings key: {:?}",
                    key
                )));
            }
        }
        Ok(())
    }
}
