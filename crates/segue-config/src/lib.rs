//! Segue configuration system
//!
//! This crate provides centralized configuration for the transition engine,
//! loading settings from `segue.toml` with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Segue
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SegueConfig {
    /// Lifecycle settings
    pub transitions: TransitionConfig,
    /// Snapshot capture settings
    pub capture: CaptureConfig,
    /// Headless scene host settings
    pub headless: HeadlessConfig,
}

/// Lifecycle configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Skip a transition with a timeout once it has been alive for this many
    /// frames without reaching `done`. `None` disables the deadline.
    pub timeout_frames: Option<u32>,
}

/// Snapshot capture configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum snapshot containing block width in pixels
    pub max_snapshot_width: Option<f64>,
    /// Maximum snapshot containing block height in pixels
    pub max_snapshot_height: Option<f64>,
}

/// Headless scene host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessConfig {
    /// Number of frame ticks presentation animations report as running
    pub animation_frames: u32,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            // ~250ms at 60fps, the UA default cross-fade duration
            animation_frames: 15,
        }
    }
}

impl CaptureConfig {
    /// Whether a snapshot containing block of `width` x `height` exceeds the configured maximum.
    pub fn exceeds_limit(&self, width: f64, height: f64) -> bool {
        self.max_snapshot_width.is_some_and(|max| width > max)
            || self.max_snapshot_height.is_some_and(|max| height > max)
    }
}

impl SegueConfig {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the segue.toml configuration file
    ///
    /// # Returns
    /// * `Ok(SegueConfig)` - Successfully loaded configuration
    /// * `Err(String)` - Error message if loading failed
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Load configuration from the default location (segue.toml in the current directory)
    /// or return default configuration if file doesn't exist
    pub fn load_or_default() -> Self {
        Self::load_from_file("segue.toml").unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Some(frames) = read_env("SEGUE_TIMEOUT_FRAMES") {
            self.transitions.timeout_frames = Some(frames);
        }
        if let Some(width) = read_env("SEGUE_MAX_SNAPSHOT_WIDTH") {
            self.capture.max_snapshot_width = Some(width);
        }
        if let Some(height) = read_env("SEGUE_MAX_SNAPSHOT_HEIGHT") {
            self.capture.max_snapshot_height = Some(height);
        }
        if let Some(frames) = read_env("SEGUE_ANIMATION_FRAMES") {
            self.headless.animation_frames = frames;
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// This is the recommended way to load configuration:
    /// 1. Load from segue.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

fn read_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}
