use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::constants;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: u64,

    #[serde(default = "default_tick_increment")]
    pub tick_increment_secs: f64,

    #[serde(default = "default_max_allowed_jump")]
    pub max_allowed_jump_secs: f64,

    #[serde(default = "default_required_percent")]
    pub required_percent: f64,

    #[serde(default = "default_embed_duration_retry")]
    pub embed_duration_retry_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_backoff")]
    pub base_backoff_ms: u64,

    #[serde(default = "default_warn_threshold")]
    pub failure_warn_threshold: u32,

    /// Verify enrollment with the server before the first sync. Off by
    /// default; the sync endpoints report 403 anyway.
    #[serde(default)]
    pub precheck_enrollment: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub connection_timeout_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            debug!("Loading config from {:?}", config_path);
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            info!("Config loaded successfully");
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, contents).context("Failed to write config file")?;
        debug!("Config saved to {:?}", config_path);
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to determine config directory")?;
        Ok(config_dir.join("coursetrack").join("config.toml"))
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: default_sample_interval(),
            tick_increment_secs: default_tick_increment(),
            max_allowed_jump_secs: default_max_allowed_jump(),
            required_percent: default_required_percent(),
            embed_duration_retry_secs: default_embed_duration_retry(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval(),
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff(),
            failure_warn_threshold: default_warn_threshold(),
            precheck_enrollment: false,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_timeout(),
        }
    }
}

fn default_sample_interval() -> u64 {
    constants::SAMPLE_INTERVAL_SECS
}

fn default_tick_increment() -> f64 {
    constants::TICK_INCREMENT_SECS
}

fn default_max_allowed_jump() -> f64 {
    constants::MAX_ALLOWED_JUMP_SECS
}

fn default_required_percent() -> f64 {
    constants::REQUIRED_PERCENT
}

fn default_embed_duration_retry() -> u64 {
    constants::EMBED_DURATION_RETRY_SECS
}

fn default_sync_interval() -> u64 {
    constants::SYNC_INTERVAL_SECS
}

fn default_max_attempts() -> u32 {
    constants::SYNC_MAX_ATTEMPTS
}

fn default_base_backoff() -> u64 {
    constants::SYNC_BASE_BACKOFF_MS
}

fn default_warn_threshold() -> u32 {
    constants::SYNC_FAILURE_WARN_THRESHOLD
}

fn default_timeout() -> u64 {
    constants::HTTP_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = Config::default();
        assert_eq!(config.tracking.sample_interval_secs, 5);
        assert_eq!(config.tracking.tick_increment_secs, 5.0);
        assert_eq!(config.tracking.max_allowed_jump_secs, 60.0);
        assert_eq!(config.tracking.required_percent, 90.0);
        assert_eq!(config.sync.interval_secs, 30);
        assert_eq!(config.sync.max_attempts, 3);
        assert_eq!(config.sync.base_backoff_ms, 1000);
        assert_eq!(config.sync.failure_warn_threshold, 3);
        assert!(!config.sync.precheck_enrollment);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [tracking]
            required_percent = 75.0
            "#,
        )
        .unwrap();

        assert_eq!(config.tracking.required_percent, 75.0);
        assert_eq!(config.tracking.sample_interval_secs, 5);
        assert_eq!(config.sync.interval_secs, 30);
    }
}
