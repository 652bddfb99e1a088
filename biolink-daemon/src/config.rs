//! Configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use biolink_acquisition::{
    AcquisitionConfig, StreamSource, SyntheticSource, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_SOURCE_RATE, DEFAULT_TARGET_RATE,
};

/// Which stream source the acquisition loop connects to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Built-in FakeBio generator
    Synthetic,
}

impl SourceKind {
    /// Build a fresh source for one acquisition run
    pub fn create(&self, rate: f64) -> Box<dyn StreamSource> {
        match self {
            SourceKind::Synthetic => Box::new(SyntheticSource::with_rate(rate)),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Path to configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Unix socket path for control commands
    pub socket_path: String,

    /// Unix socket path for the live event stream
    pub events_socket_path: String,

    /// Directory session artifacts are written to
    pub recordings_dir: String,

    /// Tracing level (error, warn, info, debug, trace)
    pub log_level: String,

    /// Stream source to acquire from
    pub source: SourceKind,

    /// Assumed source sample rate in Hz (not measured)
    pub source_rate: f64,

    /// Rate samples are decimated to in Hz
    pub target_rate: f64,

    /// Ingestion queue capacity; the oldest sample is dropped beyond it
    pub queue_capacity: usize,

    /// Max samples pulled per inlet per tick (None = decimation factor)
    pub chunk_size: Option<usize>,

    /// Pause between acquisition ticks (ms)
    pub tick_interval_ms: u64,

    /// Pause between stream discovery attempts (ms)
    pub discovery_retry_ms: u64,

    /// Channels kept from each sample (None = all)
    pub include_channels: Option<Vec<String>>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            socket_path: path_or(biolink_paths::get_ipc_socket_path(), "/tmp/biolink.sock"),
            events_socket_path: path_or(
                biolink_paths::get_events_socket_path(),
                "/tmp/biolink_events.sock",
            ),
            recordings_dir: path_or(biolink_paths::get_recordings_dir(), "./recordings"),
            log_level: "info".to_string(),
            source: SourceKind::Synthetic,
            source_rate: DEFAULT_SOURCE_RATE,
            target_rate: DEFAULT_TARGET_RATE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            chunk_size: None,
            tick_interval_ms: 1,
            discovery_retry_ms: 2000,
            include_channels: Some(vec!["EDA".to_string(), "ECG".to_string()]),
        }
    }
}

fn path_or(resolved: Result<PathBuf>, fallback: &str) -> String {
    resolved
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| fallback.to_string())
}

impl DaemonConfig {
    /// Load configuration from the default location, or create it
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_config_path())
    }

    /// Load configuration from `config_path`, writing defaults if it is missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            // Load existing config
            let contents = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

            let mut config: DaemonConfig = toml::from_str(&contents)
                .context("Failed to parse config file")?;

            config.config_path = config_path.to_path_buf();
            config.validate()?;
            Ok(config)
        } else {
            // Create default config
            let config = Self {
                config_path: config_path.to_path_buf(),
                ..Self::default()
            };
            config.save()
                .context("Failed to save default config")?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(&self.config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Reject values the acquisition loop cannot run with
    pub fn validate(&self) -> Result<()> {
        self.to_acquisition_config()
            .validate()
            .context("Invalid acquisition settings")?;
        Ok(())
    }

    pub fn to_acquisition_config(&self) -> AcquisitionConfig {
        AcquisitionConfig {
            source_rate: self.source_rate,
            target_rate: self.target_rate,
            queue_capacity: self.queue_capacity,
            chunk_size: self.chunk_size,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            discovery_retry: Duration::from_millis(self.discovery_retry_ms),
            include_channels: self.include_channels.clone(),
        }
    }

    /// Get default config path
    fn default_config_path() -> PathBuf {
        biolink_paths::get_config_file_path()
            .unwrap_or_else(|_| PathBuf::from(".").join(biolink_paths::CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = DaemonConfig::default();
        assert_eq!(config.source_rate, 1000.0);
        assert_eq!(config.target_rate, 100.0);
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.source, SourceKind::Synthetic);
        assert_eq!(
            config.include_channels,
            Some(vec!["EDA".to_string(), "ECG".to_string()])
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = DaemonConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.config_path, path);

        let reloaded = DaemonConfig::load_from(&path).unwrap();
        assert_eq!(reloaded.socket_path, config.socket_path);
        assert_eq!(reloaded.tick_interval_ms, 1);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "target_rate = 50.0\nlog_level = \"debug\"\n").unwrap();

        let config = DaemonConfig::load_from(&path).unwrap();
        assert_eq!(config.target_rate, 50.0);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.source_rate, 1000.0);

        let acquisition = config.to_acquisition_config();
        assert_eq!(acquisition.discovery_retry, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "queue_capacity = 0\n").unwrap();
        assert!(DaemonConfig::load_from(&path).is_err());

        std::fs::write(&path, "source = \"hardware\"\n").unwrap();
        assert!(DaemonConfig::load_from(&path).is_err());
    }
}
