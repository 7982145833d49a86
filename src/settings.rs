use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LogSettings;
use crate::poller::{
    DEFAULT_MAX_WAIT, DEFAULT_MIN_DEVICES, DEFAULT_POLL_INTERVAL, DEFAULT_PROBE_INTERVAL,
    DEFAULT_QUIESCENCE, PollerOptions, PollerOptionsBuilderError, ReadinessOptions,
    ReadinessOptionsBuilderError,
};
use crate::reconciler::StructuralCheck;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid poller settings: {0}")]
    Poller(#[from] PollerOptionsBuilderError),
    #[error("Invalid readiness settings: {0}")]
    Readiness(#[from] ReadinessOptionsBuilderError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessSettings {
    pub min_devices: usize,
    pub quiescence_ms: u64,
    pub probe_interval_ms: u64,
    pub max_wait_ms: u64,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        ReadinessSettings {
            min_devices: DEFAULT_MIN_DEVICES,
            quiescence_ms: DEFAULT_QUIESCENCE.as_millis() as u64,
            probe_interval_ms: DEFAULT_PROBE_INTERVAL.as_millis() as u64,
            max_wait_ms: DEFAULT_MAX_WAIT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub poll_interval_ms: u64,
    pub structural_check: StructuralCheck,
    pub readiness: ReadinessSettings,
    pub logging: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            structural_check: StructuralCheck::default(),
            readiness: ReadinessSettings::default(),
            logging: LogSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Settings from `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Settings::from_file(path),
            None => Ok(Settings::default()),
        }
    }

    pub fn poller_options(&self) -> Result<PollerOptions, SettingsError> {
        let r = &self.readiness;
        let readiness = ReadinessOptions::builder()
            .min_devices(r.min_devices)
            .quiescence(Duration::from_millis(r.quiescence_ms))
            .probe_interval(Duration::from_millis(r.probe_interval_ms))
            .max_wait(Duration::from_millis(r.max_wait_ms))
            .build()?;
        Ok(PollerOptions::builder()
            .interval(Duration::from_millis(self.poll_interval_ms))
            .readiness(readiness)
            .build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogRotation;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_poller_defaults() {
        let options = Settings::default().poller_options().unwrap();
        assert_eq!(options, PollerOptions::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"poll_interval_ms": 4000, "structural_check": "membership", "readiness": {"min_devices": 3}}"#,
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.poll_interval_ms, 4000);
        assert_eq!(settings.structural_check, StructuralCheck::Membership);
        assert_eq!(settings.readiness.min_devices, 3);
        assert_eq!(settings.readiness.max_wait_ms, 10_000);

        let options = settings.poller_options().unwrap();
        assert_eq!(options.interval, Duration::from_secs(4));
        assert_eq!(options.readiness.min_devices, 3);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let settings = Settings {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.poller_options(),
            Err(SettingsError::Poller(_))
        ));
    }

    #[test]
    fn test_load_errors() {
        assert_eq!(Settings::load(None).unwrap(), Settings::default());

        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            Settings::load(Some(&missing)),
            Err(SettingsError::Io(_))
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            Settings::load(Some(&broken)),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_logging_section() {
        let settings: Settings = serde_json::from_str(
            r#"{"logging": {"dir": "/var/log/lifx-dash", "rotation": "hourly"}}"#,
        )
        .unwrap();
        assert_eq!(
            settings.logging.dir.as_deref(),
            Some(Path::new("/var/log/lifx-dash"))
        );
        assert_eq!(settings.logging.rotation, LogRotation::Hourly);
        assert_eq!(settings.logging.keep_files, 7);
    }
}
