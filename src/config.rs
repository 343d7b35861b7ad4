//! Configuration module
//!
//! Process configuration read from `HOSTBRIDGE_*` environment variables, with
//! platform data/cache directories as defaults.

use log::{info, warn};
use std::env;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};
use crate::models::speech::{PITCH_RANGE, RATE_RANGE, VOLUME_RANGE};
use crate::models::Prosody;

const APP_DIR: &str = "hostbridge";

pub const DB_PATH_VAR: &str = "HOSTBRIDGE_DB_PATH";
pub const READ_ONLY_VAR: &str = "HOSTBRIDGE_CALENDAR_READ_ONLY";
pub const RECORDINGS_DIR_VAR: &str = "HOSTBRIDGE_RECORDINGS_DIR";
pub const SPEECH_RATE_VAR: &str = "HOSTBRIDGE_SPEECH_RATE";
pub const SPEECH_PITCH_VAR: &str = "HOSTBRIDGE_SPEECH_PITCH";
pub const SPEECH_VOLUME_VAR: &str = "HOSTBRIDGE_SPEECH_VOLUME";

/// Bridge process configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// SQLite file backing the calendar store
    pub db_path: PathBuf,
    /// Reject event creation as a device calendar without write access does
    pub calendar_read_only: bool,
    /// Where `startRecording` writes its files
    pub recordings_dir: PathBuf,
    /// Prosody for requests that leave rate, pitch or volume unset
    pub speech_defaults: Prosody,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        let cache_dir = dirs::cache_dir().unwrap_or_else(|| data_dir.clone());

        Self {
            db_path: data_dir.join(APP_DIR).join("calendar.db"),
            calendar_read_only: false,
            recordings_dir: cache_dir.join(APP_DIR).join("recordings"),
            speech_defaults: Prosody::default(),
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by any `HOSTBRIDGE_*` variables that are set.
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(path) = env_string(DB_PATH_VAR) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(flag) = env_string(READ_ONLY_VAR) {
            config.calendar_read_only = parse_bool(READ_ONLY_VAR, &flag)?;
        }
        if let Some(dir) = env_string(RECORDINGS_DIR_VAR) {
            config.recordings_dir = PathBuf::from(dir);
        }
        if let Some(rate) = env_f32(SPEECH_RATE_VAR)? {
            config.speech_defaults.rate = rate;
        }
        if let Some(pitch) = env_f32(SPEECH_PITCH_VAR)? {
            config.speech_defaults.pitch = pitch;
        }
        if let Some(volume) = env_f32(SPEECH_VOLUME_VAR)? {
            config.speech_defaults.volume = volume;
        }

        Ok(config)
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_f32(name: &str) -> AppResult<Option<f32>> {
    env_string(name)
        .map(|raw| {
            raw.parse::<f32>()
                .map_err(|_| AppError::config(format!("{} must be a number, got '{}'", name, raw)))
        })
        .transpose()
}

fn parse_bool(name: &str, raw: &str) -> AppResult<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::config(format!("{} must be a boolean, got '{}'", name, raw))),
    }
}

fn check_range(name: &str, value: f32, (min, max): (f32, f32)) -> AppResult<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(AppError::config(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )))
    }
}

/// Rejects settings the adapters cannot honor.
pub fn validate_config(config: &BridgeConfig) -> AppResult<()> {
    let prosody = config.speech_defaults;
    check_range(SPEECH_RATE_VAR, prosody.rate, RATE_RANGE)?;
    check_range(SPEECH_PITCH_VAR, prosody.pitch, PITCH_RANGE)?;
    check_range(SPEECH_VOLUME_VAR, prosody.volume, VOLUME_RANGE)?;

    if config.db_path.as_os_str().is_empty() {
        return Err(AppError::config("database path is empty"));
    }
    if config.calendar_read_only {
        warn!("Calendar store is read-only; createEvent will be denied");
    }

    info!("Configuration validated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            DB_PATH_VAR,
            READ_ONLY_VAR,
            RECORDINGS_DIR_VAR,
            SPEECH_RATE_VAR,
            SPEECH_PITCH_VAR,
            SPEECH_VOLUME_VAR,
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear_env();
        let config = BridgeConfig::from_env().unwrap();

        assert_eq!(config, BridgeConfig::default());
        assert!(config.db_path.ends_with("hostbridge/calendar.db"));
        assert!(config.recordings_dir.ends_with("hostbridge/recordings"));
        assert!(!config.calendar_read_only);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var(DB_PATH_VAR, "/tmp/hb/test.db");
        env::set_var(READ_ONLY_VAR, "TRUE");
        env::set_var(SPEECH_RATE_VAR, "1.5");
        env::set_var(SPEECH_VOLUME_VAR, " 0.25 ");

        let config = BridgeConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.db_path, PathBuf::from("/tmp/hb/test.db"));
        assert!(config.calendar_read_only);
        assert_eq!(config.speech_defaults.rate, 1.5);
        assert_eq!(config.speech_defaults.pitch, 1.0);
        assert_eq!(config.speech_defaults.volume, 0.25);
    }

    #[test]
    #[serial]
    fn test_malformed_values_are_config_errors() {
        clear_env();
        env::set_var(SPEECH_PITCH_VAR, "high");
        let err = BridgeConfig::from_env().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(err.message().contains(SPEECH_PITCH_VAR));

        clear_env();
        env::set_var(READ_ONLY_VAR, "maybe");
        assert!(BridgeConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    fn test_validate_rejects_out_of_range_prosody() {
        let mut config = BridgeConfig::default();
        config.speech_defaults.rate = 0.0;
        assert!(validate_config(&config).is_err());

        let mut config = BridgeConfig::default();
        config.speech_defaults.volume = 1.5;
        let err = validate_config(&config).unwrap_err();
        assert!(err.message().contains(SPEECH_VOLUME_VAR));

        let mut config = BridgeConfig::default();
        config.speech_defaults.pitch = f32::NAN;
        assert!(validate_config(&config).is_err());
    }
}
