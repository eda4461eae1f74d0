//! Configuration loading, validation and persistence.
//!
//! Settings are stored as a JSON file. Durations are written as human
//! readable strings (`"500ms"`, `"2s"`, `"1m"`); a bare number means
//! milliseconds.

use crate::error::{Result, TswError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// User-facing settings for the substitution engine and the `tsw` driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Pause between synthesized keystrokes when typing character by
    /// character into a sensitive application.
    #[serde(default = "default_key_delay", with = "duration_format")]
    pub key_delay: Duration,

    /// How long after the paste chord the clipboard backup is restored.
    /// Restoring too early races the target application's paste handling.
    #[serde(
        default = "default_clipboard_restore_delay",
        with = "duration_format"
    )]
    pub clipboard_restore_delay: Duration,

    /// Executable names (with extension) that must never receive
    /// clipboard-based substitution.
    #[serde(default)]
    pub sensitive_processes: Vec<String>,

    /// Global hotkey that fires the configured substitution in hotkey mode.
    #[serde(default = "default_trigger_hotkey")]
    pub trigger_hotkey: String,

    /// Verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_key_delay() -> Duration {
    Duration::ZERO
}

fn default_clipboard_restore_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_trigger_hotkey() -> String {
    "ctrl+alt+t".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_delay: default_key_delay(),
            clipboard_restore_delay: default_clipboard_restore_delay(),
            sensitive_processes: Vec::new(),
            trigger_hotkey: default_trigger_hotkey(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load and validate a configuration file.
    pub fn from_file(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| TswError::config_load(path, err.to_string()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| TswError::config_load(path, err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| TswError::config_save(path, err.to_string()))?;
        fs::write(path, json).map_err(|err| TswError::config_save(path, err.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.clipboard_restore_delay.is_zero() {
            return Err(TswError::config_validation(
                "clipboard_restore_delay cannot be zero",
            ));
        }
        if self.clipboard_restore_delay > Duration::from_secs(60) {
            return Err(TswError::config_validation(
                "clipboard_restore_delay cannot exceed 60s",
            ));
        }
        if self.key_delay > Duration::from_secs(2) {
            return Err(TswError::config_validation("key_delay cannot exceed 2s"));
        }
        if self
            .sensitive_processes
            .iter()
            .any(|name| name.trim().is_empty())
        {
            return Err(TswError::config_validation(
                "sensitive_processes entries cannot be empty",
            ));
        }
        if self.trigger_hotkey.trim().is_empty() {
            return Err(TswError::config_validation(
                "trigger_hotkey cannot be empty",
            ));
        }
        Ok(())
    }
}

/// Parse a duration string: `"500ms"`, `"2s"`, `"1m"` or a bare number of
/// milliseconds. Case-insensitive, surrounding whitespace ignored.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(TswError::invalid_duration(value, "empty duration"));
    }

    let (number, unit_ms) = if let Some(stripped) = trimmed.strip_suffix("ms") {
        (stripped, 1u64)
    } else if let Some(stripped) = trimmed.strip_suffix('s') {
        (stripped, 1_000)
    } else if let Some(stripped) = trimmed.strip_suffix('m') {
        (stripped, 60_000)
    } else {
        (trimmed.as_str(), 1)
    };

    let amount: u64 = number.trim().parse().map_err(|_| {
        TswError::invalid_duration(value, "expected a non-negative number with ms/s/m suffix")
    })?;
    amount
        .checked_mul(unit_ms)
        .map(Duration::from_millis)
        .ok_or_else(|| TswError::invalid_duration(value, "duration is too large"))
}

mod duration_format {
    use super::parse_duration;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        parse_duration(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.key_delay, Duration::ZERO);
        assert_eq!(config.clipboard_restore_delay, Duration::from_millis(1000));
        assert!(config.sensitive_processes.is_empty());
        assert_eq!(config.trigger_hotkey, "ctrl+alt+t");
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_fields() {
        let json = r#"
        {
            "key_delay": "20ms",
            "clipboard_restore_delay": "2s",
            "sensitive_processes": ["keepass.exe", "1password.exe"],
            "trigger_hotkey": "ctrl+shift+space",
            "verbose": true
        }
        "#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.key_delay, Duration::from_millis(20));
        assert_eq!(config.clipboard_restore_delay, Duration::from_secs(2));
        assert_eq!(config.sensitive_processes.len(), 2);
        assert_eq!(config.trigger_hotkey, "ctrl+shift+space");
        assert!(config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duration_parsing_edge_cases() {
        // Valid cases
        assert_eq!(parse_duration("0ms").unwrap(), Duration::from_millis(0));
        assert_eq!(parse_duration("1000").unwrap(), Duration::from_millis(1000));
        assert_eq!(parse_duration("5S").unwrap(), Duration::from_secs(5)); // Case insensitive
        assert_eq!(parse_duration(" 2m ").unwrap(), Duration::from_secs(120)); // Whitespace

        // Invalid cases
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("1000x").is_err());
        assert!(parse_duration("-1000ms").is_err());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config {
            clipboard_restore_delay: Duration::ZERO,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        config.clipboard_restore_delay = Duration::from_secs(120);
        assert!(config.validate().is_err());

        config.clipboard_restore_delay = Duration::from_millis(1000);
        config.key_delay = Duration::from_secs(5);
        assert!(config.validate().is_err());

        config.key_delay = Duration::ZERO;
        config.sensitive_processes = vec!["keepass.exe".to_string(), "  ".to_string()];
        assert!(config.validate().is_err());

        config.sensitive_processes = vec!["keepass.exe".to_string()];
        config.trigger_hotkey = "".to_string();
        assert!(config.validate().is_err());

        config.trigger_hotkey = "ctrl+alt+t".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duration_serialization_round_trip() {
        let config = Config {
            key_delay: Duration::from_millis(15),
            clipboard_restore_delay: Duration::from_millis(1500),
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"15ms\""));
        assert!(json.contains("\"1500ms\""));

        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
