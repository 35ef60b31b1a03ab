use std::{path::Path, str::FromStr, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected `key = value`")]
    MissingValue { line: usize },
    #[error("line {line}: invalid value `{value}` for {key}")]
    InvalidValue { line: usize, key: String, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// How often progress is broadcast while a walk is running.
    pub tick_interval: Duration,
    /// How long `start` waits for the first fix.
    pub fix_timeout: Duration,
    pub command_capacity: usize,
    pub event_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            fix_timeout: Duration::from_secs(10),
            command_capacity: 32,
            event_capacity: 64,
        }
    }
}

impl TrackerConfig {
    /// Reads `key = value` lines. Missing keys keep their defaults.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::MissingValue { line: line_number });
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "tick_interval_ms" => config.tick_interval = Duration::from_millis(parse_positive(line_number, key, value)?),
                "fix_timeout_ms" => config.fix_timeout = Duration::from_millis(parse_positive(line_number, key, value)?),
                "command_capacity" => config.command_capacity = parse_positive(line_number, key, value)?,
                "event_capacity" => config.event_capacity = parse_positive(line_number, key, value)?,
                _ => tracing::warn!("Unknown config key: {}", key),
            }
        }

        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }
}

// Zero would make tokio intervals and channels panic
fn parse_positive<T: FromStr + Default + PartialEq>(line: usize, key: &str, value: &str) -> Result<T, ConfigError> {
    match value.parse::<T>() {
        Ok(parsed) if parsed != T::default() => Ok(parsed),
        _ => Err(invalid(line, key, value)),
    }
}

fn invalid(line: usize, key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        line,
        key: key.to_string(),
        value: value.to_string(),
    }
}
