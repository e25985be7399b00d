//! Logging setup
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use purr_core::{PurrError, PurrResult};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info,purr_runtime=debug`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LogConfig {
    pub fn json() -> Self {
        LogConfig {
            format: LogFormat::Json,
            ..Default::default()
        }
    }

    fn filter(&self) -> PurrResult<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|e| PurrError::Logging(format!("bad filter {:?}: {}", self.level, e))),
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> PurrResult<()> {
    let filter = config.filter()?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| PurrError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(LogConfig::json().format, LogFormat::Json);
    }

    #[test]
    fn test_filter_accepts_directives() {
        let config = LogConfig {
            level: "warn,purr_runtime=debug".to_string(),
            ..Default::default()
        };
        assert!(config.filter().is_ok());
    }
}
