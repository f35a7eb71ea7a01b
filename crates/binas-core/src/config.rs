//! Binas configuration
//!
//! Loaded from TOML, then overridden by `BINAS_*` environment variables, then
//! validated. Every section has defaults so an empty file is a valid config.

use crate::errors::{BinasError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "BINAS_";

/// Quorum register timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumConfig {
    /// Deadline for one quorum read or write, in milliseconds
    pub timeout_ms: u64,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self { timeout_ms: 2_000 }
    }
}

impl QuorumConfig {
    /// Deadline for one quorum round
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Values a station falls back to on reset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationDefaults {
    /// Number of docks
    pub capacity: i64,
    /// Credit awarded for each return
    pub return_bonus: i64,
}

impl Default for StationDefaults {
    fn default() -> Self {
        Self {
            capacity: 20,
            return_bonus: 0,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinasConfig {
    /// Directory name prefix every station replica registers under
    pub station_prefix: String,
    /// Directory service endpoint
    pub directory_url: String,
    /// Credit given to newly created users
    pub initial_credit: i64,
    /// Quorum register timing
    pub quorum: QuorumConfig,
    /// Station reset values
    pub station_defaults: StationDefaults,
}

impl Default for BinasConfig {
    fn default() -> Self {
        Self {
            station_prefix: "A00_Station".to_string(),
            directory_url: "http://localhost:9090".to_string(),
            initial_credit: 10,
            quorum: QuorumConfig::default(),
            station_defaults: StationDefaults::default(),
        }
    }
}

impl BinasConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BinasError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Apply `BINAS_*` overrides from the process environment
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply overrides from an explicit variable list.
    ///
    /// Unrelated variables are ignored; a recognised variable with an
    /// unparsable value is an error.
    pub fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "STATION_PREFIX" => self.station_prefix = value,
                "DIRECTORY_URL" => self.directory_url = value,
                "INITIAL_CREDIT" => self.initial_credit = parse_var(&key, &value)?,
                "QUORUM_TIMEOUT_MS" => self.quorum.timeout_ms = parse_var(&key, &value)?,
                _ => continue,
            }
            tracing::debug!(variable = %key, "Applied environment override");
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.station_prefix.is_empty() {
            return Err(BinasError::config("station_prefix must not be empty"));
        }
        if self.initial_credit < 0 {
            return Err(BinasError::config(format!(
                "initial_credit must be non-negative, got {}",
                self.initial_credit
            )));
        }
        if self.quorum.timeout_ms == 0 {
            return Err(BinasError::config("quorum.timeout_ms must be positive"));
        }
        if self.station_defaults.capacity < 0 || self.station_defaults.return_bonus < 0 {
            return Err(BinasError::config("station_defaults must be non-negative"));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| BinasError::config(format!("{key}={value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let config = BinasConfig::from_toml_str("").unwrap();
        assert_eq!(config, BinasConfig::default());
        assert_eq!(config.quorum.timeout(), Duration::from_secs(2));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = BinasConfig::from_toml_str(
            r#"
            station_prefix = "T01_Station"

            [quorum]
            timeout_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.station_prefix, "T01_Station");
        assert_eq!(config.quorum.timeout_ms, 250);
        assert_eq!(config.initial_credit, 10);
        assert_eq!(config.station_defaults.capacity, 20);
    }

    #[test]
    fn load_from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "initial_credit = 3").unwrap();
        let config = BinasConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.initial_credit, 3);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = BinasConfig::load_from_file(Path::new("/nonexistent/binas.toml")).unwrap_err();
        assert_eq!(err.code(), "config");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = BinasConfig::default();
        config
            .merge_with_vars(vec![
                ("BINAS_INITIAL_CREDIT".to_string(), "7".to_string()),
                ("BINAS_QUORUM_TIMEOUT_MS".to_string(), "90".to_string()),
                ("PATH".to_string(), "/bin".to_string()),
            ])
            .unwrap();
        assert_eq!(config.initial_credit, 7);
        assert_eq!(config.quorum.timeout_ms, 90);
    }

    #[test]
    fn unparsable_env_override_is_rejected() {
        let mut config = BinasConfig::default();
        let err = config
            .merge_with_vars(vec![("BINAS_INITIAL_CREDIT".to_string(), "lots".to_string())])
            .unwrap_err();
        assert_eq!(err.code(), "config");
    }

    #[test]
    fn validation_rejects_negative_credit_and_zero_timeout() {
        let mut config = BinasConfig {
            initial_credit: -1,
            ..BinasConfig::default()
        };
        assert!(config.validate().is_err());

        config.initial_credit = 0;
        config.quorum.timeout_ms = 0;
        assert!(config.validate().is_err());

        config.quorum.timeout_ms = 1;
        assert!(config.validate().is_ok());
    }
}
