//! Layered configuration loading shared by Rentory binaries
//!
//! Values are resolved from serialized defaults, then a TOML file, then
//! prefixed environment variables (`__` separates nested keys).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to parse configuration: {details}")]
    ParseError { details: String },

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Loader for configuration structs with a default, a TOML file and env overrides
pub trait ConfigLoader: Serialize + DeserializeOwned + Default {
    /// Environment variable prefix, e.g. `RENTORY_API_`
    const ENV_PREFIX: &'static str;

    /// File read when no explicit path is given. Missing is not an error.
    const DEFAULT_FILE: &'static str;

    /// Load from an explicit file, or from the default file when `None`
    fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => {
                let figment = Figment::from(Serialized::defaults(Self::default()))
                    .merge(Toml::file(Self::DEFAULT_FILE))
                    .merge(Env::prefixed(Self::ENV_PREFIX).split("__"));
                Self::extract(figment)
            }
        }
    }

    /// Load from a file that must exist
    fn load_from_file(path: &Path) -> Result<Self, ConfigurationError> {
        if !path.exists() {
            return Err(ConfigurationError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Re-apply environment overrides on top of an existing value
    fn apply_env_overrides(&mut self) -> Result<(), ConfigurationError> {
        let figment = Figment::from(Serialized::defaults(&*self))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"));
        *self = Self::extract(figment)?;
        Ok(())
    }

    /// Semantic checks run after extraction
    fn validate(&self) -> Result<(), ConfigurationError> {
        Ok(())
    }

    /// Serialize the default configuration as pretty TOML
    fn generate_example() -> Result<String, ConfigurationError> {
        toml::to_string_pretty(&Self::default()).map_err(|e| ConfigurationError::ParseError {
            details: format!("Failed to serialize config: {e}"),
        })
    }

    #[doc(hidden)]
    fn extract(figment: Figment) -> Result<Self, ConfigurationError> {
        let config: Self = figment
            .extract()
            .map_err(|e| ConfigurationError::ParseError {
                details: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct SampleConfig {
        name: String,
        port: u16,
    }

    impl Default for SampleConfig {
        fn default() -> Self {
            Self {
                name: "sample".to_string(),
                port: 8000,
            }
        }
    }

    impl ConfigLoader for SampleConfig {
        const ENV_PREFIX: &'static str = "RENTORY_COMMON_TEST_";
        const DEFAULT_FILE: &'static str = "rentory-common-test-does-not-exist.toml";

        fn validate(&self) -> Result<(), ConfigurationError> {
            if self.port == 0 {
                return Err(ConfigurationError::InvalidValue {
                    key: "port".to_string(),
                    reason: "must be non-zero".to_string(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn test_defaults_when_file_missing() {
        let config = SampleConfig::load(None).unwrap();
        assert_eq!(config, SampleConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 9100").unwrap();

        let config = SampleConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.name, "sample");
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = SampleConfig::load(Some(Path::new("/nonexistent/rentory.toml")));
        assert!(matches!(
            result,
            Err(ConfigurationError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_validation_runs_after_extraction() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 0").unwrap();

        let result = SampleConfig::load(Some(file.path()));
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_generate_example_round_trips() {
        let example = SampleConfig::generate_example().unwrap();
        let parsed: SampleConfig = toml::from_str(&example).unwrap();
        assert_eq!(parsed, SampleConfig::default());
    }
}
