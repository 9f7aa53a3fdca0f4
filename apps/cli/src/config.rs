//! # CLI Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     SPLITWISER_EXCLUSION_MARKER=*                                       │
//! │     SPLITWISER_DECIMAL_SEPARATOR=,                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     --config <path>, or                                                 │
//! │     ~/.config/splitwiser/config.toml (Linux)                            │
//! │     ~/Library/Application Support/com.splitwiser.splitwiser/... (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [parsing]
//! exclusion_marker = "!"
//! reset_payer_on_blank_line = false
//!
//! [format]
//! decimal_separator = ","
//! thousands_separator = "."
//!
//! [log]
//! level = "warn"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use splitwiser_core::{NumberFormat, ParseOptions, SplitConfig};
use tracing::debug;

use crate::error::ConfigError;

/// Prefix of every environment override.
const ENV_PREFIX: &str = "SPLITWISER_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub parsing: ParseOptions,

    #[serde(default)]
    pub format: NumberFormat,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
        }
    }
}

impl CliConfig {
    /// Loads configuration: defaults, then the TOML file, then environment.
    ///
    /// An explicit path must exist; the default path is optional.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let explicit = config_path.is_some();
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() || explicit {
                debug!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Read { path, source })?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// The options the core library needs.
    pub fn split_config(&self) -> SplitConfig {
        SplitConfig {
            parsing: self.parsing.clone(),
            format: self.format.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.split_config().validate()?;
        Ok(())
    }

    /// Applies `SPLITWISER_*` overrides read through `var`.
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| var(&format!("{}{}", ENV_PREFIX, name));

        if let Some(value) = get("EXCLUSION_MARKER") {
            self.parsing.exclusion_marker = single_char("EXCLUSION_MARKER", &value)?;
        }

        if let Some(value) = get("RESET_PAYER_ON_BLANK_LINE") {
            self.parsing.reset_payer_on_blank_line = match value.trim() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => return Err(invalid("RESET_PAYER_ON_BLANK_LINE", &value)),
            };
        }

        if let Some(value) = get("DECIMAL_SEPARATOR") {
            self.format.decimal_separator = single_char("DECIMAL_SEPARATOR", &value)?;
        }

        if let Some(value) = get("THOUSANDS_SEPARATOR") {
            self.format.thousands_separator = match value.as_str() {
                "" | "none" => None,
                _ => Some(single_char("THOUSANDS_SEPARATOR", &value)?),
            };
        }

        if let Some(value) = get("LOG") {
            debug!(level = %value, "Overriding log level from environment");
            self.log.level = value;
        }

        Ok(())
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "splitwiser", "splitwiser")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

fn single_char(key: &str, value: &str) -> Result<char, ConfigError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(invalid(key, value)),
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: format!("{}{}", ENV_PREFIX, key),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.parsing.exclusion_marker, '!');
        assert_eq!(config.log.level, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_sections() {
        let config = CliConfig::from_toml(
            r#"
            [parsing]
            reset_payer_on_blank_line = true

            [format]
            decimal_separator = ","
            thousands_separator = "."
            "#,
        )
        .unwrap();

        assert!(config.parsing.reset_payer_on_blank_line);
        assert_eq!(config.parsing.exclusion_marker, '!');
        assert_eq!(config.format, NumberFormat::european());
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(matches!(
            CliConfig::from_toml("[parsing]\nexclusion_marker = 5"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("SPLITWISER_EXCLUSION_MARKER", "*"),
            ("SPLITWISER_RESET_PAYER_ON_BLANK_LINE", "yes"),
            ("SPLITWISER_THOUSANDS_SEPARATOR", "none"),
            ("SPLITWISER_LOG", "debug"),
        ]);
        let mut config = CliConfig::default();
        config.apply_overrides(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.parsing.exclusion_marker, '*');
        assert!(config.parsing.reset_payer_on_blank_line);
        assert_eq!(config.format.thousands_separator, None);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_env_override_rejects_bad_values() {
        let vars = env(&[("SPLITWISER_DECIMAL_SEPARATOR", "..")]);
        let mut config = CliConfig::default();
        assert!(matches!(
            config.apply_overrides(|k| vars.get(k).cloned()),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validation_catches_clashes() {
        let mut config = CliConfig::default();
        config.format.decimal_separator = ',';
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let path = std::env::temp_dir().join("splitwiser-missing-config-for-test.toml");
        assert!(matches!(
            CliConfig::load(Some(path)),
            Err(ConfigError::Read { .. })
        ));
    }
}
