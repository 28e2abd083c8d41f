use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthConfig {
    pub token_cache: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BookingConfig {
    #[serde(default)]
    pub fallback: FallbackPolicy,
    #[serde(default)]
    pub default_court: Option<String>,
}

/// What to show when the court or slot list cannot be fetched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    #[default]
    Disabled,
    Demo,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    pub fn load_or_create() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("court-book")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8080/api".to_string(),
                timeout_secs: 15,
            },
            auth: AuthConfig {
                token_cache: Self::config_dir().join("token.json"),
            },
            booking: BookingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_points_at_local_api() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8080/api");
        assert_eq!(config.api.timeout_secs, 15);
    }

    #[test]
    fn default_config_disables_fallback_data() {
        let config = Config::default();
        assert_eq!(config.booking.fallback, FallbackPolicy::Disabled);
        assert!(config.booking.default_court.is_none());
    }

    #[test]
    fn parse_valid_toml_config() {
        let toml_content = r#"
            [api]
            base_url = "https://courts.example.com/api"
            timeout_secs = 5

            [auth]
            token_cache = "/tmp/token.json"

            [booking]
            fallback = "demo"
            default_court = "court-2"
        "#;

        let config = Config::from_toml(toml_content).unwrap();

        assert_eq!(config.api.base_url, "https://courts.example.com/api");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.auth.token_cache, PathBuf::from("/tmp/token.json"));
        assert_eq!(config.booking.fallback, FallbackPolicy::Demo);
        assert_eq!(config.booking.default_court.as_deref(), Some("court-2"));
    }

    #[test]
    fn booking_section_is_optional() {
        let toml_content = r#"
            [api]
            base_url = "http://localhost:9000"
            timeout_secs = 10

            [auth]
            token_cache = "/tmp/token.json"
        "#;

        let config = Config::from_toml(toml_content).unwrap();

        assert_eq!(config.booking, BookingConfig::default());
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let invalid_toml = "this is not valid toml";
        let result = Config::from_toml(invalid_toml);
        assert!(result.is_err());
    }

    #[test]
    fn saved_config_reads_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.booking.fallback = FallbackPolicy::Demo;

        config.save_to(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();

        assert_eq!(Config::from_toml(&content).unwrap(), config);
    }
}
