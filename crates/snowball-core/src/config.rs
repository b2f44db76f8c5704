//! Snowball Configuration Management
//!
//! Handles configuration from environment variables and config files,
//! with defaults that work against local tagger/oracle services.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Web search configuration
    pub search: SearchConfig,

    /// Page fetching configuration
    pub fetch: FetchConfig,

    /// Sentence segmentation / NER configuration
    pub tagger: TaggerConfig,

    /// Relation classifier configuration
    pub oracle: OracleConfig,

    /// Candidate extraction configuration
    pub extraction: ExtractionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|message| ConfigError::ParseError { path, message })
    }

    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        if let Ok(provider) = std::env::var("SNOWBALL_TAGGER") {
            self.tagger.provider = provider.parse()?;
        }
        if let Ok(url) = std::env::var("SNOWBALL_TAGGER_URL") {
            self.tagger.url = url;
        }

        if let Ok(provider) = std::env::var("SNOWBALL_ORACLE") {
            self.oracle.provider = provider.parse()?;
        }
        if let Ok(url) = std::env::var("SNOWBALL_ORACLE_URL") {
            self.oracle.url = url;
        }

        if let Ok(size) = std::env::var("SNOWBALL_WINDOW_SIZE") {
            self.extraction.window_size = parse_env("SNOWBALL_WINDOW_SIZE", size)?;
        }
        if let Ok(secs) = std::env::var("SNOWBALL_FETCH_TIMEOUT_SECS") {
            self.fetch.timeout_secs = parse_env("SNOWBALL_FETCH_TIMEOUT_SECS", secs)?;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extraction.window_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "extraction.window_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::InvalidValue {
                key: "search.max_results".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Custom Search JSON API endpoint
    pub endpoint: String,

    /// Maximum results per query
    pub max_results: usize,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
            max_results: 10,
            timeout_secs: 30,
        }
    }
}

/// Page fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-page timeout in seconds
    pub timeout_secs: u64,

    /// Plain text beyond this many characters is discarded
    pub max_text_chars: usize,

    /// User agent sent with page requests
    pub user_agent: String,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_text_chars: 20_000,
            user_agent: concat!("snowball/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Tagger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    pub provider: TaggerProvider,

    /// Base URL of the tagging service (http provider)
    pub url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            provider: TaggerProvider::Rule,
            url: "http://localhost:8001".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Supported taggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaggerProvider {
    /// Built-in regex and dictionary tagger
    Rule,
    /// Remote tagging service
    Http,
}

impl std::str::FromStr for TaggerProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rule" => Ok(Self::Rule),
            "http" => Ok(Self::Http),
            _ => Err(ConfigError::InvalidValue {
                key: "SNOWBALL_TAGGER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Relation classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub provider: OracleProvider,

    /// Base URL of the classifier service (http provider)
    pub url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: OracleProvider::Keyword,
            url: "http://localhost:8002".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Supported relation classifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    /// Built-in trigger keyword classifier
    Keyword,
    /// Remote classifier service
    Http,
}

impl std::str::FromStr for OracleProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keyword" => Ok(Self::Keyword),
            "http" => Ok(Self::Http),
            _ => Err(ConfigError::InvalidValue {
                key: "SNOWBALL_ORACLE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Candidate extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum entity gap and window width, in tokens
    pub window_size: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self { window_size: 40 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl From<ConfigError> for crate::SnowballError {
    fn from(err: ConfigError) -> Self {
        crate::SnowballError::ConfigError(err.to_string())
    }
}
