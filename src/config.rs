use crate::error::{LedgerError, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for the ledger service
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Practice-time credit policy
    pub credit: CreditConfig,

    /// Retry configuration
    pub retry: RetryConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to
    pub bind: String,

    /// Port for the HTTP listener
    pub port: u16,

    /// Origin allowed by the CORS layer (the SPA dev server by default)
    pub cors_origin: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Maximum connection pool size
    pub max_connections: u32,

    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u32,

    /// Path to database file (relative to data directory)
    pub path: String,
}

/// Fixed practice-time credits granted per action.
///
/// These are policy constants, not measured wall-clock time: a quiz or an
/// AI reply credits a flat number of seconds regardless of how long the
/// student actually spent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditConfig {
    /// Seconds credited for each AI tutor reply
    pub ai_reply_seconds: i64,

    /// Seconds credited for a quiz when the client supplies no duration
    pub quiz_default_seconds: i64,

    /// Seconds credited per question when crediting by question count
    pub seconds_per_question: i64,
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Database operation retry configuration
    pub db_ops: RetrySettings,
}

/// Individual retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum number of retry attempts
    pub max_attempts: u32,

    /// Initial delay in milliseconds
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,

    /// Backoff factor (multiplier for each retry)
    pub backoff_factor: f32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1".to_string(),
            port: 5000,
            cors_origin: "http://localhost:5173".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            max_connections: 5,
            busy_timeout_ms: 10000,
            path: "ledger.db".to_string(),
        }
    }
}

impl Default for CreditConfig {
    fn default() -> Self {
        CreditConfig {
            ai_reply_seconds: 60,
            quiz_default_seconds: 120,
            seconds_per_question: 30,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            db_ops: RetrySettings {
                max_attempts: 5,
                initial_delay_ms: 50,
                max_delay_ms: 2000,
                backoff_factor: 1.5,
            },
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_factor: 2.0,
        }
    }
}

// Configuration loading
impl Config {
    /// Load configuration from file, or use defaults
    pub fn load() -> Result<Self> {
        // Try to find config file in standard locations
        if let Some(config_path) = Self::find_config_file() {
            Self::load_from_file(&config_path)
        } else {
            // No config file found, use defaults
            Ok(Config::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| LedgerError::config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| LedgerError::config(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| LedgerError::config(format!("Failed to serialize config: {}", e)))?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LedgerError::config(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, toml_string)
            .map_err(|e| LedgerError::config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Find config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check in order of priority:
        // 1. Environment variable from CLI flag
        if let Ok(path) = std::env::var("STUDY_LEDGER_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Environment variable
        if let Ok(path) = std::env::var("STUDY_LEDGER_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 3. XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("study-ledger").join("config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 4. Home directory
        if let Some(home_dir) = dirs::home_dir() {
            let path = home_dir.join(".study-ledger.toml");
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Get default config file path (for creating new config)
    pub fn default_config_path() -> Result<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("study-ledger").join("config.toml"))
        } else {
            Err(LedgerError::config("Could not determine config directory"))
        }
    }

    /// Generate example config file content
    pub fn example_toml() -> &'static str {
        r#"# Study Ledger Configuration File
#
# This file configures the activity ledger service.
# All values shown are the defaults - you can override only what you need.

[server]
# HTTP listener
bind = "127.0.0.1"
port = 5000

# Origin allowed by the CORS layer
cors_origin = "http://localhost:5173"

[database]
# Database connection settings
max_connections = 5
busy_timeout_ms = 10000
path = "ledger.db"  # Relative to data directory

[credit]
# Fixed practice-time credits per action (seconds)
ai_reply_seconds = 60       # Credited for each AI tutor reply
quiz_default_seconds = 120  # Credited for a quiz with no explicit duration
seconds_per_question = 30   # Credited per question when counting questions

[retry.db_ops]
# Database operation retry settings
max_attempts = 5
initial_delay_ms = 50
max_delay_ms = 2000
backoff_factor = 1.5
"#
    }
}

// Global configuration instance
use std::sync::OnceLock;

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration instance
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| {
        Config::load().unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Config::default()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.credit.ai_reply_seconds, 60);
        assert_eq!(config.credit.quiz_default_seconds, 120);
        assert_eq!(config.credit.seconds_per_question, 30);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.server.port = 8088;
        config.save(&config_path).unwrap();

        let loaded_config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(loaded_config.server.port, 8088);
        assert_eq!(
            loaded_config.credit.quiz_default_seconds,
            config.credit.quiz_default_seconds
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "[credit]\nai_reply_seconds = 90\n").unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.credit.ai_reply_seconds, 90);
        // Untouched sections keep their defaults
        assert_eq!(config.credit.quiz_default_seconds, 120);
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_example_config() {
        let example = Config::example_toml();
        assert!(example.contains("Study Ledger Configuration"));
        assert!(example.contains("quiz_default_seconds"));
        assert!(example.contains("cors_origin"));

        // The example must itself be valid TOML
        let parsed: Config = toml::from_str(example).unwrap();
        assert_eq!(parsed.credit.ai_reply_seconds, 60);
    }
}
