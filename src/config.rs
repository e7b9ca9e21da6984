//! Configuration management for inventory-chat.
//!
//! Configuration is resolved once at startup with this precedence:
//! 1. CLI flags (highest)
//! 2. Environment variables (a `.env` file is loaded first)
//! 3. TOML config file
//! 4. Built-in defaults
//!
//! The resolved [`Config`] is read-only for the rest of the process lifetime.

use crate::db::DatabaseBackend;
use crate::error::{ChatError, Result};
use crate::llm::openai::DEFAULT_BASE_URL;
use crate::llm::Provider;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use url::Url;

/// Main configuration structure for inventory-chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Relational store settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Language model settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Path of the schema DDL embedded in the SQL generation prompt.
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
            schema_path: default_schema_path(),
        }
    }
}

/// Relational store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (`sqlite:///./inventory.db`, `postgres://...`).
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider label reported in responses.
    #[serde(default)]
    pub provider: Provider,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (prefer the `MODEL_API_KEY` environment variable).
    #[serde(default)]
    pub api_key: String,

    /// Model name (e.g., "llama-3.3-70b-versatile", "gpt-4o").
    #[serde(default = "default_model")]
    pub model: String,

    /// HTTP request timeout for a single model call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts for transient transport failures.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite:///./inventory.db".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("schema.sql")
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("inventory-chat")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file, or defaults if it does not exist.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ChatError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ChatError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies process environment variables on top of the current values.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Applies environment-style overrides from an arbitrary lookup.
    ///
    /// Recognized keys: `DATABASE_URL`, `MODEL_BASE_URL`, `MODEL_API_KEY`,
    /// `MODEL_NAME`, `PROVIDER`, `MODEL_TIMEOUT_SECS`, `SCHEMA_PATH`, `BIND_ADDR`.
    /// Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(base_url) = get("MODEL_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(api_key) = get("MODEL_API_KEY") {
            self.llm.api_key = api_key;
        }
        if let Some(model) = get("MODEL_NAME") {
            self.llm.model = model;
        }
        if let Some(provider) = get("PROVIDER") {
            self.llm.provider = provider.parse().map_err(ChatError::config)?;
        }
        if let Some(timeout) = get("MODEL_TIMEOUT_SECS") {
            self.llm.timeout_secs = timeout.parse().map_err(|_| {
                ChatError::config(format!("MODEL_TIMEOUT_SECS must be an integer, got '{timeout}'"))
            })?;
        }
        if let Some(schema_path) = get("SCHEMA_PATH") {
            self.schema_path = PathBuf::from(schema_path);
        }
        if let Some(bind) = get("BIND_ADDR") {
            self.server.bind = bind;
        }

        Ok(())
    }

    /// Checks that the resolved values are usable.
    pub fn validate(&self) -> Result<()> {
        DatabaseBackend::from_url(&self.database.url)?;

        Url::parse(&self.llm.base_url).map_err(|e| {
            ChatError::config(format!("Invalid model base URL '{}': {e}", self.llm.base_url))
        })?;

        if self.llm.model.trim().is_empty() {
            return Err(ChatError::config("Model name must not be empty"));
        }

        self.bind_addr()?;
        Ok(())
    }

    /// Parses the server bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind.parse().map_err(|e| {
            ChatError::config(format!("Invalid bind address '{}': {e}", self.server.bind))
        })
    }

    /// Reads the schema DDL text from `schema_path`.
    pub fn load_schema_ddl(&self) -> Result<String> {
        std::fs::read_to_string(&self.schema_path).map_err(|e| {
            ChatError::config(format!(
                "Failed to read schema file {}: {e}",
                self.schema_path.display()
            ))
        })
    }
}
