//! Error types for inventory-chat.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for inventory-chat operations.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Language model call failed (network, auth, rate limit, bad payload).
    #[error("Generation error: {0}")]
    Generation(String),

    /// SQL execution failed (syntax errors, unknown tables, constraint violations).
    #[error("Query error: {0}")]
    Query(String),

    /// Database connection errors (bad URL, file not found, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration errors (invalid config file, bad provider label, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Creates a generation error with the given message.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Generation(_) => "Generation Error",
            Self::Query(_) => "Query Error",
            Self::Connection(_) => "Connection Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the underlying message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Generation(msg)
            | Self::Query(msg)
            | Self::Connection(msg)
            | Self::Config(msg)
            | Self::Internal(msg) => msg,
        }
    }
}

/// Result type alias using ChatError.
pub type Result<T> = std::result::Result<T, ChatError>;
