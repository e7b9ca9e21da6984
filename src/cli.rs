//! Command-line argument parsing for inventory-chat.
//!
//! Flags given here override both the environment and the config file.

use crate::config::Config;
use crate::llm::Provider;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Natural-language chat over an inventory database.
#[derive(Parser, Debug)]
#[command(name = "inventory-chat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Database connection URL (e.g., sqlite:///./inventory.db, postgres://user@host/db)
    #[arg(long, global = true, value_name = "URL")]
    pub database_url: Option<String>,

    /// Base URL of the OpenAI-compatible model API
    #[arg(long, global = true, value_name = "URL")]
    pub model_base_url: Option<String>,

    /// Model API key
    #[arg(long, global = true, value_name = "KEY")]
    pub model_api_key: Option<String>,

    /// Model name (e.g., llama-3.3-70b-versatile)
    #[arg(long, global = true, value_name = "NAME")]
    pub model_name: Option<String>,

    /// Provider label reported in responses (openai, azure)
    #[arg(long, global = true, value_name = "PROVIDER")]
    pub provider: Option<Provider>,

    /// Schema DDL file used as prompt context
    #[arg(long, global = true, value_name = "PATH")]
    pub schema_path: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, env = "LOG_FILE", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands. `serve` runs when none is given.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP API
    Serve {
        /// Address to listen on (e.g., 0.0.0.0:8000)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// Create and seed the SQLite demo database
    InitDb,
    /// Answer one question and print the JSON response
    Ask {
        /// The question to answer
        question: String,
        /// Session identifier to attach to the request
        #[arg(long, default_value = "cli")]
        session_id: String,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Returns the subcommand, defaulting to `serve`.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Serve { bind: None })
    }

    /// Overrides config values with any flags that were given.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if let Some(base_url) = &self.model_base_url {
            config.llm.base_url = base_url.clone();
        }
        if let Some(api_key) = &self.model_api_key {
            config.llm.api_key = api_key.clone();
        }
        if let Some(model) = &self.model_name {
            config.llm.model = model.clone();
        }
        if let Some(provider) = self.provider {
            config.llm.provider = provider;
        }
        if let Some(schema_path) = &self.schema_path {
            config.schema_path = schema_path.clone();
        }
        if let Some(Command::Serve { bind: Some(bind) }) = &self.command {
            config.server.bind = bind.clone();
        }
    }
}
