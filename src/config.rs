//! Configuration module for frame-server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use crate::codec::DEFAULT_MAX_MSG;
use crate::handler::HandlerKind;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Upper bound on `max_message`. Each connection allocates its receive and
/// send buffers at this size up front.
pub const MAX_MESSAGE_LIMIT: usize = 16 * 1024 * 1024;

/// How accepted connections are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ServeMode {
    /// Serve one connection to completion before accepting the next
    #[default]
    Serial,
    /// Serve each connection on its own thread
    Threaded,
}

/// Command-line arguments for the frame server
#[derive(Parser, Debug)]
#[command(name = "frame-server")]
#[command(author = "frame-server authors")]
#[command(version = "0.1.0")]
#[command(about = "A length-prefixed request/response server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0:1234)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Listen backlog passed to the kernel
    #[arg(long)]
    pub backlog: Option<i32>,

    /// Maximum frame payload in bytes
    #[arg(short = 'm', long)]
    pub max_message: Option<usize>,

    /// Request handler
    #[arg(long, value_enum)]
    pub handler: Option<HandlerKind>,

    /// Connection scheduling
    #[arg(long, value_enum)]
    pub mode: Option<ServeMode>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub handler: HandlerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Listen backlog
    #[serde(default = "default_backlog")]
    pub backlog: i32,
    /// Connection scheduling
    #[serde(default)]
    pub mode: ServeMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            backlog: default_backlog(),
            mode: ServeMode::default(),
        }
    }
}

/// Framing configuration
#[derive(Debug, Deserialize)]
pub struct ProtocolConfig {
    /// Maximum frame payload in bytes
    #[serde(default = "default_max_message")]
    pub max_message: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_message: default_max_message(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct HandlerConfig {
    #[serde(default)]
    pub kind: HandlerKind,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:1234".to_string()
}

fn default_backlog() -> i32 {
    128
}

fn default_max_message() -> usize {
    DEFAULT_MAX_MSG
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub backlog: i32,
    pub max_message: usize,
    pub handler: HandlerKind,
    pub mode: ServeMode,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            backlog: default_backlog(),
            max_message: default_max_message(),
            handler: HandlerKind::default(),
            mode: ServeMode::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Resolve already-parsed CLI args, reading the config file they name.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let config = Self::merge(cli, toml_config);
        config.validate()?;
        Ok(config)
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            backlog: cli.backlog.unwrap_or(toml_config.server.backlog),
            max_message: cli
                .max_message
                .unwrap_or(toml_config.protocol.max_message),
            handler: cli.handler.unwrap_or(toml_config.handler.kind),
            mode: cli.mode.unwrap_or(toml_config.server.mode),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message > MAX_MESSAGE_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_message {} exceeds the limit of {} bytes",
                self.max_message, MAX_MESSAGE_LIMIT
            )));
        }
        if self.backlog <= 0 {
            return Err(ConfigError::Invalid(format!(
                "backlog must be positive, got {}",
                self.backlog
            )));
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    FileRead(PathBuf, std::io::Error),

    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    TomlParse(PathBuf, toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
