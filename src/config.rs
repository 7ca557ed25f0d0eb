// Configuration management for the route resolver
// Supports CLI arguments, config file (TOML), and environment variables

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

/// Route resolver - show which interface the system would route an address through
#[derive(Parser, Debug, Clone)]
#[command(name = "route-resolver")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace)
    #[arg(short, long, env = "RR_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Path to configuration file
    #[arg(short, long, env = "RR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seconds after startup during which routing tables are not cached
    #[arg(long, env = "RR_GRACE_PERIOD")]
    pub grace_period: Option<u64>,

    /// Maximum attempts at dumping a routing table that keeps growing
    #[arg(long, env = "RR_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Resolve the outgoing interface for one or more addresses
    Resolve {
        #[arg(required = true)]
        addresses: Vec<IpAddr>,
    },
    /// Print the parsed routing table
    Table {
        /// Show the IPv6 table instead of IPv4
        #[arg(long)]
        ipv6: bool,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Configuration file structure (TOML format)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Seconds after creation during which the cache is bypassed
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,

    /// Attempts at a size-then-fetch dump before giving up
    #[serde(default = "default_max_dump_attempts")]
    pub max_dump_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_grace_period() -> u64 {
    10
}
fn default_max_dump_attempts() -> u32 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            grace_period_secs: default_grace_period(),
            max_dump_attempts: default_max_dump_attempts(),
        }
    }
}

impl ResolverConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

/// Merged configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: Level,
    pub resolver: ResolverConfig,
    pub command: Command,
    /// Config file that was loaded, if any
    pub config_path: Option<PathBuf>,
}

const DEFAULT_CONFIG_PATH: &str = "route-resolver.toml";

impl Config {
    /// Load configuration from all sources (CLI args, config file, defaults)
    /// Priority: CLI args > Config file > Defaults
    pub fn load() -> anyhow::Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(cli_args: CliArgs) -> anyhow::Result<Self> {
        let config_path = cli_args.config.clone().or_else(|| {
            let path = PathBuf::from(DEFAULT_CONFIG_PATH);
            path.exists().then_some(path)
        });
        let config_file = match &config_path {
            Some(path) => load_config_file(path)?,
            None => ConfigFile::default(),
        };

        let mut resolver = config_file.resolver;
        if let Some(secs) = cli_args.grace_period {
            resolver.grace_period_secs = secs;
        }
        if let Some(attempts) = cli_args.max_attempts {
            resolver.max_dump_attempts = attempts;
        }
        if resolver.max_dump_attempts == 0 {
            anyhow::bail!("max_dump_attempts must be at least 1");
        }

        let level = cli_args
            .log_level
            .as_deref()
            .unwrap_or(&config_file.logging.level);
        let log_level = parse_log_level(level)?;

        Ok(Config {
            log_level,
            resolver,
            command: cli_args.command,
            config_path,
        })
    }
}

fn load_config_file(path: &Path) -> anyhow::Result<ConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str::<ConfigFile>(&content)?)
}

fn parse_log_level(level_str: &str) -> anyhow::Result<Level> {
    match level_str.to_lowercase().as_str() {
        "error" => Ok(Level::ERROR),
        "warn" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        _ => Err(anyhow::anyhow!("Invalid log level: {}", level_str)),
    }
}
