//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::defaults::*;
use crate::network::IrcSettings;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server connection and identity.
    pub irc: IrcConfig,
    /// Modules and behaviour.
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Outbound flood control.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Connection parameters for [`crate::network::IrcConnection`].
    pub fn irc_settings(&self) -> IrcSettings {
        let irc = &self.irc;
        IrcSettings {
            server: irc.server.clone(),
            port: irc.port,
            tls: irc.tls,
            verify_cert: irc.verify_cert,
            nick: irc.nick.clone(),
            username: irc.username.clone().unwrap_or_else(|| irc.nick.clone()),
            realname: irc.realname.clone(),
            channel: non_empty(&irc.channel),
            channel_key: irc.channel_key.as_deref().and_then(non_empty),
            password: irc.password.as_deref().and_then(non_empty),
            connect_timeout: Duration::from_secs(irc.connect_timeout_secs),
            registration_timeout: Duration::from_secs(irc.registration_timeout_secs),
            messages_per_second: self.rate_limit.messages_per_second,
            burst: self.rate_limit.burst,
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.trim().is_empty()).then(|| s.to_string())
}

/// IRC server and identity.
#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    /// Server host name (e.g., "irc.libera.chat").
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub tls: bool,
    /// Disable only for self-signed test servers.
    #[serde(default = "default_true")]
    pub verify_cert: bool,
    pub nick: String,
    /// Defaults to the nick.
    pub username: Option<String>,
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Home channel, joined after registration.
    pub channel: String,
    pub channel_key: Option<String>,
    /// Server password sent with PASS.
    pub password: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_registration_timeout")]
    pub registration_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Modules to load, in order.
    #[serde(default = "default_modules")]
    pub modules: Vec<String>,
    /// Nicks allowed to run admin commands.
    #[serde(default)]
    pub admins: Vec<String>,
    /// Per-invocation handler bound in seconds; 0 disables it.
    #[serde(default = "default_handler_timeout")]
    pub handler_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            modules: default_modules(),
            admins: Vec::new(),
            handler_timeout_secs: default_handler_timeout(),
        }
    }
}

impl BotConfig {
    pub fn handler_timeout(&self) -> Option<Duration> {
        (self.handler_timeout_secs > 0).then(|| Duration::from_secs(self.handler_timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file, or ":memory:".
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_messages_per_second")]
    pub messages_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            messages_per_second: default_messages_per_second(),
            burst: default_burst(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}
