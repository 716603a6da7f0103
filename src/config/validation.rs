//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use crate::proto::is_channel_name;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("irc.server is required")]
    MissingServer,
    #[error("irc.port must not be 0")]
    InvalidPort,
    #[error("irc.nick is required")]
    MissingNick,
    #[error("irc.nick must not contain spaces or start with '#', '&' or ':', got '{0}'")]
    InvalidNick(String),
    #[error("irc.channel must be a channel name starting with '#' or '&', got '{0}'")]
    InvalidChannel(String),
    #[error("rate_limit.messages_per_second must not be 0")]
    InvalidRate,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let irc = &config.irc;

    if irc.server.trim().is_empty() {
        errors.push(ValidationError::MissingServer);
    }
    if irc.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    if irc.nick.is_empty() {
        errors.push(ValidationError::MissingNick);
    } else if irc.nick.contains(char::is_whitespace) || irc.nick.starts_with(['#', '&', ':']) {
        errors.push(ValidationError::InvalidNick(irc.nick.clone()));
    }

    if !is_channel_name(&irc.channel) || irc.channel.contains([' ', ',']) {
        errors.push(ValidationError::InvalidChannel(irc.channel.clone()));
    }

    if config.rate_limit.messages_per_second == 0 {
        errors.push(ValidationError::InvalidRate);
    }

    let db_path = Path::new(&config.database.path);
    if config.database.path != ":memory:"
        && let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        errors.push(ValidationError::DatabasePathInvalid(config.database.path.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
