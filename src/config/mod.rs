//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions (Config, IrcConfig, BotConfig, ...)
//! - [`defaults`]: serde default value functions
//! - [`validation`]: startup checks that report every problem at once

mod defaults;
mod types;
mod validation;

pub use types::{
    BotConfig, Config, ConfigError, DatabaseConfig, IrcConfig, LoggingConfig, RateLimitConfig,
};
pub use validation::{ValidationError, validate};
