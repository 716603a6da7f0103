//! Feature modules.
//!
//! Each module registers its commands and scanners on a [`Bot`] during
//! startup. Modules are selected by name from `bot.modules`; `help` is always
//! registered last so it can list every other command.

pub mod help;
pub mod memo;
pub mod pictures;
pub mod quote;
pub mod search;
pub mod webinfo;
pub mod xkcd;

use crate::core::Bot;
use crate::db::Database;
use crate::error::RegistrationError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Names accepted in `bot.modules`.
pub const AVAILABLE: &[&str] = &["memo", "webinfo", "search", "xkcd", "pictures", "quote"];

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared resources handed to modules at registration time.
#[derive(Clone)]
pub struct ModuleContext {
    pub db: Database,
    pub http: reqwest::Client,
    pub admins: Arc<[String]>,
}

impl ModuleContext {
    pub fn new(db: Database, admins: Vec<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("slirc-bot/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            db,
            http,
            admins: admins.into(),
        }
    }

    pub fn is_admin(&self, nick: &str) -> bool {
        self.admins.iter().any(|a| a.eq_ignore_ascii_case(nick))
    }
}

/// Register one module by name. Returns `false` for an unknown name.
pub fn register(name: &str, bot: &mut Bot, ctx: &ModuleContext) -> Result<bool, RegistrationError> {
    match name {
        "memo" => memo::register(bot, ctx)?,
        "webinfo" => webinfo::register(bot, ctx)?,
        "search" => search::register(bot)?,
        "xkcd" => xkcd::register(bot, ctx)?,
        "pictures" => pictures::register(bot, ctx)?,
        "quote" => quote::register(bot, ctx)?,
        _ => return Ok(false),
    }
    Ok(true)
}

/// Register the named modules in order, then `help`.
pub fn register_all<S: AsRef<str>>(
    names: &[S],
    bot: &mut Bot,
    ctx: &ModuleContext,
) -> Result<(), RegistrationError> {
    for name in names {
        let name = name.as_ref().trim();
        if register(name, bot, ctx)? {
            info!(module = %name, "Module loaded");
        } else {
            warn!(module = %name, available = ?AVAILABLE, "Unknown module skipped");
        }
    }
    help::register(bot)
}

/// Render a unix timestamp for chat output.
pub(crate) fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_all_skips_unknown_and_adds_help_last() {
        let db = Database::new(":memory:").await.unwrap();
        let ctx = ModuleContext::new(db, vec!["Alice".into()]);
        let mut bot = Bot::new();

        register_all(&["search", "nope", "pictures", "quote"], &mut bot, &ctx).unwrap();

        let registry = bot.registry();
        assert!(registry.lookup_command("!wiki").is_some());
        assert!(registry.lookup_command("!addpic").is_some());
        assert!(registry.lookup_command("!rmq").is_some());
        assert_eq!(
            registry.commands().last().unwrap().command.module(),
            "help"
        );
        assert!(ctx.is_admin("alice"));
        assert!(!ctx.is_admin("bob"));
    }

    #[tokio::test]
    async fn test_loading_a_module_twice_is_a_registration_error() {
        let db = Database::new(":memory:").await.unwrap();
        let ctx = ModuleContext::new(db, Vec::new());
        let mut bot = Bot::new();
        assert!(matches!(
            register_all(&["xkcd", "xkcd"], &mut bot, &ctx),
            Err(RegistrationError::DuplicateTrigger { .. })
        ));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00 UTC");
    }
}
