//! slirc-bot - Straylight IRC Bot

use slirc_bot::config::{self, Config};
use slirc_bot::core::{Bot, StopHandle};
use slirc_bot::db::Database;
use slirc_bot::modules::{self, ModuleContext};
use slirc_bot::network::IrcConnection;
use slirc_bot::telemetry;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = match Config::load(&config_path) {
        Ok(config) => {
            telemetry::init(&config.logging.filter, config.logging.json);
            config
        }
        Err(e) => {
            telemetry::init("info", false);
            error!(path = %config_path, error = %e, "Failed to load config");
            return Err(e.into());
        }
    };

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("configuration has {} error(s)", errors.len());
    }

    info!(
        server = %config.irc.server,
        port = config.irc.port,
        nick = %config.irc.nick,
        channel = %config.irc.channel,
        "Starting slirc-bot"
    );

    let db = Database::new(&config.database.path).await.map_err(|e| {
        error!(path = %config.database.path, error = %e, "Failed to open database");
        e
    })?;

    let mut bot = Bot::new().with_handler_timeout(config.bot.handler_timeout());
    let ctx = ModuleContext::new(db.clone(), config.bot.admins.clone());
    modules::register_all(&config.bot.modules, &mut bot, &ctx).map_err(|e| {
        error!(error = %e, "Module registration failed");
        e
    })?;

    spawn_signal_handler(bot.stop_handle());

    bot.connect(IrcConnection::new(config.irc_settings())).await?;
    let result = bot.run().await;

    db.close().await;
    match result {
        Ok(()) => {
            info!("slirc-bot stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "slirc-bot stopped with an error");
            Err(e.into())
        }
    }
}

/// Stop the bot on Ctrl-C or SIGTERM.
fn spawn_signal_handler(stop: StopHandle) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C"),
                        _ = term.recv() => info!("Received SIGTERM"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Received Ctrl-C");
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl-C");
        }
        stop.stop();
    });
}
