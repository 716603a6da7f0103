//! Quotes: `!q` saves something a nick said recently, or prints a saved line.
//!
//! A scanner keeps the last [`RECENT_LINES`] channel lines in memory. Only
//! those lines can be saved, so nobody can put words in someone's mouth.

use super::ModuleContext;
use crate::core::{Bot, Command, DeliveryPolicy, Handler, IncomingEvent, MessageScanner, Sink};
use crate::db::Database;
use crate::error::{HandlerResult, RegistrationError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::info;

pub const RECENT_LINES: usize = 100;

const HELP_QUOTE: &str = "!q [<nick> [<text>]] => Save the last line of <nick> containing <text>, or show a random quote (of <nick>)";
const HELP_REMOVE: &str = "!rmq <nick> <text> => Remove the quotes of <nick> containing <text> (admin only)";

pub fn register(bot: &mut Bot, ctx: &ModuleContext) -> Result<(), RegistrationError> {
    let recent = Arc::new(RecentLines::default());
    bot.add_scanner(
        MessageScanner::new(
            "quote",
            RecordLines {
                recent: Arc::clone(&recent),
            },
        ),
        DeliveryPolicy::BroadcastToOrigin,
    )?;
    bot.add_command(
        Command::new(
            "quote",
            ["!q"],
            HELP_QUOTE,
            QuoteCommand {
                db: ctx.db.clone(),
                recent,
            },
        ),
        DeliveryPolicy::BroadcastToOrigin,
    )?;
    bot.add_command(
        Command::new(
            "quote",
            ["!rmq"],
            HELP_REMOVE,
            RemoveQuote {
                db: ctx.db.clone(),
                admins: Arc::clone(&ctx.admins),
            },
        ),
        DeliveryPolicy::BroadcastToOrigin,
    )
}

/// Latest channel lines, oldest first.
#[derive(Default)]
struct RecentLines {
    lines: Mutex<VecDeque<(String, String)>>,
}

impl RecentLines {
    fn push(&self, nick: &str, text: &str) {
        let mut lines = self.lines.lock();
        if lines.len() == RECENT_LINES {
            lines.pop_front();
        }
        lines.push_back((nick.to_string(), text.to_string()));
    }

    /// Newest line of `nick` containing `fragment`, ignoring case.
    fn find(&self, nick: &str, fragment: &str) -> Option<(String, String)> {
        let fragment = fragment.to_lowercase();
        self.lines
            .lock()
            .iter()
            .rev()
            .find(|(n, text)| {
                n.eq_ignore_ascii_case(nick) && text.to_lowercase().contains(&fragment)
            })
            .cloned()
    }
}

/// Scanner feeding [`RecentLines`]; never replies.
struct RecordLines {
    recent: Arc<RecentLines>,
}

#[async_trait]
impl Handler for RecordLines {
    async fn handle(&self, event: &IncomingEvent, _sink: &Sink<'_>) -> HandlerResult {
        let text = event.raw_message().trim();
        if event.origin().channel().is_none() || text.is_empty() || text.starts_with('!') {
            return Ok(false);
        }
        self.recent.push(event.sender(), text);
        Ok(false)
    }
}

struct QuoteCommand {
    db: Database,
    recent: Arc<RecentLines>,
}

#[async_trait]
impl Handler for QuoteCommand {
    async fn handle(&self, event: &IncomingEvent, sink: &Sink<'_>) -> HandlerResult {
        let args = event.args();
        let quotes = self.db.quotes();

        let (nick, words) = match args.split_first() {
            None => (None, &[][..]),
            Some((nick, words)) => (Some(*nick), words),
        };

        let Some(nick) = nick.filter(|_| !words.is_empty()) else {
            match quotes.random(nick).await? {
                Some(quote) => sink.reply(format!("<{}> {}", quote.nick, quote.content)),
                None => match nick {
                    Some(nick) => sink.reply(format!("No quote found for {}", nick)),
                    None => sink.reply("No quote saved yet"),
                },
            }
            return Ok(true);
        };

        let fragment = words.join(" ");
        let Some((said_by, line)) = self.recent.find(nick, &fragment) else {
            sink.reply(format!(
                "No recent message from {} containing {:?}",
                nick, fragment
            ));
            return Ok(true);
        };

        if quotes.add(&said_by, &line, event.sender()).await? {
            info!(nick = %said_by, by = %event.sender(), "Quote saved");
            sink.reply(format!("Quote saved: <{}> {}", said_by, line));
        } else {
            sink.reply(format!("This quote of {} is already saved", said_by));
        }
        Ok(true)
    }
}

struct RemoveQuote {
    db: Database,
    admins: Arc<[String]>,
}

#[async_trait]
impl Handler for RemoveQuote {
    async fn handle(&self, event: &IncomingEvent, sink: &Sink<'_>) -> HandlerResult {
        let args = event.args();
        let [nick, words @ ..] = args.as_slice() else {
            return Ok(false);
        };
        if words.is_empty() {
            return Ok(false);
        }

        if !self
            .admins
            .iter()
            .any(|a| a.eq_ignore_ascii_case(event.sender()))
        {
            sink.reply(format!(
                "You need to be an administrator to run this command (Admins: {})",
                self.admins.join(", ")
            ));
            return Ok(true);
        }

        let fragment = words.join(" ");
        match self.db.quotes().remove(nick, &fragment).await? {
            0 => sink.reply(format!("No quote of {} containing {:?}", nick, fragment)),
            n => {
                info!(nick = %nick, removed = n, by = %event.sender(), "Quotes removed");
                sink.reply(format!("{} quote(s) of {} removed", n, nick));
            }
        }
        Ok(true)
    }
}
