//! Memos: `!memo <nick> <text>` leaves a message delivered privately the
//! next time `<nick>` says anything.

use super::{ModuleContext, format_timestamp};
use crate::core::{Bot, Command, DeliveryPolicy, Handler, IncomingEvent, MessageScanner, Sink};
use crate::db::Database;
use crate::error::{HandlerResult, RegistrationError};
use async_trait::async_trait;
use tracing::debug;

const HELP_MEMO: &str = "!memo <nick> <message> => Leave a memo for <nick>, delivered when they next speak";
const HELP_STAT: &str = "!memostat => List the memos you left that have not been delivered yet";

pub fn register(bot: &mut Bot, ctx: &ModuleContext) -> Result<(), RegistrationError> {
    bot.add_scanner(
        MessageScanner::new(
            "memo",
            DeliverMemos {
                db: ctx.db.clone(),
            },
        ),
        DeliveryPolicy::DirectToSender,
    )?;
    bot.add_command(
        Command::new(
            "memo",
            ["!memo"],
            HELP_MEMO,
            LeaveMemo {
                db: ctx.db.clone(),
            },
        ),
        DeliveryPolicy::BroadcastToOrigin,
    )?;
    bot.add_command(
        Command::new(
            "memo",
            ["!memostat"],
            HELP_STAT,
            MemoStatus {
                db: ctx.db.clone(),
            },
        ),
        DeliveryPolicy::DirectToSender,
    )
}

struct LeaveMemo {
    db: Database,
}

#[async_trait]
impl Handler for LeaveMemo {
    async fn handle(&self, event: &IncomingEvent, sink: &Sink<'_>) -> HandlerResult {
        let args = event.args();
        let [recipient, words @ ..] = args.as_slice() else {
            return Ok(false);
        };
        if words.is_empty() {
            return Ok(false);
        }

        let message = words.join(" ");
        self.db
            .memos()
            .add(event.sender(), recipient, &message)
            .await?;
        sink.reply(format!(
            "{}: memo for {} saved",
            event.sender(),
            recipient
        ));
        Ok(true)
    }
}

/// Scanner: hands the speaker every memo waiting for them.
struct DeliverMemos {
    db: Database,
}

#[async_trait]
impl Handler for DeliverMemos {
    async fn handle(&self, event: &IncomingEvent, sink: &Sink<'_>) -> HandlerResult {
        let memos = self.db.memos().take_for(event.sender()).await?;
        if memos.is_empty() {
            return Ok(false);
        }
        debug!(recipient = %event.sender(), count = memos.len(), "Delivering memos");
        for memo in memos {
            sink.reply(format!(
                "Memo from {} ({}): {}",
                memo.sender,
                format_timestamp(memo.created_at),
                memo.message
            ));
        }
        Ok(true)
    }
}

struct MemoStatus {
    db: Database,
}

#[async_trait]
impl Handler for MemoStatus {
    async fn handle(&self, event: &IncomingEvent, sink: &Sink<'_>) -> HandlerResult {
        let memos = self.db.memos().sent_by(event.sender()).await?;
        if memos.is_empty() {
            sink.reply("You have no pending memo");
        }
        for memo in memos {
            sink.reply(format!(
                "Memo for {} ({}): {}",
                memo.recipient,
                format_timestamp(memo.created_at),
                memo.message
            ));
        }
        Ok(true)
    }
}
