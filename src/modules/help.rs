//! `!help`: lists every registered command, privately.

use crate::core::{Bot, Command, DeliveryPolicy, ReplyRequest, handler_fn};
use crate::error::RegistrationError;

const HELP: &str = "!help => Show this help";

/// Register `!help`. Call after every other module.
pub fn register(bot: &mut Bot) -> Result<(), RegistrationError> {
    let mut lines = bot.registry().help_lines();
    lines.push(HELP.to_string());

    bot.add_command(
        Command::new(
            "help",
            ["!help"],
            HELP,
            handler_fn(move |event, sink| {
                for line in &lines {
                    sink.reply(ReplyRequest::new(line.clone()).to_nick(event.sender()));
                }
                Ok(true)
            }),
        ),
        DeliveryPolicy::DirectToSender,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Destination;
    use crate::modules::testing::{channel, run_command};

    #[tokio::test]
    async fn test_help_lists_commands_privately() {
        let mut bot = Bot::new();
        crate::modules::search::register(&mut bot).unwrap();
        register(&mut bot).unwrap();

        let (handled, sent) = run_command(bot.registry(), &channel("alice", "!help")).await;
        assert!(handled);
        assert_eq!(sent.len(), bot.registry().help_lines().len());
        assert!(sent.iter().all(|(dest, _)| *dest == Destination::Nick("alice".into())));
        assert_eq!(sent.last().unwrap().1, HELP);
    }
}
