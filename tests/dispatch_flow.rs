//! End-to-end dispatch through the bot facade over a scripted connection.

mod common;

use common::scripted::ScriptEnd;
use common::{ScriptedConnection, line};
use slirc_bot::core::{
    Bot, BotState, Command, DeliveryPolicy, Destination, MessageScanner, ReplyRequest, handler_fn,
};
use slirc_bot::error::{BotError, ConnectionError, RegistrationError};
use std::time::Duration;
use tokio::time::timeout;

const RUN_LIMIT: Duration = Duration::from_secs(5);

fn echo() -> Command {
    Command::new(
        "echo",
        ["!echo"],
        "!echo <text> => Repeat text",
        handler_fn(|event, sink| {
            sink.reply(event.args().join(" "));
            Ok(true)
        }),
    )
}

#[tokio::test]
async fn test_echo_is_broadcast_to_triggering_channel() {
    let mut bot = Bot::new();
    bot.add_command(echo(), DeliveryPolicy::BroadcastToOrigin).unwrap();

    let conn = ScriptedConnection::new([line("alice", "#rust", "!echo hello")])
        .ending_with(ScriptEnd::Eof);
    let probe = conn.probe();
    bot.connect(conn).await.unwrap();
    assert_eq!(bot.state(), BotState::Connected);

    let result = timeout(RUN_LIMIT, bot.run()).await.expect("run finished");
    assert!(matches!(
        result,
        Err(BotError::Connection(ConnectionError::Closed))
    ));
    assert_eq!(bot.state(), BotState::Stopped);
    assert_eq!(
        probe.sent(),
        vec![(Destination::Channel("#rust".into()), "hello".to_string())]
    );
    assert_eq!(probe.closed_with().as_deref(), Some("Connection error"));
}

#[tokio::test]
async fn test_scanner_reply_precedes_command_reply() {
    let mut bot = Bot::new();
    bot.add_scanner(
        MessageScanner::new(
            "url-detector",
            handler_fn(|event, sink| {
                let Some(url) = event.tokens().find(|t| t.starts_with("http")) else {
                    return Ok(false);
                };
                sink.reply(format!("seen {}", url));
                Ok(true)
            }),
        ),
        DeliveryPolicy::BroadcastToOrigin,
    )
    .unwrap();
    bot.add_command(
        Command::new(
            "links",
            ["!link"],
            "!link <url> => Save a link",
            handler_fn(|event, sink| {
                sink.reply(format!("saved {}", event.args().len()));
                Ok(true)
            }),
        ),
        DeliveryPolicy::BroadcastToOrigin,
    )
    .unwrap();

    let conn = ScriptedConnection::new([line("bob", "#rust", "!link https://example.org")])
        .ending_with(ScriptEnd::Eof);
    let probe = conn.probe();
    bot.connect(conn).await.unwrap();
    let _ = timeout(RUN_LIMIT, bot.run()).await.expect("run finished");

    let texts: Vec<String> = probe.sent().into_iter().map(|(_, t)| t).collect();
    assert_eq!(texts, vec!["seen https://example.org", "saved 1"]);
}

#[tokio::test]
async fn test_duplicate_trigger_fails_before_connect() {
    let mut bot = Bot::new();
    let a = |module: &str| Command::new(module, ["!a"], "!a", handler_fn(|_, _| Ok(true)));
    bot.add_command(a("first"), DeliveryPolicy::BroadcastToOrigin)
        .unwrap();

    let err = bot
        .add_command(a("second"), DeliveryPolicy::DirectToSender)
        .unwrap_err();
    assert_eq!(
        err,
        RegistrationError::DuplicateTrigger {
            trigger: "!a".into(),
            module: "second".into(),
            existing: "first".into(),
        }
    );
    assert_eq!(bot.state(), BotState::Created);

    let entry = bot.registry().lookup_command("!a").unwrap();
    assert_eq!(entry.command.module(), "first");
    assert_eq!(bot.registry().commands().len(), 1);
}

#[tokio::test]
async fn test_registration_closed_after_connect() {
    let mut bot = Bot::new();
    bot.connect(ScriptedConnection::idle()).await.unwrap();

    let err = bot
        .add_command(echo(), DeliveryPolicy::BroadcastToOrigin)
        .unwrap_err();
    assert_eq!(err, RegistrationError::RegistrationClosed);
    assert!(bot.registry().is_empty());
}

#[tokio::test]
async fn test_stop_mid_dispatch_finishes_line_and_reads_no_more() {
    let mut bot = Bot::new();
    let stop = bot.stop_handle();
    bot.add_command(
        Command::new(
            "control",
            ["!quit"],
            "!quit => Stop the bot",
            handler_fn(move |_, sink| {
                sink.reply("bye 1");
                stop.stop();
                sink.reply("bye 2");
                sink.reply("bye 3");
                Ok(true)
            }),
        ),
        DeliveryPolicy::BroadcastToOrigin,
    )
    .unwrap();
    bot.add_command(echo(), DeliveryPolicy::BroadcastToOrigin)
        .unwrap();

    let conn = ScriptedConnection::new([
        line("alice", "#rust", "!echo first"),
        line("alice", "#rust", "!quit"),
        line("alice", "#rust", "!echo never"),
    ]);
    let probe = conn.probe();
    bot.connect(conn).await.unwrap();

    timeout(RUN_LIMIT, bot.run())
        .await
        .expect("run finished")
        .expect("clean stop");

    assert_eq!(bot.state(), BotState::Stopped);
    assert_eq!(probe.reads(), 2);
    let texts: Vec<String> = probe.sent().into_iter().map(|(_, t)| t).collect();
    assert_eq!(texts, vec!["first", "bye 1", "bye 2", "bye 3"]);
    assert_eq!(probe.closed_with().as_deref(), Some("Shutting down"));
}

#[tokio::test]
async fn test_stop_from_another_task_ends_idle_loop() {
    let mut bot = Bot::new();
    let stop = bot.stop_handle();
    let conn = ScriptedConnection::idle();
    let probe = conn.probe();
    bot.connect(conn).await.unwrap();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.stop();
        stop.stop();
    });

    timeout(RUN_LIMIT, bot.run())
        .await
        .expect("run finished")
        .expect("clean stop");
    assert_eq!(bot.state(), BotState::Stopped);
    assert!(probe.closed_with().is_some());
}

#[tokio::test]
async fn test_private_lines_follow_each_policy() {
    let mut bot = Bot::new();
    let reply = |text: &'static str| {
        handler_fn(move |_, sink| {
            sink.reply(text);
            Ok(true)
        })
    };
    bot.add_command(
        Command::new("t", ["!bc"], "!bc", reply("bc")),
        DeliveryPolicy::BroadcastToOrigin,
    )
    .unwrap();
    bot.add_command(
        Command::new("t", ["!dm"], "!dm", reply("dm")),
        DeliveryPolicy::DirectToSender,
    )
    .unwrap();
    bot.add_command(
        Command::new("t", ["!ctx"], "!ctx", reply("ctx")),
        DeliveryPolicy::ContextSensitive,
    )
    .unwrap();
    bot.add_command(
        Command::new(
            "t",
            ["!fwd"],
            "!fwd",
            handler_fn(|_, sink| {
                sink.reply(ReplyRequest::new("for carol").to_nick("carol"));
                Ok(true)
            }),
        ),
        DeliveryPolicy::DirectToSender,
    )
    .unwrap();

    let conn = ScriptedConnection::new([
        line("alice", "slircbot", "!bc"),
        line("alice", "slircbot", "!dm"),
        line("alice", "slircbot", "!ctx"),
        line("alice", "#rust", "!ctx"),
        line("alice", "#rust", "!fwd"),
    ])
    .with_home_channel("#home")
    .ending_with(ScriptEnd::Eof);
    let probe = conn.probe();
    bot.connect(conn).await.unwrap();
    let _ = timeout(RUN_LIMIT, bot.run()).await.expect("run finished");

    assert_eq!(
        probe.sent(),
        vec![
            (Destination::Channel("#home".into()), "bc".to_string()),
            (Destination::Nick("alice".into()), "dm".to_string()),
            (Destination::Nick("alice".into()), "ctx".to_string()),
            (Destination::Channel("#rust".into()), "ctx".to_string()),
            (Destination::Nick("carol".into()), "for carol".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_failing_handler_does_not_stop_later_lines() {
    let mut bot = Bot::new().with_handler_timeout(Some(Duration::from_secs(1)));
    bot.add_command(
        Command::new(
            "broken",
            ["!boom"],
            "!boom",
            handler_fn(|_, _| panic!("handler bug")),
        ),
        DeliveryPolicy::BroadcastToOrigin,
    )
    .unwrap();
    bot.add_command(echo(), DeliveryPolicy::BroadcastToOrigin)
        .unwrap();

    let conn = ScriptedConnection::new([
        line("alice", "#rust", "!boom"),
        line("alice", "#rust", "!echo still here"),
        line("alice", "#rust", "!unknown trigger"),
    ])
    .ending_with(ScriptEnd::Error);
    let probe = conn.probe();
    bot.connect(conn).await.unwrap();

    let result = timeout(RUN_LIMIT, bot.run()).await.expect("run finished");
    assert!(matches!(
        result,
        Err(BotError::Connection(ConnectionError::ServerError(_)))
    ));
    assert_eq!(probe.reads(), 3);
    let texts: Vec<String> = probe.sent().into_iter().map(|(_, t)| t).collect();
    assert_eq!(texts, vec!["still here"]);
}

#[tokio::test]
async fn test_failed_open_leaves_bot_stopped() {
    let mut bot = Bot::new();
    let err = bot
        .connect(ScriptedConnection::idle().failing_open())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BotError::Connection(ConnectionError::Handshake(_))
    ));
    assert_eq!(bot.state(), BotState::Stopped);

    let err = bot.run().await.unwrap_err();
    assert!(matches!(
        err,
        BotError::InvalidState {
            expected: BotState::Connected,
            actual: BotState::Stopped
        }
    ));
}
