//! Full stack: modules, dispatcher and a real IRC connection to a local server.

mod common;

use common::FakeIrcServer;
use slirc_bot::core::{Bot, BotState};
use slirc_bot::db::Database;
use slirc_bot::error::{BotError, ConnectionError};
use slirc_bot::modules::{self, ModuleContext};
use slirc_bot::network::{IrcConnection, IrcSettings};
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn settings(port: u16) -> IrcSettings {
    IrcSettings {
        server: "127.0.0.1".into(),
        port,
        nick: "bot".into(),
        username: "bot".into(),
        channel: Some("#test".into()),
        connect_timeout: Duration::from_secs(2),
        registration_timeout: Duration::from_secs(5),
        messages_per_second: 100,
        burst: 100,
        ..IrcSettings::default()
    }
}

async fn bot_with_modules() -> Bot {
    let db = Database::new(":memory:").await.unwrap();
    let ctx = ModuleContext::new(db, vec!["alice".into()]);
    let mut bot = Bot::new().with_handler_timeout(Some(Duration::from_secs(2)));
    modules::register_all(&["search", "memo"], &mut bot, &ctx).unwrap();
    bot
}

#[tokio::test]
async fn test_commands_scanners_and_shutdown_over_tcp() {
    let server = FakeIrcServer::bind().await;
    let mut bot = bot_with_modules().await;
    let stop = bot.stop_handle();

    let conn = IrcConnection::new(settings(server.port()));
    let (connected, mut peer) = tokio::join!(bot.connect(conn), async {
        let mut peer = server.accept().await;
        assert_eq!(peer.expect("NICK ").await, "NICK bot");
        peer.welcome("bot", "#test").await;
        peer
    });
    connected.unwrap();
    assert_eq!(bot.state(), BotState::Connected);

    let running = tokio::spawn(async move {
        let result = bot.run().await;
        (result, bot.state())
    });

    peer.send("PING :irc.test").await;
    assert_eq!(peer.expect("PONG").await, "PONG irc.test");

    peer.privmsg("alice", "#test", "!w rust lang").await;
    assert_eq!(
        peer.expect("PRIVMSG").await,
        "PRIVMSG #test :Wikipedia search for \"rust lang\": \
         https://en.wikipedia.org/w/index.php?search=rust+lang"
    );

    peer.privmsg("alice", "bot", "!d ferris").await;
    assert_eq!(
        peer.expect("PRIVMSG").await,
        "PRIVMSG alice :DuckDuckGo search for \"ferris\": https://duckduckgo.com/?q=ferris"
    );

    peer.privmsg("alice", "#test", "!memo carol hello there").await;
    assert_eq!(
        peer.expect("PRIVMSG").await,
        "PRIVMSG #test :alice: memo for carol saved"
    );

    peer.privmsg("Carol", "#test", "hi all").await;
    let delivered = peer.expect("PRIVMSG").await;
    assert!(delivered.starts_with("PRIVMSG Carol :Memo from alice ("), "{}", delivered);
    assert!(delivered.ends_with("): hello there"), "{}", delivered);

    peer.privmsg("bob", "#test", "!help").await;
    let help = peer.expect("PRIVMSG").await;
    assert!(help.starts_with("PRIVMSG bob :"), "{}", help);

    stop.stop();
    assert_eq!(peer.expect("QUIT").await, "QUIT :Shutting down");

    let (result, state) = timeout(WAIT, running).await.unwrap().unwrap();
    result.unwrap();
    assert_eq!(state, BotState::Stopped);
}

#[tokio::test]
async fn test_server_disconnect_ends_run_with_closed() {
    let server = FakeIrcServer::bind().await;
    let mut bot = bot_with_modules().await;

    let conn = IrcConnection::new(settings(server.port()));
    let (connected, peer) = tokio::join!(bot.connect(conn), async {
        let mut peer = server.accept().await;
        peer.welcome("bot", "#test").await;
        peer
    });
    connected.unwrap();

    drop(peer);
    let result = timeout(WAIT, bot.run()).await.unwrap();
    assert!(matches!(
        result,
        Err(BotError::Connection(ConnectionError::Closed))
    ));
    assert_eq!(bot.state(), BotState::Stopped);
}

#[tokio::test]
async fn test_server_error_line_ends_run() {
    let server = FakeIrcServer::bind().await;
    let mut bot = bot_with_modules().await;

    let conn = IrcConnection::new(settings(server.port()));
    let (connected, mut peer) = tokio::join!(bot.connect(conn), async {
        let mut peer = server.accept().await;
        peer.welcome("bot", "#test").await;
        peer
    });
    connected.unwrap();

    peer.send("ERROR :Closing Link: bot (K-Lined)").await;
    let result = timeout(WAIT, bot.run()).await.unwrap();
    match result {
        Err(BotError::Connection(ConnectionError::ServerError(reason))) => {
            assert!(reason.contains("K-Lined"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(bot.state(), BotState::Stopped);
}

#[tokio::test]
async fn test_silent_server_times_out_registration() {
    let server = FakeIrcServer::bind().await;
    let mut bot = bot_with_modules().await;

    let conn = IrcConnection::new(IrcSettings {
        registration_timeout: Duration::from_millis(200),
        ..settings(server.port())
    });
    let (connected, _peer) = tokio::join!(bot.connect(conn), server.accept());

    assert!(matches!(
        connected,
        Err(BotError::Connection(ConnectionError::Timeout(_)))
    ));
    assert_eq!(bot.state(), BotState::Stopped);
}

#[tokio::test]
async fn test_refused_connection_fails_connect() {
    let port = {
        let server = FakeIrcServer::bind().await;
        server.port()
    };
    let mut bot = Bot::new();

    let err = bot
        .connect(IrcConnection::new(settings(port)))
        .await
        .unwrap_err();
    assert!(matches!(err, BotError::Connection(_)));
    assert_eq!(bot.state(), BotState::Stopped);
}
