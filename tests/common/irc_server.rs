//! Fake IRC server for end-to-end tests.
//!
//! Listens on an ephemeral local port and hands the test the raw client
//! lines, so assertions are on exactly what went over the wire.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

pub struct FakeIrcServer {
    listener: TcpListener,
}

#[allow(dead_code)]
impl FakeIrcServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake server");
        Self { listener }
    }

    pub fn port(&self) -> u16 {
        self.listener.local_addr().expect("local addr").port()
    }

    pub async fn accept(&self) -> Peer {
        let (stream, _) = timeout(WAIT, self.listener.accept())
            .await
            .expect("client connected in time")
            .expect("accept");
        let (read, write) = stream.into_split();
        Peer {
            lines: BufReader::new(read).lines(),
            write,
        }
    }
}

/// The server side of one client connection.
pub struct Peer {
    lines: Lines<BufReader<OwnedReadHalf>>,
    write: OwnedWriteHalf,
}

#[allow(dead_code)]
impl Peer {
    /// Next line from the client, or `None` once it disconnected.
    pub async fn next_line(&mut self) -> Option<String> {
        timeout(WAIT, self.lines.next_line())
            .await
            .expect("client line in time")
            .expect("read client line")
    }

    /// Skip lines until one starts with `prefix`, and return it.
    pub async fn expect(&mut self, prefix: &str) -> String {
        loop {
            match self.next_line().await {
                Some(line) if line.starts_with(prefix) => return line,
                Some(_) => continue,
                None => panic!("client disconnected while waiting for {:?}", prefix),
            }
        }
    }

    pub async fn send(&mut self, line: &str) {
        self.write
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .expect("write to client");
    }

    /// Complete registration for `nick` and confirm the join of `channel`.
    pub async fn welcome(&mut self, nick: &str, channel: &str) {
        self.expect("USER ").await;
        self.send(&format!(":irc.test 001 {} :Welcome to the test network", nick))
            .await;
        self.expect(&format!("JOIN {}", channel)).await;
        self.send(&format!(":{}!bot@test JOIN {}", nick, channel)).await;
    }

    /// Say `text` in `target` as `nick`.
    pub async fn privmsg(&mut self, nick: &str, target: &str, text: &str) {
        self.send(&format!(":{}!u@test PRIVMSG {} :{}", nick, target, text))
            .await;
    }
}
