//! IRC client connection.
//!
//! Reading happens on the caller's task through [`Connection::recv`]. Writing
//! happens on a dedicated writer task fed by an unbounded queue, so every
//! outbound line, from handlers or from protocol housekeeping, leaves in the
//! order it was queued.

use super::outbound::{QueueOutbound, WriterCommand};
use super::{Connection, InboundLine, tls};
use crate::core::Outbound;
use crate::error::ConnectionError;
use crate::proto::{Command, IrcCodec, Message};
use crate::telemetry::spans;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{Instrument, debug, info, warn};

/// How long `close()` waits for the writer to flush.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

const CTCP_DELIM: char = '\x01';

/// Any byte stream an IRC session can run over.
pub trait IrcStream: AsyncRead + AsyncWrite + Unpin + Send + Sync {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send + Sync> IrcStream for T {}

type BoxedStream = Box<dyn IrcStream>;
type Reader = FramedRead<ReadHalf<BoxedStream>, IrcCodec>;
type Writer = FramedWrite<WriteHalf<BoxedStream>, IrcCodec>;

/// Connection parameters.
#[derive(Debug, Clone)]
pub struct IrcSettings {
    pub server: String,
    pub port: u16,
    pub tls: bool,
    pub verify_cert: bool,
    pub nick: String,
    pub username: String,
    pub realname: String,
    pub channel: Option<String>,
    pub channel_key: Option<String>,
    pub password: Option<String>,
    pub connect_timeout: Duration,
    pub registration_timeout: Duration,
    pub messages_per_second: u32,
    pub burst: u32,
}

impl Default for IrcSettings {
    fn default() -> Self {
        Self {
            server: "localhost".into(),
            port: 6667,
            tls: false,
            verify_cert: true,
            nick: "slircbot".into(),
            username: "slircbot".into(),
            realname: "slirc-bot".into(),
            channel: None,
            channel_key: None,
            password: None,
            connect_timeout: Duration::from_secs(30),
            registration_timeout: Duration::from_secs(60),
            messages_per_second: 2,
            burst: 4,
        }
    }
}

/// Protocol state shared by the handshake and the read loop.
struct Session {
    nick: String,
    channel: Option<String>,
    channel_key: Option<String>,
    outbound: Arc<QueueOutbound>,
}

impl Session {
    fn is_me(&self, nick: &str) -> bool {
        nick.eq_ignore_ascii_case(&self.nick)
    }

    fn is_home(&self, channel: &str) -> bool {
        self.channel
            .as_deref()
            .is_some_and(|home| home.eq_ignore_ascii_case(channel))
    }

    fn join_home(&self) -> Result<(), ConnectionError> {
        match &self.channel {
            Some(channel) => self
                .outbound
                .enqueue(Message::join(channel.clone(), self.channel_key.clone())),
            None => Ok(()),
        }
    }

    /// Handle traffic the bot answers itself; return what handlers should see.
    fn process(&mut self, msg: Message) -> Result<Option<InboundLine>, ConnectionError> {
        let sender = msg.source_nickname().map(str::to_string);
        match msg.command {
            Command::PING(token, extra) => {
                self.outbound.enqueue(Command::PONG(token, extra).into())?;
                Ok(None)
            }
            Command::ERROR(reason) => Err(ConnectionError::ServerError(reason)),
            Command::NICK(new_nick) => {
                if sender.as_deref().is_some_and(|old| self.is_me(old)) {
                    info!(old = %self.nick, new = %new_nick, "Nick changed");
                    self.nick = new_nick;
                }
                Ok(None)
            }
            Command::Raw(name, args) if name == "KICK" => {
                if let [channel, victim, ..] = args.as_slice()
                    && self.is_me(victim)
                    && self.is_home(channel)
                {
                    warn!(channel = %channel, by = ?sender, "Kicked, rejoining");
                    self.join_home()?;
                }
                Ok(None)
            }
            Command::PRIVMSG(target, text) => {
                let Some(sender) = sender else {
                    return Ok(None);
                };
                if self.is_me(&sender) {
                    return Ok(None);
                }
                if text.starts_with(CTCP_DELIM) {
                    self.answer_ctcp(&sender, &text)?;
                    return Ok(None);
                }
                Ok(Some(InboundLine {
                    sender,
                    target,
                    text,
                }))
            }
            other => {
                debug!(command = ?other, "Ignored");
                Ok(None)
            }
        }
    }

    fn answer_ctcp(&self, sender: &str, text: &str) -> Result<(), ConnectionError> {
        let request = text.trim_matches(CTCP_DELIM);
        if request.eq_ignore_ascii_case("VERSION") {
            let reply = format!(
                "{d}VERSION slirc-bot {}{d}",
                env!("CARGO_PKG_VERSION"),
                d = CTCP_DELIM
            );
            self.outbound
                .enqueue(Command::NOTICE(sender.to_string(), reply).into())?;
        } else {
            debug!(sender = %sender, request = %request, "CTCP ignored");
        }
        Ok(())
    }
}

/// An IRC client connection implementing [`Connection`].
pub struct IrcConnection {
    settings: IrcSettings,
    session: Session,
    stream: Option<BoxedStream>,
    reader: Option<Reader>,
    queue_tx: mpsc::UnboundedSender<WriterCommand>,
    queue_rx: Option<mpsc::UnboundedReceiver<WriterCommand>>,
    writer: Option<JoinHandle<Result<(), ConnectionError>>>,
    pending: VecDeque<InboundLine>,
}

impl IrcConnection {
    /// Connection that dials `settings.server` when opened.
    pub fn new(settings: IrcSettings) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let outbound = Arc::new(QueueOutbound::new(queue_tx.clone()));
        Self {
            session: Session {
                nick: settings.nick.clone(),
                channel: settings.channel.clone(),
                channel_key: settings.channel_key.clone(),
                outbound,
            },
            settings,
            stream: None,
            reader: None,
            queue_tx,
            queue_rx: Some(queue_rx),
            writer: None,
            pending: VecDeque::new(),
        }
    }

    /// Connection over an already established stream.
    pub fn with_stream(settings: IrcSettings, stream: impl IrcStream + 'static) -> Self {
        let mut conn = Self::new(settings);
        conn.stream = Some(Box::new(stream));
        conn
    }

    /// Nick currently in use; may differ from the configured one after a collision.
    pub fn nick(&self) -> &str {
        &self.session.nick
    }

    async fn dial(settings: IrcSettings) -> Result<BoxedStream, ConnectionError> {
        let addr = (settings.server.as_str(), settings.port);
        let tcp = tokio::time::timeout(settings.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ConnectionError::Timeout("connecting"))??;
        if let Err(e) = tcp.set_nodelay(true) {
            debug!(error = %e, "Failed to set TCP_NODELAY");
        }

        if settings.tls {
            let stream = tls::upgrade(tcp, &settings.server, settings.verify_cert).await?;
            Ok(Box::new(stream))
        } else {
            Ok(Box::new(tcp))
        }
    }

    fn rate_limiter(&self) -> DefaultDirectRateLimiter {
        let rate = NonZeroU32::new(self.settings.messages_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.settings.burst).unwrap_or(rate);
        RateLimiter::direct(Quota::per_second(rate).allow_burst(burst))
    }

    fn send_registration(&self) -> Result<(), ConnectionError> {
        let out = &self.session.outbound;
        if let Some(password) = self.settings.password.as_ref().filter(|p| !p.is_empty()) {
            out.enqueue(Command::PASS(password.clone()).into())?;
        }
        out.enqueue(Command::NICK(self.session.nick.clone()).into())?;
        out.enqueue(
            Command::USER(
                self.settings.username.clone(),
                "0".into(),
                self.settings.realname.clone(),
            )
            .into(),
        )
    }

    /// Wait for the welcome numeric and, if configured, the channel join.
    async fn register(&mut self) -> Result<(), ConnectionError> {
        let mut welcomed = false;
        let reader = self.reader.as_mut().ok_or(ConnectionError::Closed)?;

        loop {
            let msg = match reader.next().await {
                None => return Err(ConnectionError::Closed),
                Some(Ok(msg)) => msg,
                Some(Err(e)) => return Err(e.into()),
            };

            match &msg.command {
                Command::Response(1, args) => {
                    if let Some(nick) = args.first().filter(|n| !n.is_empty()) {
                        self.session.nick = nick.clone();
                    }
                    info!(nick = %self.session.nick, "Registered with server");
                    welcomed = true;
                    match &self.session.channel {
                        Some(_) => self.session.join_home()?,
                        None => return Ok(()),
                    }
                }
                Command::Response(433, _) if !welcomed => {
                    self.session.nick.push('_');
                    warn!(nick = %self.session.nick, "Nick in use, retrying");
                    self.session
                        .outbound
                        .enqueue(Command::NICK(self.session.nick.clone()).into())?;
                }
                Command::Response(code @ (403 | 405 | 471 | 473 | 474 | 475), args)
                    if welcomed =>
                {
                    return Err(ConnectionError::Handshake(format!(
                        "cannot join channel ({}): {}",
                        code,
                        args.last().map(String::as_str).unwrap_or_default()
                    )));
                }
                Command::JOIN(channel, _)
                    if welcomed
                        && msg.source_nickname().is_some_and(|n| self.session.is_me(n))
                        && self.session.is_home(channel) =>
                {
                    info!(channel = %channel, "Joined channel");
                    return Ok(());
                }
                _ => {
                    // Lines that arrive before the join completes are kept.
                    if let Some(line) = self.session.process(msg)? {
                        self.pending.push_back(line);
                    }
                }
            }
        }
    }
}

async fn write_loop(
    mut sink: Writer,
    mut queue: mpsc::UnboundedReceiver<WriterCommand>,
    limiter: DefaultDirectRateLimiter,
) -> Result<(), ConnectionError> {
    while let Some(command) = queue.recv().await {
        match command {
            WriterCommand::Send(msg) => {
                if matches!(msg.command, Command::PRIVMSG(..) | Command::NOTICE(..)) {
                    limiter.until_ready().await;
                }
                sink.send(msg).await?;
            }
            WriterCommand::Close => break,
        }
    }
    sink.close().await?;
    debug!("Writer finished");
    Ok(())
}

#[async_trait]
impl Connection for IrcConnection {
    async fn open(&mut self) -> Result<(), ConnectionError> {
        let span = spans::connection(&self.settings.server, &self.settings.nick);
        let stream = match self.stream.take() {
            Some(stream) => stream,
            None => Self::dial(self.settings.clone()).instrument(span.clone()).await?,
        };
        let queue = self.queue_rx.take().ok_or(ConnectionError::Closed)?;

        let (read_half, write_half) = tokio::io::split(stream);
        self.reader = Some(FramedRead::new(read_half, IrcCodec::new()));
        let writer = FramedWrite::new(write_half, IrcCodec::new());
        self.writer = Some(tokio::spawn(
            write_loop(writer, queue, self.rate_limiter()).instrument(span.clone()),
        ));

        self.send_registration()?;
        let timeout = self.settings.registration_timeout;
        tokio::time::timeout(timeout, self.register())
            .instrument(span)
            .await
            .map_err(|_| ConnectionError::Timeout("registering"))?
    }

    async fn recv(&mut self) -> Option<Result<InboundLine, ConnectionError>> {
        if let Some(line) = self.pending.pop_front() {
            return Some(Ok(line));
        }
        let reader = self.reader.as_mut()?;

        loop {
            let msg = match reader.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(e.into())),
            };
            match self.session.process(msg) {
                Ok(Some(line)) => return Some(Ok(line)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    fn outbound(&self) -> Arc<dyn Outbound> {
        self.session.outbound.clone()
    }

    fn home_channel(&self) -> Option<&str> {
        self.settings.channel.as_deref()
    }

    async fn close(&mut self, reason: &str) -> Result<(), ConnectionError> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        // The writer may already be gone if the link dropped.
        let _ = self
            .session
            .outbound
            .enqueue(Command::QUIT(Some(reason.to_string())).into());
        let _ = self.queue_tx.send(WriterCommand::Close);

        let result = match tokio::time::timeout(CLOSE_TIMEOUT, writer).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ConnectionError::Io(std::io::Error::other(join_err))),
            Err(_) => Err(ConnectionError::Timeout("flushing outbound queue")),
        };
        self.reader = None;
        info!(reason = %reason, "Disconnected");
        result
    }
}
