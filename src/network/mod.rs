//! Chat connections.
//!
//! The core only needs an inbound stream of lines, an ordered outbound write
//! path and a way to close. [`Connection`] captures exactly that; [`IrcConnection`]
//! implements it over TCP or TLS.

mod irc;
mod outbound;
mod tls;

pub use irc::{IrcConnection, IrcSettings};
pub use outbound::{QueueOutbound, WriterCommand, split_reply};

use crate::core::Outbound;
use crate::error::ConnectionError;
use async_trait::async_trait;
use std::sync::Arc;

/// One inbound chat message as seen by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundLine {
    /// Nick of the sender.
    pub sender: String,
    /// Channel name, or the bot's nick for a private message.
    pub target: String,
    pub text: String,
}

/// A live chat connection.
#[async_trait]
pub trait Connection: Send {
    /// Perform the handshake: authentication, registration, channel join.
    async fn open(&mut self) -> Result<(), ConnectionError>;

    /// Next inbound message. `None` means the peer closed the link.
    ///
    /// Must be cancel-safe: the bot drops a pending call when stopping.
    async fn recv(&mut self) -> Option<Result<InboundLine, ConnectionError>>;

    /// The shared, order-preserving write path.
    fn outbound(&self) -> Arc<dyn Outbound>;

    /// Channel the connection joined, if any.
    fn home_channel(&self) -> Option<&str> {
        None
    }

    /// Leave the network, after flushing queued writes.
    async fn close(&mut self, reason: &str) -> Result<(), ConnectionError>;
}
