//! Minimal IRC client-side protocol layer.
//!
//! Only what the bot needs to talk to a server: an owned [`Message`] with a
//! lenient parser and serializer, and a tokio [`IrcCodec`] that frames lines.

mod codec;
mod message;

pub use codec::IrcCodec;
pub use message::{Command, Message, Prefix, is_channel_name};

use thiserror::Error;

/// Maximum length of a single IRC line on the wire, CRLF included.
pub const MAX_IRC_LINE_LEN: usize = 512;

/// Upper bound accepted when reading, leaving room for IRCv3 message tags.
pub const MAX_INBOUND_LINE_LEN: usize = 8191 + MAX_IRC_LINE_LEN;

/// Protocol-level errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a single line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageParseError {
    #[error("empty message")]
    Empty,

    #[error("missing command")]
    MissingCommand,

    #[error("invalid numeric reply {0:?}")]
    InvalidNumeric(String),
}
