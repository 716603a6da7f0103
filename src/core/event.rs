//! Inbound events and outbound reply requests.

use chrono::{DateTime, Utc};
use std::str::SplitWhitespace;

/// Where an inbound line was said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A public channel, by name.
    Channel(String),
    /// A private message addressed to the bot.
    Private,
}

impl Origin {
    /// Classify a PRIVMSG target.
    pub fn from_target(target: &str) -> Self {
        if crate::proto::is_channel_name(target) {
            Origin::Channel(target.to_string())
        } else {
            Origin::Private
        }
    }

    pub fn channel(&self) -> Option<&str> {
        match self {
            Origin::Channel(name) => Some(name),
            Origin::Private => None,
        }
    }
}

/// Read-only view of one inbound chat line.
///
/// Built by the dispatch loop per line and only lent to handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingEvent {
    raw_message: String,
    sender: String,
    origin: Origin,
    timestamp: DateTime<Utc>,
}

impl IncomingEvent {
    pub fn new(sender: impl Into<String>, origin: Origin, raw_message: impl Into<String>) -> Self {
        Self::with_timestamp(sender, origin, raw_message, Utc::now())
    }

    pub fn with_timestamp(
        sender: impl Into<String>,
        origin: Origin,
        raw_message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            raw_message: raw_message.into(),
            sender: sender.into(),
            origin,
            timestamp,
        }
    }

    /// Full message text.
    pub fn raw_message(&self) -> &str {
        &self.raw_message
    }

    /// Nick of the sender.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whitespace-delimited tokens of the message.
    pub fn tokens(&self) -> SplitWhitespace<'_> {
        self.raw_message.split_whitespace()
    }

    /// The first token, which selects a command.
    pub fn first_token(&self) -> Option<&str> {
        self.tokens().next()
    }

    /// Tokens after the first one.
    pub fn args(&self) -> Vec<&str> {
        self.tokens().skip(1).collect()
    }
}

/// One reply emitted by a handler through its sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    pub text: String,
    /// Explicit recipient; `None` uses the policy's default target.
    pub target_nick: Option<String>,
}

impl ReplyRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_nick: None,
        }
    }

    #[must_use]
    pub fn to_nick(mut self, nick: impl Into<String>) -> Self {
        let nick = nick.into();
        self.target_nick = (!nick.is_empty()).then_some(nick);
        self
    }
}

impl From<String> for ReplyRequest {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for ReplyRequest {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
