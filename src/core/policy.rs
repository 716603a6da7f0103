//! Delivery policies: how a reply is addressed.

use super::event::{IncomingEvent, Origin, ReplyRequest};
use std::fmt;

/// Addressing rule fixed when a command or scanner is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryPolicy {
    /// Send to the channel the event came from.
    BroadcastToOrigin,
    /// Send privately to the sender (or to `target_nick` when given).
    DirectToSender,
    /// Channel events get a channel reply, private events a private one.
    ContextSensitive,
}

/// Resolved recipient of one outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Channel(String),
    Nick(String),
}

impl Destination {
    /// The PRIVMSG target.
    pub fn target(&self) -> &str {
        match self {
            Destination::Channel(name) | Destination::Nick(name) => name,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target())
    }
}

impl DeliveryPolicy {
    /// Resolve where `request` goes for `event`.
    ///
    /// `home_channel` is the channel the bot joined; a broadcast of a private
    /// event lands there, or back with the sender if the bot has none.
    pub fn resolve(
        self,
        event: &IncomingEvent,
        request: &ReplyRequest,
        home_channel: Option<&str>,
    ) -> Destination {
        match self {
            DeliveryPolicy::BroadcastToOrigin => match event.origin() {
                Origin::Channel(name) => Destination::Channel(name.clone()),
                Origin::Private => match home_channel {
                    Some(home) => Destination::Channel(home.to_string()),
                    None => Destination::Nick(event.sender().to_string()),
                },
            },
            DeliveryPolicy::DirectToSender => Destination::Nick(
                request
                    .target_nick
                    .clone()
                    .unwrap_or_else(|| event.sender().to_string()),
            ),
            DeliveryPolicy::ContextSensitive => match event.origin() {
                Origin::Channel(name) => Destination::Channel(name.clone()),
                Origin::Private => Destination::Nick(event.sender().to_string()),
            },
        }
    }
}
