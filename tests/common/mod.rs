//! Integration test common infrastructure.
//!
//! - [`ScriptedConnection`]: an in-memory [`Connection`] fed from a script.
//! - [`FakeIrcServer`]: a one-client IRC server on a local TCP port.
//! - [`serve_http`]: a tiny HTTP responder for modules that fetch pages.
//!
//! [`Connection`]: slirc_bot::network::Connection

pub mod http;
pub mod irc_server;
pub mod scripted;

#[allow(unused_imports)]
pub use http::{Route, serve_http};
#[allow(unused_imports)]
pub use irc_server::{FakeIrcServer, Peer};
#[allow(unused_imports)]
pub use scripted::{ScriptProbe, ScriptedConnection};

use slirc_bot::network::InboundLine;

/// Inbound line from `sender` in `target` (a channel or the bot's nick).
#[allow(dead_code)]
pub fn line(sender: &str, target: &str, text: &str) -> InboundLine {
    InboundLine {
        sender: sender.to_string(),
        target: target.to_string(),
        text: text.to_string(),
    }
}
