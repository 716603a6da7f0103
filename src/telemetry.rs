//! Tracing setup and span constructors.

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` overrides `default_filter`.
pub fn init(default_filter: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Standardized span constructors for bot observability.
pub mod spans {
    use tracing::{Span, debug_span, info_span};

    /// Span for the lifetime of one server connection.
    pub fn connection(server: &str, nick: &str) -> Span {
        info_span!("connection", server = %server, nick = %nick)
    }

    /// Span for dispatching one inbound line.
    pub fn dispatch(sender: &str, channel: Option<&str>) -> Span {
        match channel {
            Some(channel) => debug_span!("irc.dispatch", sender = %sender, channel = %channel),
            None => debug_span!("irc.dispatch", sender = %sender, private = true),
        }
    }

    /// Span for one handler invocation.
    pub fn handler(module: &str, trigger: Option<&str>) -> Span {
        match trigger {
            Some(trigger) => debug_span!("handler", module = %module, trigger = %trigger),
            None => debug_span!("handler", module = %module, scanner = true),
        }
    }
}
