//! Scripted in-memory connection.

use async_trait::async_trait;
use parking_lot::Mutex;
use slirc_bot::core::{CapturingOutbound, Destination, Outbound};
use slirc_bot::error::ConnectionError;
use slirc_bot::network::{Connection, InboundLine};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What `recv` does once the script runs out.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptEnd {
    /// Wait forever, like an idle server.
    Idle,
    /// Report end of stream.
    Eof,
    /// Report a server error.
    Error,
}

/// Shared view of a [`ScriptedConnection`] for assertions after it moved into a bot.
#[derive(Clone, Default)]
pub struct ScriptProbe {
    pub out: Arc<CapturingOutbound>,
    reads: Arc<AtomicUsize>,
    closed: Arc<Mutex<Option<String>>>,
}

#[allow(dead_code)]
impl ScriptProbe {
    /// Lines handed to the bot so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Reason passed to `close`, if it was called.
    pub fn closed_with(&self) -> Option<String> {
        self.closed.lock().clone()
    }

    pub fn sent(&self) -> Vec<(Destination, String)> {
        self.out.sent()
    }
}

/// A [`Connection`] that replays a fixed list of lines.
pub struct ScriptedConnection {
    lines: VecDeque<InboundLine>,
    end: ScriptEnd,
    home: Option<String>,
    fail_open: bool,
    probe: ScriptProbe,
}

#[allow(dead_code)]
impl ScriptedConnection {
    pub fn new(lines: impl IntoIterator<Item = InboundLine>) -> Self {
        Self {
            lines: lines.into_iter().collect(),
            end: ScriptEnd::Idle,
            home: None,
            fail_open: false,
            probe: ScriptProbe::default(),
        }
    }

    /// A connection that never delivers a line.
    pub fn idle() -> Self {
        Self::new(VecDeque::<InboundLine>::new())
    }

    pub fn ending_with(mut self, end: ScriptEnd) -> Self {
        self.end = end;
        self
    }

    pub fn with_home_channel(mut self, channel: &str) -> Self {
        self.home = Some(channel.to_string());
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn probe(&self) -> ScriptProbe {
        self.probe.clone()
    }
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn open(&mut self) -> Result<(), ConnectionError> {
        if self.fail_open {
            return Err(ConnectionError::Handshake("scripted refusal".into()));
        }
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<InboundLine, ConnectionError>> {
        if let Some(line) = self.lines.pop_front() {
            self.probe.reads.fetch_add(1, Ordering::SeqCst);
            return Some(Ok(line));
        }
        match self.end {
            ScriptEnd::Idle => std::future::pending().await,
            ScriptEnd::Eof => None,
            ScriptEnd::Error => Some(Err(ConnectionError::ServerError("scripted error".into()))),
        }
    }

    fn outbound(&self) -> Arc<dyn Outbound> {
        self.probe.out.clone()
    }

    fn home_channel(&self) -> Option<&str> {
        self.home.as_deref()
    }

    async fn close(&mut self, reason: &str) -> Result<(), ConnectionError> {
        *self.probe.closed.lock() = Some(reason.to_string());
        Ok(())
    }
}
