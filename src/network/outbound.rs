//! Outbound write path: replies become queued PRIVMSG lines.

use crate::core::{Destination, Outbound};
use crate::error::ConnectionError;
use crate::proto::{MAX_IRC_LINE_LEN, Message};
use tokio::sync::mpsc;

/// Space the server adds when relaying our line (`:nick!user@host `).
const PREFIX_RESERVE: usize = 100;

/// Work items for the connection's writer task.
#[derive(Debug)]
pub enum WriterCommand {
    Send(Message),
    /// Flush what is queued, then stop writing.
    Close,
}

/// [`Outbound`] backed by the writer task's queue.
///
/// `send` never blocks: lines are queued in call order and paced by the
/// writer. Once the writer has gone away every send fails with `Closed`.
#[derive(Debug, Clone)]
pub struct QueueOutbound {
    tx: mpsc::UnboundedSender<WriterCommand>,
}

impl QueueOutbound {
    pub fn new(tx: mpsc::UnboundedSender<WriterCommand>) -> Self {
        Self { tx }
    }

    pub(crate) fn enqueue(&self, message: Message) -> Result<(), ConnectionError> {
        self.tx
            .send(WriterCommand::Send(message))
            .map_err(|_| ConnectionError::Closed)
    }
}

impl Outbound for QueueOutbound {
    fn send(&self, destination: &Destination, text: &str) -> Result<(), ConnectionError> {
        let target = destination.target();
        for chunk in split_reply(text, payload_budget(target)) {
            self.enqueue(Message::privmsg(target, chunk))?;
        }
        Ok(())
    }
}

fn payload_budget(target: &str) -> usize {
    // "PRIVMSG <target> :<text>\r\n"
    let overhead = "PRIVMSG ".len() + target.len() + " :".len() + 2;
    MAX_IRC_LINE_LEN
        .saturating_sub(PREFIX_RESERVE + overhead)
        .max(16)
}

/// Split reply text into IRC-sized lines.
///
/// Embedded newlines start a new line, blank lines are dropped, and long
/// lines are cut at whitespace where possible, never inside a character.
pub fn split_reply(text: &str, max_bytes: usize) -> Vec<String> {
    let mut out = Vec::new();
    for line in text.split(['\r', '\n']) {
        let mut rest = line.trim_end();
        while !rest.is_empty() {
            if rest.len() <= max_bytes {
                out.push(rest.to_string());
                break;
            }
            let mut cut = max_bytes;
            while !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut == 0 {
                cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
            } else if rest.as_bytes()[cut] != b' '
                && let Some(space) = rest[..cut].rfind(' ').filter(|&i| i > 0)
            {
                cut = space;
            }
            out.push(rest[..cut].to_string());
            rest = rest[cut..].trim_start();
        }
    }
    out
}
