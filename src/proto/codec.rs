//! Tokio codec for IRC lines.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use super::{MAX_INBOUND_LINE_LEN, Message, ProtocolError};

/// Frames LF or CRLF terminated lines and parses them into [`Message`]s.
///
/// Per-line problems never end the stream: bytes that are not valid UTF-8
/// are replaced with U+FFFD, and blank, unparsable or oversized lines are
/// logged and skipped. Outgoing messages are terminated with CRLF.
pub struct IrcCodec {
    /// Index of the next byte to check for a newline.
    next_index: usize,
    max_len: usize,
    /// Dropping the rest of an oversized line until its newline shows up.
    discarding: bool,
}

impl IrcCodec {
    pub fn new() -> Self {
        Self::with_max_len(MAX_INBOUND_LINE_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }

    /// Next complete raw line, without its terminator.
    fn next_line(&mut self, src: &mut BytesMut) -> Option<BytesMut> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                if src.len() > self.max_len {
                    if !self.discarding {
                        warn!(limit = self.max_len, "Discarding oversized line");
                    }
                    src.clear();
                    self.discarding = true;
                }
                self.next_index = src.len();
                return None;
            };

            let mut line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            if line.len() > self.max_len {
                warn!(len = line.len(), limit = self.max_len, "Discarding oversized line");
                continue;
            }

            line.truncate(line.len() - 1);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            return Some(line);
        }
    }

    fn parse(raw: &[u8]) -> Option<Message> {
        let line = String::from_utf8_lossy(raw);
        if line.trim().is_empty() {
            return None;
        }
        match line.parse::<Message>() {
            Ok(msg) => Some(msg),
            Err(cause) => {
                warn!(line = %line, error = %cause, "Skipping invalid line");
                None
            }
        }
    }
}

impl Default for IrcCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, ProtocolError> {
        while let Some(line) = self.next_line(src) {
            if let Some(msg) = Self::parse(&line) {
                return Ok(Some(msg));
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>, ProtocolError> {
        if let Some(msg) = self.decode(src)? {
            return Ok(Some(msg));
        }
        // Unterminated trailing bytes.
        let rest = src.split();
        self.next_index = 0;
        if std::mem::take(&mut self.discarding) {
            return Ok(None);
        }
        Ok(Self::parse(rest.strip_suffix(b"\r").unwrap_or(&rest[..])))
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        // Never let a payload smuggle an extra protocol line.
        let line: String = msg
            .to_string()
            .chars()
            .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
            .collect();
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
