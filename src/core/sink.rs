//! Reply sinks and the outbound write path.

use super::event::{IncomingEvent, ReplyRequest};
use super::policy::{DeliveryPolicy, Destination};
use crate::error::ConnectionError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// The single capability the core needs from a chat connection.
///
/// Implementations must preserve call order.
pub trait Outbound: Send + Sync {
    fn send(&self, destination: &Destination, text: &str) -> Result<(), ConnectionError>;
}

/// Outbound that records every write in memory.
#[derive(Debug, Default)]
pub struct CapturingOutbound {
    sent: Mutex<Vec<(Destination, String)>>,
}

impl CapturingOutbound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, in order.
    pub fn sent(&self) -> Vec<(Destination, String)> {
        self.sent.lock().clone()
    }

    /// Drain and return everything written so far.
    pub fn take(&self) -> Vec<(Destination, String)> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl Outbound for CapturingOutbound {
    fn send(&self, destination: &Destination, text: &str) -> Result<(), ConnectionError> {
        self.sent.lock().push((destination.clone(), text.to_string()));
        Ok(())
    }
}

/// Reply callback bound to one event and one delivery policy.
///
/// Each [`Sink::reply`] resolves its destination immediately and writes
/// through to the outbound path, so replies leave in emission order.
pub struct Sink<'a> {
    policy: DeliveryPolicy,
    event: &'a IncomingEvent,
    outbound: &'a dyn Outbound,
    home_channel: Option<&'a str>,
    delivered: AtomicUsize,
}

impl<'a> Sink<'a> {
    pub fn new(policy: DeliveryPolicy, event: &'a IncomingEvent, outbound: &'a dyn Outbound) -> Self {
        Self {
            policy,
            event,
            outbound,
            home_channel: None,
            delivered: AtomicUsize::new(0),
        }
    }

    /// Sink that always answers in the event's channel.
    pub fn to_channel(event: &'a IncomingEvent, outbound: &'a dyn Outbound) -> Self {
        Self::new(DeliveryPolicy::BroadcastToOrigin, event, outbound)
    }

    /// Sink that always answers the sender privately.
    pub fn to_nick(event: &'a IncomingEvent, outbound: &'a dyn Outbound) -> Self {
        Self::new(DeliveryPolicy::DirectToSender, event, outbound)
    }

    /// Sink that answers where the event was said.
    pub fn contextual(event: &'a IncomingEvent, outbound: &'a dyn Outbound) -> Self {
        Self::new(DeliveryPolicy::ContextSensitive, event, outbound)
    }

    #[must_use]
    pub fn with_home_channel(mut self, home_channel: Option<&'a str>) -> Self {
        self.home_channel = home_channel;
        self
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    /// Where `request` would be delivered.
    pub fn destination_for(&self, request: &ReplyRequest) -> Destination {
        self.policy.resolve(self.event, request, self.home_channel)
    }

    /// Emit one reply. Delivery is at-most-once; failures are logged.
    pub fn reply(&self, request: impl Into<ReplyRequest>) {
        let request = request.into();
        let destination = self.destination_for(&request);
        match self.outbound.send(&destination, &request.text) {
            Ok(()) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(target = %destination, "Reply queued");
            }
            Err(e) => {
                warn!(target = %destination, error = %e, "Failed to deliver reply");
            }
        }
    }

    /// Number of replies handed to the outbound path.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::Relaxed)
    }
}
