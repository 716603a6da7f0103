//! Dispatch engine.
//!
//! Turns one inbound line into handler invocations:
//! 1. Lines with no tokens are dropped.
//! 2. Every scanner runs, in registration order.
//! 3. If the first token is a registered trigger, that command runs once.
//!
//! Each invocation gets a [`Sink`] bound to its registered policy. Handler
//! failures, panics and timeouts are contained to the invocation.

use super::event::IncomingEvent;
use super::handler::Handler;
use super::policy::DeliveryPolicy;
use super::registry::Registry;
use super::sink::{Outbound, Sink};
use crate::error::{HandlerError, HandlerResult};
use crate::telemetry::spans;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, warn};

/// Outcome of one handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// The handler returned normally; `true` if it acted.
    Completed(bool),
    /// The handler failed; treated as "no reply".
    Failed(&'static str),
}

impl Invocation {
    pub fn handled(&self) -> bool {
        matches!(self, Invocation::Completed(true))
    }
}

/// What happened while dispatching a line, for logs and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Scanner results in registration order, keyed by module.
    pub scanners: Vec<(String, Invocation)>,
    /// The matched trigger and its result, if any.
    pub command: Option<(String, Invocation)>,
    /// Replies handed to the outbound path.
    pub replies: usize,
}

impl DispatchReport {
    pub fn failures(&self) -> usize {
        self.scanners
            .iter()
            .chain(self.command.iter())
            .filter(|(_, inv)| matches!(inv, Invocation::Failed(_)))
            .count()
    }
}

/// Dispatch engine bound to a frozen registry.
pub struct Dispatcher {
    registry: Arc<Registry>,
    home_channel: Option<String>,
    handler_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            home_channel: None,
            handler_timeout: None,
        }
    }

    /// Channel used when a broadcast reply has no channel of its own.
    #[must_use]
    pub fn with_home_channel(mut self, home_channel: Option<String>) -> Self {
        self.home_channel = home_channel;
        self
    }

    /// Upper bound for a single handler invocation.
    #[must_use]
    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Dispatch one event fully before returning.
    pub async fn dispatch(&self, event: &IncomingEvent, outbound: &dyn Outbound) -> DispatchReport {
        let mut report = DispatchReport::default();

        let Some(first) = event.first_token() else {
            debug!(sender = %event.sender(), "Empty line ignored");
            return report;
        };

        let span = spans::dispatch(event.sender(), event.origin().channel());
        async {
            for entry in self.registry.scanners() {
                let module = entry.scanner.module();
                let (outcome, replies) = self
                    .invoke(entry.scanner.handler().as_ref(), entry.policy, event, outbound)
                    .instrument(spans::handler(module, None))
                    .await;
                report.replies += replies;
                report.scanners.push((module.to_string(), outcome));
            }

            // Not a registered trigger: a normal outcome, nothing to do.
            if let Some(entry) = self.registry.lookup_command(first) {
                let module = entry.command.module();
                let (outcome, replies) = self
                    .invoke(entry.command.handler().as_ref(), entry.policy, event, outbound)
                    .instrument(spans::handler(module, Some(first)))
                    .await;
                report.replies += replies;
                report.command = Some((first.to_string(), outcome));
            }
        }
        .instrument(span)
        .await;

        report
    }

    async fn invoke(
        &self,
        handler: &dyn Handler,
        policy: DeliveryPolicy,
        event: &IncomingEvent,
        outbound: &dyn Outbound,
    ) -> (Invocation, usize) {
        let sink = Sink::new(policy, event, outbound).with_home_channel(self.home_channel.as_deref());

        let result = self.run_bounded(handler, event, &sink).await;
        let outcome = match result {
            Ok(handled) => Invocation::Completed(handled),
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Handler failed");
                Invocation::Failed(e.error_code())
            }
        };
        (outcome, sink.delivered())
    }

    async fn run_bounded(
        &self,
        handler: &dyn Handler,
        event: &IncomingEvent,
        sink: &Sink<'_>,
    ) -> HandlerResult {
        let guarded = AssertUnwindSafe(handler.handle(event, sink)).catch_unwind();

        let caught = match self.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(caught) => caught,
                Err(_) => return Err(HandlerError::TimedOut(limit)),
            },
            None => guarded.await,
        };

        caught.unwrap_or(Err(HandlerError::Panicked))
    }
}
