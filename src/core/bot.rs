//! Bot facade: registration API and connection lifecycle.
//!
//! ```text
//! Created --connect()--> Connected --run()--> Running --stop()--> Stopping --> Stopped
//! ```
//!
//! Commands and scanners can only be added while `Created`. Connecting freezes
//! the registry. `stop()` is safe from any task: the loop finishes the line it
//! is dispatching, reads nothing further, then closes the connection.

use super::dispatch::Dispatcher;
use super::event::{IncomingEvent, Origin};
use super::handler::{Command, MessageScanner};
use super::policy::DeliveryPolicy;
use super::registry::Registry;
use super::sink::{Outbound, Sink};
use crate::error::{BotError, ConnectionError, RegistrationError};
use crate::network::{Connection, InboundLine};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Lifecycle states of a [`Bot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Created,
    Connected,
    Running,
    Stopping,
    Stopped,
}

/// State shared between the bot and its stop handles.
struct Lifecycle {
    state: RwLock<BotState>,
    stop_tx: watch::Sender<bool>,
}

impl Lifecycle {
    fn transition(&self, next: BotState) {
        let mut state = self.state.write();
        info!(from = ?*state, to = ?next, "Bot state changed");
        *state = next;
    }
}

/// Clonable handle that asks a running bot to stop.
#[derive(Clone)]
pub struct StopHandle {
    lifecycle: Arc<Lifecycle>,
}

impl StopHandle {
    /// Request shutdown. Idempotent; never blocks.
    pub fn stop(&self) {
        let already = self.lifecycle.stop_tx.send_replace(true);
        if already {
            return;
        }
        let mut state = self.lifecycle.state.write();
        if *state == BotState::Running {
            info!("Stop requested");
            *state = BotState::Stopping;
        }
    }

    pub fn state(&self) -> BotState {
        *self.lifecycle.state.read()
    }
}

/// The bot facade.
pub struct Bot {
    lifecycle: Arc<Lifecycle>,
    registry: Registry,
    handler_timeout: Option<Duration>,
    dispatcher: Option<Dispatcher>,
    connection: Option<Box<dyn Connection>>,
    outbound: Option<Arc<dyn Outbound>>,
    home_channel: Option<String>,
}

impl Default for Bot {
    fn default() -> Self {
        Self::new()
    }
}

impl Bot {
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            lifecycle: Arc::new(Lifecycle {
                state: RwLock::new(BotState::Created),
                stop_tx,
            }),
            registry: Registry::new(),
            handler_timeout: None,
            dispatcher: None,
            connection: None,
            outbound: None,
            home_channel: None,
        }
    }

    /// Bound every handler invocation; `None` lets handlers run unbounded.
    #[must_use]
    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn state(&self) -> BotState {
        *self.lifecycle.state.read()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }

    /// Request shutdown; see [`StopHandle::stop`].
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    /// The registry as populated so far.
    pub fn registry(&self) -> &Registry {
        match &self.dispatcher {
            Some(dispatcher) => dispatcher.registry().as_ref(),
            None => &self.registry,
        }
    }

    fn ensure_open_for_registration(&self) -> Result<(), RegistrationError> {
        if self.state() == BotState::Created {
            Ok(())
        } else {
            Err(RegistrationError::RegistrationClosed)
        }
    }

    /// Register a trigger-selected command.
    pub fn add_command(
        &mut self,
        command: Command,
        policy: DeliveryPolicy,
    ) -> Result<(), RegistrationError> {
        self.ensure_open_for_registration()?;
        self.registry.register_command(command, policy)
    }

    /// Register a handler that sees every line.
    pub fn add_scanner(
        &mut self,
        scanner: MessageScanner,
        policy: DeliveryPolicy,
    ) -> Result<(), RegistrationError> {
        self.ensure_open_for_registration()?;
        self.registry.register_scanner(scanner, policy);
        Ok(())
    }

    /// Open the connection and freeze the registry.
    ///
    /// On failure the bot moves to `Stopped`; it never runs half-connected.
    pub async fn connect(&mut self, connection: impl Connection + 'static) -> Result<(), BotError> {
        self.expect_state(BotState::Created)?;

        let mut connection: Box<dyn Connection> = Box::new(connection);
        if let Err(e) = connection.open().await {
            error!(error = %e, "Connection handshake failed");
            self.lifecycle.transition(BotState::Stopped);
            return Err(e.into());
        }

        let registry = Arc::new(std::mem::take(&mut self.registry));
        info!(
            commands = registry.commands().len(),
            scanners = registry.scanners().len(),
            "Registry frozen"
        );

        self.home_channel = connection.home_channel().map(str::to_string);
        self.dispatcher = Some(
            Dispatcher::new(registry)
                .with_home_channel(self.home_channel.clone())
                .with_handler_timeout(self.handler_timeout),
        );
        self.outbound = Some(connection.outbound());
        self.connection = Some(connection);
        self.lifecycle.transition(BotState::Connected);
        Ok(())
    }

    /// Run the event loop until stopped or the connection fails.
    ///
    /// Lines are dispatched one at a time, in receipt order.
    pub async fn run(&mut self) -> Result<(), BotError> {
        self.expect_state(BotState::Connected)?;
        let (Some(mut connection), Some(dispatcher)) =
            (self.connection.take(), self.dispatcher.as_ref())
        else {
            return Err(BotError::InvalidState {
                expected: BotState::Connected,
                actual: self.state(),
            });
        };
        let outbound = connection.outbound();

        let mut stop_rx = self.lifecycle.stop_tx.subscribe();
        {
            let mut state = self.lifecycle.state.write();
            // stop() may already have been requested before run().
            *state = if *stop_rx.borrow() {
                BotState::Stopping
            } else {
                BotState::Running
            };
            info!(state = ?*state, "Event loop starting");
        }

        let result: Result<(), ConnectionError> = loop {
            if *stop_rx.borrow_and_update() {
                break Ok(());
            }

            let next = tokio::select! {
                biased;
                _ = stop_rx.changed() => continue,
                next = connection.recv() => next,
            };

            match next {
                Some(Ok(line)) => {
                    let event = event_from_line(line);
                    let report = dispatcher.dispatch(&event, outbound.as_ref()).await;
                    debug!(
                        scanners = report.scanners.len(),
                        command = ?report.command,
                        replies = report.replies,
                        "Line dispatched"
                    );
                }
                Some(Err(e)) => {
                    error!(error = %e, "Connection failed");
                    break Err(e);
                }
                None => {
                    warn!("Connection closed by peer");
                    break Err(ConnectionError::Closed);
                }
            }
        };

        if self.state() != BotState::Stopping {
            self.lifecycle.transition(BotState::Stopping);
        }
        let _ = self.lifecycle.stop_tx.send_replace(true);

        let reason = if result.is_ok() { "Shutting down" } else { "Connection error" };
        if let Err(e) = connection.close(reason).await {
            warn!(error = %e, "Error while closing connection");
        }
        self.lifecycle.transition(BotState::Stopped);

        result.map_err(BotError::from)
    }

    /// Sink that always answers in the event's channel.
    pub fn reply_to_channel<'a>(&'a self, event: &'a IncomingEvent) -> Result<Sink<'a>, BotError> {
        self.sink(DeliveryPolicy::BroadcastToOrigin, event)
    }

    /// Sink that always answers the sender privately.
    pub fn reply_to_nick<'a>(&'a self, event: &'a IncomingEvent) -> Result<Sink<'a>, BotError> {
        self.sink(DeliveryPolicy::DirectToSender, event)
    }

    /// Sink that answers where the event was said.
    pub fn reply_contextual<'a>(&'a self, event: &'a IncomingEvent) -> Result<Sink<'a>, BotError> {
        self.sink(DeliveryPolicy::ContextSensitive, event)
    }

    fn sink<'a>(
        &'a self,
        policy: DeliveryPolicy,
        event: &'a IncomingEvent,
    ) -> Result<Sink<'a>, BotError> {
        let outbound = self.outbound.as_deref().ok_or(BotError::InvalidState {
            expected: BotState::Connected,
            actual: self.state(),
        })?;
        Ok(Sink::new(policy, event, outbound).with_home_channel(self.home_channel.as_deref()))
    }

    fn expect_state(&self, expected: BotState) -> Result<(), BotError> {
        let actual = self.state();
        if actual == expected {
            Ok(())
        } else {
            Err(BotError::InvalidState { expected, actual })
        }
    }
}

fn event_from_line(line: InboundLine) -> IncomingEvent {
    IncomingEvent::new(line.sender, Origin::from_target(&line.target), line.text)
}
