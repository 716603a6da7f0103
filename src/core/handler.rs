//! Handler trait and registration records.

use super::event::IncomingEvent;
use super::sink::Sink;
use crate::error::HandlerResult;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Module logic invoked by the dispatcher.
///
/// Handlers run on the dispatch loop, one at a time. Anything slow stalls
/// every other line, so keep work bounded. The event must not outlive the call.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Returns `Ok(true)` when the handler acted on the event.
    async fn handle(&self, event: &IncomingEvent, sink: &Sink<'_>) -> HandlerResult;
}

/// Adapter turning a synchronous closure into a [`Handler`].
pub struct FnHandler<F>(F);

/// Wrap a closure as a handler.
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&IncomingEvent, &Sink<'_>) -> HandlerResult + Send + Sync + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&IncomingEvent, &Sink<'_>) -> HandlerResult + Send + Sync + 'static,
{
    async fn handle(&self, event: &IncomingEvent, sink: &Sink<'_>) -> HandlerResult {
        (self.0)(event, sink)
    }
}

/// A trigger-selected handler, created once by a module at startup.
#[derive(Clone)]
pub struct Command {
    module: String,
    help: String,
    triggers: Vec<String>,
    handler: Arc<dyn Handler>,
}

impl Command {
    pub fn new<I, S>(
        module: impl Into<String>,
        triggers: I,
        help: impl Into<String>,
        handler: impl Handler + 'static,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            module: module.into(),
            help: help.into(),
            triggers: triggers.into_iter().map(Into::into).collect(),
            handler: Arc::new(handler),
        }
    }

    /// Owning feature module.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Usage line shown by `!help`.
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Literal tokens aliasing this command, in declaration order.
    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("module", &self.module)
            .field("triggers", &self.triggers)
            .finish_non_exhaustive()
    }
}

/// A handler run on every inbound line.
#[derive(Clone)]
pub struct MessageScanner {
    module: String,
    handler: Arc<dyn Handler>,
}

impl MessageScanner {
    pub fn new(module: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self {
            module: module.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl fmt::Debug for MessageScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageScanner")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}
