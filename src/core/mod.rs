//! Dispatch core: events, delivery policies, sinks, handlers, the registry,
//! the dispatch engine and the bot facade.

mod bot;
mod dispatch;
mod event;
mod handler;
mod policy;
mod registry;
mod sink;

pub use bot::{Bot, BotState, StopHandle};
pub use dispatch::{DispatchReport, Dispatcher, Invocation};
pub use event::{IncomingEvent, Origin, ReplyRequest};
pub use handler::{Command, FnHandler, Handler, MessageScanner, handler_fn};
pub use policy::{DeliveryPolicy, Destination};
pub use registry::{RegisteredCommand, RegisteredScanner, Registry};
pub use sink::{CapturingOutbound, Outbound, Sink};
