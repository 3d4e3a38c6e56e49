//! Cross-process log aggregation: events emitted in the main process and
//! in any number of worker processes funnel through one shared channel
//! into a single observable, append-only buffer.

pub mod config;
pub mod emitter;
pub mod init;
pub mod listener;
pub mod process;
pub mod record;
pub mod sink;

#[cfg(test)]
mod tests;

pub use emitter::{install_forwarder, Emitter, ForwardHandler, HandlerKind, LogHandler};
pub use init::{init, LogContext, CHANNEL_CAPACITY};
pub use process::{ProcessSpawner, SpawnStrategy, WorkerHandle};
pub use record::{LogEvent, LogRecord, Severity, TimeStamp};
pub use sink::{LogSink, SubscriberId};
