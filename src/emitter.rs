use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::record::{LogEvent, Severity};

/// How long a full aggregation channel may hold up an emitting thread
/// before the event is dropped instead.
pub const FORWARD_TIMEOUT: Duration = Duration::from_millis(50);

/// Capability tag carried by every installed handler.
///
/// The forwarder install check compares tags, not object identity, so it
/// gives the right answer both in a freshly started process (no handlers
/// inherited) and in a duplicated one (parent's forwarder carried over).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Relays events onto the shared aggregation channel.
    Forwarder,
    /// Any other interceptor.
    Other,
}

/// One interceptor in a process's emission chain. Handlers see every
/// event emitted in their process, in chain order.
pub trait LogHandler: Send {
    fn handle(&self, event: &LogEvent);

    /// Tag inspected by [`install_forwarder`].
    fn kind(&self) -> HandlerKind {
        HandlerKind::Other
    }

    /// Copy of this handler, for duplicating process creation.
    fn boxed_clone(&self) -> Box<dyn LogHandler>;
}

/// Per-process log emission facility: an explicit, ordered chain of
/// handlers that every emitted event walks front to back.
pub struct Emitter {
    handlers: Mutex<Vec<Box<dyn LogHandler>>>,
}

impl Emitter {
    /// An emitter with an empty chain, as in a freshly started process.
    pub fn new() -> Self {
        Emitter {
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// An emitter carrying a copy of this one's chain, as in a process
    /// created by duplicating its parent's state.
    pub fn duplicate(&self) -> Self {
        let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        Emitter {
            handlers: Mutex::new(handlers.iter().map(|h| h.boxed_clone()).collect()),
        }
    }

    /// Appends a handler to the back of the chain.
    pub fn add_handler(&self, handler: Box<dyn LogHandler>) {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers.push(handler);
    }

    /// The tags of the installed handlers, in chain order.
    pub fn handler_kinds(&self) -> Vec<HandlerKind> {
        let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers.iter().map(|h| h.kind()).collect()
    }

    /// Emits one event through the chain. The message is rendered here,
    /// once, and never again downstream.
    pub fn log(&self, level: Severity, source: &str, content: impl Into<String>) {
        let event = LogEvent::new(level, source, content);
        let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        for handler in handlers.iter() {
            handler.handle(&event);
        }
    }

    /// Emit with trace severity.
    pub fn trace(&self, source: &str, msg: impl Into<String>) {
        self.log(Severity::Trace, source, msg);
    }

    /// Emit with debug severity.
    pub fn debug(&self, source: &str, msg: impl Into<String>) {
        self.log(Severity::Debug, source, msg);
    }

    /// Emit with info severity.
    pub fn info(&self, source: &str, msg: impl Into<String>) {
        self.log(Severity::Info, source, msg);
    }

    /// Emit with warn severity.
    pub fn warn(&self, source: &str, msg: impl Into<String>) {
        self.log(Severity::Warn, source, msg);
    }

    /// Emit with error severity.
    pub fn error(&self, source: &str, msg: impl Into<String>) {
        self.log(Severity::Error, source, msg);
    }

    /// Emit with critical severity.
    pub fn critical(&self, source: &str, msg: impl Into<String>) {
        self.log(Severity::Critical, source, msg);
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Relays every emitted event onto the shared aggregation channel.
pub struct ForwardHandler {
    sender: Sender<Vec<u8>>,
}

impl ForwardHandler {
    pub fn new(sender: Sender<Vec<u8>>) -> Self {
        ForwardHandler { sender }
    }
}

impl LogHandler for ForwardHandler {
    fn handle(&self, event: &LogEvent) {
        let Ok(bytes) = rmp_serde::to_vec(event) else {
            return;
        };
        // Full channel: wait briefly, then drop the event. Emission must
        // never stall the emitting thread indefinitely.
        let _ = self.sender.send_timeout(bytes, FORWARD_TIMEOUT);
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Forwarder
    }

    fn boxed_clone(&self) -> Box<dyn LogHandler> {
        Box::new(ForwardHandler {
            sender: self.sender.clone(),
        })
    }
}

/// Installs a forwarder bound to `sender` at the front of the emitter's
/// chain, unless one is already present.
///
/// Works for both process-creation strategies: a duplicated child may
/// already carry the parent's forwarder, where a blind install would
/// double-emit every record; a fresh child carries nothing and needs
/// the install.
pub fn install_forwarder(emitter: &Emitter, sender: &Sender<Vec<u8>>) {
    let mut handlers = emitter.handlers.lock().unwrap_or_else(|e| e.into_inner());
    if !handlers.iter().any(|h| h.kind() == HandlerKind::Forwarder) {
        handlers.insert(0, Box::new(ForwardHandler::new(sender.clone())));
    }
}
