use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Sender};

use crate::emitter::{install_forwarder, Emitter};
use crate::listener::AggregationListener;
use crate::process::ProcessSpawner;
use crate::sink::LogSink;

/// Capacity of the shared aggregation channel. Emission beyond this,
/// with the listener not keeping up, waits briefly and then drops.
pub const CHANNEL_CAPACITY: usize = 4096;

/// Everything the aggregation subsystem wires together: the main
/// process emitter, the spawner whose workers auto-install forwarders,
/// the sink the listener drains into, and the shutdown handle.
///
/// Owns the subsystem explicitly rather than through ambient globals;
/// [`init`] provides the guarded process-wide instance.
pub struct LogContext {
    emitter: Arc<Emitter>,
    sink: Arc<LogSink>,
    spawner: ProcessSpawner,
    shutdown_tx: Sender<()>,
    listener: Mutex<Option<JoinHandle<()>>>,
    down: AtomicBool,
}

impl LogContext {
    /// Brings up the whole subsystem: shared channel, forwarder in the
    /// current process, spawn hook installing a forwarder in every
    /// future worker, and the listener thread draining into the sink.
    ///
    /// Once this returns, any event logged through the main emitter or
    /// a worker spawned afterwards reaches the sink, short of channel
    /// overflow or forced process termination.
    pub fn create() -> Self {
        let (tx, rx) = bounded(CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let sink = Arc::new(LogSink::new());
        let emitter = Arc::new(Emitter::new());
        let spawner = ProcessSpawner::new(emitter.clone());

        let hook_tx = tx.clone();
        spawner.register_hook(move |child| install_forwarder(child, &hook_tx));
        install_forwarder(&emitter, &tx);

        let listener = AggregationListener::create(rx, shutdown_rx, sink.clone());

        LogContext {
            emitter,
            sink,
            spawner,
            shutdown_tx,
            listener: Mutex::new(Some(listener)),
            down: AtomicBool::new(false),
        }
    }

    /// The main process's emitter.
    pub fn emitter(&self) -> &Arc<Emitter> {
        &self.emitter
    }

    /// The aggregated log buffer.
    pub fn sink(&self) -> &Arc<LogSink> {
        &self.sink
    }

    /// The worker-process spawner bound to this subsystem.
    pub fn spawner(&self) -> &ProcessSpawner {
        &self.spawner
    }

    /// Stops the listener thread and waits for it to exit. Idempotent;
    /// events emitted afterwards are dropped silently.
    pub fn shutdown(&self) {
        if self.down.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());
        let handle = {
            let mut listener = self.listener.lock().unwrap_or_else(|e| e.into_inner());
            listener.take()
        };
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

static CONTEXT: OnceLock<LogContext> = OnceLock::new();

/// Process-wide bring-up. The first call creates the subsystem; every
/// later call returns the same context unchanged.
pub fn init() -> &'static LogContext {
    CONTEXT.get_or_init(LogContext::create)
}
