use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::emitter::Emitter;

/// How a worker process comes into being.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnStrategy {
    /// The child inherits a copy of the parent's emission chain
    /// (copy-of-parent-state creation).
    Duplicate,
    /// The child starts from scratch with an empty chain
    /// (re-run-from-scratch creation).
    Fresh,
}

type SpawnHook = Arc<dyn Fn(&Emitter) + Send + Sync>;

/// Creates worker processes and runs the registered hooks in each of
/// them before the worker's own entry logic.
pub struct ProcessSpawner {
    parent: Arc<Emitter>,
    hooks: Mutex<Vec<SpawnHook>>,
}

/// Handle to a running worker.
pub struct WorkerHandle {
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Waits for the worker to finish.
    pub fn join(self) {
        let _ = self.handle.join();
    }
}

impl ProcessSpawner {
    pub fn new(parent: Arc<Emitter>) -> Self {
        ProcessSpawner {
            parent,
            hooks: Mutex::new(Vec::new()),
        }
    }

    /// Registers a hook run in every subsequently spawned worker,
    /// against the worker's emitter, before its entry closure.
    pub fn register_hook(&self, hook: impl Fn(&Emitter) + Send + Sync + 'static) {
        let mut hooks = self.hooks.lock().unwrap_or_else(|e| e.into_inner());
        hooks.push(Arc::new(hook));
    }

    /// Spawns a worker. Its emitter is built per `strategy`, passed
    /// through every registered hook, then handed to `entry`.
    pub fn spawn<F>(&self, strategy: SpawnStrategy, entry: F) -> WorkerHandle
    where
        F: FnOnce(Arc<Emitter>) + Send + 'static,
    {
        let emitter = Arc::new(match strategy {
            SpawnStrategy::Duplicate => self.parent.duplicate(),
            SpawnStrategy::Fresh => Emitter::new(),
        });
        let hooks: Vec<SpawnHook> = {
            let hooks = self.hooks.lock().unwrap_or_else(|e| e.into_inner());
            hooks.clone()
        };
        let handle = thread::Builder::new()
            .name("logfunnel-worker".into())
            .spawn(move || {
                for hook in &hooks {
                    hook(&emitter);
                }
                entry(emitter);
            })
            .expect("Unable to start worker");
        WorkerHandle { handle }
    }
}
