use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::record::LogRecord;

/// Identifies a registered subscriber, for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Callback = Box<dyn Fn(&Arc<LogRecord>) + Send>;

/// Ordered, append-only, observable buffer of log records.
///
/// The aggregation listener is the sole writer; subscribers and snapshot
/// readers may run concurrently with appends. Retention is unbounded;
/// capping the buffer is a presentation concern, not handled here.
pub struct LogSink {
    records: RwLock<Vec<Arc<LogRecord>>>,
    subscribers: Mutex<Vec<(SubscriberId, Callback)>>,
    next_id: AtomicU64,
}

impl LogSink {
    pub fn new() -> Self {
        LogSink {
            records: RwLock::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Appends a record and notifies every subscriber, synchronously and
    /// in registration order, with the appended record as payload.
    pub fn append(&self, record: LogRecord) {
        let record = Arc::new(record);
        {
            let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
            records.push(record.clone());
        }
        let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        for (_, callback) in subscribers.iter() {
            callback(&record);
        }
    }

    /// Registers an observer invoked on every append.
    pub fn subscribe(&self, callback: impl Fn(&Arc<LogRecord>) + Send + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.push((id, Box::new(callback)));
        id
    }

    /// Removes a previously registered observer. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|(sid, _)| *sid != id);
    }

    /// A consistent view of all records held so far.
    pub fn snapshot(&self) -> Vec<Arc<LogRecord>> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.clone()
    }

    pub fn len(&self) -> usize {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}
