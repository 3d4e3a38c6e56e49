use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver};

use crate::record::{LogEvent, LogRecord};
use crate::sink::LogSink;

/// Sole consumer of the shared aggregation channel: drains it into the
/// log sink on a dedicated background thread.
pub struct AggregationListener {
    frames: Receiver<Vec<u8>>,
    shutdown: Receiver<()>,
    sink: Arc<LogSink>,
}

impl AggregationListener {
    pub fn create(
        frames: Receiver<Vec<u8>>,
        shutdown: Receiver<()>,
        sink: Arc<LogSink>,
    ) -> JoinHandle<()> {
        thread::Builder::new()
            .name("logfunnel-listener".into())
            .spawn(move || {
                let listener = AggregationListener {
                    frames,
                    shutdown,
                    sink,
                };
                listener.run();
            })
            .expect("Unable to start aggregation listener")
    }

    fn run(&self) {
        loop {
            select! {
                recv(self.frames) -> frame => match frame {
                    Err(_) => break, // every producer gone
                    Ok(bytes) => self.deposit(bytes),
                },
                recv(self.shutdown) -> _ => break,
            }
        }
    }

    /// One dequeued frame becomes one appended record. A frame that
    /// fails to decode, or a subscriber that panics, costs that one
    /// record; the loop stays alive for all future ones.
    fn deposit(&self, bytes: Vec<u8>) {
        let Ok(event) = rmp_serde::from_slice::<LogEvent>(&bytes) else {
            return;
        };
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            self.sink.append(LogRecord::from(event));
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Severity;
    use std::time::{Duration, Instant};

    fn encoded(content: &str) -> Vec<u8> {
        rmp_serde::to_vec(&LogEvent::new(Severity::Info, "test", content)).unwrap()
    }

    fn wait_for(sink: &LogSink, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while sink.len() < count {
            assert!(Instant::now() < deadline, "sink never reached {count} records");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_undecodable_frame_is_discarded() {
        let (tx, rx) = crossbeam_channel::bounded(8);
        let (_stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let sink = Arc::new(LogSink::new());
        let handle = AggregationListener::create(rx, stop_rx, sink.clone());

        tx.send(vec![0xc1, 0xff, 0x00]).unwrap();
        tx.send(encoded("survivor")).unwrap();
        wait_for(&sink, 1);
        assert_eq!(sink.snapshot()[0].content, "survivor");

        drop(tx);
        handle.join().unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_panicking_subscriber_does_not_stop_the_loop() {
        let (tx, rx) = crossbeam_channel::bounded(8);
        let (_stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let sink = Arc::new(LogSink::new());
        sink.subscribe(|_| panic!("subscriber bug"));
        let handle = AggregationListener::create(rx, stop_rx, sink.clone());

        tx.send(encoded("first")).unwrap();
        tx.send(encoded("second")).unwrap();
        wait_for(&sink, 2);

        drop(tx);
        handle.join().unwrap();
        let contents: Vec<_> = sink.snapshot().iter().map(|r| r.content.clone()).collect();
        assert_eq!(contents, ["first", "second"]);
    }

    #[test]
    fn test_shutdown_signal_stops_the_thread() {
        let (_tx, rx) = crossbeam_channel::bounded::<Vec<u8>>(8);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let sink = Arc::new(LogSink::new());
        let handle = AggregationListener::create(rx, stop_rx, sink);

        stop_tx.send(()).unwrap();
        handle.join().unwrap();
    }
}
