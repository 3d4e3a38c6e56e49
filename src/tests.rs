//! End-to-end scenarios across the whole subsystem.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::init::LogContext;
use crate::process::SpawnStrategy;
use crate::record::Severity;
use crate::sink::LogSink;

fn wait_for(sink: &LogSink, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while sink.len() < count {
        assert!(Instant::now() < deadline, "sink never reached {count} records");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_main_and_worker_records_reach_the_sink() {
    let ctx = LogContext::create();

    ctx.emitter().info("main", "hello");
    wait_for(ctx.sink(), 1);
    let snap = ctx.sink().snapshot();
    assert_eq!(snap[0].level, Severity::Info);
    assert_eq!(snap[0].source, "main");
    assert_eq!(snap[0].content, "hello");

    ctx.spawner()
        .spawn(SpawnStrategy::Fresh, |emitter| {
            emitter.error("worker", "boom");
        })
        .join();
    wait_for(ctx.sink(), 2);
    let snap = ctx.sink().snapshot();
    assert!(snap
        .iter()
        .any(|r| r.level == Severity::Error && r.content == "boom"));

    ctx.shutdown();
}

#[test]
fn test_duplicated_worker_does_not_double_emit() {
    let ctx = LogContext::create();

    // The duplicated child inherits the parent's forwarder AND runs the
    // install hook; idempotence must leave exactly one forwarder.
    ctx.spawner()
        .spawn(SpawnStrategy::Duplicate, |emitter| {
            emitter.info("worker", "once");
        })
        .join();

    wait_for(ctx.sink(), 1);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(ctx.sink().len(), 1);

    ctx.shutdown();
}

#[test]
fn test_per_worker_emission_order_is_preserved() {
    let ctx = LogContext::create();

    let workers = 4;
    let per_worker = 25;
    let handles: Vec<_> = (0..workers)
        .map(|w| {
            ctx.spawner().spawn(SpawnStrategy::Fresh, move |emitter| {
                for i in 0..per_worker {
                    emitter.info(&format!("worker-{w}"), format!("{i}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join();
    }

    wait_for(ctx.sink(), workers * per_worker);
    assert_eq!(ctx.sink().len(), workers * per_worker);

    // Arrival interleaving across workers is arbitrary; within one
    // worker the emission order must survive.
    let mut seen: HashMap<String, Vec<usize>> = HashMap::new();
    for record in ctx.sink().snapshot() {
        seen.entry(record.source.clone())
            .or_default()
            .push(record.content.parse().unwrap());
    }
    assert_eq!(seen.len(), workers);
    for (source, order) in seen {
        let expected: Vec<usize> = (0..per_worker).collect();
        assert_eq!(order, expected, "records from {source} were reordered");
    }

    ctx.shutdown();
}

#[test]
fn test_subscriber_sees_every_append() {
    let ctx = LogContext::create();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    ctx.sink()
        .subscribe(move |record| sink_seen.lock().unwrap().push(record.content.clone()));

    ctx.emitter().debug("main", "a");
    ctx.emitter().debug("main", "b");
    wait_for(ctx.sink(), 2);
    assert_eq!(*seen.lock().unwrap(), ["a", "b"]);

    ctx.shutdown();
}

#[test]
fn test_shutdown_is_prompt_idempotent_and_final() {
    let ctx = LogContext::create();

    ctx.emitter().info("main", "before");
    wait_for(ctx.sink(), 1);

    let start = Instant::now();
    ctx.shutdown();
    ctx.shutdown();
    assert!(start.elapsed() < Duration::from_secs(2));

    // Late emission is dropped, never queued for a dead listener.
    ctx.emitter().info("main", "after");
    thread::sleep(Duration::from_millis(100));
    assert_eq!(ctx.sink().len(), 1);
}

#[test]
fn test_emitter_source_strings() {
    // `info` and friends accept any displayable source through log().
    let ctx = LogContext::create();
    let name = String::from("analysis.cfg");
    ctx.emitter().warn(&name, "unresolved jump");
    wait_for(ctx.sink(), 1);
    assert_eq!(ctx.sink().snapshot()[0].source, "analysis.cfg");
    ctx.shutdown();
}
