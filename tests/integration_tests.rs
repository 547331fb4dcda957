mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::ScriptedSource;
use horizon_poller::prelude::*;
use parking_lot::Mutex;

const TICK: Duration = Duration::from_millis(1000);

fn def(name: &str, path: &str, label: &str) -> MetricDefinition {
    MetricDefinition::new(name, path, label).unwrap()
}

fn scheduler_with(source: Arc<ScriptedSource>, threshold: u32) -> (PollScheduler, Arc<SeriesRegistry>) {
    let registry = Arc::new(SeriesRegistry::new());
    let scheduler = PollScheduler::new(source, Arc::clone(&registry), TICK, threshold).unwrap();
    (scheduler, registry)
}

#[tokio::test(start_paused = true)]
async fn test_timestamps_never_decrease_per_label() {
    let source = Arc::new(
        ScriptedSource::new()
            .with_values("fast", vec![Some(1.0)])
            .with_values("jittery", vec![Some(1.0), None, Some(2.0), None, None, Some(3.0)])
            .with_latency("jittery", Duration::from_millis(700))
            .with_values("slow", vec![Some(5.0)])
            .with_latency("slow", Duration::from_millis(2300)),
    );
    let (scheduler, registry) = scheduler_with(Arc::clone(&source), 5);
    scheduler.register(def("A", "lastMinute/avg", "fast")).unwrap();
    scheduler.register(def("B", "lastHour/avg", "jittery")).unwrap();
    scheduler.register(def("C", "lastDay/sum", "slow")).unwrap();

    let seen: Arc<Mutex<HashMap<String, Vec<u64>>>> = Arc::new(Mutex::new(HashMap::new()));
    let sink = Arc::clone(&seen);
    registry.subscribe(move |event| {
        if let RegistryEvent::Sample(sample) = event {
            sink.lock().entry(sample.label.clone()).or_default().push(sample.timestamp);
        }
    });

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_secs(20)).await;
    scheduler.stop();

    let seen = seen.lock();
    assert_eq!(seen.len(), 3);
    for (label, timestamps) in seen.iter() {
        assert!(timestamps.windows(2).all(|w| w[0] <= w[1]), "{} went backwards: {:?}", label, timestamps);
    }
    assert!(seen["fast"].len() > seen["slow"].len());
}

#[tokio::test(start_paused = true)]
async fn test_late_subscriber_sees_snapshot_then_stream() {
    let source = Arc::new(
        ScriptedSource::new()
            .with_values("L1", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)])
            .with_values("L2", vec![Some(10.0), Some(20.0), Some(30.0), Some(40.0), Some(50.0)]),
    );
    let (scheduler, registry) = scheduler_with(source, 5);
    scheduler.register(def("A", "lastMinute/avg", "L1")).unwrap();
    scheduler.register(def("B", "lastMinute/avg", "L2")).unwrap();
    scheduler.start().unwrap();

    // Three ticks at 0, 1000 and 2000 ms
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let (_handle, mut rx) = registry.subscribe_channel();
    match rx.recv().await.unwrap() {
        RegistryEvent::Snapshot(state) => {
            assert_eq!(state["L1"].value, Some(3.0));
            assert_eq!(state["L2"].value, Some(30.0));
        },
        other => panic!("expected snapshot first, got {:?}", other),
    }

    let mut next = Vec::new();
    for _ in 0..2 {
        match rx.recv().await.unwrap() {
            RegistryEvent::Sample(sample) => next.push((sample.label, sample.value)),
            other => panic!("expected sample, got {:?}", other),
        }
    }
    next.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(next, vec![("L1".to_string(), Some(4.0)), ("L2".to_string(), Some(40.0))]);

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_identical_streams() {
    let source = Arc::new(ScriptedSource::new().with_values("L1", vec![Some(1.0), None, Some(2.0)]));
    let (scheduler, registry) = scheduler_with(source, 1);
    scheduler.register(def("A", "lastMinute/avg", "L1")).unwrap();

    let (_a, mut first) = registry.subscribe_channel();
    let (_b, mut second) = registry.subscribe_channel();
    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_millis(3500)).await;
    scheduler.stop();

    let collect = |rx: &mut tokio::sync::mpsc::UnboundedReceiver<RegistryEvent>| {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    };
    let first = collect(&mut first);
    let second = collect(&mut second);

    assert_eq!(first, second);
    // snapshot, 1.0, failure, degraded (threshold 1), 2.0, recovered, 2.0
    assert_eq!(first.len(), 7);
    assert!(matches!(first[3], RegistryEvent::Degraded(_)));
    assert!(matches!(first[5], RegistryEvent::Recovered { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_stop_blocks_late_completions() {
    let source = Arc::new(
        ScriptedSource::new().with_values("L1", vec![Some(1.0)]).with_latency("L1", Duration::from_millis(400)),
    );
    let (scheduler, registry) = scheduler_with(Arc::clone(&source), 5);
    scheduler.register(def("A", "lastMinute/avg", "L1")).unwrap();

    let updates = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&updates);
    registry.subscribe(move |event| {
        if let RegistryEvent::Sample(_) = event {
            *counter.lock() += 1;
        }
    });

    scheduler.start().unwrap();
    // Second fetch is issued at 1000 ms and would complete at 1400 ms
    tokio::time::sleep(Duration::from_millis(1200)).await;
    scheduler.stop();
    let at_stop = *updates.lock();
    assert_eq!(at_stop, 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(*updates.lock(), at_stop);
    assert_eq!(source.calls("L1"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_from_config_polls_every_panel_window() {
    let config = MonitorConfig::new("http://localhost:8080/jolokia")
        .with_panel(Panel::new("Errors", "WarningsAndErrors", Aggregate::Sum));
    let source = Arc::new(ScriptedSource::new());
    let registry = Arc::new(SeriesRegistry::new());
    let scheduler =
        PollScheduler::from_config(&config, Arc::clone(&source) as Arc<dyn MetricSource>, registry).unwrap();

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    scheduler.stop();

    for window in Window::ALL {
        assert_eq!(source.calls(&format!("Errors / {}", window)), 2);
    }
    assert_eq!(source.total_calls(), 10);
}
