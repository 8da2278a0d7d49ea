use super::*;
use ghost_core::{ConnectionStatus, FakeClock};
use ghost_storage::MemoryStore;
use std::time::Duration;

fn sample(id: &str, ts: u64) -> MetricSample {
    MetricSample {
        process_id: id.to_string(),
        cpu_percentage: 1.0,
        memory_bytes: 1024,
        thread_count: 1,
        handle_count: 1,
        app_type: "external".to_string(),
        timestamp: ts,
    }
}

fn setup() -> (ConnectionRegistry<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    let bus: Arc<dyn Bus> = Arc::new(crate::bus::LocalBus::new());
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    (ConnectionRegistry::new(bus, store, clock.clone()), clock)
}

#[tokio::test]
async fn heartbeat_for_unknown_id_auto_registers() {
    let (registry, _clock) = setup();
    registry.upsert_from_heartbeat("ext1", "Running", Some("external")).await;

    let record = registry.get("ext1").await.unwrap();
    assert_eq!(record.status, ConnectionStatus::Running);
    assert_eq!(record.metadata.app_type, "external");
}

#[tokio::test]
async fn subsequent_heartbeats_do_not_re_register() {
    let (registry, clock) = setup();
    registry.upsert_from_heartbeat("ext1", "Running", Some("external")).await;
    clock.advance(Duration::from_millis(50));
    registry.upsert_from_heartbeat("ext1", "Running", Some("external")).await;

    assert_eq!(registry.list_all().await.len(), 1);
}

#[tokio::test]
async fn stale_heartbeat_with_clock_regression_is_dropped() {
    let (registry, clock) = setup();
    registry.upsert_from_heartbeat("ext1", "Running", Some("external")).await;
    let after_first = registry.get("ext1").await.unwrap().last_seen;

    clock.set_epoch_ms(after_first - 10);
    registry.upsert_from_heartbeat("ext1", "Running", Some("external")).await;

    assert_eq!(registry.get("ext1").await.unwrap().last_seen, after_first);
}

#[tokio::test]
async fn sweep_marks_stale_connection_disconnected_and_emits_once() {
    let (registry, clock) = setup();
    let mut events = registry.bus.subscribe("ghost:events").unwrap();

    registry.upsert_from_heartbeat("ext1", "Running", Some("external")).await;
    clock.advance(Duration::from_secs(121));
    registry.sweep(Duration::from_secs(120)).await;

    let record = registry.get("ext1").await.unwrap();
    assert_eq!(record.status, ConnectionStatus::Disconnected);

    let event = events.recv().await.unwrap();
    assert_eq!(event.payload["type"], "connection.disconnected");

    // A second sweep must not re-emit for an already-disconnected record.
    registry.sweep(Duration::from_secs(120)).await;
    assert!(
        tokio::time::timeout(Duration::from_millis(20), events.recv()).await.is_err(),
        "sweep should not re-emit disconnected for an already-disconnected record"
    );
}

#[tokio::test]
async fn list_active_excludes_stale_records() {
    let (registry, clock) = setup();
    registry.upsert_from_heartbeat("ext1", "Running", Some("external")).await;
    clock.advance(Duration::from_secs(200));
    registry.upsert_from_heartbeat("ext2", "Running", Some("external")).await;

    let active = registry.list_active(Duration::from_secs(120)).await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, "ext2");
}

#[tokio::test]
async fn upsert_from_metrics_forwards_sample_to_store_and_forces_running() {
    let (registry, clock) = setup();
    registry.upsert_from_heartbeat("ext1", "Warning", Some("external")).await;
    registry.upsert_from_metrics("ext1", sample("ext1", clock.epoch_ms())).await.unwrap();

    let record = registry.get("ext1").await.unwrap();
    assert_eq!(record.status, ConnectionStatus::Running);
    assert!(record.last_metrics.is_some());
}

#[tokio::test]
async fn reconnection_after_disconnect_emits_connection_connected() {
    let (registry, clock) = setup();
    let mut events = registry.bus.subscribe("ghost:events").unwrap();

    registry.upsert_from_heartbeat("ext1", "Running", Some("external")).await;
    clock.advance(Duration::from_secs(121));
    registry.sweep(Duration::from_secs(120)).await;
    let _disconnected_event = events.recv().await.unwrap();

    clock.advance(Duration::from_secs(1));
    registry.upsert_from_heartbeat("ext1", "Running", Some("external")).await;

    let event = events.recv().await.unwrap();
    assert_eq!(event.payload["type"], "connection.connected");
}
