use super::*;
use crate::bus::LocalBus;
use ghost_core::FakeClock;
use ghost_storage::MemoryStore;
use std::time::Duration;

#[tokio::test]
async fn sample_once_publishes_on_the_daemon_metrics_topic() {
    let bus = Arc::new(LocalBus::new());
    let store = Arc::new(MemoryStore::new());
    let clock = FakeClock::default();
    let registry = Arc::new(ConnectionRegistry::new(
        bus.clone() as Arc<dyn Bus>,
        store as Arc<dyn ghost_storage::Store>,
        clock.clone(),
    ));
    let reporter = SelfMetricsReporter::new(bus.clone() as Arc<dyn Bus>, registry.clone(), clock, Duration::from_secs(10));

    let mut subscription = bus.subscribe(&format!("ghost:metrics:{DAEMON_CONNECTION_ID}")).unwrap();
    let mut cpu = CpuUsageSampler::new();
    reporter.sample_once(&mut cpu).await;

    let message = subscription.recv().await.expect("expected a published sample");
    assert_eq!(message.payload["processId"], DAEMON_CONNECTION_ID);
    assert_eq!(message.payload["appType"], "daemon");

    let record = registry.get(DAEMON_CONNECTION_ID).await.expect("self metrics should register the daemon");
    assert!(record.last_metrics.is_some());
}
