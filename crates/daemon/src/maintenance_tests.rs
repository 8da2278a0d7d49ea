use super::*;
use crate::bus::LocalBus;
use crate::registry::ConnectionRegistry;
use crate::supervisor::launcher::TokioLauncher;
use crate::supervisor::{ProcessSupervisor, SupervisorConfig};
use ghost_core::{ConnectionStatus, FakeClock, ProcessRecord, ProcessStatus};
use ghost_storage::{MemoryStore, Store as _};

fn harness() -> (Arc<ConnectionRegistry<FakeClock>>, Arc<ProcessSupervisor<FakeClock>>, Arc<MemoryStore>) {
    let (registry, supervisor, store, _clock) = harness_with_clock();
    (registry, supervisor, store)
}

fn harness_with_clock() -> (Arc<ConnectionRegistry<FakeClock>>, Arc<ProcessSupervisor<FakeClock>>, Arc<MemoryStore>, FakeClock) {
    let bus = Arc::new(LocalBus::new());
    let store = Arc::new(MemoryStore::new());
    let clock = FakeClock::default();
    let config = SupervisorConfig {
        max_start_attempts: 2,
        startup_timeout: Duration::from_secs(5),
        shutdown_timeout: Duration::from_millis(500),
    };
    let supervisor = Arc::new(ProcessSupervisor::new(
        bus.clone() as Arc<dyn Bus>,
        store.clone() as Arc<dyn ghost_storage::Store>,
        Arc::new(TokioLauncher),
        clock.clone(),
        config,
    ));
    let registry =
        Arc::new(ConnectionRegistry::new(bus as Arc<dyn Bus>, store.clone() as Arc<dyn ghost_storage::Store>, clock.clone()));
    (registry, supervisor, store, clock)
}

fn registered(id: &str) -> ProcessRecord {
    let mut record = ProcessRecord::builder().id(id).executable_path(std::path::PathBuf::from("/bin/true")).build();
    record.status = ProcessStatus::Registered;
    record
}

fn long_running(id: &str) -> ProcessRecord {
    let mut record = ProcessRecord::builder().id(id).executable_path(std::path::PathBuf::from("/bin/sleep")).build();
    record.arguments = vec!["5".to_string()];
    record.status = ProcessStatus::Registered;
    record
}

#[tokio::test]
async fn on_tick_sweeps_stale_connections() {
    let (registry, supervisor, store) = harness();
    let ticker = MaintenanceTicker::new(
        registry.clone(),
        supervisor,
        store,
        Duration::from_secs(0),
        Duration::from_secs(30),
        Duration::from_secs(1),
        Duration::from_secs(60),
    );

    registry.ensure_daemon_self().await;
    registry.upsert_from_heartbeat("stale-app", "Running", Some("app")).await;

    ticker.on_tick(Duration::from_secs(0)).await;

    let record = registry.get("stale-app").await.unwrap();
    assert_eq!(record.status, ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn on_tick_snapshots_every_managed_record_once_the_checkpoint_interval_elapses() {
    let (registry, supervisor, store) = harness();
    let ticker = MaintenanceTicker::new(
        registry,
        supervisor.clone(),
        store.clone(),
        Duration::from_secs(120),
        Duration::from_secs(30),
        Duration::from_secs(1),
        Duration::from_secs(60),
    );

    supervisor.register(registered("svc-a")).await.unwrap();
    supervisor.register(registered("svc-b")).await.unwrap();

    ticker.on_tick(Duration::from_secs(60)).await;

    let snapshot = store.get_status(None).await.unwrap();
    assert_eq!(snapshot.len(), supervisor.all_statuses().await.len());
    assert_eq!(snapshot.len(), 2);
}

#[tokio::test]
async fn health_sweep_demotes_a_stale_running_record_to_warning() {
    let (registry, supervisor, store, clock) = harness_with_clock();
    let ticker = MaintenanceTicker::new(
        registry.clone(),
        supervisor.clone(),
        store,
        Duration::from_secs(120),
        Duration::from_secs(5),
        Duration::from_secs(1),
        Duration::from_secs(60),
    );

    supervisor.register(long_running("svc-a")).await.unwrap();
    supervisor.start("svc-a").await.unwrap();
    registry.upsert_from_heartbeat("svc-a", "Running", None).await;

    ticker.on_tick(Duration::from_secs(0)).await;
    assert_eq!(supervisor.status_of("svc-a").await.unwrap().status, ProcessStatus::Running);

    clock.advance(Duration::from_secs(6));
    ticker.on_tick(Duration::from_secs(0)).await;
    assert_eq!(supervisor.status_of("svc-a").await.unwrap().status, ProcessStatus::Warning);

    supervisor.stop("svc-a", Duration::from_secs(2)).await.unwrap();
}
