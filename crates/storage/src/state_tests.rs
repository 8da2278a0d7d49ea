use super::*;
use ghost_core::MetricSample;

fn sample(process_id: &str, timestamp: u64) -> MetricSample {
    MetricSample {
        process_id: process_id.to_string(),
        cpu_percentage: 1.0,
        memory_bytes: 1024,
        thread_count: 1,
        handle_count: 1,
        app_type: "unknown".to_string(),
        timestamp,
    }
}

#[test]
fn append_metric_trims_older_than_24h() {
    let mut state = StoreState::default();
    state.append_metric(sample("app1", 0), 0);
    state.append_metric(sample("app1", METRIC_RETENTION_MS + 1), METRIC_RETENTION_MS + 1);

    let series = &state.metrics["app1"];
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].timestamp, METRIC_RETENTION_MS + 1);
}

#[test]
fn latest_metric_returns_most_recently_appended() {
    let mut state = StoreState::default();
    state.append_metric(sample("app1", 10), 10);
    state.append_metric(sample("app1", 20), 20);

    assert_eq!(state.latest_metric("app1").unwrap().timestamp, 20);
}

#[test]
fn latest_metric_none_for_unknown_process() {
    let state = StoreState::default();
    assert!(state.latest_metric("unknown").is_none());
}
